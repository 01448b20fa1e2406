//! Fixed-capacity record layout
//!
//! ```text
//! offset 0      hospital id (u8)
//! offset 1      report id (u8)
//! offset 2..n   document hash, utf-8
//! offset n..cap 0x00 padding
//! ```
//!
//! NUL never appears inside a document hash, so trailing zeros are always
//! padding and a slot that was created but never written is all zeros.

use serde::{Deserialize, Serialize};

use crate::error::{DecodingError, EncodingError};
use crate::slot::RecordKey;

/// Bytes taken by the two id fields
pub const RECORD_HEADER_LEN: usize = 2;

/// Slot size used by the first deployment of the service
pub const OBSERVED_SLOT_CAPACITY: usize = 64;

/// Header plus a 64-character hex SHA-256 digest
pub const DEFAULT_SLOT_CAPACITY: usize = RECORD_HEADER_LEN + crate::constants::SHA256_HEX_LEN;

/// A decoded slot record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashRecord {
    pub hospital_id: u8,
    pub report_id: u8,
    pub document_hash: String,
}

impl HashRecord {
    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.hospital_id.into(), self.report_id.into())
    }
}

/// Encoder/decoder bound to a slot capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordCodec {
    capacity: usize,
    require_hash: bool,
}

impl RecordCodec {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            require_hash: true,
        }
    }

    /// Accept records whose document hash is empty
    pub fn allow_empty_hash(mut self) -> Self {
        self.require_hash = false;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Longest document hash (in bytes) this codec can store
    pub fn max_hash_len(&self) -> usize {
        self.capacity.saturating_sub(RECORD_HEADER_LEN)
    }

    /// Encode a record without padding
    pub fn encode(
        &self,
        hospital_id: i64,
        report_id: i64,
        document_hash: &str,
    ) -> Result<Vec<u8>, EncodingError> {
        let hospital = u8::try_from(hospital_id)
            .map_err(|_| EncodingError::HospitalIdOutOfRange(hospital_id))?;
        let report =
            u8::try_from(report_id).map_err(|_| EncodingError::ReportIdOutOfRange(report_id))?;

        let hash = document_hash.as_bytes();
        if let Some(pos) = hash.iter().position(|&b| b == 0) {
            return Err(EncodingError::EmbeddedNul(pos));
        }

        let len = RECORD_HEADER_LEN + hash.len();
        if len > self.capacity {
            return Err(EncodingError::CapacityExceeded {
                len,
                capacity: self.capacity,
            });
        }

        let mut bytes = Vec::with_capacity(len);
        bytes.push(hospital);
        bytes.push(report);
        bytes.extend_from_slice(hash);
        Ok(bytes)
    }

    /// Encode a record for a key
    pub fn encode_for(&self, key: &RecordKey, document_hash: &str) -> Result<Vec<u8>, EncodingError> {
        self.encode(key.hospital_id, key.report_id, document_hash)
    }

    /// Pad an encoded record with zeros up to the slot capacity
    pub fn slot_image(&self, record: &[u8]) -> Vec<u8> {
        let mut image = record.to_vec();
        if image.len() < self.capacity {
            image.resize(self.capacity, 0);
        }
        image
    }

    /// Decode slot bytes, stripping trailing padding
    pub fn decode(&self, bytes: &[u8]) -> Result<HashRecord, DecodingError> {
        if bytes.len() < RECORD_HEADER_LEN {
            return Err(DecodingError::TooShort(bytes.len()));
        }

        let body = &bytes[RECORD_HEADER_LEN..];
        let end = body.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        let document_hash = String::from_utf8(body[..end].to_vec())?;

        if self.require_hash && document_hash.is_empty() {
            return Err(DecodingError::EmptyHash);
        }

        Ok(HashRecord {
            hospital_id: bytes[0],
            report_id: bytes[1],
            document_hash,
        })
    }

    /// Decode and check the record belongs to `key`
    pub fn decode_for(&self, key: &RecordKey, bytes: &[u8]) -> Result<HashRecord, DecodingError> {
        let record = self.decode(bytes)?;
        if i64::from(record.hospital_id) != key.hospital_id
            || i64::from(record.report_id) != key.report_id
        {
            return Err(DecodingError::KeyMismatch {
                expected: key.seed(),
                actual_hospital: record.hospital_id,
                actual_report: record.report_id,
            });
        }
        Ok(record)
    }

    /// True when a slot was allocated but never written
    pub fn is_blank(bytes: &[u8]) -> bool {
        bytes.iter().all(|&b| b == 0)
    }
}

impl Default for RecordCodec {
    fn default() -> Self {
        Self::new(DEFAULT_SLOT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_SHA256: &str = "185f8db32271fe25f561a6fc938b2e264306ec304eda518007d1764826381969";

    #[test]
    fn test_layout() {
        let codec = RecordCodec::default();
        let bytes = codec.encode(1, 2, "abc").unwrap();
        assert_eq!(bytes, vec![1, 2, b'a', b'b', b'c']);
    }

    #[test]
    fn test_roundtrip_through_padded_slot() {
        let codec = RecordCodec::default();
        for (h, r, d) in [(0, 0, "x"), (255, 255, HELLO_SHA256), (17, 3, "ümlaut")] {
            let image = codec.slot_image(&codec.encode(h, r, d).unwrap());
            assert_eq!(image.len(), DEFAULT_SLOT_CAPACITY);

            let record = codec.decode(&image).unwrap();
            assert_eq!(i64::from(record.hospital_id), h);
            assert_eq!(i64::from(record.report_id), r);
            assert_eq!(record.document_hash, d);
        }
    }

    #[test]
    fn test_sha256_hex_fits_default_capacity() {
        let codec = RecordCodec::default();
        let bytes = codec.encode(1, 2, HELLO_SHA256).unwrap();
        assert_eq!(bytes.len(), DEFAULT_SLOT_CAPACITY);
    }

    #[test]
    fn test_capacity_exceeded_is_rejected() {
        let codec = RecordCodec::new(OBSERVED_SLOT_CAPACITY);
        let max = "a".repeat(codec.max_hash_len());
        assert!(codec.encode(1, 1, &max).is_ok());

        let over = "a".repeat(codec.max_hash_len() + 1);
        assert_eq!(
            codec.encode(1, 1, &over),
            Err(EncodingError::CapacityExceeded { len: 65, capacity: 64 })
        );
        assert!(matches!(
            codec.encode(1, 1, HELLO_SHA256),
            Err(EncodingError::CapacityExceeded { .. })
        ));
    }

    #[test]
    fn test_ids_out_of_range() {
        let codec = RecordCodec::default();
        assert_eq!(codec.encode(256, 0, "h"), Err(EncodingError::HospitalIdOutOfRange(256)));
        assert_eq!(codec.encode(-1, 0, "h"), Err(EncodingError::HospitalIdOutOfRange(-1)));
        assert_eq!(codec.encode(0, 300, "h"), Err(EncodingError::ReportIdOutOfRange(300)));
    }

    #[test]
    fn test_nul_is_reserved_for_padding() {
        let codec = RecordCodec::default();
        assert_eq!(codec.encode(1, 1, "ab\0c"), Err(EncodingError::EmbeddedNul(2)));
    }

    #[test]
    fn test_decode_errors() {
        let codec = RecordCodec::default();
        assert_eq!(codec.decode(&[7]), Err(DecodingError::TooShort(1)));
        assert_eq!(codec.decode(&[1, 2, 0, 0]), Err(DecodingError::EmptyHash));
        assert!(matches!(
            codec.decode(&[1, 2, 0xff, 0xfe]),
            Err(DecodingError::InvalidUtf8(_))
        ));

        let lenient = codec.allow_empty_hash();
        let record = lenient.decode(&[1, 2]).unwrap();
        assert_eq!(record.document_hash, "");
    }

    #[test]
    fn test_decode_for_checks_key() {
        let codec = RecordCodec::default();
        let bytes = codec.encode(5, 12, "abc").unwrap();
        assert!(codec.decode_for(&RecordKey::new(5, 12), &bytes).is_ok());
        assert!(matches!(
            codec.decode_for(&RecordKey::new(5, 13), &bytes),
            Err(DecodingError::KeyMismatch { .. })
        ));
    }

    #[test]
    fn test_is_blank() {
        assert!(RecordCodec::is_blank(&[0u8; 64]));
        assert!(!RecordCodec::is_blank(&[0, 1, 0]));
    }
}
