//! End-to-end tests for the record store
//!
//! Runs the full path: config -> service context -> codec -> slot derivation -> ledger

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use docanchor_core::{
    derive_slot, EncodingError, RecordCodec, RecordKey, ServiceConfig, DEFAULT_SLOT_CAPACITY,
    OBSERVED_SLOT_CAPACITY,
};
use docanchor_store::{
    FetchError, IdentitySource, InMemoryLedger, Ledger, RecordStore, ServiceContext, StoreError,
};
use sha2::{Digest, Sha256};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::signer::keypair::write_keypair_file;

fn program_keypair(dir: &Path) -> (std::path::PathBuf, Pubkey) {
    let path = dir.join("hash-keypair.json");
    let keypair = Keypair::new();
    write_keypair_file(&keypair, &path).unwrap();
    (path, keypair.pubkey())
}

async fn start_store(
    dir: &Path,
    configure: impl FnOnce(ServiceConfig) -> ServiceConfig,
) -> (RecordStore, Arc<InMemoryLedger>) {
    let (program_path, program_id) = program_keypair(dir);
    let config = configure(
        ServiceConfig::new(program_path)
            .with_identity(dir.join("identity.json"))
            .with_poll_interval(Duration::from_millis(5)),
    );

    let ledger = Arc::new(InMemoryLedger::new(program_id));
    let context = ServiceContext::init(config, ledger.clone()).await.unwrap();
    (RecordStore::new(Arc::new(context)), ledger)
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[tokio::test]
async fn test_hello_digest_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _ledger) = start_store(dir.path(), |c| c).await;

    let digest = sha256_hex(b"Hello");
    assert_eq!(
        digest,
        "185f8db32271fe25f561a6fc938b2e264306ec304eda518007d1764826381969"
    );

    let key = RecordKey::new(1, 2);
    store.store(key, &digest).await.unwrap();

    let record = store.fetch(key).await.unwrap();
    assert_eq!(record.document_hash, digest);
    assert_eq!(record.key(), key);
}

#[tokio::test]
async fn test_init_funds_and_persists_identity() {
    let dir = tempfile::tempdir().unwrap();
    let (store, ledger) = start_store(dir.path(), |c| c).await;

    let context = store.context();
    assert!(matches!(context.identity().source(), IdentitySource::File(_)));
    assert!(dir.path().join("identity.json").exists());

    let balance = ledger.balance(&context.identity().pubkey()).await.unwrap();
    assert!(balance >= context.config().airdrop_lamports);
}

#[tokio::test]
async fn test_address_matches_independent_derivation() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _ledger) = start_store(dir.path(), |c| c).await;
    let key = RecordKey::new(12, 34);

    let receipt = store.store(key, "abc").await.unwrap();

    let context = store.context();
    let expected = derive_slot(&context.identity().pubkey(), &context.program_id(), &key).unwrap();
    assert_eq!(receipt.address, expected.address);
    assert_eq!(expected.seed, "12_34");
}

#[tokio::test]
async fn test_keys_are_independent() {
    let dir = tempfile::tempdir().unwrap();
    let (store, ledger) = start_store(dir.path(), |c| c).await;

    // "1_23" and "12_3" must not collide
    store.store(RecordKey::new(1, 23), "first").await.unwrap();
    store.store(RecordKey::new(12, 3), "second").await.unwrap();

    assert_eq!(store.fetch(RecordKey::new(1, 23)).await.unwrap().document_hash, "first");
    assert_eq!(store.fetch(RecordKey::new(12, 3)).await.unwrap().document_hash, "second");
    assert_eq!(ledger.slot_count().await, 2);
}

#[tokio::test]
async fn test_restore_same_hash_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let (store, ledger) = start_store(dir.path(), |c| c).await;
    let key = RecordKey::new(7, 8);
    let digest = sha256_hex(b"report body");

    for _ in 0..3 {
        store.store(key, &digest).await.unwrap();
    }

    assert_eq!(store.fetch(key).await.unwrap().document_hash, digest);
    assert_eq!(ledger.create_calls(), 1);
}

#[tokio::test]
async fn test_shorter_overwrite_leaves_no_tail() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _ledger) = start_store(dir.path(), |c| c).await;
    let key = RecordKey::new(3, 3);

    store.store(key, &sha256_hex(b"long")).await.unwrap();
    store.store(key, "short").await.unwrap();

    assert_eq!(store.fetch(key).await.unwrap().document_hash, "short");
}

#[tokio::test]
async fn test_fetch_before_store_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _ledger) = start_store(dir.path(), |c| c).await;

    let err = store.fetch(RecordKey::new(200, 201)).await.unwrap_err();
    assert!(matches!(err, FetchError::NotFound(_)));
}

#[tokio::test]
async fn test_id_boundaries() {
    let dir = tempfile::tempdir().unwrap();
    let (store, ledger) = start_store(dir.path(), |c| c).await;

    store.store(RecordKey::new(0, 0), "low").await.unwrap();
    store.store(RecordKey::new(255, 255), "high").await.unwrap();
    assert_eq!(store.fetch(RecordKey::new(255, 255)).await.unwrap().document_hash, "high");

    for key in [RecordKey::new(256, 0), RecordKey::new(0, 256), RecordKey::new(-1, 5)] {
        let err = store.store(key, "x").await.unwrap_err();
        assert!(err.is_invalid_input(), "{key} should be rejected");
        assert!(matches!(err, StoreError::Encoding(_)));
    }
    assert_eq!(ledger.slot_count().await, 2);
}

#[tokio::test]
async fn test_observed_capacity_rejects_full_digest() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _ledger) =
        start_store(dir.path(), |c| c.with_slot_capacity(OBSERVED_SLOT_CAPACITY)).await;
    let digest = sha256_hex(b"Hello");

    let err = store.store(RecordKey::new(1, 1), &digest).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Encoding(EncodingError::CapacityExceeded { len: 66, capacity: 64 })
    ));

    store.store(RecordKey::new(1, 1), &digest[..62]).await.unwrap();
    assert_eq!(
        store.fetch(RecordKey::new(1, 1)).await.unwrap().document_hash,
        &digest[..62]
    );
}

#[tokio::test]
async fn test_concurrent_stores_distinct_keys() {
    let dir = tempfile::tempdir().unwrap();
    let (store, ledger) = start_store(dir.path(), |c| c).await;
    let store = Arc::new(store);

    let handles: Vec<_> = (0..16i64)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                let key = RecordKey::new(i, i + 100);
                store.store(key, &format!("hash-{i}")).await.map(|_| key)
            })
        })
        .collect();

    for result in futures::future::join_all(handles).await {
        let key = result.unwrap().unwrap();
        let record = store.fetch(key).await.unwrap();
        assert_eq!(record.document_hash, format!("hash-{}", key.hospital_id));
    }
    assert_eq!(ledger.slot_count().await, 16);
}

#[tokio::test]
async fn test_stored_bytes_follow_record_layout() {
    let dir = tempfile::tempdir().unwrap();
    let (store, ledger) = start_store(dir.path(), |c| c).await;
    let key = RecordKey::new(9, 10);

    let receipt = store.store(key, "abc").await.unwrap();
    let data = ledger.account_data(&receipt.address).await.unwrap().unwrap();

    assert_eq!(data.len(), DEFAULT_SLOT_CAPACITY);
    assert_eq!(&data[..5], &[9, 10, b'a', b'b', b'c']);
    assert!(data[5..].iter().all(|b| *b == 0));

    let codec = RecordCodec::new(DEFAULT_SLOT_CAPACITY);
    assert_eq!(codec.decode(&data).unwrap().document_hash, "abc");
}
