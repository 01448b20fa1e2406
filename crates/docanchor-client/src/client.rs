//! HTTP client for the document hash service

use std::time::Duration;

use docanchor_core::RecordKey;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoreRequest<'a> {
    hospital_id: i64,
    report_id: i64,
    document_hash: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FetchRequest {
    hospital_id: i64,
    report_id: i64,
}

/// Response from `/store`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreResponse {
    pub status: String,
    #[serde(default)]
    pub reason: Option<String>,
}

impl StoreResponse {
    pub fn is_ok(&self) -> bool {
        self.status == "OK"
    }
}

/// Response from `/fetch`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchResponse {
    pub hospital_id: i64,
    pub report_id: i64,
    pub document_hash: String,
}

impl FetchResponse {
    /// The stored hash, or `None` for the empty sentinel
    pub fn hash(&self) -> Option<&str> {
        if self.document_hash.is_empty() {
            None
        } else {
            Some(&self.document_hash)
        }
    }
}

/// Response from `/health`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub identity: String,
    pub program_id: String,
    pub slot_capacity: usize,
}

pub struct DocAnchorClient {
    http: Client,
    server_url: String,
}

impl DocAnchorClient {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self::with_http(Client::new(), server_url)
    }

    /// Client whose requests give up after `timeout`
    pub fn with_timeout(server_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_http(http, server_url))
    }

    pub fn with_http(http: Client, server_url: impl Into<String>) -> Self {
        let server_url = server_url.into();
        Self {
            http,
            server_url: server_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Store `document_hash` under `key`, waiting for the ledger to commit it
    pub async fn store(&self, key: RecordKey, document_hash: &str) -> Result<StoreResponse> {
        let url = format!("{}/store", self.server_url);
        let resp = self
            .http
            .post(&url)
            .json(&StoreRequest {
                hospital_id: key.hospital_id,
                report_id: key.report_id,
                document_hash,
            })
            .send()
            .await?;

        let status = resp.status().as_u16();
        let body = resp.text().await?;

        match serde_json::from_str::<StoreResponse>(&body) {
            Ok(parsed) if parsed.is_ok() => Ok(parsed),
            Ok(parsed) => Err(ClientError::Rejected {
                status,
                reason: parsed.reason.unwrap_or_default(),
            }),
            Err(_) => Err(ClientError::Server {
                status,
                message: body,
            }),
        }
    }

    /// Read the record under `key`; an empty `documentHash` means nothing readable
    pub async fn fetch(&self, key: RecordKey) -> Result<FetchResponse> {
        let url = format!("{}/fetch", self.server_url);
        let resp = self
            .http
            .post(&url)
            .json(&FetchRequest {
                hospital_id: key.hospital_id,
                report_id: key.report_id,
            })
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ClientError::Server {
                status: resp.status().as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }

        Ok(resp.json().await?)
    }

    /// Fetch and unwrap the sentinel into an `Option`
    pub async fn fetch_hash(&self, key: RecordKey) -> Result<Option<String>> {
        let resp = self.fetch(key).await?;
        Ok(resp.hash().map(str::to_string))
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let url = format!("{}/health", self.server_url);
        let resp = self.http.get(&url).send().await?;

        if !resp.status().is_success() {
            return Err(ClientError::Server {
                status: resp.status().as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }

        Ok(resp.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = DocAnchorClient::new("http://localhost:3000/");
        assert_eq!(client.server_url(), "http://localhost:3000");
    }

    #[test]
    fn test_store_request_wire_names() {
        let req = StoreRequest {
            hospital_id: 1,
            report_id: 2,
            document_hash: "abc",
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["hospitalId"], 1);
        assert_eq!(json["reportId"], 2);
        assert_eq!(json["documentHash"], "abc");
    }

    #[test]
    fn test_store_response_parsing() {
        let ok: StoreResponse = serde_json::from_str(r#"{"status":"OK"}"#).unwrap();
        assert!(ok.is_ok());
        assert!(ok.reason.is_none());

        let err: StoreResponse =
            serde_json::from_str(r#"{"status":"Error","reason":"hospital id 300 out of range"}"#)
                .unwrap();
        assert!(!err.is_ok());
        assert_eq!(err.reason.as_deref(), Some("hospital id 300 out of range"));
    }

    #[test]
    fn test_fetch_sentinel() {
        let empty: FetchResponse = serde_json::from_str(
            r#"{"hospitalId":1,"reportId":2,"documentHash":""}"#,
        )
        .unwrap();
        assert_eq!(empty.hash(), None);

        let found: FetchResponse = serde_json::from_str(
            r#"{"hospitalId":1,"reportId":2,"documentHash":"abc"}"#,
        )
        .unwrap();
        assert_eq!(found.hash(), Some("abc"));
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let client =
            DocAnchorClient::with_timeout("http://127.0.0.1:1", Duration::from_millis(500))
                .unwrap();
        let result = client.fetch(RecordKey::new(1, 1)).await;
        assert!(matches!(result, Err(ClientError::Http(_))));
    }
}
