//! Solana JSON-RPC ledger client

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use docanchor_core::{Pubkey, SlotAddress};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::signature::{Keypair, Signature, Signer};
#[allow(deprecated)]
use solana_sdk::system_instruction;
use solana_sdk::transaction::Transaction;

use crate::error::LedgerError;
use crate::ledger::{write_instruction, Ledger, TxStatus};

#[derive(Serialize)]
struct RpcRequest<'a, P> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

#[derive(Deserialize)]
struct RpcResponse<R> {
    result: Option<R>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

impl From<RpcErrorObject> for LedgerError {
    fn from(err: RpcErrorObject) -> Self {
        // sendTransaction preflight failures carry the program logs
        let logs = err
            .data
            .as_ref()
            .and_then(|d| d.get("logs"))
            .and_then(Value::as_array)
            .map(|logs| {
                logs.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        LedgerError::Rpc {
            code: err.code,
            message: err.message,
            logs,
        }
    }
}

/// `{ context, value }` wrapper used by most account/signature methods
#[derive(Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Deserialize)]
struct BlockhashValue {
    blockhash: String,
}

#[derive(Deserialize)]
struct AccountValue {
    /// `[data, encoding]`
    data: (String, String),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignatureStatusValue {
    #[serde(default)]
    err: Option<Value>,
    #[serde(default)]
    confirmation_status: Option<String>,
}

fn commitment_rank(level: &str) -> u8 {
    match level {
        "processed" => 0,
        "confirmed" => 1,
        _ => 2,
    }
}

/// Ledger client speaking Solana JSON-RPC over HTTP
pub struct SolanaRpcLedger {
    http: reqwest::Client,
    url: String,
    commitment: String,
    next_id: AtomicU64,
}

impl SolanaRpcLedger {
    pub fn new(url: &str, commitment: &str) -> Result<Self, LedgerError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            url: url.to_string(),
            commitment: commitment.to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Raw JSON-RPC call
    async fn rpc_call<P, R>(&self, method: &str, params: P) -> Result<R, LedgerError>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response: RpcResponse<R> = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = response.error {
            tracing::debug!(method, code = err.code, message = %err.message, "RPC error");
            return Err(err.into());
        }

        response
            .result
            .ok_or_else(|| LedgerError::InvalidResponse(format!("{} returned no result", method)))
    }

    async fn latest_blockhash(&self) -> Result<Hash, LedgerError> {
        let resp: WithContext<BlockhashValue> = self
            .rpc_call("getLatestBlockhash", [json!({ "commitment": self.commitment })])
            .await?;
        Hash::from_str(&resp.value.blockhash)
            .map_err(|e| LedgerError::InvalidResponse(format!("bad blockhash: {}", e)))
    }

    /// Sign with `payer` against a fresh blockhash and submit
    async fn send(&self, payer: &Keypair, instructions: &[Instruction]) -> Result<Signature, LedgerError> {
        let blockhash = self.latest_blockhash().await?;
        let tx = Transaction::new_signed_with_payer(
            instructions,
            Some(&payer.pubkey()),
            &[payer],
            blockhash,
        );
        let signature = tx.signatures[0];

        let wire = bincode::serialize(&tx).map_err(|e| LedgerError::Serialization(e.to_string()))?;
        let encoded = BASE64.encode(wire);

        let returned: String = self
            .rpc_call(
                "sendTransaction",
                (
                    encoded,
                    json!({ "encoding": "base64", "preflightCommitment": self.commitment }),
                ),
            )
            .await?;

        if returned != signature.to_string() {
            tracing::warn!(expected = %signature, returned, "RPC returned unexpected signature");
        }

        Ok(signature)
    }
}

#[async_trait]
impl Ledger for SolanaRpcLedger {
    async fn minimum_balance(&self, space: usize) -> Result<u64, LedgerError> {
        self.rpc_call("getMinimumBalanceForRentExemption", [space]).await
    }

    async fn balance(&self, pubkey: &Pubkey) -> Result<u64, LedgerError> {
        let resp: WithContext<u64> = self
            .rpc_call(
                "getBalance",
                (pubkey.to_string(), json!({ "commitment": self.commitment })),
            )
            .await?;
        Ok(resp.value)
    }

    async fn account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, LedgerError> {
        let resp: WithContext<Option<AccountValue>> = self
            .rpc_call(
                "getAccountInfo",
                (
                    address.to_string(),
                    json!({ "encoding": "base64", "commitment": self.commitment }),
                ),
            )
            .await?;

        let Some(account) = resp.value else {
            return Ok(None);
        };

        let (data, encoding) = account.data;
        if encoding != "base64" {
            return Err(LedgerError::InvalidResponse(format!(
                "unexpected account encoding: {}",
                encoding
            )));
        }

        let bytes = BASE64
            .decode(data)
            .map_err(|e| LedgerError::InvalidResponse(format!("bad account data: {}", e)))?;
        Ok(Some(bytes))
    }

    async fn create_slot(
        &self,
        payer: &Keypair,
        slot: &SlotAddress,
        space: usize,
        lamports: u64,
    ) -> Result<Signature, LedgerError> {
        #[allow(deprecated)]
        let ix = system_instruction::create_account_with_seed(
            &payer.pubkey(),
            &slot.address,
            &slot.base,
            &slot.seed,
            lamports,
            space as u64,
            &slot.program_id,
        );

        self.send(payer, &[ix]).await.map_err(|e| {
            if e.mentions("already in use") {
                LedgerError::AccountAlreadyExists(slot.address)
            } else {
                e
            }
        })
    }

    async fn write_slot(
        &self,
        authority: &Keypair,
        slot: &SlotAddress,
        image: &[u8],
    ) -> Result<Signature, LedgerError> {
        let ix = write_instruction(slot, &authority.pubkey(), image);
        self.send(authority, &[ix]).await
    }

    async fn request_funding(
        &self,
        pubkey: &Pubkey,
        lamports: u64,
    ) -> Result<Signature, LedgerError> {
        let signature: String = self
            .rpc_call("requestAirdrop", (pubkey.to_string(), lamports))
            .await?;
        Signature::from_str(&signature)
            .map_err(|e| LedgerError::InvalidResponse(format!("bad signature: {}", e)))
    }

    async fn signature_status(&self, signature: &Signature) -> Result<TxStatus, LedgerError> {
        let resp: WithContext<Vec<Option<SignatureStatusValue>>> = self
            .rpc_call(
                "getSignatureStatuses",
                (
                    [signature.to_string()],
                    json!({ "searchTransactionHistory": true }),
                ),
            )
            .await?;

        let Some(status) = resp.value.into_iter().next().flatten() else {
            return Ok(TxStatus::Pending);
        };

        if let Some(err) = status.err {
            return Ok(TxStatus::Failed(err.to_string()));
        }

        // Nodes that omit confirmationStatus only report rooted transactions
        let reached = status.confirmation_status.as_deref().unwrap_or("finalized");
        if commitment_rank(reached) >= commitment_rank(&self.commitment) {
            Ok(TxStatus::Committed)
        } else {
            Ok(TxStatus::Pending)
        }
    }
}
