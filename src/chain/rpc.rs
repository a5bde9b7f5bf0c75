use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ChainClient, ChainError, TransactionReceipt, TransactionRequest, USER_REJECTED_CODE};

/// key: chain-client-jsonrpc -> Ethereum JSON-RPC over HTTP
pub struct JsonRpcChainClient {
    client: reqwest::Client,
    endpoint: String,
    next_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    block_number: Option<String>,
}

impl JsonRpcChainClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let endpoint = endpoint.into();
        url::Url::parse(&endpoint)
            .with_context(|| format!("invalid chain rpc endpoint {endpoint}"))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build chain rpc client")?;
        Ok(Self {
            client,
            endpoint,
            next_id: AtomicU64::new(1),
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let envelope: RpcEnvelope = self
            .client
            .post(&self.endpoint)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": method,
                "params": params,
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = envelope.error {
            tracing::debug!(method, code = error.code, message = %error.message, "chain rpc returned error");
            if error.code == USER_REJECTED_CODE {
                return Err(ChainError::UserRejected(error.message));
            }
            return Err(ChainError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        Ok(envelope.result)
    }
}

fn parse_quantity(method: &str, value: &Value) -> Result<u64, ChainError> {
    let raw = value
        .as_str()
        .ok_or_else(|| ChainError::Malformed(format!("{method} result is not a hex string")))?;
    let digits = raw.trim_start_matches("0x");
    u64::from_str_radix(digits, 16)
        .map_err(|_| ChainError::Malformed(format!("{method} returned invalid quantity {raw}")))
}

#[async_trait]
impl ChainClient for JsonRpcChainClient {
    async fn estimate_gas(&self, request: &TransactionRequest) -> Result<u64, ChainError> {
        let result = self
            .call("eth_estimateGas", json!([request.to_rpc_params()]))
            .await?;
        parse_quantity("eth_estimateGas", &result)
    }

    async fn send_transaction(&self, request: &TransactionRequest) -> Result<String, ChainError> {
        let result = self
            .call("eth_sendTransaction", json!([request.to_rpc_params()]))
            .await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ChainError::Malformed("eth_sendTransaction result is not a hash".into()))
    }

    async fn transaction_receipt(&self, hash: &str) -> Result<Option<TransactionReceipt>, ChainError> {
        let result = self
            .call("eth_getTransactionReceipt", json!([hash]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        let receipt: RpcReceipt = serde_json::from_value(result)
            .map_err(|err| ChainError::Malformed(format!("invalid receipt for {hash}: {err}")))?;
        let block_number = receipt
            .block_number
            .as_ref()
            .map(|raw| parse_quantity("eth_getTransactionReceipt", &json!(raw)))
            .transpose()?;
        Ok(Some(TransactionReceipt {
            transaction_hash: receipt.transaction_hash,
            succeeded: receipt.status.as_deref() == Some("0x1"),
            block_number,
        }))
    }
}
