use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

pub mod contract;
pub mod rpc;
pub mod units;

pub use contract::{is_address, ContractCall, PaymentContract, CREATE_SUBSCRIPTION_SELECTOR};
pub use rpc::JsonRpcChainClient;
pub use units::{to_base_units, to_wei, WEI_DECIMALS};

/// EIP-1193 code returned when the wallet owner declines a request.
pub const USER_REJECTED_CODE: i64 = 4001;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("invalid amount '{amount}': {reason}")]
    InvalidAmount { amount: String, reason: String },
    #[error("request rejected by user: {0}")]
    UserRejected(String),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("rpc transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed rpc response: {0}")]
    Malformed(String),
}

impl ChainError {
    pub fn is_user_rejection(&self) -> bool {
        match self {
            ChainError::UserRejected(_) => true,
            ChainError::Rpc { code, message } => {
                *code == USER_REJECTED_CODE || looks_like_rejection(message)
            }
            _ => false,
        }
    }
}

fn looks_like_rejection(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("user denied") || message.contains("user rejected")
}

/// key: chain-client -> transaction envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: String,
    pub to: String,
    pub value: u128,
    pub gas: Option<u64>,
    pub data: Vec<u8>,
}

impl TransactionRequest {
    pub fn for_call(from: impl Into<String>, call: &ContractCall, value: u128) -> Self {
        Self {
            from: from.into(),
            to: call.to.clone(),
            value,
            gas: None,
            data: call.data.clone(),
        }
    }

    pub fn with_gas(mut self, gas: u64) -> Self {
        self.gas = Some(gas);
        self
    }

    /// Ethereum JSON-RPC transaction object with hex quantities.
    pub fn to_rpc_params(&self) -> Value {
        let mut params = json!({
            "from": self.from,
            "to": self.to,
            "value": format!("0x{:x}", self.value),
            "data": format!("0x{}", hex::encode(&self.data)),
        });
        if let Some(gas) = self.gas {
            params["gas"] = json!(format!("0x{gas:x}"));
        }
        params
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    pub succeeded: bool,
    pub block_number: Option<u64>,
}

/// key: chain-client -> collaborator interface
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn estimate_gas(&self, request: &TransactionRequest) -> Result<u64, ChainError>;

    /// Submits the transaction and returns its hash once the node accepts it.
    async fn send_transaction(&self, request: &TransactionRequest) -> Result<String, ChainError>;

    /// `None` while the transaction is not mined yet.
    async fn transaction_receipt(&self, hash: &str) -> Result<Option<TransactionReceipt>, ChainError>;
}

/// `ceil(estimate * (100 + margin_percent) / 100)`, saturating at `u64::MAX`.
pub fn gas_limit_with_margin(estimate: u64, margin_percent: u64) -> u64 {
    let scaled = u128::from(estimate) * (100 + u128::from(margin_percent));
    let limit = (scaled + 99) / 100;
    u64::try_from(limit).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gas_margin_rounds_up() {
        assert_eq!(gas_limit_with_margin(100_000, 20), 120_000);
        assert_eq!(gas_limit_with_margin(21_001, 20), 25_202);
        assert_eq!(gas_limit_with_margin(0, 20), 0);
        assert_eq!(gas_limit_with_margin(u64::MAX, 20), u64::MAX);
    }

    #[test]
    fn rejection_is_detected_from_code_or_message() {
        let coded = ChainError::Rpc {
            code: USER_REJECTED_CODE,
            message: "denied".into(),
        };
        let worded = ChainError::Rpc {
            code: -32000,
            message: "MetaMask Tx Signature: User denied transaction signature.".into(),
        };
        let other = ChainError::Rpc {
            code: -32000,
            message: "insufficient funds for gas * price + value".into(),
        };
        assert!(coded.is_user_rejection());
        assert!(worded.is_user_rejection());
        assert!(!other.is_user_rejection());
    }

    #[test]
    fn rpc_params_use_hex_quantities() {
        let request = TransactionRequest {
            from: "0xabc".into(),
            to: "0xdef".into(),
            value: 10_000_000_000_000_000,
            gas: None,
            data: vec![0xa7, 0x1b],
        }
        .with_gas(120_000);
        let params = request.to_rpc_params();
        assert_eq!(params["value"], "0x2386f26fc10000");
        assert_eq!(params["gas"], "0x1d4c0");
        assert_eq!(params["data"], "0xa71b");
    }
}
