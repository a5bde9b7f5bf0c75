use anyhow::{bail, Result};

/// First four bytes of `keccak256("createSubscription(uint256,uint256)")`.
pub const CREATE_SUBSCRIPTION_SELECTOR: [u8; 4] = [0xa7, 0x1b, 0x6c, 0xd0];

/// key: payment-contract -> deployed renewal contract handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentContract {
    address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub to: String,
    pub data: Vec<u8>,
}

impl PaymentContract {
    pub fn new(address: impl Into<String>) -> Result<Self> {
        let address = address.into();
        if !is_address(&address) {
            bail!("contract address {address} must be 0x followed by 20 hex-encoded bytes");
        }
        Ok(Self {
            address: address.to_ascii_lowercase(),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Payable `createSubscription(price, duration)`; the caller attaches `price` as value.
    pub fn create_subscription(&self, price: u128, duration_secs: u64) -> ContractCall {
        let mut data = Vec::with_capacity(4 + 64);
        data.extend_from_slice(&CREATE_SUBSCRIPTION_SELECTOR);
        data.extend_from_slice(&encode_uint256(price));
        data.extend_from_slice(&encode_uint256(u128::from(duration_secs)));
        ContractCall {
            to: self.address.clone(),
            data,
        }
    }
}

/// `0x` followed by 40 hex digits, in either case.
pub fn is_address(value: &str) -> bool {
    value
        .strip_prefix("0x")
        .map_or(false, |digits| digits.len() == 40 && digits.chars().all(|c| c.is_ascii_hexdigit()))
}

fn encode_uint256(value: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}
