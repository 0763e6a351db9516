//! Chain identity, transaction and receipt types
//!
//! Quantities cross the RPC boundary as `0x`-prefixed hex strings; some
//! nodes answer with plain JSON numbers, so both forms are accepted when
//! decoding.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::error::{DeployerError, Result};

// ============================================================================
// Chain Identity
// ============================================================================

/// Which side of the bridge a transaction targets.
///
/// Resolved once from configuration; call sites never compare URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainRole {
    Home,
    Foreign,
}

impl ChainRole {
    pub const ALL: [ChainRole; 2] = [ChainRole::Home, ChainRole::Foreign];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChainRole::Home => "home",
            ChainRole::Foreign => "foreign",
        }
    }

    /// Environment variable prefix for this side (`HOME` / `FOREIGN`)
    pub fn env_prefix(&self) -> &'static str {
        match self {
            ChainRole::Home => "HOME",
            ChainRole::Foreign => "FOREIGN",
        }
    }
}

impl fmt::Display for ChainRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON-RPC method namespace exposed by a chain's node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RpcNamespace {
    #[default]
    Eth,
    /// Harmony nodes (`hmy_sendRawTransaction`, ...)
    Hmy,
}

impl RpcNamespace {
    pub fn prefix(&self) -> &'static str {
        match self {
            RpcNamespace::Eth => "eth",
            RpcNamespace::Hmy => "hmy",
        }
    }

    /// Full method name, e.g. `method("getTransactionReceipt")`
    pub fn method(&self, name: &str) -> String {
        format!("{}_{}", self.prefix(), name)
    }

    pub fn send_raw_transaction(&self) -> String {
        self.method("sendRawTransaction")
    }
}

impl FromStr for RpcNamespace {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eth" => Ok(RpcNamespace::Eth),
            "hmy" => Ok(RpcNamespace::Hmy),
            other => Err(format!("unknown RPC namespace '{}' (expected eth or hmy)", other)),
        }
    }
}

/// Where the gas estimate for a transaction comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasEstimation {
    /// Ask the node (`eth_estimateGas`)
    Rpc,
    /// Use a fixed figure for chains whose estimator is not reliable yet
    Fixed(u64),
}

/// Per-chain gas policy for outgoing administrative transactions
#[derive(Debug, Clone, PartialEq)]
pub struct GasPolicy {
    /// Fixed gas price in wei
    pub gas_price: u128,
    /// Extra fraction added on top of the estimate (0.2 = +20%)
    pub limit_margin: f64,
    pub estimation: GasEstimation,
}

/// Immutable identity of a target chain
#[derive(Debug, Clone)]
pub struct ChainEndpoint {
    pub role: ChainRole,
    pub url: Url,
    pub chain_id: u64,
    pub namespace: RpcNamespace,
    pub gas: GasPolicy,
}

// ============================================================================
// Transactions
// ============================================================================

/// Unsigned legacy transaction ready for signing.
///
/// `from` is the account whose nonce was read; the signer refuses any key
/// that does not derive to it. `to == None` creates a contract.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTransaction {
    pub from: Address,
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub to: Option<Address>,
    pub data: Bytes,
    pub value: U256,
}

impl RawTransaction {
    pub fn gas_price_hex(&self) -> String {
        to_quantity(self.gas_price)
    }

    pub fn gas_limit_hex(&self) -> String {
        to_quantity(self.gas_limit as u128)
    }

    /// JSON-RPC transaction object (hex quantities)
    pub fn to_rpc_object(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("from".into(), json!(self.from));
        if let Some(to) = self.to {
            obj.insert("to".into(), json!(to));
        }
        obj.insert("nonce".into(), json!(to_quantity(self.nonce as u128)));
        obj.insert("gasPrice".into(), json!(self.gas_price_hex()));
        obj.insert("gas".into(), json!(self.gas_limit_hex()));
        obj.insert("value".into(), json!(format!("{:#x}", self.value)));
        obj.insert("data".into(), json!(self.data));
        Value::Object(obj)
    }
}

/// Receipt as reported by the node.
///
/// `block_number == None` means not yet mined. `status == None` with a block
/// number present is a mined transaction whose outcome the node did not
/// report; it needs confirmation against contract state.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionReceipt {
    pub transaction_hash: TxHash,
    pub block_number: Option<u64>,
    pub status: Option<u64>,
    pub contract_address: Option<Address>,
    pub gas_used: Option<u64>,
}

/// What a receipt says about execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptOutcome {
    Pending,
    Succeeded,
    Reverted,
    StatusUnknown,
}

impl TransactionReceipt {
    pub fn is_mined(&self) -> bool {
        self.block_number.is_some()
    }

    pub fn outcome(&self) -> ReceiptOutcome {
        if !self.is_mined() {
            return ReceiptOutcome::Pending;
        }
        match self.status {
            Some(1) => ReceiptOutcome::Succeeded,
            Some(_) => ReceiptOutcome::Reverted,
            None => ReceiptOutcome::StatusUnknown,
        }
    }

    /// Decode the `result` of a `getTransactionReceipt` call
    pub(crate) fn from_rpc(method: &str, value: Value) -> Result<Option<Self>> {
        if value.is_null() {
            return Ok(None);
        }

        let raw: RpcReceipt = serde_json::from_value(value)
            .map_err(|e| DeployerError::malformed(method, format!("bad receipt: {}", e)))?;

        let transaction_hash = TxHash::from_str(&raw.transaction_hash)
            .map_err(|e| DeployerError::malformed(method, format!("bad transactionHash: {}", e)))?;

        let opt_quantity = |field: &str, v: &Option<Value>| -> Result<Option<u64>> {
            match v {
                None | Some(Value::Null) => Ok(None),
                Some(v) => quantity_u64(v)
                    .map(Some)
                    .map_err(|e| DeployerError::malformed(method, format!("bad {}: {}", field, e))),
            }
        };

        let contract_address = match raw.contract_address.as_deref() {
            None => None,
            Some(s) => Some(Address::from_str(s).map_err(|e| {
                DeployerError::malformed(method, format!("bad contractAddress: {}", e))
            })?),
        };

        Ok(Some(Self {
            transaction_hash,
            block_number: opt_quantity("blockNumber", &raw.block_number)?,
            status: opt_quantity("status", &raw.status)?,
            contract_address,
            gas_used: opt_quantity("gasUsed", &raw.gas_used)?,
        }))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: String,
    #[serde(default)]
    block_number: Option<Value>,
    #[serde(default)]
    status: Option<Value>,
    #[serde(default)]
    contract_address: Option<String>,
    #[serde(default)]
    gas_used: Option<Value>,
}

// ============================================================================
// Quantity Encoding
// ============================================================================

/// Hex quantity encoding (`0x0`, `0x3b9aca00`)
pub fn to_quantity(value: u128) -> String {
    format!("{:#x}", value)
}

/// Decode a quantity given either as hex string or JSON number
pub fn quantity_u128(value: &Value) -> std::result::Result<u128, String> {
    match value {
        Value::String(s) => {
            let digits = s
                .strip_prefix("0x")
                .or_else(|| s.strip_prefix("0X"))
                .ok_or_else(|| format!("quantity '{}' is not 0x-prefixed", s))?;
            if digits.is_empty() {
                return Err("empty quantity".to_string());
            }
            u128::from_str_radix(digits, 16).map_err(|e| format!("quantity '{}': {}", s, e))
        }
        Value::Number(n) => n
            .as_u64()
            .map(u128::from)
            .ok_or_else(|| format!("quantity {} is not a non-negative integer", n)),
        other => Err(format!("expected quantity, got {}", other)),
    }
}

pub fn quantity_u64(value: &Value) -> std::result::Result<u64, String> {
    let v = quantity_u128(value)?;
    u64::try_from(v).map_err(|_| format!("quantity {} overflows u64", v))
}
