//! JSON-RPC client
//!
//! Sends `{jsonrpc:"2.0", method, params:[...], id:1}` envelopes to a chain
//! endpoint and hands back the raw `result`. The transport sits behind
//! [`RpcTransport`] so the envelope rules, error mapping and typed helpers are
//! the same whether the bytes go over HTTP or to a test double.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::{DeployerError, Result};
use crate::types::{quantity_u64, RpcNamespace, TransactionReceipt};

/// Length of a `0x`-prefixed 32-byte transaction hash
pub const TX_HASH_LENGTH: usize = 66;

/// JSON-RPC request envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcRequest {
    pub jsonrpc: &'static str,
    pub method: String,
    pub params: Vec<Value>,
    pub id: u64,
}

impl RpcRequest {
    /// Build an envelope; a non-array `params` becomes a one-element array.
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        let params = match params {
            Value::Array(items) => items,
            scalar => vec![scalar],
        };
        Self {
            jsonrpc: "2.0",
            method: method.into(),
            params,
            id: 1,
        }
    }
}

/// JSON-RPC response envelope
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub result: Value,
    /// Kept as raw JSON: nodes do not agree on the error shape
    #[serde(default)]
    pub error: Option<Value>,
}

/// Code reported when the node's error carries no integer `code`
pub const INTERNAL_ERROR_CODE: i64 = -32603;

/// Normalized JSON-RPC error
#[derive(Debug, Clone, PartialEq)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

impl RpcErrorObject {
    /// Read any non-null `error` value.
    ///
    /// A string is the message itself. An object without a string `message`
    /// keeps its JSON text as the message; a missing or non-integer `code`
    /// becomes [`INTERNAL_ERROR_CODE`].
    pub fn from_value(error: &Value) -> Self {
        let code = error
            .get("code")
            .and_then(Value::as_i64)
            .unwrap_or(INTERNAL_ERROR_CODE);
        let message = match error {
            Value::String(text) => text.clone(),
            other => other
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| other.to_string()),
        };
        Self { code, message }
    }
}

/// Moves one envelope to a node and back
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn send(&self, url: &Url, request: &RpcRequest) -> Result<RpcResponse>;
}

/// HTTP POST transport
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn send(&self, url: &Url, request: &RpcRequest) -> Result<RpcResponse> {
        let response = self
            .client
            .post(url.clone())
            .header("Content-type", "application/json")
            .json(request)
            .send()
            .await?
            .json::<RpcResponse>()
            .await?;
        Ok(response)
    }
}

/// JSON-RPC client bound to one chain endpoint
#[derive(Clone)]
pub struct RpcClient {
    transport: Arc<dyn RpcTransport>,
    url: Url,
    namespace: RpcNamespace,
}

impl RpcClient {
    pub fn new(transport: Arc<dyn RpcTransport>, url: Url, namespace: RpcNamespace) -> Self {
        Self {
            transport,
            url,
            namespace,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn namespace(&self) -> RpcNamespace {
        self.namespace
    }

    /// Send `method` and return its `result` verbatim.
    ///
    /// A non-null `error` always fails with [`DeployerError::Rpc`]. The raw
    /// send method must answer with a 66-character transaction hash.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let request = RpcRequest::new(method, params);
        let response = self.transport.send(&self.url, &request).await?;

        if let Some(error) = response.error.as_ref().map(RpcErrorObject::from_value) {
            debug!(method, code = error.code, message = %error.message, "RPC call failed");
            return Err(DeployerError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        if method == self.namespace.send_raw_transaction() {
            check_tx_hash_shape(method, &response.result)?;
        }

        Ok(response.result)
    }

    // =========================================================================
    // Typed Helpers
    // =========================================================================

    pub async fn chain_id(&self) -> Result<u64> {
        let method = self.namespace.method("chainId");
        let result = self.call(&method, json!([])).await?;
        quantity_u64(&result).map_err(|e| DeployerError::malformed(&method, e))
    }

    /// Current sequence number of `address` (mined transactions only)
    pub async fn transaction_count(&self, address: Address) -> Result<u64> {
        let method = self.namespace.method("getTransactionCount");
        let result = self.call(&method, json!([address, "latest"])).await?;
        quantity_u64(&result).map_err(|e| DeployerError::malformed(&method, e))
    }

    pub async fn balance(&self, address: Address) -> Result<U256> {
        let method = self.namespace.method("getBalance");
        let result = self.call(&method, json!([address, "latest"])).await?;
        let raw = result
            .as_str()
            .ok_or_else(|| DeployerError::malformed(&method, "balance is not a string"))?;
        U256::from_str(raw).map_err(|e| DeployerError::malformed(&method, e.to_string()))
    }

    pub async fn code(&self, address: Address) -> Result<String> {
        let method = self.namespace.method("getCode");
        let result = self.call(&method, json!([address, "latest"])).await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| DeployerError::malformed(&method, "code is not a string"))
    }

    pub async fn estimate_gas(&self, tx: Value) -> Result<u64> {
        let method = self.namespace.method("estimateGas");
        let result = self.call(&method, json!([tx])).await?;
        quantity_u64(&result).map_err(|e| DeployerError::malformed(&method, e))
    }

    /// Gas limit of the latest block
    pub async fn block_gas_limit(&self) -> Result<u64> {
        let method = self.namespace.method("getBlockByNumber");
        let block = self.call(&method, json!(["latest", false])).await?;
        let limit = block
            .get("gasLimit")
            .ok_or_else(|| DeployerError::malformed(&method, "block has no gasLimit"))?;
        quantity_u64(limit).map_err(|e| DeployerError::malformed(&method, e))
    }

    pub async fn send_raw_transaction(&self, encoded: &Bytes) -> Result<TxHash> {
        let method = self.namespace.send_raw_transaction();
        let result = self.call(&method, json!([encoded])).await?;
        let raw = result
            .as_str()
            .ok_or_else(|| DeployerError::malformed(&method, "hash is not a string"))?;
        TxHash::from_str(raw).map_err(|e| DeployerError::malformed(&method, e.to_string()))
    }

    /// `None` while the node has not seen the transaction mined
    pub async fn transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<TransactionReceipt>> {
        let method = self.namespace.method("getTransactionReceipt");
        let result = self.call(&method, json!(tx_hash)).await?;
        TransactionReceipt::from_rpc(&method, result)
    }

    /// Read-only contract call against the latest block
    pub async fn read<C: SolCall>(&self, to: Address, call: &C) -> Result<C::Return> {
        let method = self.namespace.method("call");
        let data = Bytes::from(call.abi_encode());
        let result = self
            .call(&method, json!([{ "to": to, "data": data }, "latest"]))
            .await?;
        let raw = result
            .as_str()
            .ok_or_else(|| DeployerError::malformed(&method, "call result is not a string"))?;
        let bytes = hex::decode(raw.trim_start_matches("0x"))
            .map_err(|e| DeployerError::malformed(&method, e.to_string()))?;
        C::abi_decode_returns(&bytes, true)
            .map_err(|e| DeployerError::Abi(format!("{}: {}", C::SIGNATURE, e)))
    }
}

fn check_tx_hash_shape(method: &str, result: &Value) -> Result<()> {
    let hash = result
        .as_str()
        .ok_or_else(|| DeployerError::malformed(method, format!("Tx wasn't sent {}", result)))?;

    if hash.len() != TX_HASH_LENGTH
        || !hash.starts_with("0x")
        || !hash[2..].chars().all(|c| c.is_ascii_hexdigit())
    {
        return Err(DeployerError::malformed(
            method,
            format!("Tx wasn't sent {}", hash),
        ));
    }
    Ok(())
}
