//! Test doubles for the RPC boundary
//!
//! [`ScriptedRpc`] answers each JSON-RPC method from its own queue of
//! replies. The last reply of a queue sticks, so a single scripted answer
//! serves every later call of that method. Every request is recorded.

use alloy::primitives::{Address, TxHash};
use alloy::sol_types::SolValue;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use url::Url;

use crate::error::Result;
use crate::rpc::{RpcRequest, RpcResponse, RpcTransport};
use crate::types::{ChainEndpoint, ChainRole, GasEstimation, GasPolicy, RpcNamespace};

/// Well-known development key (first Anvil/Hardhat account)
pub const TEST_PRIVATE_KEY: &str =
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Address derived from [`TEST_PRIVATE_KEY`]
pub const TEST_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

/// Scripted answer to one call
#[derive(Debug, Clone)]
pub enum Reply {
    Result(Value),
    Error(i64, String),
}

#[derive(Default)]
pub struct ScriptedRpc {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    seen: Mutex<Vec<RpcRequest>>,
}

impl ScriptedRpc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for `method`
    pub fn push(&self, method: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn push_result(&self, method: &str, value: Value) {
        self.push(method, Reply::Result(value));
    }

    /// Requests received for `method`, in order
    pub fn requests(&self, method: &str) -> Vec<RpcRequest> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method)
            .cloned()
            .collect()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.requests(method).len()
    }

    /// ABI-encoded `address` return word as `eth_call` hex
    pub fn abi_word_address(address: Address) -> Value {
        json!(format!("0x{}", hex::encode(address.abi_encode())))
    }

    pub fn abi_word_bool(value: bool) -> Value {
        json!(format!("0x{}", hex::encode(value.abi_encode())))
    }

    /// Receipt JSON as a node would return it
    pub fn receipt(tx_hash: TxHash, block_number: Option<u64>, status: Option<u64>) -> Value {
        let mut receipt = json!({
            "transactionHash": tx_hash,
            "blockNumber": block_number.map(|b| format!("{:#x}", b)),
            "gasUsed": "0x5208",
        });
        if let Some(status) = status {
            receipt["status"] = json!(format!("{:#x}", status));
        }
        receipt
    }
}

#[async_trait]
impl RpcTransport for ScriptedRpc {
    async fn send(&self, _url: &Url, request: &RpcRequest) -> Result<RpcResponse> {
        self.seen.lock().unwrap().push(request.clone());

        let reply = {
            let mut replies = self.replies.lock().unwrap();
            let queue = replies.get_mut(&request.method);
            match queue {
                Some(q) if q.len() > 1 => q.pop_front(),
                Some(q) => q.front().cloned(),
                None => None,
            }
        };

        Ok(match reply {
            Some(Reply::Result(result)) => RpcResponse {
                result,
                error: None,
            },
            Some(Reply::Error(code, message)) => RpcResponse {
                result: Value::Null,
                error: Some(json!({ "code": code, "message": message })),
            },
            None => RpcResponse {
                result: Value::Null,
                error: Some(json!({
                    "code": -32601,
                    "message": format!("no scripted reply for {}", request.method),
                })),
            },
        })
    }
}

/// Endpoint with a 20% margin and a fixed gas price
pub fn endpoint(role: ChainRole, chain_id: u64, gas_price: u128) -> ChainEndpoint {
    let url = match role {
        ChainRole::Home => "http://home.localhost:8545",
        ChainRole::Foreign => "http://foreign.localhost:8545",
    };
    ChainEndpoint {
        role,
        url: Url::parse(url).unwrap(),
        chain_id,
        namespace: RpcNamespace::Eth,
        gas: GasPolicy {
            gas_price,
            limit_margin: 0.2,
            estimation: GasEstimation::Rpc,
        },
    }
}
