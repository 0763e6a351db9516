//! Receipt polling
//!
//! Waits a fixed interval, asks for the receipt, and repeats until the
//! transaction is mined (a receipt with a block number) or the attempt budget
//! runs out. Mined only means included: the caller still has to look at the
//! receipt's status, which may be absent.

use alloy::primitives::TxHash;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{DeployerError, Result};
use crate::rpc::RpcClient;
use crate::types::TransactionReceipt;

/// Receipt polling bounds
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptPolicy {
    /// Wait before each poll
    pub interval: Duration,
    /// Polls before giving up with [`DeployerError::ReceiptTimeout`]
    pub max_attempts: u32,
}

impl Default for ReceiptPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(3000),
            max_attempts: 100,
        }
    }
}

impl ReceiptPolicy {
    /// Upper bound on the time spent sleeping
    pub fn deadline(&self) -> Duration {
        self.interval
            .checked_mul(self.max_attempts)
            .unwrap_or(Duration::MAX)
    }
}

/// Poll until `tx_hash` is mined.
///
/// RPC errors while polling propagate. Cancelling `cancel` aborts the wait
/// with [`DeployerError::Cancelled`].
pub async fn poll_receipt(
    client: &RpcClient,
    tx_hash: TxHash,
    policy: &ReceiptPolicy,
    cancel: &CancellationToken,
) -> Result<TransactionReceipt> {
    for attempt in 1..=policy.max_attempts {
        tokio::select! {
            _ = cancel.cancelled() => {
                warn!(tx_hash = %tx_hash, attempt, "Receipt polling cancelled");
                return Err(DeployerError::Cancelled("polling receipt"));
            }
            _ = tokio::time::sleep(policy.interval) => {}
        }

        match client.transaction_receipt(tx_hash).await? {
            Some(receipt) if receipt.is_mined() => {
                info!(
                    tx_hash = %tx_hash,
                    block = receipt.block_number,
                    status = ?receipt.status,
                    attempt,
                    "Transaction mined"
                );
                return Ok(receipt);
            }
            Some(_) => debug!(tx_hash = %tx_hash, attempt, "Receipt without block number, pending"),
            None => debug!(tx_hash = %tx_hash, attempt, "No receipt yet"),
        }
    }

    warn!(
        tx_hash = %tx_hash,
        attempts = policy.max_attempts,
        deadline_ms = policy.deadline().as_millis() as u64,
        "Gave up waiting for receipt"
    );
    Err(DeployerError::ReceiptTimeout {
        tx_hash,
        attempts: policy.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Reply, ScriptedRpc};
    use crate::types::{ReceiptOutcome, RpcNamespace};
    use serde_json::Value;
    use std::sync::Arc;
    use url::Url;

    const METHOD: &str = "eth_getTransactionReceipt";

    fn fast(max_attempts: u32) -> ReceiptPolicy {
        ReceiptPolicy {
            interval: Duration::from_millis(1),
            max_attempts,
        }
    }

    fn client(rpc: &Arc<ScriptedRpc>) -> RpcClient {
        RpcClient::new(
            rpc.clone(),
            Url::parse("http://localhost:8545").unwrap(),
            RpcNamespace::Eth,
        )
    }

    #[test]
    fn test_deadline_saturates() {
        assert_eq!(ReceiptPolicy::default().deadline(), Duration::from_secs(300));

        let huge = ReceiptPolicy {
            interval: Duration::from_secs(u64::MAX / 2),
            max_attempts: 100,
        };
        assert_eq!(huge.deadline(), Duration::MAX);
    }

    #[tokio::test]
    async fn test_mined_exactly_when_block_number_appears() {
        let rpc = Arc::new(ScriptedRpc::new());
        let hash = TxHash::repeat_byte(0x01);
        rpc.push_result(METHOD, Value::Null);
        rpc.push_result(METHOD, ScriptedRpc::receipt(hash, None, None));
        rpc.push_result(METHOD, ScriptedRpc::receipt(hash, Some(42), Some(1)));

        let receipt = poll_receipt(&client(&rpc), hash, &fast(10), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(receipt.block_number, Some(42));
        assert_eq!(rpc.call_count(METHOD), 3);
    }

    #[tokio::test]
    async fn test_mined_without_status_is_returned_as_unknown() {
        let rpc = Arc::new(ScriptedRpc::new());
        let hash = TxHash::repeat_byte(0x02);
        rpc.push_result(METHOD, ScriptedRpc::receipt(hash, Some(7), None));

        let receipt = poll_receipt(&client(&rpc), hash, &fast(3), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(receipt.outcome(), ReceiptOutcome::StatusUnknown);
    }

    #[tokio::test]
    async fn test_times_out_after_max_attempts() {
        let rpc = Arc::new(ScriptedRpc::new());
        let hash = TxHash::repeat_byte(0x03);
        rpc.push_result(METHOD, Value::Null);

        let err = poll_receipt(&client(&rpc), hash, &fast(4), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DeployerError::ReceiptTimeout { attempts: 4, .. }));
        assert_eq!(rpc.call_count(METHOD), 4);
    }

    #[tokio::test]
    async fn test_cancellation_aborts_wait() {
        let rpc = Arc::new(ScriptedRpc::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let policy = ReceiptPolicy {
            interval: Duration::from_secs(60),
            max_attempts: 10,
        };
        let err = poll_receipt(&client(&rpc), TxHash::ZERO, &policy, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, DeployerError::Cancelled(_)));
        assert_eq!(rpc.call_count(METHOD), 0);
    }

    #[tokio::test]
    async fn test_rpc_error_propagates() {
        let rpc = Arc::new(ScriptedRpc::new());
        rpc.push(METHOD, Reply::Error(-32005, "limit exceeded".into()));

        let err = poll_receipt(&client(&rpc), TxHash::ZERO, &fast(5), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DeployerError::Rpc { code: -32005, .. }));
    }
}
