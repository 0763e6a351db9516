//! Error taxonomy for transaction submission and confirmation
//!
//! Low-level failures (RPC, signing, broadcast) are hard failures. Receipt
//! timeouts, state mismatches and cancellation leave the on-chain outcome
//! unknown and carry enough detail for manual reconciliation.

use alloy::primitives::TxHash;
use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T, E = DeployerError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum DeployerError {
    // ========================================================================
    // RPC Boundary
    // ========================================================================
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("RPC transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed response to {method}: {reason}")]
    MalformedResponse { method: String, reason: String },

    // ========================================================================
    // Transaction Construction and Submission
    // ========================================================================
    #[error("Estimated gas {estimated} exceeds the block gas limit {block_limit}")]
    GasLimitExceeded { estimated: u64, block_limit: u64 },

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Broadcast rejected: {0}")]
    Broadcast(String),

    #[error("Transaction {tx_hash} reverted")]
    TransactionReverted { tx_hash: TxHash },

    // ========================================================================
    // Confirmation (outcome unknown)
    // ========================================================================
    #[error("No mined receipt for {tx_hash} after {attempts} polls")]
    ReceiptTimeout { tx_hash: TxHash, attempts: u32 },

    #[error("Transaction Failed. Expected: {expected} Actual: {observed} (after {attempts} attempts)")]
    StateMismatch {
        expected: String,
        observed: String,
        attempts: u32,
    },

    #[error("Cancelled while {0}")]
    Cancelled(&'static str),

    // ========================================================================
    // Caller Input
    // ========================================================================
    #[error("ABI decode failed: {0}")]
    Abi(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl DeployerError {
    /// True when the transaction may or may not have landed.
    ///
    /// These errors must be reconciled by inspecting the chain, not by
    /// resubmitting with the same nonce.
    pub fn is_uncertain(&self) -> bool {
        matches!(
            self,
            DeployerError::ReceiptTimeout { .. }
                | DeployerError::StateMismatch { .. }
                | DeployerError::Cancelled(_)
        )
    }

    pub(crate) fn malformed(method: &str, reason: impl Into<String>) -> Self {
        DeployerError::MalformedResponse {
            method: method.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uncertain_classification() {
        let timeout = DeployerError::ReceiptTimeout {
            tx_hash: TxHash::ZERO,
            attempts: 3,
        };
        let mismatch = DeployerError::StateMismatch {
            expected: "true".to_string(),
            observed: "false".to_string(),
            attempts: 5,
        };

        assert!(timeout.is_uncertain());
        assert!(mismatch.is_uncertain());
        assert!(DeployerError::Cancelled("polling receipt").is_uncertain());
        assert!(!DeployerError::Broadcast("nonce too low".to_string()).is_uncertain());
        assert!(!DeployerError::Rpc {
            code: -32000,
            message: "boom".to_string()
        }
        .is_uncertain());
    }

    #[test]
    fn test_state_mismatch_message_names_both_values() {
        let err = DeployerError::StateMismatch {
            expected: "0xabc".to_string(),
            observed: "0xdef".to_string(),
            attempts: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("Expected: 0xabc"));
        assert!(msg.contains("Actual: 0xdef"));
    }
}
