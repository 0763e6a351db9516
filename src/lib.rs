//! Bridge Deployer: administration of mirrored home/foreign bridge contracts
//!
//! Builds, signs, broadcasts and confirms privileged transactions against the
//! two chains of a bridge:
//!
//! - **RPC** - JSON-RPC envelope, error mapping and typed queries over a pluggable transport
//! - **Builder** - Gas estimation with a safety margin bounded by the block gas limit
//! - **Broadcast** - EIP-155 legacy signing and single-shot submission
//! - **Receipt** - Bounded, cancellable receipt polling
//! - **Confirm** - Contract-state confirmation when a receipt carries no status
//! - **Dispatch** - Per-chain endpoint and gas price selection by role
//! - **Admin** - Deploy, ownership, bridge wiring, validator and upgrade drivers
//!
//! ## Feature Flags
//!
//! - `testing` - Expose the scripted RPC transport used by the unit tests

// Core modules
pub mod admin;
pub mod broadcast;
pub mod builder;
pub mod config;
pub mod confirm;
pub mod contracts;
pub mod dispatch;
pub mod error;
pub mod keys;
pub mod receipt;
pub mod redact;
pub mod rpc;
pub mod types;

// Testing utilities (feature-gated)
#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used items at the crate root
pub use admin::{
    AccountReport, AdminReceipt, BridgeAdmin, BridgeVariant, Confirmation, DeployedContract,
    ValidatorSetup,
};
pub use builder::{compute_gas_limit, TransactionBuilder};
pub use config::Config;
pub use confirm::{confirm_state, RetryPolicy};
pub use dispatch::{ChainLane, Dispatcher};
pub use error::{DeployerError, Result};
pub use keys::PrivateKey;
pub use receipt::{poll_receipt, ReceiptPolicy};
pub use rpc::{HttpTransport, RpcClient, RpcTransport};
pub use types::{ChainRole, RawTransaction, RpcNamespace, TransactionReceipt};
