//! Transaction builder
//!
//! Turns a payload into a [`RawTransaction`]: estimate gas, add the chain's
//! safety margin, and keep the result within the block gas limit.

use alloy::primitives::{Address, Bytes, U256};
use tracing::{debug, warn};

use crate::error::{DeployerError, Result};
use crate::rpc::RpcClient;
use crate::types::{GasEstimation, GasPolicy, RawTransaction};

/// Gas limit for `estimated` gas plus `margin`, bounded by `block_limit`.
///
/// An estimate above the block limit can never be included and fails with
/// [`DeployerError::GasLimitExceeded`]. A margin that would push past the
/// block limit is capped at the block limit. The result is always
/// `estimated <= limit <= block_limit`.
pub fn compute_gas_limit(estimated: u64, margin: f64, block_limit: u64) -> Result<u64> {
    if estimated > block_limit {
        return Err(DeployerError::GasLimitExceeded {
            estimated,
            block_limit,
        });
    }

    let with_margin = (estimated as f64 * (1.0 + margin.max(0.0))).round();
    if with_margin >= block_limit as f64 {
        return Ok(block_limit);
    }
    Ok((with_margin as u64).max(estimated))
}

pub struct TransactionBuilder<'a> {
    client: &'a RpcClient,
}

impl<'a> TransactionBuilder<'a> {
    pub fn new(client: &'a RpcClient) -> Self {
        Self { client }
    }

    /// Build an unsigned transaction from `from` at `nonce`.
    ///
    /// `to == None` builds a contract creation.
    pub async fn build(
        &self,
        from: Address,
        payload: Bytes,
        to: Option<Address>,
        value: U256,
        nonce: u64,
        policy: &GasPolicy,
    ) -> Result<RawTransaction> {
        let mut tx = RawTransaction {
            from,
            nonce,
            gas_price: policy.gas_price,
            gas_limit: 0,
            to,
            data: payload,
            value,
        };

        let estimated = match policy.estimation {
            GasEstimation::Fixed(gas) => gas,
            GasEstimation::Rpc => {
                let mut call = tx.to_rpc_object();
                if let Some(obj) = call.as_object_mut() {
                    // Let the node pick the cap while estimating
                    obj.remove("gas");
                    obj.remove("nonce");
                }
                self.client.estimate_gas(call).await?
            }
        };

        let block_limit = self.client.block_gas_limit().await?;
        let gas_limit = compute_gas_limit(estimated, policy.limit_margin, block_limit)?;
        if gas_limit == block_limit {
            warn!(
                estimated,
                block_limit,
                margin = policy.limit_margin,
                "Gas limit capped at block gas limit"
            );
        }
        tx.gas_limit = gas_limit;

        debug!(
            nonce,
            estimated,
            gas_limit = %tx.gas_limit_hex(),
            gas_price = %tx.gas_price_hex(),
            to = ?to,
            "Built raw transaction"
        );

        Ok(tx)
    }
}
