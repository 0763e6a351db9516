//! Chain dispatch
//!
//! Holds one lane per bridge side: the endpoint (chain id, gas policy) and the
//! RPC client that signs and broadcasts through it. Selection is a pure
//! lookup by [`ChainRole`].

use crate::error::{DeployerError, Result};
use crate::rpc::RpcClient;
use crate::types::{ChainEndpoint, ChainRole, GasPolicy};

/// Endpoint plus the client bound to it
#[derive(Clone)]
pub struct ChainLane {
    pub endpoint: ChainEndpoint,
    pub client: RpcClient,
}

impl ChainLane {
    pub fn new(endpoint: ChainEndpoint, client: RpcClient) -> Self {
        Self { endpoint, client }
    }

    pub fn gas_policy(&self) -> &GasPolicy {
        &self.endpoint.gas
    }

    pub fn chain_id(&self) -> u64 {
        self.endpoint.chain_id
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    home: ChainLane,
    foreign: ChainLane,
}

impl Dispatcher {
    pub fn new(home: ChainLane, foreign: ChainLane) -> Result<Self> {
        if home.endpoint.role != ChainRole::Home || foreign.endpoint.role != ChainRole::Foreign {
            return Err(DeployerError::InvalidInput(format!(
                "lanes given as ({}, {}), expected (home, foreign)",
                home.endpoint.role, foreign.endpoint.role
            )));
        }
        if home.endpoint.url == foreign.endpoint.url {
            return Err(DeployerError::InvalidInput(format!(
                "home and foreign share the RPC URL {}",
                home.endpoint.url
            )));
        }
        Ok(Self { home, foreign })
    }

    pub fn select(&self, role: ChainRole) -> &ChainLane {
        match role {
            ChainRole::Home => &self.home,
            ChainRole::Foreign => &self.foreign,
        }
    }
}
