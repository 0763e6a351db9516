//! Deployment configuration
//!
//! Loaded from a `.env` file (if present) and the process environment.
//! Immutable after load; the home/foreign role of each endpoint is fixed here.

use eyre::{eyre, Result, WrapErr};
use std::env;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::confirm::RetryPolicy;
use crate::receipt::ReceiptPolicy;
use crate::redact::Redacted;
use crate::types::{ChainEndpoint, ChainRole, GasEstimation, GasPolicy, RpcNamespace};

/// Per-chain settings
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub rpc_url: Url,
    /// Queried with `eth_chainId` when unset
    pub chain_id: Option<u64>,
    pub namespace: RpcNamespace,
    /// Fixed gas price in wei for every outgoing transaction
    pub deployment_gas_price: u128,
    /// Replaces the estimation RPC when set
    pub fixed_gas_estimate: Option<u64>,
}

impl ChainConfig {
    pub fn gas_policy(&self, limit_margin: f64) -> GasPolicy {
        GasPolicy {
            gas_price: self.deployment_gas_price,
            limit_margin,
            estimation: match self.fixed_gas_estimate {
                Some(gas) => GasEstimation::Fixed(gas),
                None => GasEstimation::Rpc,
            },
        }
    }

    pub fn endpoint(&self, role: ChainRole, chain_id: u64, limit_margin: f64) -> ChainEndpoint {
        ChainEndpoint {
            role,
            url: self.rpc_url.clone(),
            chain_id,
            namespace: self.namespace,
            gas: self.gas_policy(limit_margin),
        }
    }
}

/// Main configuration
#[derive(Clone)]
pub struct Config {
    pub home: ChainConfig,
    pub foreign: ChainConfig,
    /// Gas limit safety margin fraction
    pub gas_limit_extra: f64,
    pub receipt: ReceiptPolicy,
    pub retry: RetryPolicy,
    /// Per-request HTTP timeout
    pub rpc_timeout: Duration,
    pub private_key: String,
}

/// Custom Debug that redacts the deployment key.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("home", &self.home)
            .field("foreign", &self.foreign)
            .field("gas_limit_extra", &self.gas_limit_extra)
            .field("receipt", &self.receipt)
            .field("retry", &self.retry)
            .field("rpc_timeout", &self.rpc_timeout)
            .field("private_key", &Redacted(&self.private_key))
            .finish()
    }
}

fn default_gas_limit_extra() -> f64 {
    0.2
}

fn default_receipt_interval_ms() -> u64 {
    3000
}

fn default_receipt_max_attempts() -> u32 {
    100
}

fn default_rpc_timeout_ms() -> u64 {
    30_000
}

impl Config {
    /// Load configuration: `.env` if present, then the environment
    pub fn load() -> Result<Self> {
        Self::load_from_file(".env")
    }

    /// Load from a specific .env file path
    pub fn load_from_file(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            dotenvy::from_filename(path)
                .wrap_err_with(|| format!("Failed to load .env file from {}", path))?;
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup (the environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| eyre!("{} environment variable is required", key))
        };

        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let chain = |role: ChainRole| -> Result<ChainConfig> {
            let prefix = role.env_prefix();
            let url_key = format!("{}_RPC_URL", prefix);
            let raw_url = required(&url_key)?;
            let rpc_url = validate_rpc_url(raw_url.trim(), &url_key)?;

            let chain_id = optional(&format!("{}_CHAIN_ID", prefix))
                .map(|v| v.trim().parse::<u64>())
                .transpose()
                .wrap_err_with(|| format!("{}_CHAIN_ID must be a valid u64", prefix))?;

            let namespace = optional(&format!("{}_RPC_NAMESPACE", prefix))
                .map(|v| v.parse::<RpcNamespace>())
                .transpose()
                .map_err(|e| eyre!("{}_RPC_NAMESPACE: {}", prefix, e))?
                .unwrap_or_default();

            let gas_key = format!("{}_DEPLOYMENT_GAS_PRICE", prefix);
            let deployment_gas_price = required(&gas_key)?
                .trim()
                .parse::<u128>()
                .wrap_err_with(|| format!("{} must be an integer wei amount", gas_key))?;

            let fixed_gas_estimate = optional(&format!("{}_FIXED_GAS_ESTIMATE", prefix))
                .map(|v| v.trim().parse::<u64>())
                .transpose()
                .wrap_err_with(|| format!("{}_FIXED_GAS_ESTIMATE must be a valid u64", prefix))?;

            Ok(ChainConfig {
                rpc_url,
                chain_id,
                namespace,
                deployment_gas_price,
                fixed_gas_estimate,
            })
        };

        let number = |key: &str, default: f64| -> Result<f64> {
            optional(key)
                .map(|v| v.trim().parse::<f64>())
                .transpose()
                .wrap_err_with(|| format!("{} must be a number", key))
                .map(|v| v.unwrap_or(default))
        };

        let integer = |key: &str, default: u64| -> Result<u64> {
            optional(key)
                .map(|v| v.trim().parse::<u64>())
                .transpose()
                .wrap_err_with(|| format!("{} must be a non-negative integer", key))
                .map(|v| v.unwrap_or(default))
        };

        let count = |key: &str, default: u32| -> Result<u32> {
            optional(key)
                .map(|v| v.trim().parse::<u32>())
                .transpose()
                .wrap_err_with(|| format!("{} must be an integer between 0 and {}", key, u32::MAX))
                .map(|v| v.unwrap_or(default))
        };

        let defaults = RetryPolicy::default();
        let config = Config {
            home: chain(ChainRole::Home)?,
            foreign: chain(ChainRole::Foreign)?,
            gas_limit_extra: number("DEPLOYMENT_GAS_LIMIT_EXTRA", default_gas_limit_extra())?,
            receipt: ReceiptPolicy {
                interval: Duration::from_millis(integer(
                    "GET_RECEIPT_INTERVAL_IN_MILLISECONDS",
                    default_receipt_interval_ms(),
                )?),
                max_attempts: count("GET_RECEIPT_MAX_ATTEMPTS", default_receipt_max_attempts())?,
            },
            retry: RetryPolicy {
                max_attempts: count("STATE_RETRY_MAX_ATTEMPTS", defaults.max_attempts)?,
                initial_backoff: Duration::from_millis(integer(
                    "STATE_RETRY_INITIAL_BACKOFF_MS",
                    defaults.initial_backoff.as_millis() as u64,
                )?),
                max_backoff: Duration::from_millis(integer(
                    "STATE_RETRY_MAX_BACKOFF_MS",
                    defaults.max_backoff.as_millis() as u64,
                )?),
                backoff_multiplier: number(
                    "STATE_RETRY_BACKOFF_MULTIPLIER",
                    defaults.backoff_multiplier,
                )?,
            },
            rpc_timeout: Duration::from_millis(integer("RPC_TIMEOUT_MS", default_rpc_timeout_ms())?),
            private_key: required("DEPLOYMENT_ACCOUNT_PRIVATE_KEY")?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn chain(&self, role: ChainRole) -> &ChainConfig {
        match role {
            ChainRole::Home => &self.home,
            ChainRole::Foreign => &self.foreign,
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.home.rpc_url == self.foreign.rpc_url {
            return Err(eyre!(
                "HOME_RPC_URL and FOREIGN_RPC_URL must differ (both {})",
                self.home.rpc_url
            ));
        }

        if !self.gas_limit_extra.is_finite() || self.gas_limit_extra < 0.0 {
            return Err(eyre!(
                "DEPLOYMENT_GAS_LIMIT_EXTRA must be a finite fraction >= 0, got {}",
                self.gas_limit_extra
            ));
        }

        if self.receipt.max_attempts == 0 {
            return Err(eyre!("GET_RECEIPT_MAX_ATTEMPTS must be at least 1"));
        }

        if self.retry.max_attempts == 0 {
            return Err(eyre!("STATE_RETRY_MAX_ATTEMPTS must be at least 1"));
        }

        if !self.retry.backoff_multiplier.is_finite() || self.retry.backoff_multiplier < 1.0 {
            return Err(eyre!(
                "STATE_RETRY_BACKOFF_MULTIPLIER must be >= 1.0, got {}",
                self.retry.backoff_multiplier
            ));
        }

        if self.retry.max_backoff < self.retry.initial_backoff {
            return Err(eyre!(
                "STATE_RETRY_MAX_BACKOFF_MS must not be below STATE_RETRY_INITIAL_BACKOFF_MS"
            ));
        }

        Ok(())
    }
}

/// Validates that a URL uses http/https and has a host component.
pub fn validate_rpc_url(url_str: &str, name: &str) -> Result<Url> {
    let parsed = Url::parse(url_str).map_err(|e| eyre!("{} must be a valid URL: {}", name, e))?;

    let scheme = parsed.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(eyre!(
            "{} must use http:// or https:// scheme, got {}",
            name,
            scheme
        ));
    }

    if parsed.host_str().is_none() {
        return Err(eyre!("{} must have a host component", name));
    }

    if scheme == "http" {
        tracing::warn!("{} uses unencrypted http://; use https:// in production", name);
    }

    Ok(parsed)
}
