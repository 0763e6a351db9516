//! Administrative operation drivers
//!
//! Each operation runs one pipeline to completion: encode the call, read the
//! sender's nonce, build, sign, broadcast, wait for the receipt, then confirm.
//! A receipt status of 1 confirms directly and 0 fails. With no status the
//! expected post-state is re-read from the contract until it appears.
//!
//! Operations against one signing key must not overlap: the nonce is the
//! account's mined transaction count at build time.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::sol_types::SolCall;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::broadcast;
use crate::builder::TransactionBuilder;
use crate::config::Config;
use crate::confirm::{confirm_state, RetryPolicy};
use crate::contracts::{
    IBridgeValidators, IBridgeableToken, IOwnable, IOwnedUpgradeabilityProxy,
    IRewardableValidators,
};
use crate::dispatch::{ChainLane, Dispatcher};
use crate::error::{DeployerError, Result};
use crate::keys::PrivateKey;
use crate::receipt::{poll_receipt, ReceiptPolicy};
use crate::rpc::{HttpTransport, RpcClient, RpcTransport};
use crate::types::{ChainRole, ReceiptOutcome, TransactionReceipt};

/// How a transaction's effect was established
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Receipt status was 1
    ReceiptStatus,
    /// Receipt carried no status; contract state showed the expected value
    ObservedState,
}

/// Result of a confirmed administrative transaction
#[derive(Debug, Clone, PartialEq)]
pub struct AdminReceipt {
    pub tx_hash: TxHash,
    pub nonce: u64,
    pub block_number: Option<u64>,
    pub confirmation: Confirmation,
}

/// Result of a confirmed contract deployment
#[derive(Debug, Clone, PartialEq)]
pub struct DeployedContract {
    pub address: Address,
    pub receipt: AdminReceipt,
}

/// Which validator contract is being initialized
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeVariant {
    Plain,
    /// One reward account per validator, in validator order
    Rewardable { reward_accounts: Vec<Address> },
}

/// Arguments for `initialize` on a validator contract
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorSetup {
    pub required_signatures: U256,
    pub validators: Vec<Address>,
    pub owner: Address,
    pub variant: BridgeVariant,
}

impl ValidatorSetup {
    /// ABI-encode the `initialize` overload matching the variant
    pub fn encode_initialize(&self) -> Result<Bytes> {
        let data = match &self.variant {
            BridgeVariant::Plain => IBridgeValidators::initializeCall {
                requiredSignatures: self.required_signatures,
                initialValidators: self.validators.clone(),
                owner: self.owner,
            }
            .abi_encode(),
            BridgeVariant::Rewardable { reward_accounts } => {
                if reward_accounts.len() != self.validators.len() {
                    return Err(DeployerError::InvalidInput(format!(
                        "{} validators but {} reward accounts",
                        self.validators.len(),
                        reward_accounts.len()
                    )));
                }
                IRewardableValidators::initializeCall {
                    requiredSignatures: self.required_signatures,
                    initialValidators: self.validators.clone(),
                    initialRewards: reward_accounts.clone(),
                    owner: self.owner,
                }
                .abi_encode()
            }
        };
        Ok(Bytes::from(data))
    }

    fn log(&self) {
        match &self.variant {
            BridgeVariant::Plain => {
                info!(
                    required_signatures = %self.required_signatures,
                    validators = ?self.validators,
                    owner = %self.owner,
                    "Initializing validators"
                );
            }
            BridgeVariant::Rewardable { reward_accounts } => {
                info!(
                    required_signatures = %self.required_signatures,
                    owner = %self.owner,
                    "Initializing rewardable validators"
                );
                for (index, (validator, reward)) in
                    self.validators.iter().zip(reward_accounts).enumerate()
                {
                    info!("{}: {}, reward address {}", index + 1, validator, reward);
                }
            }
        }
    }
}

/// Deployment account state on one chain
#[derive(Debug, Clone, PartialEq)]
pub struct AccountReport {
    pub role: ChainRole,
    pub chain_id: u64,
    pub address: Address,
    pub balance: U256,
    pub nonce: u64,
}

/// Broadcast and mined, not yet confirmed
struct Submitted {
    tx_hash: TxHash,
    nonce: u64,
    receipt: TransactionReceipt,
}

pub struct BridgeAdmin {
    dispatcher: Dispatcher,
    receipt_policy: ReceiptPolicy,
    retry_policy: RetryPolicy,
    cancel: CancellationToken,
}

impl BridgeAdmin {
    pub fn new(
        dispatcher: Dispatcher,
        receipt_policy: ReceiptPolicy,
        retry_policy: RetryPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            dispatcher,
            receipt_policy,
            retry_policy,
            cancel,
        }
    }

    /// Connect both chains over HTTP, resolving chain ids not configured
    pub async fn connect(config: &Config, cancel: CancellationToken) -> Result<Self> {
        let transport: Arc<dyn RpcTransport> = Arc::new(HttpTransport::new(config.rpc_timeout)?);
        Self::connect_with(config, transport, cancel).await
    }

    /// Like [`BridgeAdmin::connect`] over any transport
    pub async fn connect_with(
        config: &Config,
        transport: Arc<dyn RpcTransport>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let home = Self::lane(config, ChainRole::Home, transport.clone()).await?;
        let foreign = Self::lane(config, ChainRole::Foreign, transport).await?;
        Ok(Self::new(
            Dispatcher::new(home, foreign)?,
            config.receipt.clone(),
            config.retry.clone(),
            cancel,
        ))
    }

    async fn lane(
        config: &Config,
        role: ChainRole,
        transport: Arc<dyn RpcTransport>,
    ) -> Result<ChainLane> {
        let chain = config.chain(role);
        let client = RpcClient::new(transport, chain.rpc_url.clone(), chain.namespace);

        let chain_id = match chain.chain_id {
            Some(id) => id,
            None => client.chain_id().await?,
        };

        info!(
            chain = %role,
            rpc_url = %chain.rpc_url,
            chain_id,
            namespace = chain.namespace.prefix(),
            gas_price = chain.deployment_gas_price,
            "Chain endpoint configured"
        );

        Ok(ChainLane::new(
            chain.endpoint(role, chain_id, config.gas_limit_extra),
            client,
        ))
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// True when `address` holds code
    pub async fn is_contract(&self, role: ChainRole, address: Address) -> Result<bool> {
        let code = self.dispatcher.select(role).client.code(address).await?;
        Ok(code != "0x" && code != "0x0")
    }

    /// Balance, nonce and chain id check for the deployment account
    pub async fn preflight(&self, role: ChainRole, key: &PrivateKey) -> Result<AccountReport> {
        let lane = self.dispatcher.select(role);
        let address = key.address();

        let reported_chain_id = lane.client.chain_id().await?;
        if reported_chain_id != lane.chain_id() {
            return Err(DeployerError::InvalidInput(format!(
                "{} endpoint reports chain id {} but {} is configured",
                role,
                reported_chain_id,
                lane.chain_id()
            )));
        }

        let balance = lane.client.balance(address).await?;
        let nonce = lane.client.transaction_count(address).await?;

        if balance.is_zero() {
            warn!(chain = %role, address = %address, "Deployment account has no balance");
        }

        Ok(AccountReport {
            role,
            chain_id: reported_chain_id,
            address,
            balance,
            nonce,
        })
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Deploy `bytecode` with ABI-encoded `constructor_args`
    pub async fn deploy_contract(
        &self,
        role: ChainRole,
        key: &PrivateKey,
        bytecode: Bytes,
        constructor_args: Bytes,
    ) -> Result<DeployedContract> {
        let mut payload = bytecode.to_vec();
        payload.extend_from_slice(&constructor_args);

        let result = async {
            let submitted = self.submit(role, key, None, Bytes::from(payload)).await?;
            let expected = key.address().create(submitted.nonce);

            if let Some(reported) = submitted.receipt.contract_address {
                if reported != expected {
                    warn!(
                        reported = %reported,
                        expected = %expected,
                        "Receipt contract address differs from derived address"
                    );
                }
            }
            let address = submitted.receipt.contract_address.unwrap_or(expected);

            let receipt = self
                .confirm(role, submitted, || async move {
                    self.is_contract(role, address).await
                }, &true)
                .await?;

            Ok(DeployedContract { address, receipt })
        }
        .await;

        result
            .inspect(|deployed| {
                info!(chain = %role, address = %deployed.address, "Contract deployed")
            })
            .inspect_err(|e| error!(chain = %role, error = %e, "Contract deployment failed"))
    }

    pub async fn transfer_ownership(
        &self,
        role: ChainRole,
        key: &PrivateKey,
        contract: Address,
        new_owner: Address,
    ) -> Result<AdminReceipt> {
        let data = IOwnable::transferOwnershipCall { newOwner: new_owner }.abi_encode();
        let client = &self.dispatcher.select(role).client;

        self.run(role, key, contract, data, "transferOwnership", |submitted| {
            self.confirm(role, submitted, move || async move {
                client
                    .read(contract, &IOwnable::ownerCall {})
                    .await
                    .map(|r| r._0)
            }, &new_owner)
        })
        .await
    }

    pub async fn transfer_proxy_ownership(
        &self,
        role: ChainRole,
        key: &PrivateKey,
        proxy: Address,
        new_owner: Address,
    ) -> Result<AdminReceipt> {
        let data =
            IOwnedUpgradeabilityProxy::transferProxyOwnershipCall { newOwner: new_owner }
                .abi_encode();
        let client = &self.dispatcher.select(role).client;

        self.run(role, key, proxy, data, "transferProxyOwnership", |submitted| {
            self.confirm(role, submitted, move || async move {
                client
                    .read(proxy, &IOwnedUpgradeabilityProxy::proxyOwnerCall {})
                    .await
                    .map(|r| r._0)
            }, &new_owner)
        })
        .await
    }

    pub async fn set_bridge_contract(
        &self,
        role: ChainRole,
        key: &PrivateKey,
        token: Address,
        bridge: Address,
    ) -> Result<AdminReceipt> {
        let data = IBridgeableToken::setBridgeContractCall {
            bridgeContract: bridge,
        }
        .abi_encode();
        let client = &self.dispatcher.select(role).client;

        self.run(role, key, token, data, "setBridgeContract", |submitted| {
            self.confirm(role, submitted, move || async move {
                client
                    .read(token, &IBridgeableToken::bridgeContractCall {})
                    .await
                    .map(|r| r._0)
            }, &bridge)
        })
        .await
    }

    pub async fn initialize_validators(
        &self,
        role: ChainRole,
        key: &PrivateKey,
        contract: Address,
        setup: &ValidatorSetup,
    ) -> Result<AdminReceipt> {
        let data = setup
            .encode_initialize()
            .inspect_err(|e| error!(chain = %role, error = %e, "Invalid validator setup"))?;
        setup.log();
        let client = &self.dispatcher.select(role).client;

        self.run(role, key, contract, data.to_vec(), "initialize", |submitted| {
            self.confirm(role, submitted, move || async move {
                client
                    .read(contract, &IBridgeValidators::isInitializedCall {})
                    .await
                    .map(|r| r._0)
            }, &true)
        })
        .await
    }

    pub async fn upgrade_proxy(
        &self,
        role: ChainRole,
        key: &PrivateKey,
        proxy: Address,
        version: U256,
        implementation: Address,
    ) -> Result<AdminReceipt> {
        let data = IOwnedUpgradeabilityProxy::upgradeToCall {
            version,
            implementation,
        }
        .abi_encode();
        let client = &self.dispatcher.select(role).client;

        self.run(role, key, proxy, data, "upgradeTo", |submitted| {
            self.confirm(role, submitted, move || async move {
                client
                    .read(proxy, &IOwnedUpgradeabilityProxy::implementationCall {})
                    .await
                    .map(|r| r._0)
            }, &implementation)
        })
        .await
    }

    // =========================================================================
    // Pipeline
    // =========================================================================

    /// Submit a call to `to`, then confirm it with `confirm`; failures are
    /// logged with context and returned unchanged.
    async fn run<C, Fut>(
        &self,
        role: ChainRole,
        key: &PrivateKey,
        to: Address,
        data: Vec<u8>,
        operation: &'static str,
        confirm: C,
    ) -> Result<AdminReceipt>
    where
        C: FnOnce(Submitted) -> Fut,
        Fut: std::future::Future<Output = Result<AdminReceipt>>,
    {
        let result = async {
            let submitted = self.submit(role, key, Some(to), Bytes::from(data)).await?;
            confirm(submitted).await
        }
        .await;

        match &result {
            Ok(receipt) => info!(
                chain = %role,
                operation,
                contract = %to,
                tx_hash = %receipt.tx_hash,
                confirmation = ?receipt.confirmation,
                "Administrative transaction confirmed"
            ),
            Err(e) => error!(
                chain = %role,
                operation,
                contract = %to,
                uncertain = e.is_uncertain(),
                error = %e,
                "Administrative transaction failed"
            ),
        }
        result
    }

    /// Nonce, build, sign, broadcast and wait for the receipt
    async fn submit(
        &self,
        role: ChainRole,
        key: &PrivateKey,
        to: Option<Address>,
        data: Bytes,
    ) -> Result<Submitted> {
        let lane = self.dispatcher.select(role);
        let from = key.address();

        let nonce = lane.client.transaction_count(from).await?;
        let tx = TransactionBuilder::new(&lane.client)
            .build(from, data, to, U256::ZERO, nonce, lane.gas_policy())
            .await?;

        let tx_hash = broadcast::sign_and_send(&tx, key, lane.chain_id(), &lane.client).await?;
        let receipt =
            poll_receipt(&lane.client, tx_hash, &self.receipt_policy, &self.cancel).await?;

        Ok(Submitted {
            tx_hash,
            nonce,
            receipt,
        })
    }

    /// Check the receipt status, falling back to reading contract state
    async fn confirm<F, Fut, T, E>(
        &self,
        role: ChainRole,
        submitted: Submitted,
        read: F,
        expected: &E,
    ) -> Result<AdminReceipt>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
        T: PartialEq<E> + std::fmt::Display,
        E: std::fmt::Display + ?Sized,
    {
        let Submitted {
            tx_hash,
            nonce,
            receipt,
        } = submitted;

        let confirmation = match receipt.outcome() {
            ReceiptOutcome::Succeeded => Confirmation::ReceiptStatus,
            ReceiptOutcome::Reverted => {
                return Err(DeployerError::TransactionReverted { tx_hash });
            }
            ReceiptOutcome::StatusUnknown | ReceiptOutcome::Pending => {
                info!(
                    chain = %role,
                    tx_hash = %tx_hash,
                    expected = %expected,
                    "Receipt has no status, confirming against contract state"
                );
                confirm_state(read, expected, &self.retry_policy, &self.cancel).await?;
                Confirmation::ObservedState
            }
        };

        Ok(AdminReceipt {
            tx_hash,
            nonce,
            block_number: receipt.block_number,
            confirmation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{endpoint, Reply, ScriptedRpc, TEST_PRIVATE_KEY};
    use alloy::consensus::TxEnvelope;
    use alloy::eips::eip2718::Decodable2718;
    use serde_json::{json, Value};
    use std::time::Duration;

    const HOME_GAS_PRICE: u128 = 1_000_000_000;
    const FOREIGN_GAS_PRICE: u128 = 40_000_000_000;
    const TX_HASH: &str = "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060";

    struct Harness {
        home: Arc<ScriptedRpc>,
        foreign: Arc<ScriptedRpc>,
        admin: BridgeAdmin,
        key: PrivateKey,
    }

    fn tx_hash() -> TxHash {
        TX_HASH.parse().unwrap()
    }

    /// Node that accepts one transaction and mines it with `status`
    fn scripted_node(status: Option<u64>) -> Arc<ScriptedRpc> {
        let rpc = Arc::new(ScriptedRpc::new());
        rpc.push_result("eth_chainId", json!("0x1"));
        rpc.push_result("eth_getTransactionCount", json!("0x7"));
        rpc.push_result("eth_estimateGas", json!("0x7530"));
        rpc.push_result("eth_getBlockByNumber", json!({ "gasLimit": "0x7a1200" }));
        rpc.push_result("eth_sendRawTransaction", json!(TX_HASH));
        rpc.push_result("eth_getTransactionReceipt", Value::Null);
        rpc.push_result(
            "eth_getTransactionReceipt",
            ScriptedRpc::receipt(tx_hash(), Some(12), status),
        );
        rpc
    }

    fn harness(home: Arc<ScriptedRpc>, foreign: Arc<ScriptedRpc>) -> Harness {
        let lane = |role, gas_price, rpc: &Arc<ScriptedRpc>| {
            let endpoint = endpoint(role, 1, gas_price);
            let client = RpcClient::new(rpc.clone(), endpoint.url.clone(), endpoint.namespace);
            ChainLane::new(endpoint, client)
        };
        let dispatcher = Dispatcher::new(
            lane(ChainRole::Home, HOME_GAS_PRICE, &home),
            lane(ChainRole::Foreign, FOREIGN_GAS_PRICE, &foreign),
        )
        .unwrap();

        let admin = BridgeAdmin::new(
            dispatcher,
            ReceiptPolicy {
                interval: Duration::from_millis(1),
                max_attempts: 5,
            },
            RetryPolicy::fixed(5, Duration::from_millis(1)),
            CancellationToken::new(),
        );

        Harness {
            home,
            foreign,
            admin,
            key: PrivateKey::from_hex(TEST_PRIVATE_KEY).unwrap(),
        }
    }

    fn sent_transaction(rpc: &ScriptedRpc) -> TxEnvelope {
        let requests = rpc.requests("eth_sendRawTransaction");
        assert_eq!(requests.len(), 1, "broadcast exactly once");
        let raw = requests[0].params[0].as_str().unwrap();
        let bytes = hex::decode(raw.trim_start_matches("0x")).unwrap();
        TxEnvelope::decode_2718(&mut bytes.as_slice()).unwrap()
    }

    fn legacy_gas_price(envelope: &TxEnvelope) -> u128 {
        match envelope {
            TxEnvelope::Legacy(signed) => signed.tx().gas_price,
            other => panic!("expected legacy transaction, got {:?}", other.tx_type()),
        }
    }

    #[tokio::test]
    async fn test_status_one_needs_no_state_read() {
        let h = harness(scripted_node(Some(1)), Arc::new(ScriptedRpc::new()));
        let new_owner = Address::repeat_byte(0x11);

        let receipt = h
            .admin
            .transfer_ownership(ChainRole::Home, &h.key, Address::repeat_byte(0xb0), new_owner)
            .await
            .unwrap();

        assert_eq!(receipt.confirmation, Confirmation::ReceiptStatus);
        assert_eq!(receipt.tx_hash, tx_hash());
        assert_eq!(receipt.nonce, 7);
        assert_eq!(receipt.block_number, Some(12));
        assert_eq!(h.home.call_count("eth_call"), 0);
        assert_eq!(h.home.call_count("eth_getTransactionReceipt"), 2);
    }

    #[tokio::test]
    async fn test_missing_status_polls_owner_until_it_changes() {
        let home = scripted_node(None);
        let old_owner = Address::repeat_byte(0x01);
        let new_owner = Address::repeat_byte(0x11);
        home.push_result("eth_call", ScriptedRpc::abi_word_address(old_owner));
        home.push_result("eth_call", ScriptedRpc::abi_word_address(old_owner));
        home.push_result("eth_call", ScriptedRpc::abi_word_address(new_owner));
        let h = harness(home, Arc::new(ScriptedRpc::new()));

        let receipt = h
            .admin
            .transfer_ownership(ChainRole::Home, &h.key, Address::repeat_byte(0xb0), new_owner)
            .await
            .unwrap();

        assert_eq!(receipt.confirmation, Confirmation::ObservedState);
        assert_eq!(h.home.call_count("eth_call"), 3);
    }

    #[tokio::test]
    async fn test_missing_status_exhausts_with_last_observed_value() {
        let home = scripted_node(None);
        let stale = Address::repeat_byte(0x01);
        home.push_result("eth_call", ScriptedRpc::abi_word_address(stale));
        let h = harness(home, Arc::new(ScriptedRpc::new()));

        let err = h
            .admin
            .transfer_proxy_ownership(
                ChainRole::Home,
                &h.key,
                Address::repeat_byte(0xb0),
                Address::repeat_byte(0x11),
            )
            .await
            .unwrap_err();

        match &err {
            DeployerError::StateMismatch {
                observed, attempts, ..
            } => {
                assert_eq!(observed, &stale.to_string());
                assert_eq!(*attempts, 5);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.is_uncertain());
        assert_eq!(h.home.call_count("eth_call"), 5);
        assert_eq!(h.home.call_count("eth_sendRawTransaction"), 1);
    }

    #[tokio::test]
    async fn test_status_zero_is_reverted() {
        let h = harness(scripted_node(Some(0)), Arc::new(ScriptedRpc::new()));

        let err = h
            .admin
            .set_bridge_contract(
                ChainRole::Home,
                &h.key,
                Address::repeat_byte(0xe0),
                Address::repeat_byte(0xb0),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DeployerError::TransactionReverted { .. }));
        assert_eq!(h.home.call_count("eth_call"), 0);
    }

    #[tokio::test]
    async fn test_gas_price_follows_chain_role() {
        let h = harness(scripted_node(Some(1)), scripted_node(Some(1)));
        let contract = Address::repeat_byte(0xb0);
        let owner = Address::repeat_byte(0x11);

        h.admin
            .transfer_ownership(ChainRole::Home, &h.key, contract, owner)
            .await
            .unwrap();
        h.admin
            .transfer_ownership(ChainRole::Foreign, &h.key, contract, owner)
            .await
            .unwrap();

        assert_eq!(legacy_gas_price(&sent_transaction(&h.home)), HOME_GAS_PRICE);
        assert_eq!(legacy_gas_price(&sent_transaction(&h.foreign)), FOREIGN_GAS_PRICE);
    }

    #[tokio::test]
    async fn test_gas_limit_includes_margin() {
        let h = harness(scripted_node(Some(1)), Arc::new(ScriptedRpc::new()));

        h.admin
            .upgrade_proxy(
                ChainRole::Home,
                &h.key,
                Address::repeat_byte(0xb0),
                U256::from(2u64),
                Address::repeat_byte(0x0c),
            )
            .await
            .unwrap();

        match sent_transaction(&h.home) {
            TxEnvelope::Legacy(signed) => {
                // 30000 estimated, +20%
                assert_eq!(signed.tx().gas_limit, 36_000);
                assert_eq!(signed.tx().nonce, 7);
                assert_eq!(signed.tx().chain_id, Some(1));
            }
            other => panic!("expected legacy transaction, got {:?}", other.tx_type()),
        }
    }

    #[test]
    fn test_validator_encodings() {
        let validators = vec![Address::repeat_byte(0x0a), Address::repeat_byte(0x0b)];
        let rewards = vec![Address::repeat_byte(0x1a), Address::repeat_byte(0x1b)];
        let owner = Address::repeat_byte(0x0f);

        let plain = ValidatorSetup {
            required_signatures: U256::from(2u64),
            validators: validators.clone(),
            owner,
            variant: BridgeVariant::Plain,
        };
        let data = plain.encode_initialize().unwrap();
        assert_eq!(&data[..4], &IBridgeValidators::initializeCall::SELECTOR);
        let decoded = IBridgeValidators::initializeCall::abi_decode(&data, true).unwrap();
        assert_eq!(decoded.initialValidators, validators);
        assert_eq!(decoded.owner, owner);

        let rewardable = ValidatorSetup {
            variant: BridgeVariant::Rewardable {
                reward_accounts: rewards.clone(),
            },
            ..plain
        };
        let data = rewardable.encode_initialize().unwrap();
        assert_eq!(&data[..4], &IRewardableValidators::initializeCall::SELECTOR);
        let decoded = IRewardableValidators::initializeCall::abi_decode(&data, true).unwrap();
        assert_eq!(decoded.requiredSignatures, U256::from(2u64));
        assert_eq!(decoded.initialValidators, validators);
        assert_eq!(decoded.initialRewards, rewards);
        assert_eq!(decoded.owner, owner);
    }

    #[test]
    fn test_three_validator_encodings_per_variant() {
        let (a, b, c) = (
            Address::repeat_byte(0x0a),
            Address::repeat_byte(0x0b),
            Address::repeat_byte(0x0c),
        );
        let (ra, rb, rc) = (
            Address::repeat_byte(0x1a),
            Address::repeat_byte(0x1b),
            Address::repeat_byte(0x1c),
        );
        let owner = Address::repeat_byte(0x0f);

        let rewardable = ValidatorSetup {
            required_signatures: U256::from(3u64),
            validators: vec![a, b, c],
            owner,
            variant: BridgeVariant::Rewardable {
                reward_accounts: vec![ra, rb, rc],
            },
        }
        .encode_initialize()
        .unwrap();
        let plain = ValidatorSetup {
            required_signatures: U256::from(3u64),
            validators: vec![a, b, c],
            owner,
            variant: BridgeVariant::Plain,
        }
        .encode_initialize()
        .unwrap();

        let decoded = IRewardableValidators::initializeCall::abi_decode(&rewardable, true).unwrap();
        assert_eq!(decoded.requiredSignatures, U256::from(3u64));
        assert_eq!(decoded.initialValidators, vec![a, b, c]);
        assert_eq!(decoded.initialRewards, vec![ra, rb, rc]);
        assert_eq!(decoded.owner, owner);

        let decoded = IBridgeValidators::initializeCall::abi_decode(&plain, true).unwrap();
        assert_eq!(decoded.requiredSignatures, U256::from(3u64));
        assert_eq!(decoded.initialValidators, vec![a, b, c]);
        assert_eq!(decoded.owner, owner);

        // Each payload only decodes as its own overload
        assert!(IBridgeValidators::initializeCall::abi_decode(&rewardable, true).is_err());
        assert!(IRewardableValidators::initializeCall::abi_decode(&plain, true).is_err());
    }

    #[test]
    fn test_reward_account_count_must_match() {
        let setup = ValidatorSetup {
            required_signatures: U256::from(1u64),
            validators: vec![Address::repeat_byte(0x0a), Address::repeat_byte(0x0b)],
            owner: Address::repeat_byte(0x0f),
            variant: BridgeVariant::Rewardable {
                reward_accounts: vec![Address::repeat_byte(0x1a)],
            },
        };
        assert!(matches!(
            setup.encode_initialize(),
            Err(DeployerError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_initialize_confirms_via_is_initialized() {
        let home = scripted_node(None);
        home.push_result("eth_call", ScriptedRpc::abi_word_bool(false));
        home.push_result("eth_call", ScriptedRpc::abi_word_bool(true));
        let h = harness(home, Arc::new(ScriptedRpc::new()));

        let setup = ValidatorSetup {
            required_signatures: U256::from(1u64),
            validators: vec![Address::repeat_byte(0x0a)],
            owner: Address::repeat_byte(0x0f),
            variant: BridgeVariant::Plain,
        };
        let receipt = h
            .admin
            .initialize_validators(ChainRole::Home, &h.key, Address::repeat_byte(0xb0), &setup)
            .await
            .unwrap();

        assert_eq!(receipt.confirmation, Confirmation::ObservedState);
        assert_eq!(h.home.call_count("eth_call"), 2);
    }

    #[tokio::test]
    async fn test_invalid_validator_setup_sends_nothing() {
        let h = harness(scripted_node(Some(1)), Arc::new(ScriptedRpc::new()));
        let setup = ValidatorSetup {
            required_signatures: U256::from(1u64),
            validators: vec![Address::repeat_byte(0x0a)],
            owner: Address::repeat_byte(0x0f),
            variant: BridgeVariant::Rewardable {
                reward_accounts: vec![],
            },
        };

        let err = h
            .admin
            .initialize_validators(ChainRole::Home, &h.key, Address::repeat_byte(0xb0), &setup)
            .await
            .unwrap_err();

        assert!(matches!(err, DeployerError::InvalidInput(_)));
        assert_eq!(h.home.call_count("eth_getTransactionCount"), 0);
        assert_eq!(h.home.call_count("eth_sendRawTransaction"), 0);
    }

    #[tokio::test]
    async fn test_deploy_derives_address_when_receipt_has_none() {
        let home = scripted_node(None);
        home.push_result("eth_getCode", json!("0x"));
        home.push_result("eth_getCode", json!("0x6080604052"));
        let h = harness(home, Arc::new(ScriptedRpc::new()));

        let deployed = h
            .admin
            .deploy_contract(
                ChainRole::Home,
                &h.key,
                Bytes::from_static(&[0x60, 0x80, 0x60, 0x40]),
                Bytes::new(),
            )
            .await
            .unwrap();

        assert_eq!(deployed.address, h.key.address().create(7));
        assert_eq!(deployed.receipt.confirmation, Confirmation::ObservedState);
        assert_eq!(h.home.call_count("eth_getCode"), 2);

        match sent_transaction(&h.home) {
            TxEnvelope::Legacy(signed) => assert!(signed.tx().to.is_create()),
            other => panic!("expected legacy transaction, got {:?}", other.tx_type()),
        }
    }

    #[tokio::test]
    async fn test_receipt_timeout_is_uncertain() {
        let home = Arc::new(ScriptedRpc::new());
        home.push_result("eth_getTransactionCount", json!("0x0"));
        home.push_result("eth_estimateGas", json!("0x5208"));
        home.push_result("eth_getBlockByNumber", json!({ "gasLimit": "0x7a1200" }));
        home.push_result("eth_sendRawTransaction", json!(TX_HASH));
        home.push_result("eth_getTransactionReceipt", Value::Null);
        let h = harness(home, Arc::new(ScriptedRpc::new()));

        let err = h
            .admin
            .transfer_ownership(
                ChainRole::Home,
                &h.key,
                Address::repeat_byte(0xb0),
                Address::repeat_byte(0x11),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DeployerError::ReceiptTimeout { attempts: 5, .. }));
        assert!(err.is_uncertain());
        assert_eq!(h.home.call_count("eth_sendRawTransaction"), 1);
    }

    #[tokio::test]
    async fn test_broadcast_rejection_is_not_retried() {
        let rejecting = Arc::new(ScriptedRpc::new());
        rejecting.push_result("eth_getTransactionCount", json!("0x1"));
        rejecting.push_result("eth_estimateGas", json!("0x5208"));
        rejecting.push_result("eth_getBlockByNumber", json!({ "gasLimit": "0x7a1200" }));
        rejecting.push(
            "eth_sendRawTransaction",
            Reply::Error(-32000, "nonce too low".to_string()),
        );
        let h = harness(rejecting, Arc::new(ScriptedRpc::new()));

        let err = h
            .admin
            .transfer_ownership(
                ChainRole::Home,
                &h.key,
                Address::repeat_byte(0xb0),
                Address::repeat_byte(0x11),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DeployerError::Broadcast(_)));
        assert!(!err.is_uncertain());
        assert_eq!(h.home.call_count("eth_sendRawTransaction"), 1);
        assert_eq!(h.home.call_count("eth_getTransactionReceipt"), 0);
    }

    #[tokio::test]
    async fn test_preflight_reports_account() {
        let home = scripted_node(Some(1));
        home.push_result("eth_getBalance", json!("0xde0b6b3a7640000"));
        let h = harness(home, Arc::new(ScriptedRpc::new()));

        let report = h.admin.preflight(ChainRole::Home, &h.key).await.unwrap();

        assert_eq!(report.address, h.key.address());
        assert_eq!(report.chain_id, 1);
        assert_eq!(report.nonce, 7);
        assert_eq!(report.balance, U256::from(1_000_000_000_000_000_000u64));
    }

    #[tokio::test]
    async fn test_preflight_rejects_wrong_chain() {
        let home = Arc::new(ScriptedRpc::new());
        home.push_result("eth_chainId", json!("0x38"));
        let h = harness(home, Arc::new(ScriptedRpc::new()));

        let err = h.admin.preflight(ChainRole::Home, &h.key).await.unwrap_err();
        assert!(matches!(err, DeployerError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_is_contract() {
        let home = Arc::new(ScriptedRpc::new());
        home.push_result("eth_getCode", json!("0x0"));
        home.push_result("eth_getCode", json!("0x6080"));
        let h = harness(home, Arc::new(ScriptedRpc::new()));
        let address = Address::repeat_byte(0xb0);

        assert!(!h.admin.is_contract(ChainRole::Home, address).await.unwrap());
        assert!(h.admin.is_contract(ChainRole::Home, address).await.unwrap());
    }
}
