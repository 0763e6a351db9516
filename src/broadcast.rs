//! Signing and broadcasting
//!
//! A [`RawTransaction`] is signed as an EIP-155 legacy transaction,
//! serialized to its canonical wire form and submitted once. Broadcast is
//! never retried here: resending the same nonce either double-spends or is
//! rejected as a duplicate, so retries belong to confirmation.

use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TxSignerSync;
use alloy::primitives::{Bytes, TxHash, TxKind};
use tracing::{info, warn};

use crate::error::{DeployerError, Result};
use crate::keys::PrivateKey;
use crate::rpc::RpcClient;
use crate::types::RawTransaction;

/// Signed, encoded transaction awaiting broadcast.
///
/// Consumed by [`SignedTransaction::send`].
#[derive(Debug)]
pub struct SignedTransaction {
    hash: TxHash,
    encoded: Bytes,
}

impl SignedTransaction {
    pub fn hash(&self) -> TxHash {
        self.hash
    }

    pub fn encoded(&self) -> &Bytes {
        &self.encoded
    }

    /// Submit once and return the node's transaction hash
    pub async fn send(self, client: &RpcClient) -> Result<TxHash> {
        let tx_hash = client
            .send_raw_transaction(&self.encoded)
            .await
            .map_err(|e| match e {
                DeployerError::Rpc { code, message } => {
                    DeployerError::Broadcast(format!("{} (code {})", message, code))
                }
                other => other,
            })?;

        if tx_hash != self.hash {
            warn!(
                local = %self.hash,
                reported = %tx_hash,
                "Node reported a different transaction hash"
            );
        }

        info!(tx_hash = %tx_hash, rpc = %client.url(), "Transaction broadcast");
        Ok(tx_hash)
    }
}

/// Sign `tx` for `chain_id` with `key`.
///
/// The key must derive to `tx.from`, the account whose nonce was used.
pub fn sign(tx: &RawTransaction, key: &PrivateKey, chain_id: u64) -> Result<SignedTransaction> {
    let signer_address = key.address();
    if signer_address != tx.from {
        return Err(DeployerError::Signing(format!(
            "key derives to {} but the transaction was built for {}",
            signer_address, tx.from
        )));
    }

    let mut legacy = TxLegacy {
        chain_id: Some(chain_id),
        nonce: tx.nonce,
        gas_price: tx.gas_price,
        gas_limit: tx.gas_limit,
        to: match tx.to {
            Some(to) => TxKind::Call(to),
            None => TxKind::Create,
        },
        value: tx.value,
        input: tx.data.clone(),
    };

    let signature = key
        .signer()
        .sign_transaction_sync(&mut legacy)
        .map_err(|e| DeployerError::Signing(e.to_string()))?;

    let signed = legacy.into_signed(signature);
    let hash = *signed.hash();
    let encoded = Bytes::from(TxEnvelope::from(signed).encoded_2718());

    Ok(SignedTransaction { hash, encoded })
}

/// Sign and broadcast, returning the transaction hash
pub async fn sign_and_send(
    tx: &RawTransaction,
    key: &PrivateKey,
    chain_id: u64,
    client: &RpcClient,
) -> Result<TxHash> {
    sign(tx, key, chain_id)?.send(client).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Reply, ScriptedRpc, TEST_PRIVATE_KEY};
    use crate::types::RpcNamespace;
    use alloy::eips::eip2718::Decodable2718;
    use alloy::primitives::{Address, U256};
    use serde_json::json;
    use std::sync::Arc;
    use url::Url;

    fn raw_tx(from: Address) -> RawTransaction {
        RawTransaction {
            from,
            nonce: 3,
            gas_price: 1_000_000_000,
            gas_limit: 252_000,
            to: Some(Address::repeat_byte(0xbb)),
            data: Bytes::from(vec![0xf2, 0xfd, 0xe3, 0x8b]),
            value: U256::ZERO,
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
    fn test_sign_round_trips_fields_and_sender() {
        let key = PrivateKey::from_hex(TEST_PRIVATE_KEY).unwrap();
        let tx = raw_tx(key.address());

        let signed = sign(&tx, &key, 1666600000).unwrap();
        let envelope = TxEnvelope::decode_2718(&mut signed.encoded().as_ref()).unwrap();

        let legacy = envelope.as_legacy().unwrap();
        assert_eq!(*legacy.hash(), signed.hash());
        assert_eq!(legacy.tx().nonce, 3);
        assert_eq!(legacy.tx().gas_limit, 252_000);
        assert_eq!(legacy.tx().chain_id, Some(1666600000));
        assert_eq!(legacy.recover_signer().unwrap(), key.address());
    }

    #[test]
    fn test_sign_refuses_foreign_sender() {
        let key = PrivateKey::from_hex(TEST_PRIVATE_KEY).unwrap();
        let err = sign(&raw_tx(Address::repeat_byte(0x01)), &key, 1).unwrap_err();
        assert!(matches!(err, DeployerError::Signing(_)));
    }

    #[tokio::test]
    async fn test_send_submits_exactly_once() {
        let rpc = Arc::new(ScriptedRpc::new());
        let key = PrivateKey::from_hex(TEST_PRIVATE_KEY).unwrap();
        let signed = sign(&raw_tx(key.address()), &key, 1).unwrap();
        let expected = signed.hash();
        rpc.push_result("eth_sendRawTransaction", json!(expected));

        let tx_hash = signed.send(&client(&rpc)).await.unwrap();
        assert_eq!(tx_hash, expected);
        assert_eq!(rpc.call_count("eth_sendRawTransaction"), 1);
    }

    #[tokio::test]
    async fn test_rejection_is_broadcast_error_without_retry() {
        let rpc = Arc::new(ScriptedRpc::new());
        rpc.push("eth_sendRawTransaction", Reply::Error(-32000, "nonce too low".into()));
        let key = PrivateKey::from_hex(TEST_PRIVATE_KEY).unwrap();

        let err = sign_and_send(&raw_tx(key.address()), &key, 1, &client(&rpc))
            .await
            .unwrap_err();

        match err {
            DeployerError::Broadcast(msg) => assert!(msg.contains("nonce too low")),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(rpc.call_count("eth_sendRawTransaction"), 1);
    }
}
