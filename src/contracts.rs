//! Bridge administration ABI definitions
//!
//! Uses alloy's sol! macro to generate call encoders and return decoders for
//! the administrative surface of the bridge contracts. The plain and the
//! reward-bearing validator contracts each get their own interface so their
//! `initialize` overloads cannot be mixed up.

#![allow(clippy::too_many_arguments)]

use alloy::sol;

sol! {
    /// Ownable contracts (bridges, validators, tokens)
    interface IOwnable {
        function owner() external view returns (address);
        function transferOwnership(address newOwner) external;
    }

    /// Eternal-storage upgradeability proxy
    interface IOwnedUpgradeabilityProxy {
        function proxyOwner() external view returns (address);
        function transferProxyOwnership(address newOwner) external;
        function upgradeTo(uint256 version, address implementation) external;
        function implementation() external view returns (address);
        function version() external view returns (uint256);
    }

    /// Tokens that mint/burn on behalf of a bridge
    interface IBridgeableToken {
        function setBridgeContract(address bridgeContract) external;
        function bridgeContract() external view returns (address);
    }

    /// Validator set without reward accounts
    interface IBridgeValidators {
        function initialize(uint256 requiredSignatures, address[] initialValidators, address owner) external returns (bool);
        function isInitialized() external view returns (bool);
        function requiredSignatures() external view returns (uint256);
    }

    /// Validator set paying rewards to a per-validator account
    interface IRewardableValidators {
        function initialize(uint256 requiredSignatures, address[] initialValidators, address[] initialRewards, address owner) external returns (bool);
        function isInitialized() external view returns (bool);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, U256};
    use alloy::sol_types::SolCall;

    #[test]
    fn test_selectors() {
        assert_eq!(IOwnable::ownerCall::SELECTOR, [0x8d, 0xa5, 0xcb, 0x5b]);
        assert_eq!(IOwnable::transferOwnershipCall::SELECTOR, [0xf2, 0xfd, 0xe3, 0x8b]);
        assert_eq!(
            IOwnedUpgradeabilityProxy::upgradeToCall::SIGNATURE,
            "upgradeTo(uint256,address)"
        );
        assert_eq!(
            IBridgeValidators::initializeCall::SIGNATURE,
            "initialize(uint256,address[],address)"
        );
        assert_eq!(
            IRewardableValidators::initializeCall::SIGNATURE,
            "initialize(uint256,address[],address[],address)"
        );
    }

    #[test]
    fn test_transfer_ownership_encoding() {
        let new_owner = Address::repeat_byte(0x42);
        let data = IOwnable::transferOwnershipCall { newOwner: new_owner }.abi_encode();

        assert_eq!(data.len(), 4 + 32);
        assert_eq!(&data[..4], &IOwnable::transferOwnershipCall::SELECTOR);
        assert_eq!(&data[16..], new_owner.as_slice());
    }

    #[test]
    fn test_upgrade_to_encoding() {
        let data = IOwnedUpgradeabilityProxy::upgradeToCall {
            version: U256::from(2u64),
            implementation: Address::repeat_byte(0x07),
        }
        .abi_encode();

        assert_eq!(data.len(), 4 + 64);
        assert_eq!(data[4 + 31], 2);
    }
}
