use std::fmt;

use alloy_primitives::{Address, B256};
use ream_network_spec::forks::ForkVersion;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::withdrawal::Withdrawal;

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadAttributesV1 {
    #[serde(with = "serde_utils::u64_hex_be")]
    pub timestamp: u64,
    pub prev_randao: B256,
    pub suggested_fee_recipient: Address,
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadAttributesV2 {
    #[serde(with = "serde_utils::u64_hex_be")]
    pub timestamp: u64,
    pub prev_randao: B256,
    pub suggested_fee_recipient: Address,
    pub withdrawals: Vec<Withdrawal>,
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadAttributesV3 {
    #[serde(with = "serde_utils::u64_hex_be")]
    pub timestamp: u64,
    pub prev_randao: B256,
    pub suggested_fee_recipient: Address,
    pub withdrawals: Vec<Withdrawal>,
    pub parent_beacon_block_root: B256,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
pub enum PayloadAttributesVersion {
    V1,
    V2,
    V3,
}

impl PayloadAttributesVersion {
    pub fn for_fork(fork: ForkVersion) -> Result<Self, PayloadAttributesError> {
        match fork {
            ForkVersion::Phase0 | ForkVersion::Altair => {
                Err(PayloadAttributesError::PreMergeFork(fork))
            }
            ForkVersion::Bellatrix => Ok(Self::V1),
            ForkVersion::Capella => Ok(Self::V2),
            ForkVersion::Deneb | ForkVersion::Electra => Ok(Self::V3),
        }
    }
}

impl fmt::Display for PayloadAttributesVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadAttributesVersion::V1 => f.write_str("PayloadAttributesV1"),
            PayloadAttributesVersion::V2 => f.write_str("PayloadAttributesV2"),
            PayloadAttributesVersion::V3 => f.write_str("PayloadAttributesV3"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayloadAttributesError {
    #[error("{fork} expects {expected}, found {found}")]
    VersionMismatch {
        fork: ForkVersion,
        expected: PayloadAttributesVersion,
        found: PayloadAttributesVersion,
    },

    #[error("{0} does not build execution payloads")]
    PreMergeFork(ForkVersion),
}

/// Instructions for the execution client to start building a payload on top of the new head.
///
/// Serializes as the bare versioned object, which is what `engine_forkchoiceUpdated*` expects as
/// its second parameter.
#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
#[serde(untagged)]
pub enum PayloadAttributes {
    V1(PayloadAttributesV1),
    V2(PayloadAttributesV2),
    V3(PayloadAttributesV3),
}

impl PayloadAttributes {
    /// The version is picked from which optional fields are supplied; whether that version fits
    /// the fork of `timestamp` is checked separately by [PayloadAttributes::validate_for].
    pub fn new(
        timestamp: u64,
        prev_randao: B256,
        suggested_fee_recipient: Address,
        withdrawals: Option<Vec<Withdrawal>>,
        parent_beacon_block_root: Option<B256>,
    ) -> Self {
        match (withdrawals, parent_beacon_block_root) {
            (withdrawals, Some(parent_beacon_block_root)) => {
                PayloadAttributes::V3(PayloadAttributesV3 {
                    timestamp,
                    prev_randao,
                    suggested_fee_recipient,
                    withdrawals: withdrawals.unwrap_or_default(),
                    parent_beacon_block_root,
                })
            }
            (Some(withdrawals), None) => PayloadAttributes::V2(PayloadAttributesV2 {
                timestamp,
                prev_randao,
                suggested_fee_recipient,
                withdrawals,
            }),
            (None, None) => PayloadAttributes::V1(PayloadAttributesV1 {
                timestamp,
                prev_randao,
                suggested_fee_recipient,
            }),
        }
    }

    pub fn version(&self) -> PayloadAttributesVersion {
        match self {
            PayloadAttributes::V1(_) => PayloadAttributesVersion::V1,
            PayloadAttributes::V2(_) => PayloadAttributesVersion::V2,
            PayloadAttributes::V3(_) => PayloadAttributesVersion::V3,
        }
    }

    pub fn timestamp(&self) -> u64 {
        match self {
            PayloadAttributes::V1(inner) => inner.timestamp,
            PayloadAttributes::V2(inner) => inner.timestamp,
            PayloadAttributes::V3(inner) => inner.timestamp,
        }
    }

    pub fn prev_randao(&self) -> B256 {
        match self {
            PayloadAttributes::V1(inner) => inner.prev_randao,
            PayloadAttributes::V2(inner) => inner.prev_randao,
            PayloadAttributes::V3(inner) => inner.prev_randao,
        }
    }

    pub fn suggested_fee_recipient(&self) -> Address {
        match self {
            PayloadAttributes::V1(inner) => inner.suggested_fee_recipient,
            PayloadAttributes::V2(inner) => inner.suggested_fee_recipient,
            PayloadAttributes::V3(inner) => inner.suggested_fee_recipient,
        }
    }

    pub fn withdrawals(&self) -> Option<&[Withdrawal]> {
        match self {
            PayloadAttributes::V1(_) => None,
            PayloadAttributes::V2(inner) => Some(&inner.withdrawals),
            PayloadAttributes::V3(inner) => Some(&inner.withdrawals),
        }
    }

    pub fn parent_beacon_block_root(&self) -> Option<B256> {
        match self {
            PayloadAttributes::V3(inner) => Some(inner.parent_beacon_block_root),
            _ => None,
        }
    }

    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            PayloadAttributes::V1(inner) => json!(inner),
            PayloadAttributes::V2(inner) => json!(inner),
            PayloadAttributes::V3(inner) => json!(inner),
        }
    }

    pub fn validate_for(&self, fork: ForkVersion) -> Result<(), PayloadAttributesError> {
        let expected = PayloadAttributesVersion::for_fork(fork)?;
        let found = self.version();
        if expected != found {
            return Err(PayloadAttributesError::VersionMismatch {
                fork,
                expected,
                found,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn attributes(withdrawals: bool, parent_beacon_block_root: bool) -> PayloadAttributes {
        PayloadAttributes::new(
            12,
            B256::repeat_byte(0x11),
            Address::repeat_byte(0x22),
            withdrawals.then(Vec::new),
            parent_beacon_block_root.then(|| B256::repeat_byte(0x33)),
        )
    }

    #[rstest]
    #[case(false, false, PayloadAttributesVersion::V1)]
    #[case(true, false, PayloadAttributesVersion::V2)]
    #[case(true, true, PayloadAttributesVersion::V3)]
    #[case(false, true, PayloadAttributesVersion::V3)]
    fn test_version_from_fields(
        #[case] withdrawals: bool,
        #[case] parent_beacon_block_root: bool,
        #[case] expected: PayloadAttributesVersion,
    ) {
        assert_eq!(attributes(withdrawals, parent_beacon_block_root).version(), expected);
    }

    #[test]
    fn test_parent_beacon_block_root_rejected_before_deneb() {
        let with_root = attributes(true, true);

        assert_eq!(
            with_root.validate_for(ForkVersion::Capella),
            Err(PayloadAttributesError::VersionMismatch {
                fork: ForkVersion::Capella,
                expected: PayloadAttributesVersion::V2,
                found: PayloadAttributesVersion::V3,
            })
        );
        assert_eq!(with_root.validate_for(ForkVersion::Deneb), Ok(()));
        assert!(attributes(true, false).validate_for(ForkVersion::Deneb).is_err());
    }

    #[test]
    fn test_pre_merge_attributes_rejected() {
        assert_eq!(
            attributes(false, false).validate_for(ForkVersion::Altair),
            Err(PayloadAttributesError::PreMergeFork(ForkVersion::Altair))
        );
    }

    #[test]
    fn test_v3_json() {
        assert_eq!(
            attributes(true, true).to_json_value(),
            json!({
                "timestamp": "0xc",
                "prevRandao": B256::repeat_byte(0x11),
                "suggestedFeeRecipient": Address::repeat_byte(0x22),
                "withdrawals": [],
                "parentBeaconBlockRoot": B256::repeat_byte(0x33),
            })
        );
    }
}
