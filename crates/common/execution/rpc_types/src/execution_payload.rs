use alloy_primitives::{Address, B256, Bloom, Bytes, U256};
use ream_network_spec::forks::ForkVersion;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    transaction::{TransactionDecodeError, blob_versioned_hashes},
    utils::u64_hex_be_option,
    withdrawal::Withdrawal,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayloadFieldError {
    #[error("{fork} payloads must carry `{field}`")]
    Missing {
        fork: ForkVersion,
        field: &'static str,
    },

    #[error("{fork} payloads must not carry `{field}`")]
    Unexpected {
        fork: ForkVersion,
        field: &'static str,
    },

    #[error("{0} has no execution payload")]
    PreMerge(ForkVersion),
}

/// JSON form of an execution payload, covering every version from `ExecutionPayloadV1`
/// (Bellatrix) to `ExecutionPayloadV3` (Deneb and Electra). Fields introduced by later forks are
/// optional and must be present exactly when the payload's fork has them, see
/// [ExecutionPayload::check_fields].
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPayload {
    pub parent_hash: B256,
    pub fee_recipient: Address,
    pub state_root: B256,
    pub receipts_root: B256,
    pub logs_bloom: Bloom,
    pub prev_randao: B256,
    #[serde(with = "serde_utils::u64_hex_be")]
    pub block_number: u64,
    #[serde(with = "serde_utils::u64_hex_be")]
    pub gas_limit: u64,
    #[serde(with = "serde_utils::u64_hex_be")]
    pub gas_used: u64,
    #[serde(with = "serde_utils::u64_hex_be")]
    pub timestamp: u64,
    pub extra_data: Bytes,
    pub base_fee_per_gas: U256,
    pub block_hash: B256,
    pub transactions: Vec<Bytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withdrawals: Option<Vec<Withdrawal>>,
    #[serde(
        with = "u64_hex_be_option",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub blob_gas_used: Option<u64>,
    #[serde(
        with = "u64_hex_be_option",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub excess_blob_gas: Option<u64>,
}

impl ExecutionPayload {
    pub fn check_fields(&self, fork: ForkVersion) -> Result<(), PayloadFieldError> {
        if !fork.execution_enabled() {
            return Err(PayloadFieldError::PreMerge(fork));
        }

        let fields = [
            ("withdrawals", self.withdrawals.is_some(), fork.withdrawals_enabled()),
            ("blobGasUsed", self.blob_gas_used.is_some(), fork.blobs_enabled()),
            ("excessBlobGas", self.excess_blob_gas.is_some(), fork.blobs_enabled()),
        ];
        for (field, present, required) in fields {
            match (present, required) {
                (false, true) => return Err(PayloadFieldError::Missing { fork, field }),
                (true, false) => return Err(PayloadFieldError::Unexpected { fork, field }),
                _ => {}
            }
        }

        Ok(())
    }

    pub fn blob_versioned_hashes(&self) -> Result<Vec<B256>, TransactionDecodeError> {
        blob_versioned_hashes(&self.transactions)
    }

    pub fn blob_count(&self) -> Result<usize, TransactionDecodeError> {
        Ok(self.blob_versioned_hashes()?.len())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn payload_json() -> serde_json::Value {
        json!({
            "parentHash": "0x3b8fb240d288781d4aac94d3fd16809ee413bc99294a085798a589dae51ddd4a",
            "feeRecipient": "0xa94f5374fce5edbc8e2a8697c15331677e6ebf0b",
            "stateRoot": "0xca3149fa9e37db08d1cd49c9061db1002ef1cd58db2210f2115c8c989b2bdf45",
            "receiptsRoot": "0x56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421",
            "logsBloom": format!("0x{}", "00".repeat(256)),
            "prevRandao": "0x0000000000000000000000000000000000000000000000000000000000000000",
            "blockNumber": "0x1",
            "gasLimit": "0x1c9c380",
            "gasUsed": "0x0",
            "timestamp": "0x5",
            "extraData": "0x",
            "baseFeePerGas": "0x7",
            "blockHash": "0x6359b8381a370e2f54072a5784ddd78b6ed024991558c511d4452eb4f6ac898c",
            "transactions": [],
        })
    }

    #[test]
    fn test_bellatrix_payload_json() {
        let payload: ExecutionPayload =
            serde_json::from_value(payload_json()).expect("valid payload");

        assert_eq!(payload.block_number, 1);
        assert_eq!(payload.gas_limit, 30_000_000);
        assert_eq!(payload.base_fee_per_gas, U256::from(7));
        assert_eq!(payload.withdrawals, None);
        assert_eq!(serde_json::to_value(&payload).expect("serialize"), payload_json());
    }

    #[rstest]
    #[case(ForkVersion::Bellatrix, false, false, Ok(()))]
    #[case(ForkVersion::Capella, true, false, Ok(()))]
    #[case(ForkVersion::Deneb, true, true, Ok(()))]
    #[case(ForkVersion::Electra, true, true, Ok(()))]
    #[case(
        ForkVersion::Capella,
        false,
        false,
        Err(PayloadFieldError::Missing { fork: ForkVersion::Capella, field: "withdrawals" })
    )]
    #[case(
        ForkVersion::Capella,
        true,
        true,
        Err(PayloadFieldError::Unexpected { fork: ForkVersion::Capella, field: "blobGasUsed" })
    )]
    #[case(
        ForkVersion::Bellatrix,
        true,
        false,
        Err(PayloadFieldError::Unexpected { fork: ForkVersion::Bellatrix, field: "withdrawals" })
    )]
    #[case(
        ForkVersion::Altair,
        false,
        false,
        Err(PayloadFieldError::PreMerge(ForkVersion::Altair))
    )]
    fn test_check_fields(
        #[case] fork: ForkVersion,
        #[case] withdrawals: bool,
        #[case] blobs: bool,
        #[case] expected: Result<(), PayloadFieldError>,
    ) {
        let mut payload: ExecutionPayload =
            serde_json::from_value(payload_json()).expect("valid payload");
        payload.withdrawals = withdrawals.then(Vec::new);
        payload.blob_gas_used = blobs.then_some(0);
        payload.excess_blob_gas = blobs.then_some(0);

        assert_eq!(payload.check_fields(fork), expected);
    }
}
