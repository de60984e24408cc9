use alloy_primitives::{Bytes, FixedBytes, U256};
use serde::{Deserialize, Serialize};

use crate::execution_payload::ExecutionPayload;

pub type KzgCommitment = FixedBytes<48>;
pub type KzgProof = FixedBytes<48>;

#[derive(Debug, Default, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct BlobsBundle {
    pub commitments: Vec<KzgCommitment>,
    pub proofs: Vec<KzgProof>,
    pub blobs: Vec<Bytes>,
}

/// Built payload returned by `engine_getPayload*`.
///
/// `engine_getPayloadV1` returns a bare payload, later versions wrap it in an envelope; both are
/// normalised into this type with the optional fields left empty.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPayloadResponse {
    pub execution_payload: ExecutionPayload,
    #[serde(default)]
    pub block_value: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blobs_bundle: Option<BlobsBundle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub should_override_builder: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_requests: Option<Vec<Bytes>>,
}

impl GetPayloadResponse {
    pub fn from_payload(execution_payload: ExecutionPayload) -> Self {
        Self {
            execution_payload,
            block_value: U256::ZERO,
            blobs_bundle: None,
            should_override_builder: None,
            execution_requests: None,
        }
    }
}
