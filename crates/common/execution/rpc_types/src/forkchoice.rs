use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

use crate::{PayloadId, payload_status::PayloadStatusV1};

/// The consensus view the execution client must set its canonical chain to.
#[derive(Debug, Default, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForkchoiceState {
    pub head_block_hash: B256,
    pub safe_block_hash: B256,
    pub finalized_block_hash: B256,
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForkchoiceUpdatedResponse {
    pub payload_status: PayloadStatusV1,
    #[serde(default)]
    pub payload_id: Option<PayloadId>,
}
