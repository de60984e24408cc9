use alloy_primitives::{B256, Bytes};
use ream_execution_rpc_types::execution_payload::ExecutionPayload;
use ream_network_spec::forks::ForkVersion;
use serde_json::{Value, json};

use crate::{errors::ValidationError, versions::EngineNewPayloadVersion};

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct NewPayloadRequest {
    pub fork: ForkVersion,
    pub version: EngineNewPayloadVersion,
    pub execution_payload: ExecutionPayload,
    pub versioned_hashes: Vec<B256>,
    pub parent_beacon_block_root: Option<B256>,
    pub execution_requests: Option<Vec<Bytes>>,
}

impl NewPayloadRequest {
    /// `fork` must be the fork of the payload's own timestamp.
    pub fn build(
        execution_payload: ExecutionPayload,
        versioned_hashes: Vec<B256>,
        parent_beacon_block_root: Option<B256>,
        execution_requests: Option<Vec<Bytes>>,
        fork: ForkVersion,
    ) -> Result<Self, ValidationError> {
        let version = EngineNewPayloadVersion::try_from(fork)?;
        execution_payload.check_fields(fork)?;

        match (fork.parent_beacon_block_root_enabled(), parent_beacon_block_root) {
            (true, None) => return Err(ValidationError::ParentBeaconBlockRootMissing(fork)),
            (false, Some(_)) => return Err(ValidationError::ParentBeaconBlockRootUnexpected(fork)),
            _ => {}
        }
        match (fork.execution_requests_enabled(), &execution_requests) {
            (true, None) => return Err(ValidationError::ExecutionRequestsMissing(fork)),
            (false, Some(_)) => return Err(ValidationError::ExecutionRequestsUnexpected(fork)),
            _ => {}
        }

        verify_versioned_hashes(&execution_payload, &versioned_hashes)?;

        Ok(Self {
            fork,
            version,
            execution_payload,
            versioned_hashes,
            parent_beacon_block_root,
            execution_requests,
        })
    }

    pub fn method(&self) -> &'static str {
        self.version.method()
    }

    pub fn block_hash(&self) -> B256 {
        self.execution_payload.block_hash
    }

    pub fn params(&self) -> Vec<Value> {
        let mut params = vec![json!(self.execution_payload)];
        if matches!(
            self.version,
            EngineNewPayloadVersion::V3 | EngineNewPayloadVersion::V4
        ) {
            params.push(json!(self.versioned_hashes));
            params.push(json!(self.parent_beacon_block_root));
        }
        if let Some(execution_requests) = &self.execution_requests {
            params.push(json!(execution_requests));
        }
        params
    }
}

/// Check that ``versioned_hashes`` lists, in order, exactly the hashes committed to by the blob
/// transactions of ``execution_payload``.
pub fn verify_versioned_hashes(
    execution_payload: &ExecutionPayload,
    versioned_hashes: &[B256],
) -> Result<(), ValidationError> {
    let expected = execution_payload.blob_versioned_hashes()?;
    if expected.len() != versioned_hashes.len() {
        return Err(ValidationError::BlobCountMismatch {
            blob_count: expected.len(),
            supplied: versioned_hashes.len(),
        });
    }

    if let Some((index, (expected, supplied))) = expected
        .iter()
        .zip(versioned_hashes)
        .enumerate()
        .find(|(_, (expected, supplied))| expected != supplied)
    {
        return Err(ValidationError::VersionedHashMismatch {
            index,
            expected: *expected,
            supplied: *supplied,
        });
    }

    Ok(())
}
