use alloy_primitives::B256;
use ream_execution_rpc_types::{
    PayloadId, execution_payload::PayloadFieldError, payload_attributes::PayloadAttributesError,
    transaction::TransactionDecodeError,
};
use ream_network_spec::forks::ForkVersion;
use thiserror::Error;

use crate::{auth::AuthError, transport::RpcCallError};

/// Raised while building a request, before anything reaches the wire.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} does not use the engine api")]
    PreMergeFork(ForkVersion),

    #[error(transparent)]
    PayloadFields(#[from] PayloadFieldError),

    #[error("Payload carries {blob_count} blob commitments but {supplied} versioned hashes were supplied")]
    BlobCountMismatch { blob_count: usize, supplied: usize },

    #[error("Versioned hash {index} is {supplied}, payload commits to {expected}")]
    VersionedHashMismatch {
        index: usize,
        expected: B256,
        supplied: B256,
    },

    #[error(transparent)]
    MalformedTransaction(#[from] TransactionDecodeError),

    #[error("{0} requires a parent beacon block root")]
    ParentBeaconBlockRootMissing(ForkVersion),

    #[error("{0} does not accept a parent beacon block root")]
    ParentBeaconBlockRootUnexpected(ForkVersion),

    #[error("{0} requires execution requests")]
    ExecutionRequestsMissing(ForkVersion),

    #[error("{0} does not accept execution requests")]
    ExecutionRequestsUnexpected(ForkVersion),

    #[error(transparent)]
    PayloadAttributes(#[from] PayloadAttributesError),

    #[error("Timestamp {timestamp} falls in {actual}, request was built for {requested}")]
    TimestampForkMismatch {
        timestamp: u64,
        requested: ForkVersion,
        actual: ForkVersion,
    },

    #[error("Payload {payload_id} was issued under {issued}, requested under {requested}")]
    ForkVersionMismatch {
        payload_id: PayloadId,
        issued: ForkVersion,
        requested: ForkVersion,
    },
}

/// What the caller should do with a failed engine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDisposition {
    /// The execution client could not be reached or answered too late.
    RetryLater,
    /// The block or request itself is at fault.
    RejectBlock,
    /// The execution client answered with something it must never send.
    ChainOfCustodyBroken,
    /// The build job is gone, start a new one with a forkchoice update.
    Rebuild,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("Execution engine unavailable after {attempts} attempts calling {method}: {last_error}")]
    EngineUnavailable {
        method: &'static str,
        attempts: u32,
        last_error: RpcCallError,
    },

    #[error("Protocol violation in {method}: {reason}")]
    ProtocolViolation { method: &'static str, reason: String },

    #[error("Payload invalid (latest valid hash {latest_valid_hash:?}): {validation_error:?}")]
    PayloadInvalid {
        latest_valid_hash: Option<B256>,
        validation_error: Option<String>,
    },

    #[error("Payload build {0} has expired")]
    CacheExpired(PayloadId),

    #[error("{method} rejected with code {code}: {message}")]
    Rejected {
        method: &'static str,
        code: i64,
        message: String,
    },

    #[error("Authentication failed calling {method}: {reason}")]
    Auth { method: &'static str, reason: String },

    #[error("Deadline exceeded calling {0}")]
    DeadlineExceeded(&'static str),

    #[error("Jwt error: {0}")]
    Jwt(#[from] AuthError),

    #[error("Could not create http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl EngineError {
    pub fn protocol_violation(method: &'static str, reason: impl Into<String>) -> Self {
        Self::ProtocolViolation {
            method,
            reason: reason.into(),
        }
    }

    pub fn disposition(&self) -> ErrorDisposition {
        match self {
            EngineError::Validation(_)
            | EngineError::PayloadInvalid { .. }
            | EngineError::Rejected { .. } => ErrorDisposition::RejectBlock,
            EngineError::ProtocolViolation { .. } => ErrorDisposition::ChainOfCustodyBroken,
            EngineError::CacheExpired(_) => ErrorDisposition::Rebuild,
            EngineError::EngineUnavailable { .. }
            | EngineError::Auth { .. }
            | EngineError::DeadlineExceeded(_)
            | EngineError::Jwt(_)
            | EngineError::HttpClient(_) => ErrorDisposition::RetryLater,
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::B64;

    use super::*;

    #[test]
    fn test_disposition() {
        assert_eq!(
            EngineError::from(ValidationError::ParentBeaconBlockRootMissing(ForkVersion::Deneb))
                .disposition(),
            ErrorDisposition::RejectBlock
        );
        assert_eq!(
            EngineError::CacheExpired(B64::ZERO).disposition(),
            ErrorDisposition::Rebuild
        );
        assert_eq!(
            EngineError::protocol_violation("engine_newPayloadV3", "bad hash").disposition(),
            ErrorDisposition::ChainOfCustodyBroken
        );
        assert_eq!(
            EngineError::EngineUnavailable {
                method: "engine_newPayloadV3",
                attempts: 3,
                last_error: RpcCallError::Timeout(std::time::Duration::from_secs(1)),
            }
            .disposition(),
            ErrorDisposition::RetryLater
        );
    }
}
