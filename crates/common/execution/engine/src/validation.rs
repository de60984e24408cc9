//! Checks on execution client responses. A response that does not fit the negotiated fork or
//! contradicts the request is a protocol violation and is never retried.

use alloy_primitives::B256;
use ream_execution_rpc_types::{
    execution_payload::ExecutionPayload,
    forkchoice::ForkchoiceUpdatedResponse,
    get_payload::GetPayloadResponse,
    payload_status::{PayloadStatusV1, PayloadStatusV1Status},
};
use ream_network_spec::forks::ForkVersion;
use serde_json::Value;

use crate::{
    errors::EngineError, payload_cache::BuildJobContext, versions::EngineGetPayloadVersion,
};

/// Statuses a caller can act on. `INVALID` and `INVALID_BLOCK_HASH` surface as
/// [EngineError::PayloadInvalid] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadStatus {
    Valid,
    Syncing,
    Accepted,
}

impl PayloadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadStatus::Valid => "valid",
            PayloadStatus::Syncing => "syncing",
            PayloadStatus::Accepted => "accepted",
        }
    }
}

fn parse_status(
    method: &'static str,
    status: &PayloadStatusV1,
) -> Result<PayloadStatusV1Status, EngineError> {
    status
        .status()
        .map_err(|err| EngineError::protocol_violation(method, err.to_string()))
}

fn payload_invalid(status: &PayloadStatusV1, latest_valid_hash: Option<B256>) -> EngineError {
    EngineError::PayloadInvalid {
        latest_valid_hash,
        validation_error: status.validation_error.clone(),
    }
}

/// `INVALID` must name the latest valid ancestor so the caller knows how far to roll back.
fn invalid_status(method: &'static str, status: &PayloadStatusV1) -> EngineError {
    match status.latest_valid_hash {
        Some(latest_valid_hash) => payload_invalid(status, Some(latest_valid_hash)),
        None => {
            EngineError::protocol_violation(method, "INVALID status without a latest valid hash")
        }
    }
}

pub fn validate_new_payload_status(
    method: &'static str,
    status: &PayloadStatusV1,
    requested_block_hash: B256,
) -> Result<PayloadStatus, EngineError> {
    match parse_status(method, status)? {
        PayloadStatusV1Status::Valid => match status.latest_valid_hash {
            Some(latest_valid_hash) if latest_valid_hash == requested_block_hash => {
                Ok(PayloadStatus::Valid)
            }
            latest_valid_hash => Err(EngineError::protocol_violation(
                method,
                format!(
                    "VALID status must point at block {requested_block_hash}, got {latest_valid_hash:?}"
                ),
            )),
        },
        PayloadStatusV1Status::Invalid => Err(invalid_status(method, status)),
        PayloadStatusV1Status::InvalidBlockHash => Err(payload_invalid(status, None)),
        PayloadStatusV1Status::Syncing => Ok(PayloadStatus::Syncing),
        PayloadStatusV1Status::Accepted => Ok(PayloadStatus::Accepted),
    }
}

pub fn validate_forkchoice_response(
    method: &'static str,
    response: &ForkchoiceUpdatedResponse,
    attributes_requested: bool,
) -> Result<PayloadStatus, EngineError> {
    let payload_status = &response.payload_status;
    let status = match parse_status(method, payload_status)? {
        PayloadStatusV1Status::Valid => PayloadStatus::Valid,
        PayloadStatusV1Status::Syncing => PayloadStatus::Syncing,
        PayloadStatusV1Status::Invalid => return Err(invalid_status(method, payload_status)),
        other @ (PayloadStatusV1Status::Accepted | PayloadStatusV1Status::InvalidBlockHash) => {
            return Err(EngineError::protocol_violation(
                method,
                format!("{other} is not a valid forkchoice status"),
            ));
        }
    };

    match (&response.payload_id, attributes_requested, status) {
        (Some(payload_id), false, _) => Err(EngineError::protocol_violation(
            method,
            format!("payload id {payload_id} returned without payload attributes"),
        )),
        (None, true, PayloadStatus::Valid) => Err(EngineError::protocol_violation(
            method,
            "VALID head with payload attributes but no payload id",
        )),
        _ => Ok(status),
    }
}

/// Decode a `getPayload` result into its normalised form. V1 returns the bare payload.
pub fn parse_get_payload_response(
    version: EngineGetPayloadVersion,
    value: Value,
) -> Result<GetPayloadResponse, EngineError> {
    let method = version.method();
    let malformed =
        |err: serde_json::Error| EngineError::protocol_violation(method, err.to_string());
    match version {
        EngineGetPayloadVersion::V1 => serde_json::from_value::<ExecutionPayload>(value)
            .map(GetPayloadResponse::from_payload)
            .map_err(malformed),
        _ => serde_json::from_value(value).map_err(malformed),
    }
}

/// `expected` is the build the payload id was issued for. Without it only the shape of the
/// response is checked.
pub fn validate_get_payload_response(
    method: &'static str,
    response: &GetPayloadResponse,
    fork: ForkVersion,
    expected: Option<&BuildJobContext>,
) -> Result<(), EngineError> {
    let violation = |reason: String| Err(EngineError::protocol_violation(method, reason));
    let payload = &response.execution_payload;

    if let Err(err) = payload.check_fields(fork) {
        return violation(err.to_string());
    }
    if response.blobs_bundle.is_some() != fork.blobs_enabled() {
        return violation(format!(
            "blobsBundle presence does not match {fork}: {}",
            response.blobs_bundle.is_some()
        ));
    }
    if response.execution_requests.is_some() != fork.execution_requests_enabled() {
        return violation(format!(
            "executionRequests presence does not match {fork}: {}",
            response.execution_requests.is_some()
        ));
    }

    if let Some(expected) = expected {
        if payload.parent_hash != expected.head_block_hash {
            return violation(format!(
                "payload builds on {}, requested head was {}",
                payload.parent_hash, expected.head_block_hash
            ));
        }
        if payload.timestamp != expected.timestamp {
            return violation(format!(
                "payload timestamp {} does not match requested {}",
                payload.timestamp, expected.timestamp
            ));
        }
        if payload.prev_randao != expected.prev_randao {
            return violation("payload prevRandao does not match the attributes".to_string());
        }
        if payload.fee_recipient != expected.suggested_fee_recipient {
            return violation(format!(
                "payload fee recipient {} does not match requested {}",
                payload.fee_recipient, expected.suggested_fee_recipient
            ));
        }
        if let Some(withdrawals) = &expected.withdrawals
            && payload.withdrawals.as_ref() != Some(withdrawals)
        {
            return violation("payload withdrawals do not match the attributes".to_string());
        }
    }

    if let Some(bundle) = &response.blobs_bundle {
        let blob_count = match payload.blob_count() {
            Ok(blob_count) => blob_count,
            Err(err) => return violation(err.to_string()),
        };
        if bundle.commitments.len() != blob_count {
            return violation(format!(
                "blobs bundle has {} commitments for {blob_count} blobs",
                bundle.commitments.len()
            ));
        }
        if bundle.proofs.len() != blob_count || bundle.blobs.len() != blob_count {
            return violation(format!(
                "blobs bundle has {} proofs and {} blobs for {blob_count} commitments",
                bundle.proofs.len(),
                bundle.blobs.len()
            ));
        }
    }

    Ok(())
}
