//! Validating constructors for the three engine calls.
//!
//! Builders perform no I/O. Every structural check runs here so a malformed request never
//! consumes a retry or reaches the execution client.

pub mod forkchoice_updated;
pub mod get_payload;
pub mod new_payload;

pub use forkchoice_updated::ForkchoiceUpdateRequest;
pub use get_payload::GetPayloadRequest;
pub use new_payload::{NewPayloadRequest, verify_versioned_hashes};
