pub mod execution_payload;
pub mod forkchoice;
pub mod get_payload;
pub mod payload_attributes;
pub mod payload_status;
pub mod transaction;
pub mod utils;
pub mod withdrawal;

use alloy_primitives::B64;

/// Identifier of a payload build job, assigned by the execution client.
pub type PayloadId = B64;
