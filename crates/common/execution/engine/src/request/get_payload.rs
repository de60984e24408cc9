use ream_execution_rpc_types::PayloadId;
use ream_network_spec::forks::ForkVersion;
use serde_json::{Value, json};

use crate::{errors::ValidationError, versions::EngineGetPayloadVersion};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct GetPayloadRequest {
    pub payload_id: PayloadId,
    pub fork: ForkVersion,
    pub version: EngineGetPayloadVersion,
}

impl GetPayloadRequest {
    /// `issued_under` is the fork recorded when the execution client returned `payload_id`, if
    /// the caller knows it.
    pub fn build(
        payload_id: PayloadId,
        fork: ForkVersion,
        issued_under: Option<ForkVersion>,
    ) -> Result<Self, ValidationError> {
        let version = EngineGetPayloadVersion::try_from(fork)?;
        if let Some(issued) = issued_under
            && issued != fork
        {
            return Err(ValidationError::ForkVersionMismatch {
                payload_id,
                issued,
                requested: fork,
            });
        }

        Ok(Self {
            payload_id,
            fork,
            version,
        })
    }

    pub fn method(&self) -> &'static str {
        self.version.method()
    }

    pub fn params(&self) -> Vec<Value> {
        vec![json!(self.payload_id)]
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::b64;

    use super::*;

    #[test]
    fn test_fork_must_match_issuance() {
        let payload_id = b64!("0x0000000000000001");

        let request =
            GetPayloadRequest::build(payload_id, ForkVersion::Deneb, Some(ForkVersion::Deneb))
            .expect("same fork");
        assert_eq!(request.method(), "engine_getPayloadV3");
        assert_eq!(request.params(), vec![json!("0x0000000000000001")]);

        assert_eq!(
            GetPayloadRequest::build(payload_id, ForkVersion::Electra, Some(ForkVersion::Deneb)),
            Err(ValidationError::ForkVersionMismatch {
                payload_id,
                issued: ForkVersion::Deneb,
                requested: ForkVersion::Electra,
            })
        );
    }

    #[test]
    fn test_unknown_issuance() {
        let request =
            GetPayloadRequest::build(b64!("0x0000000000000002"), ForkVersion::Capella, None)
                .expect("issuance unknown");
        assert_eq!(request.method(), "engine_getPayloadV2");
    }
}
