use ream_execution_rpc_types::{forkchoice::ForkchoiceState, payload_attributes::PayloadAttributes};
use ream_network_spec::forks::ForkVersion;
use serde_json::{Value, json};

use crate::{errors::ValidationError, versions::EngineForkchoiceVersion};

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ForkchoiceUpdateRequest {
    pub fork: ForkVersion,
    pub version: EngineForkchoiceVersion,
    pub forkchoice_state: ForkchoiceState,
    pub payload_attributes: Option<PayloadAttributes>,
}

impl ForkchoiceUpdateRequest {
    /// Without attributes this is a pure head update. With attributes it also starts a payload
    /// build, and the attributes variant must be the one `fork` expects.
    pub fn build(
        forkchoice_state: ForkchoiceState,
        payload_attributes: Option<PayloadAttributes>,
        fork: ForkVersion,
    ) -> Result<Self, ValidationError> {
        let version = EngineForkchoiceVersion::try_from(fork)?;
        if let Some(payload_attributes) = &payload_attributes {
            payload_attributes.validate_for(fork)?;
        }

        Ok(Self {
            fork,
            version,
            forkchoice_state,
            payload_attributes,
        })
    }

    pub fn method(&self) -> &'static str {
        self.version.method()
    }

    pub fn params(&self) -> Vec<Value> {
        vec![
            json!(self.forkchoice_state),
            self.payload_attributes
                .as_ref()
                .map_or(Value::Null, PayloadAttributes::to_json_value),
        ]
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{Address, B256};
    use ream_execution_rpc_types::payload_attributes::{
        PayloadAttributesError, PayloadAttributesVersion,
    };

    use super::*;

    fn attributes_with_root() -> PayloadAttributes {
        PayloadAttributes::new(
            100,
            B256::repeat_byte(1),
            Address::repeat_byte(2),
            Some(vec![]),
            Some(B256::repeat_byte(3)),
        )
    }

    #[test]
    fn test_head_update_without_attributes() {
        let request = ForkchoiceUpdateRequest::build(
            ForkchoiceState::default(),
            None,
            ForkVersion::Bellatrix,
        )
        .expect("pure head update");

        assert_eq!(request.method(), "engine_forkchoiceUpdatedV1");
        assert_eq!(request.params()[1], Value::Null);
    }

    #[test]
    fn test_parent_beacon_block_root_before_deneb() {
        let result = ForkchoiceUpdateRequest::build(
            ForkchoiceState::default(),
            Some(attributes_with_root()),
            ForkVersion::Capella,
        );
        assert_eq!(
            result,
            Err(ValidationError::PayloadAttributes(
                PayloadAttributesError::VersionMismatch {
                    fork: ForkVersion::Capella,
                    expected: PayloadAttributesVersion::V2,
                    found: PayloadAttributesVersion::V3,
                }
            ))
        );

        let request = ForkchoiceUpdateRequest::build(
            ForkchoiceState::default(),
            Some(attributes_with_root()),
            ForkVersion::Deneb,
        )
        .expect("deneb accepts a parent beacon block root");
        assert_eq!(request.method(), "engine_forkchoiceUpdatedV3");
        assert_eq!(
            request.params()[1]["parentBeaconBlockRoot"],
            json!(B256::repeat_byte(3))
        );
    }

    #[test]
    fn test_electra_uses_v3() {
        let request = ForkchoiceUpdateRequest::build(
            ForkchoiceState::default(),
            Some(attributes_with_root()),
            ForkVersion::Electra,
        )
        .expect("electra request");
        assert_eq!(request.method(), "engine_forkchoiceUpdatedV3");
    }
}
