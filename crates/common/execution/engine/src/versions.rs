//! Engine API method selection per fork.
//!
//! | Fork      | newPayload | forkchoiceUpdated | getPayload |
//! |-----------|------------|-------------------|------------|
//! | Bellatrix | V1         | V1                | V1         |
//! | Capella   | V2         | V2                | V2         |
//! | Deneb     | V3         | V3                | V3         |
//! | Electra   | V4         | V3                | V4         |

use ream_network_spec::forks::ForkVersion;

use crate::errors::ValidationError;

pub const ETH_SYNCING: &str = "eth_syncing";
pub const ENGINE_EXCHANGE_CAPABILITIES: &str = "engine_exchangeCapabilities";

pub const ENGINE_NEW_PAYLOAD_V1: &str = "engine_newPayloadV1";
pub const ENGINE_NEW_PAYLOAD_V2: &str = "engine_newPayloadV2";
pub const ENGINE_NEW_PAYLOAD_V3: &str = "engine_newPayloadV3";
pub const ENGINE_NEW_PAYLOAD_V4: &str = "engine_newPayloadV4";

pub const ENGINE_FORKCHOICE_UPDATED_V1: &str = "engine_forkchoiceUpdatedV1";
pub const ENGINE_FORKCHOICE_UPDATED_V2: &str = "engine_forkchoiceUpdatedV2";
pub const ENGINE_FORKCHOICE_UPDATED_V3: &str = "engine_forkchoiceUpdatedV3";

pub const ENGINE_GET_PAYLOAD_V1: &str = "engine_getPayloadV1";
pub const ENGINE_GET_PAYLOAD_V2: &str = "engine_getPayloadV2";
pub const ENGINE_GET_PAYLOAD_V3: &str = "engine_getPayloadV3";
pub const ENGINE_GET_PAYLOAD_V4: &str = "engine_getPayloadV4";

/// Methods advertised through `engine_exchangeCapabilities`.
pub const ENGINE_CAPABILITIES: &[&str] = &[
    ENGINE_NEW_PAYLOAD_V1,
    ENGINE_NEW_PAYLOAD_V2,
    ENGINE_NEW_PAYLOAD_V3,
    ENGINE_NEW_PAYLOAD_V4,
    ENGINE_FORKCHOICE_UPDATED_V1,
    ENGINE_FORKCHOICE_UPDATED_V2,
    ENGINE_FORKCHOICE_UPDATED_V3,
    ENGINE_GET_PAYLOAD_V1,
    ENGINE_GET_PAYLOAD_V2,
    ENGINE_GET_PAYLOAD_V3,
    ENGINE_GET_PAYLOAD_V4,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineNewPayloadVersion {
    V1,
    V2,
    /// Adds versioned hashes and the parent beacon block root.
    V3,
    /// Adds execution requests.
    V4,
}

impl EngineNewPayloadVersion {
    pub fn method(self) -> &'static str {
        match self {
            Self::V1 => ENGINE_NEW_PAYLOAD_V1,
            Self::V2 => ENGINE_NEW_PAYLOAD_V2,
            Self::V3 => ENGINE_NEW_PAYLOAD_V3,
            Self::V4 => ENGINE_NEW_PAYLOAD_V4,
        }
    }
}

impl TryFrom<ForkVersion> for EngineNewPayloadVersion {
    type Error = ValidationError;

    fn try_from(fork: ForkVersion) -> Result<Self, Self::Error> {
        match fork {
            ForkVersion::Phase0 | ForkVersion::Altair => Err(ValidationError::PreMergeFork(fork)),
            ForkVersion::Bellatrix => Ok(Self::V1),
            ForkVersion::Capella => Ok(Self::V2),
            ForkVersion::Deneb => Ok(Self::V3),
            ForkVersion::Electra => Ok(Self::V4),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineForkchoiceVersion {
    V1,
    V2,
    V3,
}

impl EngineForkchoiceVersion {
    pub fn method(self) -> &'static str {
        match self {
            Self::V1 => ENGINE_FORKCHOICE_UPDATED_V1,
            Self::V2 => ENGINE_FORKCHOICE_UPDATED_V2,
            Self::V3 => ENGINE_FORKCHOICE_UPDATED_V3,
        }
    }
}

impl TryFrom<ForkVersion> for EngineForkchoiceVersion {
    type Error = ValidationError;

    fn try_from(fork: ForkVersion) -> Result<Self, Self::Error> {
        match fork {
            ForkVersion::Phase0 | ForkVersion::Altair => Err(ValidationError::PreMergeFork(fork)),
            ForkVersion::Bellatrix => Ok(Self::V1),
            ForkVersion::Capella => Ok(Self::V2),
            // Electra did not change the attributes shape.
            ForkVersion::Deneb | ForkVersion::Electra => Ok(Self::V3),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineGetPayloadVersion {
    /// Returns a bare payload.
    V1,
    /// Returns `{ executionPayload, blockValue }`.
    V2,
    /// Adds `blobsBundle` and `shouldOverrideBuilder`.
    V3,
    /// Adds `executionRequests`.
    V4,
}

impl EngineGetPayloadVersion {
    pub fn method(self) -> &'static str {
        match self {
            Self::V1 => ENGINE_GET_PAYLOAD_V1,
            Self::V2 => ENGINE_GET_PAYLOAD_V2,
            Self::V3 => ENGINE_GET_PAYLOAD_V3,
            Self::V4 => ENGINE_GET_PAYLOAD_V4,
        }
    }
}

impl TryFrom<ForkVersion> for EngineGetPayloadVersion {
    type Error = ValidationError;

    fn try_from(fork: ForkVersion) -> Result<Self, Self::Error> {
        match fork {
            ForkVersion::Phase0 | ForkVersion::Altair => Err(ValidationError::PreMergeFork(fork)),
            ForkVersion::Bellatrix => Ok(Self::V1),
            ForkVersion::Capella => Ok(Self::V2),
            ForkVersion::Deneb => Ok(Self::V3),
            ForkVersion::Electra => Ok(Self::V4),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(ForkVersion::Bellatrix, ENGINE_NEW_PAYLOAD_V1, ENGINE_FORKCHOICE_UPDATED_V1, ENGINE_GET_PAYLOAD_V1)]
    #[case(ForkVersion::Capella, ENGINE_NEW_PAYLOAD_V2, ENGINE_FORKCHOICE_UPDATED_V2, ENGINE_GET_PAYLOAD_V2)]
    #[case(ForkVersion::Deneb, ENGINE_NEW_PAYLOAD_V3, ENGINE_FORKCHOICE_UPDATED_V3, ENGINE_GET_PAYLOAD_V3)]
    #[case(ForkVersion::Electra, ENGINE_NEW_PAYLOAD_V4, ENGINE_FORKCHOICE_UPDATED_V3, ENGINE_GET_PAYLOAD_V4)]
    fn test_methods_per_fork(
        #[case] fork: ForkVersion,
        #[case] new_payload: &str,
        #[case] forkchoice_updated: &str,
        #[case] get_payload: &str,
    ) {
        let version = EngineNewPayloadVersion::try_from(fork).expect("post merge fork");
        assert_eq!(version.method(), new_payload);
        let version = EngineForkchoiceVersion::try_from(fork).expect("post merge fork");
        assert_eq!(version.method(), forkchoice_updated);
        let version = EngineGetPayloadVersion::try_from(fork).expect("post merge fork");
        assert_eq!(version.method(), get_payload);
    }

    #[test]
    fn test_pre_merge_has_no_engine_methods() {
        assert_eq!(
            EngineNewPayloadVersion::try_from(ForkVersion::Altair),
            Err(ValidationError::PreMergeFork(ForkVersion::Altair))
        );
        assert!(EngineForkchoiceVersion::try_from(ForkVersion::Phase0).is_err());
        assert!(EngineGetPayloadVersion::try_from(ForkVersion::Phase0).is_err());
    }
}
