use std::{fmt, str::FromStr};

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

/// `PayloadStatusV1` as returned by `engine_newPayload*` and `engine_forkchoiceUpdated*`.
///
/// `status` is kept as the raw wire string so that an unrecognised value can be reported as a
/// protocol violation instead of failing deserialization of the whole response.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadStatusV1 {
    pub status: String,
    #[serde(default)]
    pub latest_valid_hash: Option<B256>,
    #[serde(default)]
    pub validation_error: Option<String>,
}

impl PayloadStatusV1 {
    pub fn new(status: PayloadStatusV1Status, latest_valid_hash: Option<B256>) -> Self {
        Self {
            status: status.to_string(),
            latest_valid_hash,
            validation_error: None,
        }
    }

    pub fn status(&self) -> Result<PayloadStatusV1Status, UnknownPayloadStatus> {
        self.status.parse()
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum PayloadStatusV1Status {
    Valid,
    Invalid,
    Syncing,
    Accepted,
    InvalidBlockHash,
}

impl PayloadStatusV1Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadStatusV1Status::Valid => "VALID",
            PayloadStatusV1Status::Invalid => "INVALID",
            PayloadStatusV1Status::Syncing => "SYNCING",
            PayloadStatusV1Status::Accepted => "ACCEPTED",
            PayloadStatusV1Status::InvalidBlockHash => "INVALID_BLOCK_HASH",
        }
    }
}

impl fmt::Display for PayloadStatusV1Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown payload status {0:?}")]
pub struct UnknownPayloadStatus(pub String);

impl FromStr for PayloadStatusV1Status {
    type Err = UnknownPayloadStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VALID" => Ok(PayloadStatusV1Status::Valid),
            "INVALID" => Ok(PayloadStatusV1Status::Invalid),
            "SYNCING" => Ok(PayloadStatusV1Status::Syncing),
            "ACCEPTED" => Ok(PayloadStatusV1Status::Accepted),
            "INVALID_BLOCK_HASH" => Ok(PayloadStatusV1Status::InvalidBlockHash),
            other => Err(UnknownPayloadStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("VALID", PayloadStatusV1Status::Valid)]
    #[case("INVALID", PayloadStatusV1Status::Invalid)]
    #[case("SYNCING", PayloadStatusV1Status::Syncing)]
    #[case("ACCEPTED", PayloadStatusV1Status::Accepted)]
    #[case("INVALID_BLOCK_HASH", PayloadStatusV1Status::InvalidBlockHash)]
    fn test_status_round_trip(#[case] wire: &str, #[case] status: PayloadStatusV1Status) {
        assert_eq!(wire.parse::<PayloadStatusV1Status>(), Ok(status));
        assert_eq!(status.to_string(), wire);
    }

    #[test]
    fn test_unknown_status() {
        let status: PayloadStatusV1 =
            serde_json::from_str(r#"{"status":"MAYBE","latestValidHash":null}"#)
                .expect("shape is valid");
        assert_eq!(status.status(), Err(UnknownPayloadStatus("MAYBE".to_string())));
    }
}
