use alloy_primitives::aliases::B32;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    fork_schedule::{ForkSchedule, ForkScheduleError},
    forks::{Fork, ForkVersion},
};

pub const SECONDS_PER_SLOT: u64 = 12;
pub const SLOTS_PER_EPOCH: u64 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Holesky,
    Sepolia,
    Hoodi,
    Dev,
    Custom,
}

#[derive(Debug, Error)]
pub enum ChainSpecError {
    #[error("Failed to parse chain config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid fork schedule: {0}")]
    ForkSchedule(#[from] ForkScheduleError),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// The slice of chain configuration the engine layer needs: the slot clock and the fork
/// schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainSpec {
    pub network: Network,
    pub genesis_time: u64,
    pub seconds_per_slot: u64,
    pub slots_per_epoch: u64,
    pub fork_schedule: ForkSchedule,
}

impl ChainSpec {
    pub fn new(
        network: Network,
        genesis_time: u64,
        seconds_per_slot: u64,
        slots_per_epoch: u64,
        fork_schedule: ForkSchedule,
    ) -> Result<Self, ChainSpecError> {
        if seconds_per_slot == 0 {
            return Err(ChainSpecError::Zero("SECONDS_PER_SLOT"));
        }
        if slots_per_epoch == 0 {
            return Err(ChainSpecError::Zero("SLOTS_PER_EPOCH"));
        }
        Ok(Self {
            network,
            genesis_time,
            seconds_per_slot,
            slots_per_epoch,
            fork_schedule,
        })
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ChainSpecError> {
        serde_yaml::from_str::<ChainConfig>(contents)?.try_into()
    }

    pub fn compute_epoch_at_slot(&self, slot: u64) -> u64 {
        slot / self.slots_per_epoch
    }

    /// Timestamps before genesis are clamped to slot 0.
    pub fn slot_at_timestamp(&self, timestamp: u64) -> u64 {
        timestamp.saturating_sub(self.genesis_time) / self.seconds_per_slot
    }

    pub fn timestamp_at_slot(&self, slot: u64) -> u64 {
        self.genesis_time
            .saturating_add(slot.saturating_mul(self.seconds_per_slot))
    }

    pub fn fork_version_at_epoch(&self, epoch: u64) -> ForkVersion {
        self.fork_schedule.fork_version_at_epoch(epoch)
    }

    pub fn fork_version_at_slot(&self, slot: u64) -> ForkVersion {
        self.fork_version_at_epoch(self.compute_epoch_at_slot(slot))
    }

    /// Version an execution payload by its own timestamp rather than by the wall clock, so a
    /// late arriving block from before a fork boundary keeps its original wire shape.
    pub fn fork_version_at_timestamp(&self, timestamp: u64) -> ForkVersion {
        self.fork_version_at_slot(self.slot_at_timestamp(timestamp))
    }

    pub fn fork_activation_timestamp(&self, fork_version: ForkVersion) -> Option<u64> {
        let fork = self.fork_schedule.fork(fork_version);
        fork.is_scheduled().then(|| {
            self.timestamp_at_slot(fork.epoch.saturating_mul(self.slots_per_epoch))
        })
    }
}

/// On disk representation, using the key names of the consensus `config.yaml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct ChainConfig {
    genesis_time: u64,
    #[serde(default = "default_seconds_per_slot")]
    seconds_per_slot: u64,
    #[serde(default = "default_slots_per_epoch")]
    slots_per_epoch: u64,
    genesis_fork_version: B32,
    altair_fork_version: B32,
    altair_fork_epoch: u64,
    bellatrix_fork_version: B32,
    bellatrix_fork_epoch: u64,
    capella_fork_version: B32,
    capella_fork_epoch: u64,
    deneb_fork_version: B32,
    deneb_fork_epoch: u64,
    electra_fork_version: B32,
    #[serde(default = "unscheduled_epoch")]
    electra_fork_epoch: u64,
}

fn default_seconds_per_slot() -> u64 {
    SECONDS_PER_SLOT
}

fn default_slots_per_epoch() -> u64 {
    SLOTS_PER_EPOCH
}

fn unscheduled_epoch() -> u64 {
    Fork::UNSCHEDULED_EPOCH
}

impl TryFrom<ChainConfig> for ChainSpec {
    type Error = ChainSpecError;

    fn try_from(config: ChainConfig) -> Result<Self, Self::Error> {
        let versions = [
            (config.genesis_fork_version, 0),
            (config.altair_fork_version, config.altair_fork_epoch),
            (config.bellatrix_fork_version, config.bellatrix_fork_epoch),
            (config.capella_fork_version, config.capella_fork_epoch),
            (config.deneb_fork_version, config.deneb_fork_epoch),
            (config.electra_fork_version, config.electra_fork_epoch),
        ];
        let forks = std::array::from_fn(|index| {
            let (current_version, epoch) = versions[index];
            let previous_version = index
                .checked_sub(1)
                .map_or(current_version, |previous| versions[previous].0);
            Fork {
                previous_version,
                current_version,
                epoch,
            }
        });

        ChainSpec::new(
            Network::Custom,
            config.genesis_time,
            config.seconds_per_slot,
            config.slots_per_epoch,
            ForkSchedule::try_new(forks)?,
        )
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::fork_schedule::MAINNET_FORK_SCHEDULE;

    const MAINNET_GENESIS_TIME: u64 = 1_606_824_023;

    fn mainnet() -> ChainSpec {
        ChainSpec::new(
            Network::Mainnet,
            MAINNET_GENESIS_TIME,
            SECONDS_PER_SLOT,
            SLOTS_PER_EPOCH,
            MAINNET_FORK_SCHEDULE,
        )
        .expect("mainnet spec should be valid")
    }

    #[rstest]
    #[case(0, ForkVersion::Phase0)]
    #[case(269_568 * 32 - 1, ForkVersion::Capella)]
    #[case(269_568 * 32, ForkVersion::Deneb)]
    #[case(364_032 * 32, ForkVersion::Electra)]
    fn test_fork_version_at_slot(#[case] slot: u64, #[case] expected: ForkVersion) {
        assert_eq!(mainnet().fork_version_at_slot(slot), expected);
    }

    #[test]
    fn test_fork_version_at_timestamp_uses_boundary() {
        let spec = mainnet();
        let deneb = spec
            .fork_activation_timestamp(ForkVersion::Deneb)
            .expect("deneb is scheduled");

        // Cancun activated on mainnet at 1710338135.
        assert_eq!(deneb, 1_710_338_135);
        assert_eq!(spec.fork_version_at_timestamp(deneb - 1), ForkVersion::Capella);
        assert_eq!(spec.fork_version_at_timestamp(deneb), ForkVersion::Deneb);
    }

    #[test]
    fn test_timestamp_before_genesis_maps_to_genesis_fork() {
        assert_eq!(mainnet().fork_version_at_timestamp(0), ForkVersion::Phase0);
    }

    #[test]
    fn test_rejects_zero_slot_duration() {
        let result = ChainSpec::new(Network::Dev, 0, 0, SLOTS_PER_EPOCH, MAINNET_FORK_SCHEDULE);
        assert!(matches!(result, Err(ChainSpecError::Zero("SECONDS_PER_SLOT"))));
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
GENESIS_TIME: 1000
SECONDS_PER_SLOT: 6
SLOTS_PER_EPOCH: 8
GENESIS_FORK_VERSION: "0x10000000"
ALTAIR_FORK_VERSION: "0x20000000"
ALTAIR_FORK_EPOCH: 0
BELLATRIX_FORK_VERSION: "0x30000000"
BELLATRIX_FORK_EPOCH: 0
CAPELLA_FORK_VERSION: "0x40000000"
CAPELLA_FORK_EPOCH: 1
DENEB_FORK_VERSION: "0x50000000"
DENEB_FORK_EPOCH: 2
ELECTRA_FORK_VERSION: "0x60000000"
"#;
        let spec = ChainSpec::from_yaml_str(yaml).expect("yaml should parse");

        assert_eq!(spec.network, Network::Custom);
        assert_eq!(spec.fork_version_at_slot(7), ForkVersion::Bellatrix);
        assert_eq!(spec.fork_version_at_slot(8), ForkVersion::Capella);
        assert_eq!(spec.fork_version_at_timestamp(1000 + 16 * 6), ForkVersion::Deneb);
        assert_eq!(spec.fork_version_at_slot(u64::MAX), ForkVersion::Deneb);
        assert_eq!(
            spec.fork_schedule.fork(ForkVersion::Capella).previous_version,
            alloy_primitives::fixed_bytes!("0x30000000")
        );
    }

    #[test]
    fn test_from_yaml_rejects_decreasing_epochs() {
        let yaml = r#"
GENESIS_TIME: 1000
GENESIS_FORK_VERSION: "0x10000000"
ALTAIR_FORK_VERSION: "0x20000000"
ALTAIR_FORK_EPOCH: 0
BELLATRIX_FORK_VERSION: "0x30000000"
BELLATRIX_FORK_EPOCH: 10
CAPELLA_FORK_VERSION: "0x40000000"
CAPELLA_FORK_EPOCH: 5
DENEB_FORK_VERSION: "0x50000000"
DENEB_FORK_EPOCH: 20
ELECTRA_FORK_VERSION: "0x60000000"
"#;
        assert!(matches!(
            ChainSpec::from_yaml_str(yaml),
            Err(ChainSpecError::ForkSchedule(
                ForkScheduleError::NonMonotonic { .. }
            ))
        ));
    }
}
