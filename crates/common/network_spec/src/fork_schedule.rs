use std::slice::Iter;

use alloy_primitives::fixed_bytes;
use thiserror::Error;

use crate::forks::{Fork, ForkVersion};

macro_rules! fork_array {
    // Entry
    (
        ( $first_ver:literal , $first_epoch:expr )
        $( , ( $rest_ver:literal , $rest_epoch:expr ) )* $(,)?
    ) => {
        fork_array!(@internal (
            Fork {
                previous_version: fixed_bytes!($first_ver),
                current_version:  fixed_bytes!($first_ver),
                epoch:            $first_epoch,
            }
        ), $first_ver $( , $rest_ver , $rest_epoch )* )
    };

    // Recursive case
    (@internal (
        $( $forks:expr ),*
    ), $prev_ver:literal , $curr_ver:literal , $curr_epoch:expr
       $( , $tail_ver:literal , $tail_epoch:expr )* ) => {
        fork_array!(@internal (
            $( $forks ),* ,
            Fork {
                previous_version: fixed_bytes!($prev_ver),
                current_version:  fixed_bytes!($curr_ver),
                epoch:            $curr_epoch,
            }
        ), $curr_ver $( , $tail_ver , $tail_epoch )* )
    };

    // Final case
    (@internal (
        $( $forks:expr ),*
    ), $last_ver:literal ) => {
        [ $( $forks ),* ]
    };
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ForkScheduleError {
    #[error("genesis fork must activate at epoch 0, found epoch {0}")]
    GenesisNotAtZero(u64),

    #[error("{fork} activates at epoch {epoch}, before {previous} at epoch {previous_epoch}")]
    NonMonotonic {
        fork: ForkVersion,
        epoch: u64,
        previous: ForkVersion,
        previous_epoch: u64,
    },
}

/// Activation epochs for every [ForkVersion], indexed by [ForkVersion::index].
///
/// Activation epochs never decrease in fork order, so the fork returned for an epoch is a
/// non-decreasing function of that epoch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForkSchedule([Fork; ForkSchedule::TOTAL]);

impl ForkSchedule {
    pub const TOTAL: usize = ForkVersion::ALL.len();

    /// Used for the built in presets only, user supplied schedules go through
    /// [ForkSchedule::try_new].
    const fn new(forks: [Fork; ForkSchedule::TOTAL]) -> Self {
        Self(forks)
    }

    pub fn try_new(forks: [Fork; ForkSchedule::TOTAL]) -> Result<Self, ForkScheduleError> {
        if forks[0].epoch != 0 {
            return Err(ForkScheduleError::GenesisNotAtZero(forks[0].epoch));
        }

        for (index, window) in forks.windows(2).enumerate() {
            if window[1].epoch < window[0].epoch {
                return Err(ForkScheduleError::NonMonotonic {
                    fork: ForkVersion::ALL[index + 1],
                    epoch: window[1].epoch,
                    previous: ForkVersion::ALL[index],
                    previous_epoch: window[0].epoch,
                });
            }
        }

        Ok(Self(forks))
    }

    pub fn iter(&self) -> Iter<'_, Fork> {
        self.0.iter()
    }

    pub fn scheduled(&self) -> impl Iterator<Item = (ForkVersion, &Fork)> {
        ForkVersion::ALL
            .into_iter()
            .zip(self.iter())
            .filter(|(_, fork)| fork.is_scheduled())
    }

    pub fn fork(&self, fork_version: ForkVersion) -> &Fork {
        &self.0[fork_version.index()]
    }

    pub fn activation_epoch(&self, fork_version: ForkVersion) -> u64 {
        self.fork(fork_version).epoch
    }

    /// Return the latest fork whose activation epoch is at or before ``epoch``.
    pub fn fork_version_at_epoch(&self, epoch: u64) -> ForkVersion {
        ForkVersion::ALL
            .into_iter()
            .zip(self.iter())
            .rev()
            .find(|(_, fork)| fork.is_scheduled() && fork.epoch <= epoch)
            .map(|(fork_version, _)| fork_version)
            .unwrap_or(ForkVersion::Phase0)
    }
}

pub const MAINNET_FORK_SCHEDULE: ForkSchedule = ForkSchedule::new(fork_array!(
    ("0x00000000", 0),       // Phase0
    ("0x01000000", 74_240),  // Altair
    ("0x02000000", 144_896), // Bellatrix
    ("0x03000000", 194_048), // Capella
    ("0x04000000", 269_568), // Deneb
    ("0x05000000", 364_032), // Electra
));

pub const HOLESKY_FORK_SCHEDULE: ForkSchedule = ForkSchedule::new(fork_array!(
    ("0x01017000", 0),       // Phase0
    ("0x02017000", 0),       // Altair
    ("0x03017000", 0),       // Bellatrix
    ("0x04017000", 256),     // Capella
    ("0x05017000", 29_696),  // Deneb
    ("0x06017000", 115_968), // Electra
));

pub const SEPOLIA_FORK_SCHEDULE: ForkSchedule = ForkSchedule::new(fork_array!(
    ("0x90000069", 0),       // Phase0
    ("0x90000070", 50),      // Altair
    ("0x90000071", 100),     // Bellatrix
    ("0x90000072", 56_832),  // Capella
    ("0x90000073", 132_608), // Deneb
    ("0x90000074", 222_464), // Electra
));

pub const HOODI_FORK_SCHEDULE: ForkSchedule = ForkSchedule::new(fork_array!(
    ("0x10000910", 0),     // Phase0
    ("0x20000910", 0),     // Altair
    ("0x30000910", 0),     // Bellatrix
    ("0x40000910", 0),     // Capella
    ("0x50000910", 0),     // Deneb
    ("0x60000910", 2_048), // Electra
));

pub const DEV_FORK_SCHEDULE: ForkSchedule = ForkSchedule::new(fork_array!(
    ("0x00000000", 0), // Phase0
    ("0x01000000", 0), // Altair
    ("0x02000000", 0), // Bellatrix
    ("0x03000000", 0), // Capella
    ("0x04000000", 0), // Deneb
    ("0x05000000", 0), // Electra
));

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_fork_array() {
        let expected = [
            Fork {
                previous_version: fixed_bytes!("0x90000069"),
                current_version: fixed_bytes!("0x90000069"),
                epoch: 0,
            },
            Fork {
                previous_version: fixed_bytes!("0x90000069"),
                current_version: fixed_bytes!("0x90000070"),
                epoch: 50,
            },
            Fork {
                previous_version: fixed_bytes!("0x90000070"),
                current_version: fixed_bytes!("0x90000071"),
                epoch: 100,
            },
        ];

        assert_eq!(
            fork_array!(("0x90000069", 0), ("0x90000070", 50), ("0x90000071", 100)),
            expected
        );
    }

    #[rstest]
    #[case(MAINNET_FORK_SCHEDULE)]
    #[case(HOLESKY_FORK_SCHEDULE)]
    #[case(SEPOLIA_FORK_SCHEDULE)]
    #[case(HOODI_FORK_SCHEDULE)]
    #[case(DEV_FORK_SCHEDULE)]
    fn test_presets_are_monotonic(#[case] schedule: ForkSchedule) {
        assert_eq!(ForkSchedule::try_new(schedule.0), Ok(schedule));
    }

    #[rstest]
    #[case(0, ForkVersion::Phase0)]
    #[case(74_239, ForkVersion::Phase0)]
    #[case(74_240, ForkVersion::Altair)]
    #[case(144_896, ForkVersion::Bellatrix)]
    #[case(194_047, ForkVersion::Bellatrix)]
    #[case(194_048, ForkVersion::Capella)]
    #[case(269_568, ForkVersion::Deneb)]
    #[case(364_031, ForkVersion::Deneb)]
    #[case(364_032, ForkVersion::Electra)]
    #[case(u64::MAX - 1, ForkVersion::Electra)]
    fn test_mainnet_fork_version_at_epoch(#[case] epoch: u64, #[case] expected: ForkVersion) {
        assert_eq!(MAINNET_FORK_SCHEDULE.fork_version_at_epoch(epoch), expected);
    }

    #[test]
    fn test_unscheduled_fork_is_never_returned() {
        let mut forks = MAINNET_FORK_SCHEDULE.0;
        forks[ForkVersion::Electra.index()].epoch = Fork::UNSCHEDULED_EPOCH;
        let schedule = ForkSchedule::try_new(forks).expect("schedule should be valid");

        assert_eq!(schedule.fork_version_at_epoch(u64::MAX), ForkVersion::Deneb);
        assert_eq!(schedule.scheduled().count(), ForkSchedule::TOTAL - 1);
    }

    #[test]
    fn test_rejects_non_monotonic_schedule() {
        let mut forks = MAINNET_FORK_SCHEDULE.0;
        forks[ForkVersion::Deneb.index()].epoch = 100;

        assert_eq!(
            ForkSchedule::try_new(forks),
            Err(ForkScheduleError::NonMonotonic {
                fork: ForkVersion::Deneb,
                epoch: 100,
                previous: ForkVersion::Capella,
                previous_epoch: 194_048,
            })
        );
    }

    #[test]
    fn test_rejects_late_genesis() {
        let mut forks = DEV_FORK_SCHEDULE.0;
        forks[0].epoch = 1;

        assert_eq!(
            ForkSchedule::try_new(forks),
            Err(ForkScheduleError::GenesisNotAtZero(1))
        );
    }

    #[test]
    fn test_fork_version_is_monotonic_over_epochs() {
        let mut previous = ForkVersion::Phase0;
        for epoch in (0..400_000).step_by(128) {
            let current = MAINNET_FORK_SCHEDULE.fork_version_at_epoch(epoch);
            assert!(current >= previous, "fork regressed at epoch {epoch}");
            previous = current;
        }
    }
}
