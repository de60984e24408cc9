use std::fmt;

use alloy_primitives::aliases::B32;
use serde::{Deserialize, Serialize};

/// Protocol revisions of the beacon chain, in activation order.
///
/// The derived ordering follows declaration order, so `a < b` means `a` activates before `b`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum ForkVersion {
    #[default]
    Phase0,
    Altair,
    Bellatrix,
    Capella,
    Deneb,
    Electra,
}

impl ForkVersion {
    pub const ALL: [ForkVersion; 6] = [
        ForkVersion::Phase0,
        ForkVersion::Altair,
        ForkVersion::Bellatrix,
        ForkVersion::Capella,
        ForkVersion::Deneb,
        ForkVersion::Electra,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<ForkVersion> {
        Self::ALL.get(index).copied()
    }

    pub fn previous(self) -> Option<ForkVersion> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }

    /// Blocks carry an execution payload from Bellatrix onwards.
    pub fn execution_enabled(self) -> bool {
        self >= ForkVersion::Bellatrix
    }

    pub fn withdrawals_enabled(self) -> bool {
        self >= ForkVersion::Capella
    }

    /// Deneb introduces both blob transactions and the parent beacon block root.
    pub fn blobs_enabled(self) -> bool {
        self >= ForkVersion::Deneb
    }

    pub fn parent_beacon_block_root_enabled(self) -> bool {
        self >= ForkVersion::Deneb
    }

    pub fn execution_requests_enabled(self) -> bool {
        self >= ForkVersion::Electra
    }

    pub fn name(self) -> &'static str {
        match self {
            ForkVersion::Phase0 => "phase0",
            ForkVersion::Altair => "altair",
            ForkVersion::Bellatrix => "bellatrix",
            ForkVersion::Capella => "capella",
            ForkVersion::Deneb => "deneb",
            ForkVersion::Electra => "electra",
        }
    }
}

impl fmt::Display for ForkVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub struct Fork {
    pub previous_version: B32,
    pub current_version: B32,
    pub epoch: u64,
}

impl Fork {
    pub const UNSCHEDULED_EPOCH: u64 = u64::MAX;

    pub fn is_scheduled(&self) -> bool {
        self.epoch != Self::UNSCHEDULED_EPOCH
    }
}
