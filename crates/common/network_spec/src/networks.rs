use std::sync::{Arc, LazyLock};

use crate::{
    chain_spec::{ChainSpec, Network, SECONDS_PER_SLOT, SLOTS_PER_EPOCH},
    fork_schedule::{
        DEV_FORK_SCHEDULE, ForkSchedule, HOLESKY_FORK_SCHEDULE, HOODI_FORK_SCHEDULE,
        MAINNET_FORK_SCHEDULE, SEPOLIA_FORK_SCHEDULE,
    },
};

fn preset(network: Network, genesis_time: u64, fork_schedule: ForkSchedule) -> Arc<ChainSpec> {
    Arc::new(ChainSpec {
        network,
        genesis_time,
        seconds_per_slot: SECONDS_PER_SLOT,
        slots_per_epoch: SLOTS_PER_EPOCH,
        fork_schedule,
    })
}

pub static MAINNET: LazyLock<Arc<ChainSpec>> =
    LazyLock::new(|| preset(Network::Mainnet, 1_606_824_023, MAINNET_FORK_SCHEDULE));

pub static HOLESKY: LazyLock<Arc<ChainSpec>> =
    LazyLock::new(|| preset(Network::Holesky, 1_695_902_400, HOLESKY_FORK_SCHEDULE));

pub static SEPOLIA: LazyLock<Arc<ChainSpec>> =
    LazyLock::new(|| preset(Network::Sepolia, 1_655_733_600, SEPOLIA_FORK_SCHEDULE));

pub static HOODI: LazyLock<Arc<ChainSpec>> =
    LazyLock::new(|| preset(Network::Hoodi, 1_742_213_400, HOODI_FORK_SCHEDULE));

pub static DEV: LazyLock<Arc<ChainSpec>> =
    LazyLock::new(|| preset(Network::Dev, 0, DEV_FORK_SCHEDULE));

#[cfg(test)]
mod tests {
    use crate::forks::ForkVersion;

    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(MAINNET.network, Network::Mainnet);
        assert_eq!(
            SEPOLIA.fork_version_at_slot(132_608 * SLOTS_PER_EPOCH),
            ForkVersion::Deneb
        );
        assert_eq!(HOODI.fork_version_at_slot(0), ForkVersion::Deneb);
        assert_eq!(DEV.fork_version_at_timestamp(0), ForkVersion::Electra);
    }
}
