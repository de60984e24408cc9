pub mod chain_spec;
pub mod cli;
pub mod fork_schedule;
pub mod forks;
pub mod networks;
