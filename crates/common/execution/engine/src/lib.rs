pub mod auth;
pub mod config;
pub mod engine;
pub mod errors;
pub mod events;
pub mod head;
pub mod payload_cache;
pub mod request;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod transport;
pub mod validation;
pub mod versions;

pub use engine::ExecutionEngine;
