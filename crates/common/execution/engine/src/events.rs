use std::time::Duration;

use alloy_primitives::B256;
use ream_execution_rpc_types::PayloadId;
use ream_metrics::{
    ENGINE_HEAD_SLOT, ENGINE_REQUEST_TIME, ENGINE_REQUESTS_TOTAL, ENGINE_RETRIES_TOTAL,
    ENGINE_STATE, HEAD_UPDATES_TOTAL, PAYLOAD_CACHE_TOTAL, inc_int_counter_vec,
    observe_histogram_vec, set_int_gauge_vec,
};
use tracing::{debug, info, warn};

use crate::{engine::EngineState, transport::RpcCallError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    RequestIssued {
        method: &'static str,
    },
    Retried {
        method: &'static str,
        attempt: u32,
        delay: Duration,
        error: RpcCallError,
    },
    Succeeded {
        method: &'static str,
        attempts: u32,
        elapsed: Duration,
    },
    Failed {
        method: &'static str,
        attempts: u32,
        error: String,
    },
    CacheHit {
        payload_id: PayloadId,
    },
    CacheMiss {
        payload_id: PayloadId,
    },
    CacheExpired {
        payload_id: PayloadId,
    },
    HeadUpdated {
        slot: u64,
        head_block_hash: B256,
    },
    HeadRejected {
        slot: u64,
        head_slot: u64,
    },
    StateChanged {
        state: EngineState,
    },
}

/// Receives everything the engine client does that an operator may want to see.
pub trait EngineEventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

/// Logs events and records them in the prometheus registry.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EngineEventSink for TracingEventSink {
    fn emit(&self, event: EngineEvent) {
        match event {
            EngineEvent::RequestIssued { method } => {
                debug!(method, "Engine request issued");
            }
            EngineEvent::Retried {
                method,
                attempt,
                delay,
                error,
            } => {
                warn!(method, attempt, ?delay, "Retrying engine request: {error}");
                inc_int_counter_vec(&ENGINE_RETRIES_TOTAL, &[method]);
            }
            EngineEvent::Succeeded {
                method,
                attempts,
                elapsed,
            } => {
                debug!(method, attempts, ?elapsed, "Engine request succeeded");
                inc_int_counter_vec(&ENGINE_REQUESTS_TOTAL, &[method, "success"]);
                observe_histogram_vec(&ENGINE_REQUEST_TIME, elapsed.as_secs_f64(), &[method]);
            }
            EngineEvent::Failed {
                method,
                attempts,
                error,
            } => {
                warn!(method, attempts, "Engine request failed: {error}");
                inc_int_counter_vec(&ENGINE_REQUESTS_TOTAL, &[method, "failure"]);
            }
            EngineEvent::CacheHit { payload_id } => {
                debug!(%payload_id, "Payload served from cache");
                inc_int_counter_vec(&PAYLOAD_CACHE_TOTAL, &["hit"]);
            }
            EngineEvent::CacheMiss { payload_id } => {
                debug!(%payload_id, "Payload fetched from execution client");
                inc_int_counter_vec(&PAYLOAD_CACHE_TOTAL, &["miss"]);
            }
            EngineEvent::CacheExpired { payload_id } => {
                warn!(%payload_id, "Payload build expired");
                inc_int_counter_vec(&PAYLOAD_CACHE_TOTAL, &["expired"]);
            }
            EngineEvent::HeadUpdated {
                slot,
                head_block_hash,
            } => {
                info!(slot, %head_block_hash, "Execution head updated");
                set_int_gauge_vec(&ENGINE_HEAD_SLOT, slot as i64, &[]);
                inc_int_counter_vec(&HEAD_UPDATES_TOTAL, &["applied"]);
            }
            EngineEvent::HeadRejected { slot, head_slot } => {
                info!(slot, head_slot, "Ignoring forkchoice update older than the head");
                inc_int_counter_vec(&HEAD_UPDATES_TOTAL, &["stale"]);
            }
            EngineEvent::StateChanged { state } => {
                info!("Execution engine is {state}");
                for candidate in EngineState::ALL {
                    set_int_gauge_vec(
                        &ENGINE_STATE,
                        i64::from(candidate == state),
                        &[candidate.as_str()],
                    );
                }
            }
        }
    }
}
