pub mod helpers;

pub use helpers::{inc_int_counter_vec, observe_histogram_vec, set_int_gauge_vec};
use helpers::{create_histogram_vec, create_int_counter_vec, create_int_gauge_vec};
use prometheus_exporter::prometheus::{HistogramVec, IntCounterVec, IntGaugeVec};

lazy_static::lazy_static! {
    pub static ref NODE_INFO: IntGaugeVec = create_int_gauge_vec(
        "ream_engine_node_info",
        "Static information about the running client",
        &["name", "version"]
    );

    pub static ref ENGINE_REQUESTS_TOTAL: IntCounterVec = create_int_counter_vec(
        "ream_engine_requests_total",
        "Engine API calls by method and outcome",
        &["method", "outcome"]
    );

    pub static ref ENGINE_RETRIES_TOTAL: IntCounterVec = create_int_counter_vec(
        "ream_engine_retries_total",
        "Transient Engine API failures that were retried",
        &["method"]
    );

    pub static ref ENGINE_REQUEST_TIME: HistogramVec = create_histogram_vec(
        "ream_engine_request_time",
        "Duration of Engine API calls including retries",
        &["method"]
    );

    pub static ref PAYLOAD_CACHE_TOTAL: IntCounterVec = create_int_counter_vec(
        "ream_engine_payload_cache_total",
        "Payload cache lookups by result",
        &["result"]
    );

    pub static ref ENGINE_HEAD_SLOT: IntGaugeVec = create_int_gauge_vec(
        "ream_engine_head_slot",
        "Slot of the head last accepted by the execution client",
        &[]
    );

    pub static ref HEAD_UPDATES_TOTAL: IntCounterVec = create_int_counter_vec(
        "ream_engine_head_updates_total",
        "Forkchoice updates by result",
        &["result"]
    );

    pub static ref ENGINE_STATE: IntGaugeVec = create_int_gauge_vec(
        "ream_engine_state",
        "Set to 1 for the current execution client state",
        &["state"]
    );
}
