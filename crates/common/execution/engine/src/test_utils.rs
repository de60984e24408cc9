//! Scripted transport, recording event sink and fixtures for exercising the engine client
//! without an execution client.

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    time::Duration,
};

use alloy_primitives::{Address, B256, Bloom, Bytes, U64, U256, aliases::B32};
use async_trait::async_trait;
use parking_lot::Mutex;
use ream_execution_rpc_types::{
    execution_payload::ExecutionPayload,
    get_payload::{BlobsBundle, GetPayloadResponse},
    transaction::{AccessList, BlobTransaction, ToAddress},
};
use ream_network_spec::{
    chain_spec::{ChainSpec, Network},
    fork_schedule::ForkSchedule,
    forks::{Fork, ForkVersion},
};
use serde_json::{Value, json};

use crate::{
    events::{EngineEvent, EngineEventSink},
    payload_cache::BuildJobContext,
    transport::{EngineTransport, RpcCallError},
};

pub const SECONDS_PER_SLOT: u64 = 12;
pub const SLOTS_PER_EPOCH: u64 = 32;
pub const SECONDS_PER_EPOCH: u64 = SECONDS_PER_SLOT * SLOTS_PER_EPOCH;
pub const CAPELLA_EPOCH: u64 = 1;
pub const DENEB_EPOCH: u64 = 2;
pub const ELECTRA_EPOCH: u64 = 3;

/// Genesis at 0 with Bellatrix at genesis and one epoch between each later fork.
pub fn test_chain_spec() -> Arc<ChainSpec> {
    let epochs = [0, 0, 0, CAPELLA_EPOCH, DENEB_EPOCH, ELECTRA_EPOCH];
    let forks = std::array::from_fn(|index| Fork {
        previous_version: B32::from([index.saturating_sub(1) as u8, 0, 0, 0]),
        current_version: B32::from([index as u8, 0, 0, 0]),
        epoch: epochs[index],
    });
    let schedule = ForkSchedule::try_new(forks).expect("test schedule is monotonic");
    Arc::new(
        ChainSpec::new(Network::Dev, 0, SECONDS_PER_SLOT, SLOTS_PER_EPOCH, schedule)
            .expect("test chain spec is valid"),
    )
}

/// First timestamp of ``fork`` on [test_chain_spec].
pub fn fork_timestamp(fork: ForkVersion) -> u64 {
    let epoch = match fork {
        ForkVersion::Phase0 | ForkVersion::Altair | ForkVersion::Bellatrix => 0,
        ForkVersion::Capella => CAPELLA_EPOCH,
        ForkVersion::Deneb => DENEB_EPOCH,
        ForkVersion::Electra => ELECTRA_EPOCH,
    };
    epoch * SECONDS_PER_EPOCH
}

pub fn versioned_hash(index: u8) -> B256 {
    let mut hash = [0u8; 32];
    hash[0] = 0x01;
    hash[31] = index;
    B256::from(hash)
}

pub fn blob_transaction(blob_versioned_hashes: Vec<B256>) -> Bytes {
    BlobTransaction {
        chain_id: U256::from(1),
        nonce: U256::ZERO,
        max_priority_fee_per_gas: U256::from(1),
        max_fee_per_gas: U256::from(10),
        gas_limit: U256::from(21_000),
        to: ToAddress::Exists(Address::repeat_byte(0x42)),
        value: U256::ZERO,
        data: Bytes::new(),
        access_list: AccessList::default(),
        max_fee_per_blob_gas: U256::from(1),
        blob_versioned_hashes,
        y_parity: U64::ZERO,
        r: U256::from(1),
        s: U256::from(1),
    }
    .encode_typed()
}

/// Payload with exactly the optional fields ``fork`` requires and no transactions.
pub fn payload_for_fork(fork: ForkVersion, timestamp: u64) -> ExecutionPayload {
    ExecutionPayload {
        parent_hash: B256::repeat_byte(0x01),
        fee_recipient: Address::ZERO,
        state_root: B256::repeat_byte(0x02),
        receipts_root: B256::repeat_byte(0x03),
        logs_bloom: Bloom::ZERO,
        prev_randao: B256::ZERO,
        block_number: timestamp / SECONDS_PER_SLOT,
        gas_limit: 30_000_000,
        gas_used: 0,
        timestamp,
        extra_data: Bytes::new(),
        base_fee_per_gas: U256::from(7),
        block_hash: B256::left_padding_from(&timestamp.to_be_bytes()),
        transactions: vec![],
        withdrawals: fork.withdrawals_enabled().then(Vec::new),
        blob_gas_used: fork.blobs_enabled().then_some(0),
        excess_blob_gas: fork.blobs_enabled().then_some(0),
    }
}

/// A `getPayload` result that satisfies ``context``, in the wire shape of its fork.
pub fn get_payload_result(context: &BuildJobContext) -> Value {
    let mut payload = payload_for_fork(context.fork, context.timestamp);
    payload.parent_hash = context.head_block_hash;
    payload.prev_randao = context.prev_randao;
    payload.fee_recipient = context.suggested_fee_recipient;
    payload.withdrawals = context.withdrawals.clone();

    if context.fork == ForkVersion::Bellatrix {
        return json!(payload);
    }
    let response = GetPayloadResponse {
        execution_payload: payload,
        block_value: U256::from(1_000),
        blobs_bundle: context.fork.blobs_enabled().then(BlobsBundle::default),
        should_override_builder: context.fork.blobs_enabled().then_some(false),
        execution_requests: context.fork.execution_requests_enabled().then(Vec::new),
    };
    json!(response)
}

pub fn payload_status(status: &str, latest_valid_hash: Option<B256>) -> Value {
    json!({
        "status": status,
        "latestValidHash": latest_valid_hash,
        "validationError": null,
    })
}

pub fn forkchoice_result(status: &str, payload_id: Option<&str>) -> Value {
    json!({
        "payloadStatus": payload_status(status, None),
        "payloadId": payload_id,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: &'static str,
    pub params: Vec<Value>,
}

/// Answers each method from its own queue of scripted replies, in order.
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<HashMap<&'static str, VecDeque<Result<Value, RpcCallError>>>>,
    calls: Mutex<Vec<RecordedCall>>,
    delay: Option<Duration>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request waits `delay` before answering.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn push(&self, method: &'static str, reply: Result<Value, RpcCallError>) {
        self.replies
            .lock()
            .entry(method)
            .or_default()
            .push_back(reply);
    }

    pub fn push_ok(&self, method: &'static str, result: Value) {
        self.push(method, Ok(result));
    }

    pub fn push_err(&self, method: &'static str, error: RpcCallError) {
        self.push(method, Err(error));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.method == method)
            .count()
    }
}

#[async_trait]
impl EngineTransport for MockTransport {
    async fn request(
        &self,
        method: &'static str,
        params: Vec<Value>,
        _timeout: Duration,
    ) -> Result<Value, RpcCallError> {
        self.calls.lock().push(RecordedCall { method, params });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let reply = self
            .replies
            .lock()
            .get_mut(method)
            .and_then(VecDeque::pop_front);
        reply.unwrap_or_else(|| {
            Err(RpcCallError::Transport(format!(
                "no scripted reply for {method}"
            )))
        })
    }
}

#[derive(Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self, predicate: impl Fn(&EngineEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|event| predicate(event)).count()
    }

    pub fn retries(&self, method: &str) -> usize {
        self.count(|event| matches!(event, EngineEvent::Retried { method: m, .. } if *m == method))
    }
}

impl EngineEventSink for RecordingEventSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().push(event);
    }
}
