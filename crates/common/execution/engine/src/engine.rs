use std::{
    fmt,
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use alloy_primitives::{B256, Bytes};
use backon::Retryable;
use parking_lot::{Mutex, RwLock};
use ream_execution_rpc_types::{
    PayloadId,
    execution_payload::ExecutionPayload,
    forkchoice::{ForkchoiceState, ForkchoiceUpdatedResponse},
    get_payload::GetPayloadResponse,
    payload_attributes::PayloadAttributes,
    payload_status::PayloadStatusV1,
};
use ream_network_spec::{chain_spec::ChainSpec, forks::ForkVersion};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::{
    task::JoinHandle,
    time::{Instant, timeout_at},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    auth::{JwtAuth, JwtSecret, JwtTokenProvider},
    config::{ExecutionEngineConfig, RetryConfig},
    errors::{EngineError, ValidationError},
    events::{EngineEvent, EngineEventSink, TracingEventSink},
    head::{ForkchoiceUpdateOutcome, HeadRecord, HeadTracker},
    payload_cache::{BuildJobContext, BuildJobState, PayloadCache},
    request::{ForkchoiceUpdateRequest, GetPayloadRequest, NewPayloadRequest},
    transport::{EngineTransport, HttpTransport, RpcCallError, UNKNOWN_PAYLOAD_CODE},
    validation::{
        PayloadStatus, parse_get_payload_response, validate_forkchoice_response,
        validate_get_payload_response, validate_new_payload_status,
    },
    versions::{ENGINE_CAPABILITIES, ENGINE_EXCHANGE_CAPABILITIES, ETH_SYNCING},
};

/// Last known condition of the execution client, as seen by [ExecutionEngine::upcheck] and
/// failed calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineState {
    Synced,
    Syncing,
    Offline,
    AuthFailed,
}

impl EngineState {
    pub const ALL: [EngineState; 4] = [
        EngineState::Synced,
        EngineState::Syncing,
        EngineState::Offline,
        EngineState::AuthFailed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineState::Synced => "synced",
            EngineState::Syncing => "syncing",
            EngineState::Offline => "offline",
            EngineState::AuthFailed => "auth_failed",
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client for the Engine API of a single execution client.
///
/// `new_payload` calls run concurrently with each other and with forkchoice updates. Forkchoice
/// updates are applied one at a time and never move the head to an older slot. Each payload id
/// is fetched from the execution client at most once while its build is live.
pub struct ExecutionEngine {
    chain_spec: Arc<ChainSpec>,
    transport: Arc<dyn EngineTransport>,
    events: Arc<dyn EngineEventSink>,
    token_provider: Option<Arc<JwtTokenProvider>>,
    request_timeout: Duration,
    retry: RetryConfig,
    token_refresh_interval: Duration,
    cache_prune_interval: Duration,
    payload_cache: PayloadCache,
    head: HeadTracker,
    state: RwLock<EngineState>,
    shutdown: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ExecutionEngine {
    pub fn new(
        config: &ExecutionEngineConfig,
        chain_spec: Arc<ChainSpec>,
        transport: Arc<dyn EngineTransport>,
        events: Arc<dyn EngineEventSink>,
    ) -> Self {
        Self {
            chain_spec,
            transport,
            events,
            token_provider: None,
            request_timeout: config.request_timeout,
            retry: config.retry,
            token_refresh_interval: config.token_refresh_interval,
            cache_prune_interval: config.cache_prune_interval,
            payload_cache: PayloadCache::new(config.payload_ttl),
            head: HeadTracker::new(),
            state: RwLock::new(EngineState::Offline),
            shutdown: CancellationToken::new(),
            tasks: Mutex::new(vec![]),
        }
    }

    /// Hand the token provider to the engine so [ExecutionEngine::start] keeps it refreshed.
    pub fn with_token_provider(mut self, token_provider: Arc<JwtTokenProvider>) -> Self {
        self.token_provider = Some(token_provider);
        self
    }

    /// HTTP transport authenticated with the secret at `config.jwt_secret_path`, reporting to
    /// the log and the metrics registry.
    pub fn from_config(
        config: &ExecutionEngineConfig,
        chain_spec: Arc<ChainSpec>,
    ) -> Result<Self, EngineError> {
        let secret = JwtSecret::from_file(&config.jwt_secret_path)?;
        let auth = JwtAuth::new(&secret, config.jwt_id.clone(), config.client_version.clone());
        let token_provider = Arc::new(JwtTokenProvider::new(auth, config.token_validity));
        let transport = HttpTransport::new(config.endpoint.clone(), token_provider.clone())?;
        info!("Execution engine endpoint: {}", transport.endpoint());

        Ok(Self::new(
            config,
            chain_spec,
            Arc::new(transport),
            Arc::new(TracingEventSink),
        )
        .with_token_provider(token_provider))
    }

    pub fn chain_spec(&self) -> &Arc<ChainSpec> {
        &self.chain_spec
    }

    /// Spawn the token refresher and the payload cache pruner.
    pub fn start(self: &Arc<Self>) {
        let mut tasks = self.tasks.lock();
        if let Some(token_provider) = &self.token_provider {
            tasks.push(tokio::spawn(
                token_provider
                    .clone()
                    .run_refresher(self.token_refresh_interval, self.shutdown.clone()),
            ));
        }

        let engine = Arc::downgrade(self);
        let shutdown = self.shutdown.clone();
        let prune_interval = self.cache_prune_interval;
        tasks.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(prune_interval);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => return,
                    _ = ticker.tick() => {
                        let Some(engine) = engine.upgrade() else {
                            return;
                        };
                        let pruned = engine.payload_cache.prune();
                        if pruned > 0 {
                            debug!(pruned, "Pruned payload build jobs");
                        }
                    }
                }
            }
        }));
        info!("Execution engine started");
    }

    pub async fn stop(&self) {
        self.shutdown.cancel();
        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(err) = task.await {
                warn!("Execution engine task ended abnormally: {err}");
            }
        }
        info!("Execution engine stopped");
    }

    pub fn engine_state(&self) -> EngineState {
        *self.state.read()
    }

    pub fn head(&self) -> Option<HeadRecord> {
        self.head.head()
    }

    /// Payload id of a live build started for `head_block_hash` with these attributes.
    pub fn payload_id_for(
        &self,
        head_block_hash: B256,
        attributes: &PayloadAttributes,
    ) -> Option<PayloadId> {
        let fork = self
            .chain_spec
            .fork_version_at_timestamp(attributes.timestamp());
        let forkchoice_state = ForkchoiceState {
            head_block_hash,
            ..Default::default()
        };
        self.payload_cache
            .payload_id_for(&BuildJobContext::new(fork, &forkchoice_state, attributes).key())
    }

    /// Validate a payload from a block and submit it, versioned by the payload's own timestamp.
    pub async fn notify_new_payload(
        &self,
        execution_payload: ExecutionPayload,
        versioned_hashes: Vec<B256>,
        parent_beacon_block_root: Option<B256>,
        execution_requests: Option<Vec<Bytes>>,
        deadline: Option<Instant>,
    ) -> Result<PayloadStatus, EngineError> {
        let fork = self
            .chain_spec
            .fork_version_at_timestamp(execution_payload.timestamp);
        let request = NewPayloadRequest::build(
            execution_payload,
            versioned_hashes,
            parent_beacon_block_root,
            execution_requests,
            fork,
        )?;
        self.new_payload(&request, deadline).await
    }

    pub async fn new_payload(
        &self,
        request: &NewPayloadRequest,
        deadline: Option<Instant>,
    ) -> Result<PayloadStatus, EngineError> {
        let timestamp = request.execution_payload.timestamp;
        let actual = self.chain_spec.fork_version_at_timestamp(timestamp);
        if actual != request.fork {
            return Err(ValidationError::TimestampForkMismatch {
                timestamp,
                requested: request.fork,
                actual,
            }
            .into());
        }

        let method = request.method();
        with_deadline(method, deadline, async {
            let status: PayloadStatusV1 = self.call_typed(method, request.params()).await?;
            validate_new_payload_status(method, &status, request.block_hash())
        })
        .await
    }

    /// Point the execution client at `forkchoice_state` for `slot`, optionally starting a
    /// payload build.
    ///
    /// The fork is taken from the attributes' timestamp when present and from `slot` otherwise.
    /// An update for a slot older than the current head is not sent and returns
    /// [ForkchoiceUpdateOutcome::Stale].
    pub async fn forkchoice_updated(
        &self,
        slot: u64,
        forkchoice_state: ForkchoiceState,
        payload_attributes: Option<PayloadAttributes>,
        deadline: Option<Instant>,
    ) -> Result<ForkchoiceUpdateOutcome, EngineError> {
        let fork = match &payload_attributes {
            Some(attributes) => self
                .chain_spec
                .fork_version_at_timestamp(attributes.timestamp()),
            None => self.chain_spec.fork_version_at_slot(slot),
        };
        let request = ForkchoiceUpdateRequest::build(forkchoice_state, payload_attributes, fork)?;
        let method = request.method();

        with_deadline(method, deadline, async {
            let writer = self.head.writer().await;
            if let Some(head_slot) = writer.stale_against(slot) {
                self.events
                    .emit(EngineEvent::HeadRejected { slot, head_slot });
                return Ok(ForkchoiceUpdateOutcome::Stale { slot, head_slot });
            }

            let build = request
                .payload_attributes
                .as_ref()
                .map(|attributes| BuildJobContext::new(fork, &forkchoice_state, attributes));
            let build_key = build
                .as_ref()
                .map(|context| self.payload_cache.begin_request(context.clone()));

            let result = async {
                let response: ForkchoiceUpdatedResponse =
                    self.call_typed(method, request.params()).await?;
                let status = validate_forkchoice_response(method, &response, build.is_some())?;
                Ok::<_, EngineError>((status, response.payload_id))
            }
            .await;

            let (status, payload_id) = match result {
                Ok(result) => result,
                Err(err) => {
                    if let Some(key) = &build_key {
                        self.payload_cache.abandon_request(key);
                    }
                    return Err(err);
                }
            };

            if writer.advance(slot, forkchoice_state) {
                self.events.emit(EngineEvent::HeadUpdated {
                    slot,
                    head_block_hash: forkchoice_state.head_block_hash,
                });
            }

            match (payload_id, build_key, build) {
                (Some(payload_id), Some(key), Some(context)) => {
                    self.payload_cache
                        .promote(&key, payload_id, context)
                        .await
                        .map_err(|err| EngineError::protocol_violation(method, err.to_string()))?;
                    debug!(%payload_id, slot, "Payload build started");
                }
                (_, Some(key), _) => self.payload_cache.abandon_request(&key),
                _ => {}
            }

            Ok(ForkchoiceUpdateOutcome::Applied { status, payload_id })
        })
        .await
    }

    /// Retrieve a built payload.
    ///
    /// A live job is fetched from the execution client once and served from the cache
    /// afterwards. A job past its ttl fails with [EngineError::CacheExpired] without a round
    /// trip. An id this client never saw is fetched directly.
    pub async fn get_payload(
        &self,
        payload_id: PayloadId,
        fork: ForkVersion,
        deadline: Option<Instant>,
    ) -> Result<Arc<GetPayloadResponse>, EngineError> {
        let Some(job) = self.payload_cache.get(&payload_id) else {
            let request = GetPayloadRequest::build(payload_id, fork, None)?;
            return with_deadline(request.method(), deadline, async {
                self.events.emit(EngineEvent::CacheMiss { payload_id });
                Ok(Arc::new(self.fetch_payload(&request, None).await?))
            })
            .await;
        };

        let request = GetPayloadRequest::build(payload_id, fork, Some(job.fork()))?;
        with_deadline(request.method(), deadline, async {
            let mut state = job.lock().await;
            if job.is_past_ttl(Instant::now(), self.payload_cache.ttl()) {
                if !state.is_terminal() {
                    let _ = state.transition(BuildJobState::Expired);
                }
                self.events.emit(EngineEvent::CacheExpired { payload_id });
                return Err(EngineError::CacheExpired(payload_id));
            }

            match &*state {
                BuildJobState::Delivered(response) => {
                    self.events.emit(EngineEvent::CacheHit { payload_id });
                    return Ok(response.clone());
                }
                BuildJobState::Expired => {
                    self.events.emit(EngineEvent::CacheExpired { payload_id });
                    return Err(EngineError::CacheExpired(payload_id));
                }
                BuildJobState::Requested | BuildJobState::Building => {}
            }

            self.events.emit(EngineEvent::CacheMiss { payload_id });
            let response = Arc::new(self.fetch_payload(&request, Some(job.context())).await?);
            state
                .transition(BuildJobState::Delivered(response.clone()))
                .map_err(|err| EngineError::protocol_violation(request.method(), err.to_string()))?;
            Ok(response)
        })
        .await
    }

    async fn fetch_payload(
        &self,
        request: &GetPayloadRequest,
        expected: Option<&BuildJobContext>,
    ) -> Result<GetPayloadResponse, EngineError> {
        let method = request.method();
        let value = self
            .call(method, request.params())
            .await
            .map_err(|err| match err {
                EngineError::Rejected {
                    code: UNKNOWN_PAYLOAD_CODE,
                    ..
                } => EngineError::CacheExpired(request.payload_id),
                err => err,
            })?;
        let response = parse_get_payload_response(request.version, value)?;
        validate_get_payload_response(method, &response, request.fork, expected)?;
        Ok(response)
    }

    /// Query `eth_syncing` and record the resulting [EngineState]. Never fails, an unreachable
    /// execution client is reported as [EngineState::Offline].
    pub async fn upcheck(&self) -> EngineState {
        let state = match self.call_typed::<Value>(ETH_SYNCING, vec![]).await {
            Ok(Value::Bool(false)) => EngineState::Synced,
            Ok(_) => EngineState::Syncing,
            Err(EngineError::Auth { .. }) => EngineState::AuthFailed,
            Err(_) => EngineState::Offline,
        };
        self.set_state(state);
        state
    }

    /// Advertise the methods this client speaks and return those the execution client supports.
    pub async fn exchange_capabilities(&self) -> Result<Vec<String>, EngineError> {
        let supported: Vec<String> = self
            .call_typed(ENGINE_EXCHANGE_CAPABILITIES, vec![json!(ENGINE_CAPABILITIES)])
            .await?;
        for method in ENGINE_CAPABILITIES {
            if !supported.iter().any(|supported| supported == method) {
                warn!("Execution client does not support {method}");
            }
        }
        Ok(supported)
    }

    fn set_state(&self, state: EngineState) {
        let previous = std::mem::replace(&mut *self.state.write(), state);
        if previous != state {
            self.events.emit(EngineEvent::StateChanged { state });
        }
    }

    async fn call_typed<T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: Vec<Value>,
    ) -> Result<T, EngineError> {
        let value = self.call(method, params).await?;
        serde_json::from_value(value)
            .map_err(|err| EngineError::protocol_violation(method, err.to_string()))
    }

    /// One logical call, retried with backoff while the failure is transient.
    async fn call(&self, method: &'static str, params: Vec<Value>) -> Result<Value, EngineError> {
        let started = Instant::now();
        let attempts = AtomicU32::new(0);
        self.events.emit(EngineEvent::RequestIssued { method });

        let result = (|| {
            attempts.fetch_add(1, Ordering::Relaxed);
            self.transport
                .request(method, params.clone(), self.request_timeout)
        })
        .retry(self.retry.to_backoff_builder())
        .when(RpcCallError::is_retryable)
        .notify(|error, delay| {
            self.events.emit(EngineEvent::Retried {
                method,
                attempt: attempts.load(Ordering::Relaxed),
                delay,
                error: error.clone(),
            });
        })
        .await;

        let attempts = attempts.load(Ordering::Relaxed);
        match result {
            Ok(value) => {
                self.events.emit(EngineEvent::Succeeded {
                    method,
                    attempts,
                    elapsed: started.elapsed(),
                });
                Ok(value)
            }
            Err(error) => {
                let error = self.classify(method, attempts, error);
                self.events.emit(EngineEvent::Failed {
                    method,
                    attempts,
                    error: error.to_string(),
                });
                Err(error)
            }
        }
    }

    fn classify(&self, method: &'static str, attempts: u32, error: RpcCallError) -> EngineError {
        match error {
            RpcCallError::Transport(_) | RpcCallError::Timeout(_) => {
                self.set_state(EngineState::Offline);
                EngineError::EngineUnavailable {
                    method,
                    attempts,
                    last_error: error,
                }
            }
            RpcCallError::Auth(status) => {
                self.set_state(EngineState::AuthFailed);
                EngineError::Auth {
                    method,
                    reason: format!("HTTP {status}"),
                }
            }
            RpcCallError::Token(reason) => EngineError::Auth { method, reason },
            RpcCallError::Rpc { code, message } => EngineError::Rejected {
                method,
                code,
                message,
            },
            RpcCallError::InvalidResponse(reason) => {
                EngineError::ProtocolViolation { method, reason }
            }
        }
    }
}

/// Bound `future` by the caller's deadline. Dropping the future on expiry only abandons the
/// local wait; cache entries it touched stay valid.
async fn with_deadline<T>(
    method: &'static str,
    deadline: Option<Instant>,
    future: impl Future<Output = Result<T, EngineError>>,
) -> Result<T, EngineError> {
    match deadline {
        Some(deadline) => timeout_at(deadline, future)
            .await
            .map_err(|_| EngineError::DeadlineExceeded(method))?,
        None => future.await,
    }
}
