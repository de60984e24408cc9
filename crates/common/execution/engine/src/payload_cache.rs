use std::{collections::HashMap, sync::Arc, time::Duration};

use alloy_primitives::{Address, B256};
use parking_lot::Mutex;
use ream_execution_rpc_types::{
    PayloadId, forkchoice::ForkchoiceState, get_payload::GetPayloadResponse,
    payload_attributes::PayloadAttributes, withdrawal::Withdrawal,
};
use ream_network_spec::forks::ForkVersion;
use thiserror::Error;
use tokio::{
    sync::{Mutex as AsyncMutex, MutexGuard},
    time::Instant,
};

/// Lifecycle of a payload build job.
///
/// ```text
/// Requested --(forkchoice update echoes a payload id)--> Building
/// Building  --(getPayload succeeds)--> Delivered
/// Requested | Building --(ttl elapses)--> Expired
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildJobState {
    Requested,
    Building,
    Delivered(Arc<GetPayloadResponse>),
    Expired,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Illegal build job transition from {from} to {to}")]
pub struct IllegalTransition {
    pub from: &'static str,
    pub to: &'static str,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PromoteError {
    #[error(transparent)]
    IllegalTransition(#[from] IllegalTransition),

    #[error("Payload id {0} is already building for different attributes")]
    ConflictingBuild(PayloadId),
}

impl BuildJobState {
    pub fn name(&self) -> &'static str {
        match self {
            BuildJobState::Requested => "requested",
            BuildJobState::Building => "building",
            BuildJobState::Delivered(_) => "delivered",
            BuildJobState::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BuildJobState::Delivered(_) | BuildJobState::Expired)
    }

    pub fn transition(&mut self, next: BuildJobState) -> Result<(), IllegalTransition> {
        let allowed = matches!(
            (&*self, &next),
            (BuildJobState::Requested, BuildJobState::Building)
                | (BuildJobState::Building, BuildJobState::Delivered(_))
                | (
                    BuildJobState::Requested | BuildJobState::Building,
                    BuildJobState::Expired
                )
        );
        if !allowed {
            return Err(IllegalTransition {
                from: self.name(),
                to: next.name(),
            });
        }
        *self = next;
        Ok(())
    }
}

/// What the build was asked for, used to check the payload that comes back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildJobContext {
    pub fork: ForkVersion,
    pub head_block_hash: B256,
    pub timestamp: u64,
    pub prev_randao: B256,
    pub suggested_fee_recipient: Address,
    pub withdrawals: Option<Vec<Withdrawal>>,
}

impl BuildJobContext {
    pub fn new(
        fork: ForkVersion,
        forkchoice_state: &ForkchoiceState,
        attributes: &PayloadAttributes,
    ) -> Self {
        Self {
            fork,
            head_block_hash: forkchoice_state.head_block_hash,
            timestamp: attributes.timestamp(),
            prev_randao: attributes.prev_randao(),
            suggested_fee_recipient: attributes.suggested_fee_recipient(),
            withdrawals: attributes.withdrawals().map(<[Withdrawal]>::to_vec),
        }
    }

    pub fn key(&self) -> BuildRequestKey {
        BuildRequestKey {
            head_block_hash: self.head_block_hash,
            timestamp: self.timestamp,
            prev_randao: self.prev_randao,
            suggested_fee_recipient: self.suggested_fee_recipient,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BuildRequestKey {
    pub head_block_hash: B256,
    pub timestamp: u64,
    pub prev_randao: B256,
    pub suggested_fee_recipient: Address,
}

#[derive(Debug)]
pub struct BuildJob {
    context: BuildJobContext,
    created_at: Instant,
    state: AsyncMutex<BuildJobState>,
}

impl BuildJob {
    fn new(context: BuildJobContext, created_at: Instant) -> Self {
        Self {
            context,
            created_at,
            state: AsyncMutex::new(BuildJobState::Requested),
        }
    }

    pub fn context(&self) -> &BuildJobContext {
        &self.context
    }

    pub fn fork(&self) -> ForkVersion {
        self.context.fork
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn is_past_ttl(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.created_at) >= ttl
    }

    /// Holding the guard serialises every transition of this job, including the network fetch
    /// that moves it to [BuildJobState::Delivered].
    pub async fn lock(&self) -> MutexGuard<'_, BuildJobState> {
        self.state.lock().await
    }

    pub async fn state(&self) -> BuildJobState {
        self.state.lock().await.clone()
    }
}

/// Build jobs keyed by payload id, plus the requests still waiting for one.
///
/// Jobs stay in the cache for twice the ttl so that a late `getPayload` is answered with
/// `CacheExpired` rather than a round trip.
pub struct PayloadCache {
    ttl: Duration,
    requested: Mutex<HashMap<BuildRequestKey, Arc<BuildJob>>>,
    jobs: Mutex<HashMap<PayloadId, Arc<BuildJob>>>,
}

impl PayloadCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            requested: Mutex::new(HashMap::new()),
            jobs: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn begin_request(&self, context: BuildJobContext) -> BuildRequestKey {
        let key = context.key();
        self.requested
            .lock()
            .insert(key, Arc::new(BuildJob::new(context, Instant::now())));
        key
    }

    pub fn abandon_request(&self, key: &BuildRequestKey) {
        self.requested.lock().remove(key);
    }

    /// Move a requested job to `Building` under the payload id the execution client assigned.
    ///
    /// An id that is already held by a live job redeems that job, so a repeated forkchoice
    /// update never resets its state or its ttl.
    pub async fn promote(
        &self,
        key: &BuildRequestKey,
        payload_id: PayloadId,
        context: BuildJobContext,
    ) -> Result<Arc<BuildJob>, PromoteError> {
        let job = self
            .requested
            .lock()
            .remove(key)
            .unwrap_or_else(|| Arc::new(BuildJob::new(context, Instant::now())));

        if let Some(existing) = self.get(&payload_id)
            && !existing.is_past_ttl(Instant::now(), self.ttl)
        {
            if existing.context != job.context {
                return Err(PromoteError::ConflictingBuild(payload_id));
            }
            return Ok(existing);
        }

        job.lock().await.transition(BuildJobState::Building)?;
        self.jobs.lock().insert(payload_id, job.clone());
        Ok(job)
    }

    pub fn get(&self, payload_id: &PayloadId) -> Option<Arc<BuildJob>> {
        self.jobs.lock().get(payload_id).cloned()
    }

    /// Payload id of a live job started for the same head and attributes.
    pub fn payload_id_for(&self, key: &BuildRequestKey) -> Option<PayloadId> {
        let now = Instant::now();
        self.jobs
            .lock()
            .iter()
            .find(|(_, job)| job.context.key() == *key && !job.is_past_ttl(now, self.ttl))
            .map(|(payload_id, _)| *payload_id)
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn requested_len(&self) -> usize {
        self.requested.lock().len()
    }

    /// Expire jobs past the ttl and drop jobs past twice the ttl. Returns the number of jobs
    /// dropped.
    pub fn prune(&self) -> usize {
        let now = Instant::now();
        self.requested
            .lock()
            .retain(|_, job| !job.is_past_ttl(now, self.ttl));

        let mut jobs = self.jobs.lock();
        let before = jobs.len();
        jobs.retain(|_, job| {
            if job.is_past_ttl(now, self.ttl * 2) {
                return false;
            }
            // A job that is being fetched right now is checked again by its own caller.
            if job.is_past_ttl(now, self.ttl)
                && let Ok(mut state) = job.state.try_lock()
                && !state.is_terminal()
            {
                let _ = state.transition(BuildJobState::Expired);
            }
            true
        });
        before - jobs.len()
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::b64;

    use super::*;
    use crate::test_utils::payload_for_fork;

    fn context(timestamp: u64) -> BuildJobContext {
        BuildJobContext {
            fork: ForkVersion::Deneb,
            head_block_hash: B256::repeat_byte(1),
            timestamp,
            prev_randao: B256::ZERO,
            suggested_fee_recipient: Address::ZERO,
            withdrawals: Some(vec![]),
        }
    }

    #[test]
    fn test_state_transitions() {
        let mut state = BuildJobState::Requested;
        assert!(state.transition(BuildJobState::Building).is_ok());
        assert_eq!(
            state.clone().transition(BuildJobState::Requested),
            Err(IllegalTransition {
                from: "building",
                to: "requested"
            })
        );

        let mut delivered = BuildJobState::Delivered(Arc::new(GetPayloadResponse::from_payload(
            payload_for_fork(ForkVersion::Deneb, 0),
        )));
        assert!(delivered.transition(BuildJobState::Expired).is_err());
        assert!(state.transition(BuildJobState::Expired).is_ok());
        assert!(state.is_terminal());
    }

    #[tokio::test(start_paused = true)]
    async fn test_promote_and_lookup() {
        let cache = PayloadCache::new(Duration::from_secs(12));
        let key = cache.begin_request(context(100));
        assert_eq!(cache.requested_len(), 1);

        let payload_id = b64!("0x0000000000000007");
        let job = cache
            .promote(&key, payload_id, context(100))
            .await
            .expect("requested job can start building");

        assert_eq!(job.state().await, BuildJobState::Building);
        assert_eq!(cache.requested_len(), 0);
        assert_eq!(cache.payload_id_for(&key), Some(payload_id));

        tokio::time::advance(Duration::from_secs(12)).await;
        assert_eq!(cache.payload_id_for(&key), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_promote_keeps_live_job_for_repeated_id() {
        let cache = PayloadCache::new(Duration::from_secs(12));
        let payload_id = b64!("0x0000000000000003");
        let key = cache.begin_request(context(100));
        let first = cache
            .promote(&key, payload_id, context(100))
            .await
            .expect("promote");

        tokio::time::advance(Duration::from_secs(5)).await;
        let key = cache.begin_request(context(100));
        let second = cache
            .promote(&key, payload_id, context(100))
            .await
            .expect("same build is redeemed");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.requested_len(), 0);
        assert_eq!(second.created_at(), first.created_at());

        let key = cache.begin_request(context(101));
        assert_eq!(
            cache.promote(&key, payload_id, context(101)).await.err(),
            Some(PromoteError::ConflictingBuild(payload_id))
        );
        assert_eq!(cache.requested_len(), 0);

        tokio::time::advance(Duration::from_secs(7)).await;
        let key = cache.begin_request(context(101));
        let replaced = cache
            .promote(&key, payload_id, context(101))
            .await
            .expect("an expired job can be replaced");
        assert!(!Arc::ptr_eq(&first, &replaced));
        assert_eq!(replaced.context().timestamp, 101);
    }

    #[tokio::test(start_paused = true)]
    async fn test_prune_expires_then_drops() {
        let cache = PayloadCache::new(Duration::from_secs(12));
        let key = cache.begin_request(context(100));
        let payload_id = b64!("0x0000000000000001");
        let job = cache
            .promote(&key, payload_id, context(100))
            .await
            .expect("promote");
        cache.begin_request(context(200));

        tokio::time::advance(Duration::from_secs(13)).await;
        assert_eq!(cache.prune(), 0);
        assert_eq!(job.state().await, BuildJobState::Expired);
        assert_eq!(cache.requested_len(), 0);
        assert!(cache.get(&payload_id).is_some());

        tokio::time::advance(Duration::from_secs(12)).await;
        assert_eq!(cache.prune(), 1);
        assert!(cache.is_empty());
    }
}
