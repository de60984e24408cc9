use parking_lot::RwLock;
use ream_execution_rpc_types::{PayloadId, forkchoice::ForkchoiceState};
use tokio::sync::{Mutex, MutexGuard};

use crate::validation::PayloadStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadRecord {
    pub slot: u64,
    pub forkchoice_state: ForkchoiceState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForkchoiceUpdateOutcome {
    Applied {
        status: PayloadStatus,
        payload_id: Option<PayloadId>,
    },
    /// The update targeted a slot older than the current head and was not sent.
    Stale { slot: u64, head_slot: u64 },
}

/// The head last accepted by the execution client.
///
/// Readers never wait on the writer. Writers are serialised by [HeadTracker::writer], and the
/// recorded slot never decreases.
#[derive(Debug, Default)]
pub struct HeadTracker {
    writer: Mutex<()>,
    head: RwLock<Option<HeadRecord>>,
}

impl HeadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn head(&self) -> Option<HeadRecord> {
        *self.head.read()
    }

    pub fn head_slot(&self) -> Option<u64> {
        self.head().map(|head| head.slot)
    }

    pub async fn writer(&self) -> HeadWriter<'_> {
        HeadWriter {
            _guard: self.writer.lock().await,
            tracker: self,
        }
    }
}

pub struct HeadWriter<'a> {
    _guard: MutexGuard<'a, ()>,
    tracker: &'a HeadTracker,
}

impl HeadWriter<'_> {
    /// Returns the current head slot when `slot` is older than it. Equal slots are accepted so
    /// that a reorg within the same slot can still move the head.
    pub fn stale_against(&self, slot: u64) -> Option<u64> {
        self.tracker
            .head_slot()
            .filter(|head_slot| slot < *head_slot)
    }

    pub fn advance(&self, slot: u64, forkchoice_state: ForkchoiceState) -> bool {
        let mut head = self.tracker.head.write();
        if head.is_some_and(|head| slot < head.slot) {
            return false;
        }
        *head = Some(HeadRecord {
            slot,
            forkchoice_state,
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::B256;

    use super::*;

    fn state(byte: u8) -> ForkchoiceState {
        ForkchoiceState {
            head_block_hash: B256::repeat_byte(byte),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_head_never_regresses() {
        let tracker = HeadTracker::new();
        {
            let writer = tracker.writer().await;
            assert_eq!(writer.stale_against(10), None);
            assert!(writer.advance(10, state(10)));
        }
        {
            let writer = tracker.writer().await;
            assert_eq!(writer.stale_against(9), Some(10));
            assert!(!writer.advance(9, state(9)));
            assert_eq!(writer.stale_against(10), None);
            assert!(writer.advance(10, state(11)));
        }

        assert_eq!(
            tracker.head(),
            Some(HeadRecord {
                slot: 10,
                forkchoice_state: state(11)
            })
        );
    }
}
