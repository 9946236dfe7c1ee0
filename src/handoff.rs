// Single-slot, last-value-wins mailbox between a producer thread and the render thread.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::types::FrameBuffer;

#[derive(Default)]
struct SlotState {
    pending: Option<FrameBuffer>,
    published: u64,
    claimed: u64,
    dropped: u64,
}

/// Counters since the slot was created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SlotStats {
    pub published: u64,
    pub claimed: u64,
    /// Frames overwritten by a newer publish before anyone claimed them.
    pub dropped: u64,
}

/// Holds at most one frame that has been published but not yet claimed.
///
/// Not a queue: a publish that lands on an unclaimed frame replaces it, and the
/// replaced frame is never delivered. Both operations only move ownership while the
/// lock is held, so the critical section does not depend on image size.
#[derive(Default)]
pub struct HandoffSlot {
    state: Mutex<SlotState>,
}

impl HandoffSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `frame` as the pending frame, discarding any unclaimed one.
    pub fn publish(&self, frame: FrameBuffer) {
        let stale = {
            let mut state = self.lock();
            state.published += 1;
            let stale = state.pending.replace(frame);
            if stale.is_some() {
                state.dropped += 1;
            }
            stale
        };
        // Freed outside the lock.
        if let Some(stale) = stale {
            tracing::debug!(
                width = stale.width(),
                height = stale.height(),
                "dropping unclaimed frame"
            );
        }
    }

    /// Take the pending frame if there is one. Never blocks on a producer.
    pub fn try_claim(&self) -> Option<FrameBuffer> {
        let mut state = self.lock();
        let frame = state.pending.take();
        if frame.is_some() {
            state.claimed += 1;
        }
        frame
    }

    pub fn has_pending(&self) -> bool {
        self.lock().pending.is_some()
    }

    pub fn stats(&self) -> SlotStats {
        let state = self.lock();
        SlotStats {
            published: state.published,
            claimed: state.claimed,
            dropped: state.dropped,
        }
    }

    // A panicking holder can only have been between two plain field writes, so the
    // state is still usable.
    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
