//! FIFO queue and concurrency gate.
//!
//! Pure bookkeeping: deciding what may start and recording when a slot frees
//! up. Spawning and the delayed re-drain live in the orchestrator.

use futures::future::BoxFuture;
use std::collections::VecDeque;
use tokio::time::Instant;
use uuid::Uuid;

/// A submitted operation waiting for a free slot.
///
/// The job is a not-yet-polled future that already owns the channel its
/// result is reported on.
pub struct PendingRequest {
    pub id: Uuid,
    pub enqueued_at: Instant,
    pub job: BoxFuture<'static, ()>,
}

impl PendingRequest {
    pub fn new(job: BoxFuture<'static, ()>) -> Self {
        Self {
            id: Uuid::new_v4(),
            enqueued_at: Instant::now(),
            job,
        }
    }
}

impl std::fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRequest")
            .field("id", &self.id)
            .field("enqueued_at", &self.enqueued_at)
            .finish_non_exhaustive()
    }
}

/// Queue state guarded by the orchestrator's lock.
#[derive(Debug)]
pub struct QueueState {
    max_concurrent: usize,
    active: usize,
    pending: VecDeque<PendingRequest>,
}

impl QueueState {
    /// A zero ceiling is raised to one so the queue can always drain.
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
            active: 0,
            pending: VecDeque::new(),
        }
    }

    pub const fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub const fn active(&self) -> usize {
        self.active
    }

    pub fn queued(&self) -> usize {
        self.pending.len()
    }

    pub fn push(&mut self, request: PendingRequest) {
        self.pending.push_back(request);
    }

    /// Take the oldest pending request if a slot is free, claiming the slot.
    pub fn next_ready(&mut self) -> Option<PendingRequest> {
        if self.active >= self.max_concurrent {
            return None;
        }
        let request = self.pending.pop_front()?;
        self.active += 1;
        Some(request)
    }

    /// Free a slot. Returns whether work is still waiting.
    pub fn release(&mut self) -> bool {
        self.active = self.active.saturating_sub(1);
        !self.pending.is_empty()
    }
}
