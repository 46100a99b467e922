//! Flush Scheduler
//!
//! Bookkeeping for the deferred flush of a circuit's props.
//!
//! # Algorithm
//!
//! Instead of computing a static order, the circuit uses dirty flags and
//! repeated draining, because the graph may contain cycles and may be
//! rewired at any time:
//!
//! 1. When a prop changes, every prop reachable through its targets is marked
//!    dirty and added to the pending set.
//! 2. The first addition arms a flush. Only one flush is armed at a time, no
//!    matter how many writes happen before it runs.
//! 3. The flush takes a snapshot of the pending set, clears it, and pulls every
//!    node of the snapshot that is still dirty.
//! 4. Pulling may dirty more nodes. Those re-arm the flush, and the next pass
//!    runs on the following tick.
//!
//! A graph whose values settle drains to empty. One that never settles keeps
//! arming passes forever unless a pass limit is configured. The limit counts
//! consecutive passes that left work behind; a pass that drains the pending
//! set resets the count.

use indexmap::IndexSet;

use super::node::NodeId;

/// Pending set plus the single armed-flush flag of a circuit.
#[derive(Debug, Default)]
pub struct FlushScheduler {
    /// Nodes due for recomputation, in the order they were first enqueued.
    pending: IndexSet<NodeId>,

    /// Whether a flush callback is queued and has not started yet.
    armed: bool,

    /// Passes run since the pending set was last drained.
    passes: usize,

    /// Maximum consecutive passes. `None` means unbounded.
    max_passes: Option<usize>,
}

impl FlushScheduler {
    /// Create a new empty scheduler.
    pub fn new(max_passes: Option<usize>) -> Self {
        Self {
            pending: IndexSet::new(),
            armed: false,
            passes: 0,
            max_passes,
        }
    }

    /// Add a node to the pending set. Returns `false` if it was already there.
    pub fn enqueue(&mut self, node_id: NodeId) -> bool {
        self.pending.insert(node_id)
    }

    /// Add several nodes to the pending set.
    pub fn enqueue_all(&mut self, nodes: impl IntoIterator<Item = NodeId>) {
        self.pending.extend(nodes);
    }

    /// Arm the flush. Returns `true` only if it was not armed before, in
    /// which case the caller must queue the flush callback.
    pub fn arm(&mut self) -> bool {
        !std::mem::replace(&mut self.armed, true)
    }

    /// Called by the flush callback when it starts running.
    pub fn disarm(&mut self) {
        self.armed = false;
    }

    /// Whether a flush callback is queued.
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Take the current pending set, leaving it empty.
    pub fn take_pending(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.pending).into_iter().collect()
    }

    /// Number of nodes waiting for the next pass.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is waiting.
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// Count a finished pass. Returns the passes since the last drain.
    pub fn record_pass(&mut self) -> usize {
        self.passes += 1;
        self.passes
    }

    /// Reset the pass count.
    pub fn settle(&mut self) {
        self.passes = 0;
    }

    /// Passes run since the pending set was last drained.
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Whether another pass would exceed the configured limit.
    pub fn limit_reached(&self) -> bool {
        !self.is_idle() && self.max_passes.map_or(false, |limit| self.passes >= limit)
    }

    /// Configured pass limit.
    pub fn max_passes(&self) -> Option<usize> {
        self.max_passes
    }
}
