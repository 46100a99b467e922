//! Prop Implementation
//!
//! A prop is a memoized value node. It combines push and pull:
//!
//! 1. Writing a prop stores the value and pushes dirtiness to everything
//!    reachable through its targets.
//!
//! 2. Reading a prop first pulls: if it is dirty it reads its sources
//!    (recursively) and recomputes. A read is therefore always consistent
//!    with the current sources, even before any flush has run.
//!
//! 3. The deferred flush exists so that dirty props nobody reads still get
//!    recomputed, which is what drives side effects in compute functions.
//!
//! # Flushing
//!
//! A write enqueues every prop it dirtied. The flush that runs on the next
//! tick pulls each of them that is still dirty, so a diamond recomputes its
//! sink once: by the time the sink is pulled, both of its sides are clean.
//! Recomputes that dirty more props enqueue them for another pass, which runs
//! on the tick after. Writes made in between are folded into that pass.
//!
//! # Cycles
//!
//! A prop never marks itself dirty through its own push. If the push reaches
//! it again through a cycle, the prop arms a deferred self-refresh instead,
//! so a prop bound to itself advances once per tick rather than recursing.

use std::collections::VecDeque;
use std::fmt;

use indexmap::IndexSet;
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::error::{CircuitError, Result};
use crate::graph::{NodeId, PropState};

use super::circuit::Circuit;
use super::Payload;

/// Handle to a prop node.
///
/// # Example
///
/// ```rust,ignore
/// let circuit: Circuit<i64> = Circuit::new();
/// let count = circuit.prop(0);
/// let doubled = circuit.computed(|xs| xs[0] * 2);
/// circuit.bind(&count, &doubled)?;
///
/// count.set(5);
/// assert_eq!(doubled.get(), 10);
/// ```
pub struct Prop<T> {
    id: NodeId,
    circuit: Circuit<T>,
}

impl<T: Payload> Prop<T> {
    pub(crate) fn new(id: NodeId, circuit: Circuit<T>) -> Self {
        Self { id, circuit }
    }

    /// Get the node id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The circuit this prop belongs to.
    pub fn circuit(&self) -> &Circuit<T> {
        &self.circuit
    }

    /// Get the current value, recomputing first if the prop is dirty.
    pub fn get(&self) -> T {
        self.circuit.read_prop(self.id)
    }

    /// Get the cached value without pulling from sources.
    pub fn peek(&self) -> T {
        self.circuit
            .with_prop(self.id, |state| state.cache.clone())
            .unwrap_or_default()
    }

    /// Write a value.
    ///
    /// A derived prop passes the value through its compute function first.
    /// Writing a value equal to the cache does nothing.
    pub fn set(&self, value: T) {
        self.circuit.write_prop(self.id, value);
    }

    /// Whether the cache may be stale.
    pub fn is_dirty(&self) -> bool {
        self.circuit
            .with_prop(self.id, |state| state.dirty)
            .unwrap_or(false)
    }

    /// Counter bumped every time the cached value changes.
    pub fn version(&self) -> u64 {
        self.circuit
            .with_prop(self.id, |state| state.version)
            .unwrap_or(0)
    }
}

impl<T: Payload> Clone for Prop<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            circuit: self.circuit.clone(),
        }
    }
}

impl<T: Payload> From<&Prop<T>> for NodeId {
    fn from(prop: &Prop<T>) -> Self {
        prop.id
    }
}

impl<T: Payload + fmt::Debug> fmt::Debug for Prop<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prop")
            .field("id", &self.id)
            .field("value", &self.peek())
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Engine
// ----------------------------------------------------------------------------

impl<T: Payload> Circuit<T> {
    pub(crate) fn with_prop<R>(
        &self,
        id: NodeId,
        f: impl FnOnce(&mut PropState<T>) -> R,
    ) -> Option<R> {
        let mut nodes = self.inner.nodes.borrow_mut();
        nodes.get_mut(&id).and_then(|node| node.as_prop_mut()).map(f)
    }

    pub(crate) fn read_prop(&self, id: NodeId) -> T {
        self.update_prop(id);
        self.with_prop(id, |state| state.cache.clone())
            .unwrap_or_default()
    }

    pub(crate) fn write_prop(&self, id: NodeId, value: T) {
        let Some(compute) = self.with_prop(id, |state| state.compute.clone()) else {
            return;
        };
        let value = compute.apply_written(value);

        let changed = self
            .with_prop(id, |state| {
                let changed = state.store(value);
                if changed {
                    // A written value is authoritative until a source changes.
                    state.dirty = false;
                }
                changed
            })
            .unwrap_or(false);

        if changed {
            self.mark_dirty(id);
        }
    }

    /// Recompute `id` if it is dirty.
    pub(crate) fn update_prop(&self, id: NodeId) {
        let (sources, compute) = {
            let mut nodes = self.inner.nodes.borrow_mut();
            let Some(node) = nodes.get_mut(&id) else {
                return;
            };
            let sources: SmallVec<[NodeId; 4]> = node.sources().iter().copied().collect();
            let Some(state) = node.as_prop_mut() else {
                return;
            };
            if !state.dirty {
                return;
            }
            state.dirty = false;
            (sources, state.compute.clone())
        };

        let inputs: Vec<T> = sources
            .into_iter()
            .map(|source| self.read_prop(source))
            .collect();

        let value = compute.apply(&inputs);
        let changed = self
            .with_prop(id, |state| state.store(value))
            .unwrap_or(false);
        if changed {
            self.mark_dirty(id);
        }
    }

    /// Push dirtiness from `origin` to every prop reachable through targets.
    fn mark_dirty(&self, origin: NodeId) {
        let mut visited = IndexSet::new();
        let mut reached_origin = false;

        {
            let mut nodes = self.inner.nodes.borrow_mut();
            let mut queue: VecDeque<NodeId> = nodes
                .get(&origin)
                .map(|node| node.targets().iter().copied().collect())
                .unwrap_or_default();

            while let Some(node_id) = queue.pop_front() {
                if node_id == origin {
                    reached_origin = true;
                    continue;
                }
                if !visited.insert(node_id) {
                    continue;
                }
                if let Some(node) = nodes.get_mut(&node_id) {
                    if let Some(state) = node.as_prop_mut() {
                        state.dirty = true;
                    }
                    queue.extend(node.targets().iter().copied());
                }
            }
        }

        trace!(node = %origin, marked = visited.len(), cycle = reached_origin, "mark dirty");
        self.schedule_flush(visited);

        if reached_origin {
            self.arm_refresh(origin);
        }
    }

    /// Add nodes to the pending set and arm a flush if none is armed.
    pub(crate) fn schedule_flush(&self, nodes: impl IntoIterator<Item = NodeId>) {
        let arm = {
            let mut scheduler = self.inner.scheduler.borrow_mut();
            scheduler.enqueue_all(nodes);
            !scheduler.is_idle() && scheduler.arm()
        };
        if !arm {
            return;
        }

        let circuit = self.downgrade();
        self.inner.queue.defer(move || match circuit.upgrade() {
            Some(inner) => Circuit::from_inner(inner).flush(),
            None => Ok(()),
        });
    }

    /// Queue a forced re-evaluation of a prop that reached itself.
    fn arm_refresh(&self, id: NodeId) {
        let armed = self
            .with_prop(id, |state| !std::mem::replace(&mut state.refresh_armed, true))
            .unwrap_or(false);
        if !armed {
            return;
        }

        let circuit = self.downgrade();
        self.inner.queue.defer(move || {
            if let Some(inner) = circuit.upgrade() {
                Circuit::from_inner(inner).refresh(id);
            }
            Ok(())
        });
    }

    fn refresh(&self, id: NodeId) {
        trace!(node = %id, "self refresh");
        self.with_prop(id, |state| {
            state.refresh_armed = false;
            state.dirty = true;
        });
        self.update_prop(id);
    }

    /// Run one pass over the pending set.
    ///
    /// Nodes dirtied by the pass arm the next flush themselves.
    fn flush(&self) -> Result<()> {
        let batch = {
            let mut scheduler = self.inner.scheduler.borrow_mut();
            scheduler.disarm();
            if scheduler.limit_reached() {
                let passes = scheduler.passes();
                let pending = scheduler.pending_count();
                scheduler.settle();
                warn!(passes, pending, "flush did not settle");
                return Err(CircuitError::FlushLimitExceeded { passes, pending });
            }
            scheduler.take_pending()
        };
        if batch.is_empty() {
            return Ok(());
        }

        let mut recomputed = 0;
        for id in batch {
            let dirty = self.with_prop(id, |state| state.dirty).unwrap_or(false);
            if dirty {
                self.read_prop(id);
                recomputed += 1;
            }
        }

        let (passes, pending) = {
            let mut scheduler = self.inner.scheduler.borrow_mut();
            let passes = scheduler.record_pass();
            if scheduler.is_idle() {
                scheduler.settle();
            }
            (passes, scheduler.pending_count())
        };
        debug!(passes, recomputed, pending, "flush pass");
        Ok(())
    }
}
