//! Circuit
//!
//! A circuit owns a graph of props and events, the pending set of its
//! props, and the task queue its deferred work runs on.
//!
//! # Edges
//!
//! `bind` and `unbind` are the only operations that change topology. They
//! validate both ends before touching anything, so a rejected call leaves
//! both edge lists as they were.
//!
//! Binding into a prop marks the target dirty and enqueues it, so it picks up
//! the new source's current value on the next flush even if the source never
//! changes again. Unbinding from a dirty prop recomputes it first, so an
//! update that was already on its way is not lost.
//!
//! # Borrowing
//!
//! The node table lives in a `RefCell`. No borrow is held while user code
//! (compute functions, listeners) runs or while a source is being pulled, so
//! user code may read, write, bind and emit on the same circuit.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::Value;
use tracing::trace;

use crate::config::CircuitConfig;
use crate::error::{CircuitError, Result};
use crate::graph::{
    EventState, FlushScheduler, Listener, Node, NodeBody, NodeId, NodeInfo, NodeKind, PropState,
};

use super::event::{Dispatch, Event};
use super::prop::Prop;
use super::runtime::TaskQueue;
use super::Payload;

pub(crate) struct Inner<T> {
    pub(crate) nodes: RefCell<HashMap<NodeId, Node<T>>>,
    pub(crate) scheduler: RefCell<FlushScheduler>,
    pub(crate) queue: TaskQueue,
}

/// A reactive dataflow graph.
///
/// `Circuit` is a cheap handle; clones refer to the same graph.
///
/// # Example
///
/// ```rust,ignore
/// let circuit: Circuit<i64> = Circuit::new();
/// let a = circuit.prop(1);
/// let b = circuit.prop(2);
/// let sum = circuit.computed(|xs| xs.iter().sum());
///
/// circuit.bind(&a, &sum)?;
/// circuit.bind(&b, &sum)?;
/// assert_eq!(sum.get(), 3);
///
/// a.set(10);
/// assert_eq!(sum.get(), 12);
/// ```
pub struct Circuit<T = Value> {
    pub(crate) inner: Rc<Inner<T>>,
}

impl<T: Payload> Circuit<T> {
    /// Create a circuit with its own task queue and default configuration.
    pub fn new() -> Self {
        Self::with_config(CircuitConfig::default())
    }

    /// Create a circuit with its own task queue.
    pub fn with_config(config: CircuitConfig) -> Self {
        Self::with_queue(TaskQueue::new(), config)
    }

    /// Create a circuit whose deferred work runs on `queue`.
    ///
    /// Circuits sharing a queue interleave their deferred callbacks in
    /// scheduling order.
    pub fn with_queue(queue: TaskQueue, config: CircuitConfig) -> Self {
        Self {
            inner: Rc::new(Inner {
                nodes: RefCell::new(HashMap::new()),
                scheduler: RefCell::new(FlushScheduler::new(config.max_flush_passes)),
                queue,
            }),
        }
    }

    pub(crate) fn from_inner(inner: Rc<Inner<T>>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<Inner<T>> {
        Rc::downgrade(&self.inner)
    }

    // ------------------------------------------------------------------------
    // Node creation
    // ------------------------------------------------------------------------

    /// Create a plain value prop. Starts clean.
    pub fn prop(&self, value: T) -> Prop<T> {
        let id = self.insert(NodeBody::Prop(PropState::value(value)));
        Prop::new(id, self.clone())
    }

    /// Alias for [`Circuit::prop`].
    pub fn data(&self, value: T) -> Prop<T> {
        self.prop(value)
    }

    /// Create a derived prop.
    ///
    /// `compute` receives one value per source, in bind order. The prop
    /// starts dirty and is enqueued right away, so it computes once on the
    /// next flush even if nothing is ever bound to it.
    pub fn computed<F>(&self, compute: F) -> Prop<T>
    where
        F: Fn(&[T]) -> T + 'static,
    {
        let id = self.insert(NodeBody::Prop(PropState::computed(Rc::new(compute))));
        self.schedule_flush([id]);
        Prop::new(id, self.clone())
    }

    /// Create an event without a listener. It only relays.
    pub fn event(&self) -> Event<T> {
        self.insert_event(None)
    }

    /// Create an event whose listener runs on every dispatch.
    pub fn event_with<F>(&self, listener: F) -> Event<T>
    where
        F: Fn(&mut Dispatch<'_, T>) + 'static,
    {
        self.insert_event(Some(Rc::new(listener)))
    }

    fn insert_event(&self, listener: Option<Listener<T>>) -> Event<T> {
        let id = self.insert(NodeBody::Event(EventState { listener }));
        Event::new(id, self.clone())
    }

    fn insert(&self, body: NodeBody<T>) -> NodeId {
        let node = Node::new(body);
        let id = node.id();
        trace!(node = %id, kind = %node.kind(), "node created");
        self.inner.nodes.borrow_mut().insert(id, node);
        id
    }

    // ------------------------------------------------------------------------
    // Edges
    // ------------------------------------------------------------------------

    /// Connect `source` to `target`.
    ///
    /// Binding the same pair twice creates two edges; a prop target then
    /// receives the source's value twice.
    pub fn bind(&self, source: impl Into<NodeId>, target: impl Into<NodeId>) -> Result<()> {
        let (source, target) = (source.into(), target.into());

        let kind = {
            let mut nodes = self.inner.nodes.borrow_mut();
            let kind = check_pair(&nodes, source, target)?;

            if let Some(node) = nodes.get_mut(&source) {
                node.push_target(target);
            }
            if let Some(node) = nodes.get_mut(&target) {
                node.push_source(source);
                if let Some(state) = node.as_prop_mut() {
                    state.dirty = true;
                }
            }
            kind
        };

        trace!(%source, %target, %kind, "bound");
        if kind == NodeKind::Prop {
            self.schedule_flush([target]);
        }
        Ok(())
    }

    /// Remove the most recently added edge from `source` to `target`.
    pub fn unbind(&self, source: impl Into<NodeId>, target: impl Into<NodeId>) -> Result<()> {
        let (source, target) = (source.into(), target.into());

        let (kind, dirty) = {
            let nodes = self.inner.nodes.borrow();
            let kind = check_pair(&nodes, source, target)?;
            let connected = nodes
                .get(&source)
                .map_or(false, |node| node.targets().contains(&target));
            if !connected {
                return Err(CircuitError::NotConnected {
                    from: source,
                    to: target,
                });
            }
            let dirty = nodes.get(&target).map_or(false, Node::is_dirty);
            (kind, dirty)
        };

        if kind == NodeKind::Prop && dirty {
            // Deliver what is already pending before the edge goes away.
            self.update_prop(target);
        }

        let mut nodes = self.inner.nodes.borrow_mut();
        let removed = nodes
            .get_mut(&source)
            .map_or(false, |node| node.remove_target(target));
        if !removed {
            // The recompute above rewired the pair.
            return Err(CircuitError::NotConnected {
                from: source,
                to: target,
            });
        }
        if let Some(node) = nodes.get_mut(&target) {
            node.remove_source(source);
        }

        trace!(%source, %target, %kind, "unbound");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Deferred work
    // ------------------------------------------------------------------------

    /// The queue this circuit defers work to.
    pub fn queue(&self) -> &TaskQueue {
        &self.inner.queue
    }

    /// Run one tick of the task queue.
    pub fn tick(&self) -> Result<usize> {
        self.inner.queue.tick()
    }

    /// Tick until the task queue is empty.
    pub fn run_until_idle(&self) -> Result<usize> {
        self.inner.queue.run_until_idle()
    }

    /// Number of props waiting for the next flush pass.
    pub fn pending_count(&self) -> usize {
        self.inner.scheduler.borrow().pending_count()
    }

    // ------------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------------

    /// Snapshot of one node.
    pub fn node_info(&self, id: impl Into<NodeId>) -> Option<NodeInfo> {
        self.inner.nodes.borrow().get(&id.into()).map(NodeInfo::from)
    }

    /// Snapshot of every node, ordered by id.
    pub fn topology(&self) -> Vec<NodeInfo> {
        let mut nodes: Vec<NodeInfo> = self
            .inner
            .nodes
            .borrow()
            .values()
            .map(NodeInfo::from)
            .collect();
        nodes.sort_by_key(|info| info.id);
        nodes
    }

    /// Whether `id` is a node of this circuit.
    pub fn contains(&self, id: impl Into<NodeId>) -> bool {
        self.inner.nodes.borrow().contains_key(&id.into())
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.inner.nodes.borrow().len()
    }

    /// Whether the circuit has no nodes.
    pub fn is_empty(&self) -> bool {
        self.inner.nodes.borrow().is_empty()
    }

    /// Whether two handles refer to the same circuit.
    pub fn ptr_eq(&self, other: &Circuit<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Validate an edge operation and return the shared kind.
fn check_pair<T>(nodes: &HashMap<NodeId, Node<T>>, source: NodeId, target: NodeId) -> Result<NodeKind> {
    let from = nodes
        .get(&source)
        .ok_or(CircuitError::UnknownNode(source))?
        .kind();
    let to = nodes
        .get(&target)
        .ok_or(CircuitError::UnknownNode(target))?
        .kind();
    if from != to {
        return Err(CircuitError::TypeMismatch { from, to });
    }
    Ok(from)
}

impl<T: Payload> Default for Circuit<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Payload> Clone for Circuit<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Payload> fmt::Debug for Circuit<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Circuit")
            .field("nodes", &self.len())
            .field("pending", &self.pending_count())
            .field("queue", &self.inner.queue)
            .finish()
    }
}
