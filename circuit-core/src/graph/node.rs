//! Graph Nodes
//!
//! This module defines the node types that live in a circuit.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::reactive::Dispatch;

/// Unique identifier for a node.
///
/// Ids come from a process-wide counter and are never reused, so an id that
/// belongs to one circuit is always unknown to every other circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// The kind of a node. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A memoized value node.
    Prop,

    /// A stateless message node.
    Event,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Prop => f.write_str("prop"),
            NodeKind::Event => f.write_str("event"),
        }
    }
}

/// Edge list storage. Most nodes have a handful of edges.
pub(crate) type Edges = SmallVec<[NodeId; 4]>;

/// User function that derives a prop value from its source values.
pub type ComputeFn<T> = Rc<dyn Fn(&[T]) -> T>;

/// Event listener, invoked synchronously on every dispatch.
pub type Listener<T> = Rc<dyn Fn(&mut Dispatch<'_, T>)>;

/// How a prop turns inputs into its cached value.
pub(crate) enum Compute<T> {
    /// Plain value node: writes are stored as-is, pulls take the first source.
    Identity,

    /// Derived node: one argument per source, in `sources` order.
    Function(ComputeFn<T>),
}

impl<T: Clone + Default> Compute<T> {
    /// Apply to the values gathered from the sources.
    pub(crate) fn apply(&self, inputs: &[T]) -> T {
        match self {
            Compute::Identity => inputs.first().cloned().unwrap_or_default(),
            Compute::Function(f) => f(inputs),
        }
    }

    /// Apply to a value written directly to the node.
    pub(crate) fn apply_written(&self, value: T) -> T {
        match self {
            Compute::Identity => value,
            Compute::Function(f) => f(std::slice::from_ref(&value)),
        }
    }
}

impl<T> Clone for Compute<T> {
    fn clone(&self) -> Self {
        match self {
            Compute::Identity => Compute::Identity,
            Compute::Function(f) => Compute::Function(Rc::clone(f)),
        }
    }
}

/// Per-node state of a prop.
pub(crate) struct PropState<T> {
    /// Last known value.
    pub(crate) cache: T,

    pub(crate) compute: Compute<T>,

    /// The cache may not reflect the current source values.
    pub(crate) dirty: bool,

    /// A deferred self-refresh is queued for this node.
    pub(crate) refresh_armed: bool,

    /// Bumped every time `cache` changes.
    pub(crate) version: u64,
}

impl<T> PropState<T> {
    /// A plain value node. Starts clean.
    pub(crate) fn value(initial: T) -> Self {
        Self {
            cache: initial,
            compute: Compute::Identity,
            dirty: false,
            refresh_armed: false,
            version: 0,
        }
    }

    /// A derived node. Starts dirty so that it computes at least once.
    pub(crate) fn computed(compute: ComputeFn<T>) -> Self
    where
        T: Default,
    {
        Self {
            cache: T::default(),
            compute: Compute::Function(compute),
            dirty: true,
            refresh_armed: false,
            version: 0,
        }
    }

    /// Replace the cache if `value` differs. Returns whether it changed.
    pub(crate) fn store(&mut self, value: T) -> bool
    where
        T: PartialEq,
    {
        if self.cache == value {
            return false;
        }
        self.cache = value;
        self.version += 1;
        true
    }
}

/// Per-node state of an event.
pub(crate) struct EventState<T> {
    pub(crate) listener: Option<Listener<T>>,
}

/// Kind-specific payload of a node.
pub(crate) enum NodeBody<T> {
    Prop(PropState<T>),
    Event(EventState<T>),
}

/// A node in a circuit.
pub(crate) struct Node<T> {
    /// Unique identifier for this node.
    id: NodeId,

    /// Nodes feeding this node, in bind order. Duplicates allowed.
    sources: Edges,

    /// Nodes this node feeds, in bind order. Duplicates allowed.
    targets: Edges,

    body: NodeBody<T>,
}

impl<T> Node<T> {
    pub(crate) fn new(body: NodeBody<T>) -> Self {
        Self {
            id: NodeId::new(),
            sources: Edges::new(),
            targets: Edges::new(),
            body,
        }
    }

    pub(crate) fn id(&self) -> NodeId {
        self.id
    }

    pub(crate) fn kind(&self) -> NodeKind {
        match self.body {
            NodeBody::Prop(_) => NodeKind::Prop,
            NodeBody::Event(_) => NodeKind::Event,
        }
    }

    pub(crate) fn sources(&self) -> &[NodeId] {
        &self.sources
    }

    pub(crate) fn targets(&self) -> &[NodeId] {
        &self.targets
    }

    pub(crate) fn push_source(&mut self, id: NodeId) {
        self.sources.push(id);
    }

    pub(crate) fn push_target(&mut self, id: NodeId) {
        self.targets.push(id);
    }

    /// Remove the most recently added occurrence of `id` from `sources`.
    pub(crate) fn remove_source(&mut self, id: NodeId) -> bool {
        remove_last(&mut self.sources, id)
    }

    /// Remove the most recently added occurrence of `id` from `targets`.
    pub(crate) fn remove_target(&mut self, id: NodeId) -> bool {
        remove_last(&mut self.targets, id)
    }

    pub(crate) fn as_prop(&self) -> Option<&PropState<T>> {
        match &self.body {
            NodeBody::Prop(state) => Some(state),
            NodeBody::Event(_) => None,
        }
    }

    pub(crate) fn as_prop_mut(&mut self) -> Option<&mut PropState<T>> {
        match &mut self.body {
            NodeBody::Prop(state) => Some(state),
            NodeBody::Event(_) => None,
        }
    }

    pub(crate) fn as_event(&self) -> Option<&EventState<T>> {
        match &self.body {
            NodeBody::Event(state) => Some(state),
            NodeBody::Prop(_) => None,
        }
    }

    /// Whether this is a prop whose cache may be stale.
    pub(crate) fn is_dirty(&self) -> bool {
        self.as_prop().map_or(false, |state| state.dirty)
    }
}

fn remove_last(edges: &mut Edges, id: NodeId) -> bool {
    match edges.iter().rposition(|&e| e == id) {
        Some(index) => {
            edges.remove(index);
            true
        }
        None => false,
    }
}

/// Serializable snapshot of one node, for debugging and tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub id: NodeId,
    pub kind: NodeKind,
    pub sources: Vec<NodeId>,
    pub targets: Vec<NodeId>,
    pub dirty: bool,
}

impl<T> From<&Node<T>> for NodeInfo {
    fn from(node: &Node<T>) -> Self {
        Self {
            id: node.id,
            kind: node.kind(),
            sources: node.sources.to_vec(),
            targets: node.targets.to_vec(),
            dirty: node.is_dirty(),
        }
    }
}
