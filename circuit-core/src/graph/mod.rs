//! Dependency Graph
//!
//! This module holds the topology of a circuit and the bookkeeping for
//! deferred recomputation.
//!
//! # Overview
//!
//! A circuit is a directed graph where:
//!
//! - Nodes are either props (memoized values) or events (messages)
//! - An edge from A to B means A feeds B. Edges only connect nodes of the
//!   same kind
//!
//! Unlike a DAG-based scheduler, the graph may contain self-edges and cycles
//! of any length, and the same pair may be connected more than once.
//!
//! # Design Decisions
//!
//! 1. Nodes are owned by their circuit and addressed by `NodeId`. Handles
//!    carry only the id, so compute functions and listeners can capture them
//!    without borrowing the graph.
//!
//! 2. Both directions are stored (`sources` and `targets`) as ordered
//!    multisets. `sources` order is the argument order of a compute
//!    function, `targets` order is the relay order of an event.
//!
//! 3. The kind of a node is a sum type, so edge operations match on it
//!    instead of probing fields.

mod node;
mod scheduler;

pub use node::{ComputeFn, Listener, NodeId, NodeInfo, NodeKind};
pub use scheduler::FlushScheduler;

pub(crate) use node::{EventState, Node, NodeBody, PropState};
