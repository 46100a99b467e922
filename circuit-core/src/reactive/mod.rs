//! Reactive Primitives
//!
//! This module implements the two node kinds of a circuit and the engine that
//! moves change between them.
//!
//! # Concepts
//!
//! ## Props
//!
//! A Prop holds a memoized value. It is either a plain value or derived from
//! its sources by a compute function. Writing a prop pushes dirtiness
//! downstream; reading a prop pulls fresh values from upstream. Writes made
//! in one synchronous turn are coalesced into a single deferred flush pass.
//!
//! ## Events
//!
//! An Event carries a message and keeps nothing. Emitting it runs its
//! listener right away and relays the message to its targets on the next
//! tick. The listener can rewrite the message, cancel the relay, or relay
//! explicitly.
//!
//! ## Circuits
//!
//! A Circuit owns the nodes, the edges between them (`bind`/`unbind`), and
//! the queue deferred work runs on. Separate circuits never see each other's
//! work unless they are built on a shared `TaskQueue`.
//!
//! # Implementation Notes
//!
//! Dependencies are explicit edges rather than tracked reads, so the graph
//! may be rewired at runtime and may contain cycles. Propagation relies on
//! dirty flags and repeated draining instead of a topological order.

mod circuit;
mod event;
mod prop;
mod runtime;

pub use circuit::Circuit;
pub use event::{Dispatch, Event};
pub use prop::Prop;
pub use runtime::TaskQueue;

/// Values that can flow through a circuit.
///
/// `PartialEq` decides whether a write or recompute changed anything.
/// `Default` is the value of a derived prop before its first computation and
/// the context of an event emitted without one.
pub trait Payload: Clone + PartialEq + Default + 'static {}

impl<T: Clone + PartialEq + Default + 'static> Payload for T {}
