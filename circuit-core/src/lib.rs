//! Circuit Core
//!
//! This crate provides the engine of the Circuit reactive dataflow graph.
//! It implements:
//!
//! - Prop nodes: memoized values with push/pull propagation
//! - Event nodes: messages with synchronous listeners and deferred relay
//! - Edge management (`bind`/`unbind`) over graphs that may contain cycles
//! - A deferred flush that coalesces bursts of writes into one pass over the
//!   affected nodes
//!
//! Independent producers and consumers are wired together without either
//! side knowing about the other.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: node model, edge lists and the pending set of the flush
//! - `reactive`: circuits, props, events and the deferred task queue
//! - `config`: circuit tunables
//! - `error`: error taxonomy
//!
//! # Example
//!
//! ```rust,ignore
//! use circuit_core::Circuit;
//!
//! let circuit: Circuit<i64> = Circuit::new();
//!
//! // A plain value and a derived value
//! let count = circuit.prop(1);
//! let doubled = circuit.computed(|xs| xs[0] * 2);
//! circuit.bind(&count, &doubled)?;
//!
//! // Reads pull, so they are always current
//! count.set(5);
//! assert_eq!(doubled.get(), 10);
//!
//! // Deferred work (flushes, event relays) runs when the queue ticks
//! circuit.run_until_idle()?;
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod reactive;

pub use config::CircuitConfig;
pub use error::{CircuitError, Result};
pub use graph::{NodeId, NodeInfo, NodeKind};
pub use reactive::{Circuit, Dispatch, Event, Payload, Prop, TaskQueue};

/// Default payload of an untyped circuit.
pub use serde_json::Value;
