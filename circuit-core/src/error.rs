//! Error types for circuit operations.
//!
//! Every error is raised synchronously by the call that broke the contract.
//! Once past validation, propagation itself does not fail.

use thiserror::Error;

use crate::graph::{NodeId, NodeKind};

/// The main error type for circuit operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CircuitError {
    /// A node id does not belong to this circuit.
    #[error("node {0} does not belong to this circuit")]
    UnknownNode(NodeId),

    /// Attempted to connect a prop with an event.
    #[error("cannot connect a {from} node to a {to} node")]
    TypeMismatch {
        /// Kind of the source node.
        from: NodeKind,
        /// Kind of the target node.
        to: NodeKind,
    },

    /// Attempted to remove an edge that does not exist.
    #[error("{from} is not connected to {to}")]
    NotConnected {
        /// The source node.
        from: NodeId,
        /// The target node.
        to: NodeId,
    },

    /// A flush ran more passes than configured without settling.
    #[error("flush did not settle after {passes} passes ({pending} nodes still pending)")]
    FlushLimitExceeded {
        /// The configured limit.
        passes: usize,
        /// Nodes left in the pending set.
        pending: usize,
    },
}

/// Result alias for circuit operations.
pub type Result<T> = std::result::Result<T, CircuitError>;
