//! Event Implementation
//!
//! An event is a stateless message node. Emitting it:
//!
//! 1. Captures a context value (`T::default()` when none is given).
//! 2. Runs the listener, if any, synchronously with a [`Dispatch`] handle.
//!    The listener may read or replace the context, cancel the automatic
//!    relay, and relay explicitly.
//! 3. Unless canceled, relays: one deferred delivery per target, in bind
//!    order, carrying the final context.
//!
//! The targets are read once, when the relay is scheduled. Targets bound
//! after that do not receive this dispatch. Events never cache and never
//! drop duplicate dispatches.

use std::fmt;

use tracing::trace;

use crate::graph::NodeId;

use super::circuit::Circuit;
use super::Payload;

/// Handle to an event node.
///
/// # Example
///
/// ```rust,ignore
/// let circuit: Circuit<i64> = Circuit::new();
/// let clicked = circuit.event_with(|event| {
///     let count = *event.context() + 1;
///     event.set_context(count);
/// });
/// let log = circuit.event_with(|event| println!("clicks: {}", event.context()));
/// circuit.bind(&clicked, &log)?;
///
/// clicked.emit_with(41);
/// circuit.tick()?; // prints "clicks: 42"
/// ```
pub struct Event<T> {
    id: NodeId,
    circuit: Circuit<T>,
}

impl<T: Payload> Event<T> {
    pub(crate) fn new(id: NodeId, circuit: Circuit<T>) -> Self {
        Self { id, circuit }
    }

    /// Get the node id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The circuit this event belongs to.
    pub fn circuit(&self) -> &Circuit<T> {
        &self.circuit
    }

    /// Dispatch with the default context.
    pub fn emit(&self) {
        self.circuit.emit_event(self.id, T::default());
    }

    /// Dispatch with `context` as the initial context.
    pub fn emit_with(&self, context: T) {
        self.circuit.emit_event(self.id, context);
    }
}

impl<T: Payload> Clone for Event<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            circuit: self.circuit.clone(),
        }
    }
}

impl<T: Payload> From<&Event<T>> for NodeId {
    fn from(event: &Event<T>) -> Self {
        event.id
    }
}

impl<T: Payload> fmt::Debug for Event<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event").field("id", &self.id).finish()
    }
}

/// Control handle passed to a listener for one dispatch.
pub struct Dispatch<'a, T> {
    circuit: &'a Circuit<T>,
    node: NodeId,
    context: T,
    canceled: bool,
}

impl<'a, T: Payload> Dispatch<'a, T> {
    /// The event being dispatched.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The current context.
    pub fn context(&self) -> &T {
        &self.context
    }

    /// Mutable access to the context.
    pub fn context_mut(&mut self) -> &mut T {
        &mut self.context
    }

    /// Replace the context.
    pub fn set_context(&mut self, context: T) {
        self.context = context;
    }

    /// Suppress the automatic relay after the listener returns.
    pub fn cancel(&mut self) {
        self.canceled = true;
    }

    /// Whether the automatic relay has been canceled.
    pub fn is_canceled(&self) -> bool {
        self.canceled
    }

    /// Relay now, with the current context, whether canceled or not.
    ///
    /// Without a `cancel()` the automatic relay still follows, so the
    /// targets receive the event twice.
    pub fn dispatch(&self) {
        self.circuit.relay(self.node, &self.context);
    }

    /// The circuit the event belongs to.
    pub fn circuit(&self) -> &Circuit<T> {
        self.circuit
    }
}

impl<T: Payload + fmt::Debug> fmt::Debug for Dispatch<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch")
            .field("node", &self.node)
            .field("context", &self.context)
            .field("canceled", &self.canceled)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Engine
// ----------------------------------------------------------------------------

impl<T: Payload> Circuit<T> {
    pub(crate) fn emit_event(&self, id: NodeId, context: T) {
        let listener = self
            .inner
            .nodes
            .borrow()
            .get(&id)
            .and_then(|node| node.as_event())
            .and_then(|state| state.listener.clone());

        let mut dispatch = Dispatch {
            circuit: self,
            node: id,
            context,
            canceled: false,
        };
        if let Some(listener) = listener {
            listener(&mut dispatch);
        }

        if dispatch.canceled {
            trace!(node = %id, "relay canceled");
        } else {
            self.relay(id, &dispatch.context);
        }
    }

    /// Schedule one delivery per current target.
    fn relay(&self, id: NodeId, context: &T) {
        let targets: Vec<NodeId> = self
            .inner
            .nodes
            .borrow()
            .get(&id)
            .map(|node| node.targets().to_vec())
            .unwrap_or_default();

        trace!(node = %id, targets = targets.len(), "relay");
        for target in targets {
            let circuit = self.downgrade();
            let context = context.clone();
            self.inner.queue.defer(move || {
                if let Some(inner) = circuit.upgrade() {
                    Circuit::from_inner(inner).emit_event(target, context);
                }
                Ok(())
            });
        }
    }
}
