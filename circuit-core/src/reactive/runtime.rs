//! Deferred Callback Runtime
//!
//! The task queue is the circuit's notion of "later": every deferred flush,
//! self-refresh and event relay is pushed here and runs once the current
//! synchronous call stack has unwound and the owner ticks the queue.
//!
//! # How It Works
//!
//! 1. `defer` appends a callback to the back of the queue.
//!
//! 2. `tick` runs exactly the callbacks that were queued when the tick
//!    started, in FIFO order. Callbacks deferred while the tick runs wait
//!    for the next tick, the same way a zero-delay timer scheduled from inside
//!    a timer fires on a later turn of an event loop.
//!
//! 3. `run_until_idle` and `drive` tick until nothing is left.
//!
//! # Threading
//!
//! The queue is single-threaded (`Rc`/`RefCell`). Cloning it shares the same
//! queue, which lets several circuits advance in lockstep.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::error::Result;

type Task = Box<dyn FnOnce() -> Result<()>>;

/// FIFO queue of deferred callbacks.
#[derive(Clone, Default)]
pub struct TaskQueue {
    tasks: Rc<RefCell<VecDeque<Task>>>,
}

impl TaskQueue {
    /// Create a new empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a callback for the next tick.
    pub fn defer<F>(&self, task: F)
    where
        F: FnOnce() -> Result<()> + 'static,
    {
        self.tasks.borrow_mut().push_back(Box::new(task));
    }

    /// Run the callbacks queued before this call. Returns how many ran.
    ///
    /// If a callback fails, the tick stops there: the callbacks after it stay
    /// queued and the error is returned.
    pub fn tick(&self) -> Result<usize> {
        let batch = self.len();
        let mut ran = 0;

        while ran < batch {
            // The borrow ends before the task runs so it can defer more work.
            let task = self.tasks.borrow_mut().pop_front();
            let Some(task) = task else { break };
            ran += 1;
            task()?;
        }

        if ran > 0 {
            trace!(ran, queued = self.len(), "tick");
        }
        Ok(ran)
    }

    /// Tick until the queue is empty. Returns the total number of callbacks run.
    ///
    /// Graphs that keep refreshing themselves (a prop bound to itself through
    /// a function that never settles) keep the queue busy forever.
    pub fn run_until_idle(&self) -> Result<usize> {
        let mut total = 0;
        while !self.is_idle() {
            total += self.tick()?;
        }
        Ok(total)
    }

    /// Like `run_until_idle`, yielding to the tokio runtime between ticks.
    pub async fn drive(&self) -> Result<usize> {
        let mut total = 0;
        while !self.is_idle() {
            total += self.tick()?;
            tokio::task::yield_now().await;
        }
        Ok(total)
    }

    /// Number of queued callbacks.
    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Whether nothing is queued.
    pub fn is_idle(&self) -> bool {
        self.tasks.borrow().is_empty()
    }

    /// Whether two handles share the same queue.
    pub fn same_queue(&self, other: &TaskQueue) -> bool {
        Rc::ptr_eq(&self.tasks, &other.tasks)
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("queued", &self.len())
            .finish()
    }
}
