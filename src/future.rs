//! Single-assignment result cells.
//!
//! A [`Future`] is an observable cell that bridges asynchronous completion to
//! callback-driven code. It starts pending and makes exactly one transition
//! to a terminal state: resolved with a value, failed with a [`TaskError`],
//! or cancelled. Done-callbacks never run inline; they are handed to the
//! owning [`Scheduler`](crate::Scheduler) and run on a subsequent turn, so a
//! caller can always reason about callback ordering relative to the turn in
//! which it registered.
//!
//! Futures are created by [`Scheduler::create_future`](crate::Scheduler::create_future)
//! and are `Rc`-shared between the scheduler's bookkeeping and any number of
//! holders. The whole reactor is single-threaded, so futures are
//! intentionally not `Send`.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{InvalidStateError, TaskError};
use crate::scheduler::Spawner;

/// Observable lifecycle state of a [`Future`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FutureState {
    /// Not yet settled.
    Pending,
    /// Settled with a value.
    Resolved,
    /// Settled with an error.
    Failed,
    /// Cancelled before settling.
    Cancelled,
}

impl FutureState {
    fn name(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolved => "resolved",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

enum State<T> {
    Pending,
    Resolved(Rc<T>),
    Failed(TaskError),
    Cancelled,
}

impl<T> State<T> {
    fn observable(&self) -> FutureState {
        match self {
            Self::Pending => FutureState::Pending,
            Self::Resolved(_) => FutureState::Resolved,
            Self::Failed(_) => FutureState::Failed,
            Self::Cancelled => FutureState::Cancelled,
        }
    }
}

type Callback<T> = Box<dyn FnOnce(Future<T>)>;

struct Shared<T> {
    state: State<T>,
    callbacks: Vec<Callback<T>>,
    spawner: Spawner,
}

/// A single-assignment, observable result cell.
///
/// Cloning a `Future` clones the handle, not the cell; all clones observe
/// the same state.
pub struct Future<T> {
    shared: Rc<RefCell<Shared<T>>>,
}

impl<T> Clone for Future<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<T: 'static> Future<T> {
    pub(crate) fn new(spawner: Spawner) -> Self {
        Self {
            shared: Rc::new(RefCell::new(Shared {
                state: State::Pending,
                callbacks: Vec::new(),
                spawner,
            })),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> FutureState {
        self.shared.borrow().state.observable()
    }

    /// Whether the future has not yet settled.
    pub fn is_pending(&self) -> bool {
        self.state() == FutureState::Pending
    }

    /// Whether the future reached any terminal state.
    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }

    /// The resolved value, if any.
    pub fn value(&self) -> Option<Rc<T>> {
        match &self.shared.borrow().state {
            State::Resolved(value) => Some(Rc::clone(value)),
            _ => None,
        }
    }

    /// The failure, if the future failed.
    pub fn error(&self) -> Option<TaskError> {
        match &self.shared.borrow().state {
            State::Failed(err) => Some(err.clone()),
            _ => None,
        }
    }

    /// Transition pending → resolved.
    ///
    /// All registered done-callbacks are scheduled to run exactly once each,
    /// in registration order. Fails with [`InvalidStateError`] if the future
    /// is already terminal.
    pub fn resolve(&self, value: T) -> Result<(), InvalidStateError> {
        self.settle(State::Resolved(Rc::new(value)))
    }

    /// Transition pending → failed, symmetric to [`resolve`](Self::resolve).
    pub fn fail(&self, error: TaskError) -> Result<(), InvalidStateError> {
        self.settle(State::Failed(error))
    }

    /// Transition pending → cancelled.
    ///
    /// A no-op, not an error, if the future is already terminal.
    pub fn cancel(&self) {
        let _ = self.settle(State::Cancelled);
    }

    /// Register a callback to run once the future becomes terminal.
    ///
    /// If the future is already terminal, the callback is scheduled to run
    /// on the next scheduling turn; it never runs synchronously inline.
    pub fn on_done(&self, callback: impl FnOnce(Future<T>) + 'static) {
        let mut shared = self.shared.borrow_mut();
        if matches!(shared.state, State::Pending) {
            shared.callbacks.push(Box::new(callback));
            return;
        }
        let spawner = shared.spawner.clone();
        drop(shared);
        let handle = self.clone();
        spawner.enqueue(Box::new(move || callback(handle)));
    }

    fn settle(&self, next: State<T>) -> Result<(), InvalidStateError> {
        let mut shared = self.shared.borrow_mut();
        if !matches!(shared.state, State::Pending) {
            return Err(InvalidStateError(shared.state.observable().name()));
        }
        shared.state = next;
        let callbacks = std::mem::take(&mut shared.callbacks);
        let spawner = shared.spawner.clone();
        drop(shared);
        for callback in callbacks {
            let handle = self.clone();
            spawner.enqueue(Box::new(move || callback(handle)));
        }
        Ok(())
    }
}
