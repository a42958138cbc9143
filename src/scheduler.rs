//! Single-threaded cooperative reactor.
//!
//! The [`Scheduler`] is the one driver of cooperative execution: it creates
//! futures, runs immediate, delayed, and periodic callbacks, enforces
//! timeout-guarded waits, and tracks every outstanding task so that one
//! teardown path can cancel them all. Every primitive funnels through the
//! same ready queue, so no orphaned callback can fire after shutdown.
//!
//! # Design Philosophy
//!
//! - **Single-threaded**: callbacks, timeouts, and message handlers all run
//!   interleaved on one logical thread. No locking, no data races.
//! - **Monotonic time**: delays are measured with [`Instant`], relative to
//!   issue time. Wall-clock adjustments never fire a callback early or lose
//!   it.
//! - **Contained failure**: an error returned by a callback is caught at the
//!   task boundary and reported via `tracing`; it never crashes the reactor.
//!   The cancellation signal ([`TaskError::Cancelled`]) is the one exception
//!   that is always honored as a cancellation, never as a failure.
//!
//! # Example
//!
//! ```
//! use slirc_client::Scheduler;
//!
//! let sched = Scheduler::new();
//! let fut = sched.create_future::<u32>();
//!
//! let trigger = fut.clone();
//! sched.schedule(move || {
//!     trigger.resolve(42).ok();
//!     Ok(())
//! });
//!
//! sched.run_until(&fut);
//! assert_eq!(*fut.value().unwrap(), 42);
//! ```

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::rc::{Rc, Weak};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{error, trace};

use crate::error::TaskError;
use crate::future::Future;

type OnceFn = Box<dyn FnOnce() -> Result<(), TaskError>>;
type PeriodicFn = Box<dyn FnMut() -> Result<bool, TaskError>>;

enum TaskKind {
    Once(OnceFn),
    Periodic {
        interval: Duration,
        callback: PeriodicFn,
    },
}

struct Task {
    flag: Rc<Cell<bool>>,
    kind: TaskKind,
}

struct TimerEntry {
    due: Instant,
    seq: u64,
    task: Task,
}

// Min-heap on (due, seq): earliest deadline first, issue order breaking ties.
impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for TimerEntry {}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct Core {
    ready: VecDeque<Task>,
    timers: BinaryHeap<TimerEntry>,
    next_seq: u64,
    running: bool,
    stopped: bool,
}

/// Enqueues deferred thunks onto the reactor's ready queue.
///
/// Held by futures so that settling one can schedule its done-callbacks for
/// the next turn. Holds only a weak reference; once the scheduler is gone,
/// enqueueing becomes a no-op.
#[derive(Clone)]
pub(crate) struct Spawner {
    core: Weak<RefCell<Core>>,
}

impl Spawner {
    pub(crate) fn enqueue(&self, thunk: Box<dyn FnOnce()>) {
        if let Some(core) = self.core.upgrade() {
            core.borrow_mut().ready.push_back(Task {
                flag: Rc::new(Cell::new(false)),
                kind: TaskKind::Once(Box::new(move || {
                    thunk();
                    Ok(())
                })),
            });
        }
    }
}

/// Opaque cancellable reference to a scheduled task.
///
/// Cancellation is idempotent; cancelling a handle whose task already fired
/// is a no-op.
#[derive(Clone, Debug)]
pub struct TaskHandle {
    flag: Rc<Cell<bool>>,
}

impl TaskHandle {
    /// Cancel the task. The callback will not be invoked.
    pub fn cancel(&self) {
        self.flag.set(true);
    }

    /// Whether this handle has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.flag.get()
    }
}

/// The cooperative reactor. Cheap to clone; clones share one core.
#[derive(Clone)]
pub struct Scheduler {
    core: Rc<RefCell<Core>>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Create a new, idle scheduler.
    pub fn new() -> Self {
        Self {
            core: Rc::new(RefCell::new(Core {
                ready: VecDeque::new(),
                timers: BinaryHeap::new(),
                next_seq: 0,
                running: false,
                stopped: false,
            })),
        }
    }

    /// Create a new pending [`Future`] tied to this scheduler.
    pub fn create_future<T: 'static>(&self) -> Future<T> {
        Future::new(Spawner {
            core: Rc::downgrade(&self.core),
        })
    }

    /// Run `callback` as soon as the current turn yields.
    ///
    /// Callbacks scheduled this way run in issue order.
    pub fn schedule(
        &self,
        callback: impl FnOnce() -> Result<(), TaskError> + 'static,
    ) -> TaskHandle {
        let flag = Rc::new(Cell::new(false));
        self.core.borrow_mut().ready.push_back(Task {
            flag: Rc::clone(&flag),
            kind: TaskKind::Once(Box::new(callback)),
        });
        TaskHandle { flag }
    }

    /// Run `callback` once `delay` has elapsed, measured monotonically from
    /// now.
    pub fn schedule_in(
        &self,
        delay: Duration,
        callback: impl FnOnce() -> Result<(), TaskError> + 'static,
    ) -> TaskHandle {
        let flag = Rc::new(Cell::new(false));
        self.push_timer(
            Instant::now() + delay,
            Task {
                flag: Rc::clone(&flag),
                kind: TaskKind::Once(Box::new(callback)),
            },
        );
        TaskHandle { flag }
    }

    /// Invoke `callback` every `interval`, starting one full interval from
    /// now.
    ///
    /// The task stops re-arming when the callback returns `Ok(false)` or
    /// returns an error; the re-arm deadline is measured from the end of the
    /// previous invocation, so a slow callback delays its own next firing
    /// rather than coalescing.
    pub fn schedule_periodically(
        &self,
        interval: Duration,
        callback: impl FnMut() -> Result<bool, TaskError> + 'static,
    ) -> TaskHandle {
        let flag = Rc::new(Cell::new(false));
        self.push_timer(
            Instant::now() + interval,
            Task {
                flag: Rc::clone(&flag),
                kind: TaskKind::Periodic {
                    interval,
                    callback: Box::new(callback),
                },
            },
        );
        TaskHandle { flag }
    }

    /// Attach a timeout-guarded completion handler to `future`.
    ///
    /// If the future does not settle within `timeout`, it is forced into the
    /// failed state with [`TaskError::Timeout`], exactly once. If it settles
    /// first, the pending timeout is cancelled before it can fire. Either
    /// way `callback` observes the terminal future exactly once: it is only
    /// ever invoked through the future's own done-callback path, and a
    /// timeout racing a same-turn completion loses because the force-fail is
    /// rejected by the already-terminal state.
    ///
    /// The returned handle cancels the timeout guard only; the completion
    /// callback stays attached.
    pub fn on_future<T: 'static>(
        &self,
        future: &Future<T>,
        timeout: Duration,
        callback: impl FnOnce(Future<T>) + 'static,
    ) -> TaskHandle {
        let guard = {
            let fut = future.clone();
            self.schedule_in(timeout, move || {
                // Rejected if the future already settled this turn.
                let _ = fut.fail(TaskError::Timeout);
                Ok(())
            })
        };
        let timeout_handle = guard.clone();
        future.on_done(move |fut| {
            timeout_handle.cancel();
            callback(fut);
        });
        guard
    }

    /// Idempotent cancellation of a pending task.
    pub fn unschedule(&self, handle: &TaskHandle) {
        handle.cancel();
    }

    /// Request shutdown, cancelling every outstanding task before the
    /// reactor halts.
    pub fn stop(&self) {
        self.core.borrow_mut().stopped = true;
        self.cancel_all();
    }

    /// Run the reactor until [`stop`](Self::stop) is requested or no work
    /// remains.
    pub fn run(&self) {
        {
            let mut core = self.core.borrow_mut();
            if core.running {
                return;
            }
            core.running = true;
            core.stopped = false;
        }

        loop {
            if self.core.borrow().stopped {
                break;
            }
            self.promote_due_timers();

            let task = self.core.borrow_mut().ready.pop_front();
            if let Some(task) = task {
                if !task.flag.get() {
                    self.execute(task);
                }
                continue;
            }

            // Idle: wait for the next deadline, or finish if there is none.
            let next_due = self.core.borrow().timers.peek().map(|entry| entry.due);
            match next_due {
                Some(due) => {
                    let now = Instant::now();
                    if due > now {
                        thread::sleep(due - now);
                    }
                }
                None => break,
            }
        }

        self.core.borrow_mut().running = false;
    }

    /// Run the reactor until `future` reaches a terminal state, then cancel
    /// all remaining outstanding tasks.
    pub fn run_until<T: 'static>(&self, future: &Future<T>) {
        let sched = self.clone();
        future.on_done(move |_| sched.stop());
        self.run();
    }

    fn push_timer(&self, due: Instant, task: Task) {
        let mut core = self.core.borrow_mut();
        let seq = core.next_seq;
        core.next_seq += 1;
        core.timers.push(TimerEntry { due, seq, task });
    }

    fn promote_due_timers(&self) {
        let now = Instant::now();
        let mut core = self.core.borrow_mut();
        while core
            .timers
            .peek()
            .is_some_and(|entry| entry.due <= now)
        {
            if let Some(entry) = core.timers.pop() {
                if entry.task.flag.get() {
                    continue;
                }
                core.ready.push_back(entry.task);
            }
        }
    }

    // Runs without the core borrowed, so callbacks are free to schedule.
    fn execute(&self, task: Task) {
        match task.kind {
            TaskKind::Once(callback) => match callback() {
                Ok(()) => {}
                Err(TaskError::Cancelled) => {
                    task.flag.set(true);
                    trace!("task cancelled from inside its callback");
                }
                Err(err) => error!(error = %err, "scheduled task failed"),
            },
            TaskKind::Periodic {
                interval,
                mut callback,
            } => match callback() {
                Ok(true) => {
                    if !task.flag.get() {
                        self.push_timer(
                            Instant::now() + interval,
                            Task {
                                flag: task.flag,
                                kind: TaskKind::Periodic { interval, callback },
                            },
                        );
                    }
                }
                Ok(false) => trace!("periodic task stopped by its sentinel"),
                Err(TaskError::Cancelled) => {
                    task.flag.set(true);
                    trace!("periodic task cancelled from inside its callback");
                }
                Err(err) => error!(error = %err, "periodic task failed, not re-arming"),
            },
        }
    }

    fn cancel_all(&self) {
        let (ready, timers) = {
            let mut core = self.core.borrow_mut();
            let ready = std::mem::take(&mut core.ready);
            let timers = std::mem::take(&mut core.timers);
            (ready, timers)
        };
        for task in &ready {
            task.flag.set(true);
        }
        for entry in timers.iter() {
            entry.task.flag.set(true);
        }
        // Callback captures drop here, outside the core borrow.
        drop(ready);
        drop(timers);
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        // Dropping the last external handle cancels everything still
        // queued. A queued callback that captured its own Scheduler clone
        // keeps the core alive until that callback runs or is cleared by
        // stop(); long-lived captures should prefer re-entry through a
        // handle passed in from outside.
        if Rc::strong_count(&self.core) == 1 {
            self.cancel_all();
        }
    }
}
