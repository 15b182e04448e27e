//! Deferred-callback scheduling.
//!
//! The underlying engine is synchronous, but the exposed contract is the one
//! of a genuinely asynchronous driver: a caller may register a callback and
//! then synchronously perform setup that assumes the callback has not fired
//! yet. Every callback invocation and every lifecycle event therefore passes
//! through [`Scheduler::defer`], which runs the thunk only after the current
//! synchronous call stack has unwound.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

type Task = Box<dyn FnOnce()>;

/// Single-threaded cooperative task queue.
///
/// Tasks queued while another task runs land at the back of the queue, one
/// tick later, which is what keeps re-entrant open/close sequences ordered.
#[derive(Default)]
pub struct Scheduler {
    queue: RefCell<VecDeque<Task>>,
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Rc<Scheduler> {
        Rc::new(Scheduler::default())
    }

    /// Schedule `task` to run after the current call stack unwinds.
    pub fn defer(&self, task: impl FnOnce() + 'static) {
        self.queue.borrow_mut().push_back(Box::new(task));
    }

    /// Run the next pending task, if any. Returns whether one ran.
    ///
    /// The queue borrow is released before the task runs, so a task may
    /// defer further work.
    pub fn tick(&self) -> bool {
        let next = self.queue.borrow_mut().pop_front();
        match next {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Drain the queue, including tasks deferred while draining.
    pub fn run_until_idle(&self) {
        while self.tick() {}
    }

    /// Number of tasks currently pending.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }
}
