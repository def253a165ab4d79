//! Deferred delivery queue shared by every event source of a session.
//!
//! Firing an event never runs a handler directly. Deliveries are appended to
//! a FIFO queue and run when the owner drains it: the browser runtime after
//! the current task, tests and the CLI explicitly.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

/// Called when the queue goes from empty to non-empty.
pub type Scheduler = Rc<dyn Fn(&DispatchQueue)>;

struct Delivery {
    /// Cleared when the binding is removed before the delivery runs.
    live: Rc<Cell<bool>>,
    run: Box<dyn FnOnce()>,
}

struct QueueInner {
    tasks: RefCell<VecDeque<Delivery>>,
    next_event_id: Cell<u64>,
    draining: Cell<bool>,
    scheduler: RefCell<Option<Scheduler>>,
}

/// Single-threaded FIFO of pending deliveries. Cloning shares the queue.
#[derive(Clone)]
pub struct DispatchQueue {
    inner: Rc<QueueInner>,
}

impl Default for DispatchQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DispatchQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchQueue")
            .field("pending", &self.len())
            .field("next_event_id", &self.inner.next_event_id.get())
            .finish()
    }
}

impl DispatchQueue {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(QueueInner {
                tasks: RefCell::new(VecDeque::new()),
                next_event_id: Cell::new(1),
                draining: Cell::new(false),
                scheduler: RefCell::new(None),
            }),
        }
    }

    /// Install a hook that arranges for [`drain`](Self::drain) to run later.
    pub fn set_scheduler(&self, scheduler: impl Fn(&DispatchQueue) + 'static) {
        *self.inner.scheduler.borrow_mut() = Some(Rc::new(scheduler));
    }

    /// Next event id. Strictly increasing for the life of the queue.
    pub(crate) fn next_event_id(&self) -> u64 {
        let id = self.inner.next_event_id.get();
        self.inner.next_event_id.set(id + 1);
        id
    }

    pub(crate) fn push(&self, live: Rc<Cell<bool>>, run: impl FnOnce() + 'static) {
        let was_empty = {
            let mut tasks = self.inner.tasks.borrow_mut();
            let was_empty = tasks.is_empty();
            tasks.push_back(Delivery {
                live,
                run: Box::new(run),
            });
            was_empty
        };
        if was_empty && !self.inner.draining.get() {
            let scheduler = self.inner.scheduler.borrow().clone();
            if let Some(scheduler) = scheduler {
                scheduler(self);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.tasks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.tasks.borrow().is_empty()
    }

    pub fn is_draining(&self) -> bool {
        self.inner.draining.get()
    }

    /// Run the oldest delivery. Returns false when the queue was empty.
    ///
    /// A delivery whose binding was removed since it was queued is dropped
    /// without running, and still counts as one step.
    pub fn run_next(&self) -> bool {
        let Some(delivery) = self.inner.tasks.borrow_mut().pop_front() else {
            return false;
        };
        if delivery.live.get() {
            (delivery.run)();
        } else {
            tracing::trace!("skipping delivery for removed binding");
        }
        true
    }

    /// Run deliveries until the queue is empty, including any queued by
    /// handlers along the way. Returns how many ran or were skipped.
    ///
    /// Calling `drain` from inside a handler does nothing.
    pub fn drain(&self) -> usize {
        if self.inner.draining.replace(true) {
            return 0;
        }
        let mut steps = 0;
        while self.run_next() {
            steps += 1;
        }
        self.inner.draining.set(false);
        if steps > 0 {
            tracing::trace!(steps, "dispatch queue drained");
        }
        steps
    }

    /// Drop everything pending without running it.
    pub fn clear(&self) {
        self.inner.tasks.borrow_mut().clear();
    }
}
