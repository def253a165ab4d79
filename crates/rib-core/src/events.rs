//! Named-channel publish/subscribe with deferred delivery.
//!
//! An [`EventSource`] owns a set of declared channels. Firing a payload
//! queues one delivery per current binding on the session's
//! [`DispatchQueue`]; handlers run when the queue drains. Each delivery
//! carries the liveness flag of its binding, so unbinding before the drain
//! cancels deliveries that were already queued.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::queue::DispatchQueue;

/// Payload type of an event source. Each variant names its own channel.
pub trait EventPayload: Clone + fmt::Debug + 'static {
    fn channel(&self) -> &'static str;
}

/// One fired event, shared by all of its deliveries.
#[derive(Debug, Clone, PartialEq)]
pub struct Event<E> {
    /// Taken from the queue's counter when the event was fired.
    pub id: u64,
    pub payload: E,
}

impl<E: EventPayload> Event<E> {
    pub fn name(&self) -> &'static str {
        self.payload.channel()
    }
}

/// Subscriber callback. The second argument is the data given at bind time.
pub type Handler<E> = Rc<dyn Fn(&Event<E>, Option<&str>)>;

/// Wrap a closure as a [`Handler`].
pub fn handler<E>(f: impl Fn(&Event<E>, Option<&str>) + 'static) -> Handler<E> {
    Rc::new(f)
}

/// Identifies a single binding for targeted removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingId(u64);

struct Binding<E> {
    id: BindingId,
    handler: Handler<E>,
    data: Option<SmolStr>,
    live: Rc<Cell<bool>>,
}

impl<E> Binding<E> {
    fn kill(&self) {
        self.live.set(false);
    }
}

struct SourceInner<E> {
    label: &'static str,
    queue: DispatchQueue,
    channels: RefCell<IndexMap<&'static str, Vec<Binding<E>>>>,
    suppressed: Cell<u32>,
    next_binding: Cell<u64>,
}

/// A set of named event channels. Cloning shares the source.
pub struct EventSource<E> {
    inner: Rc<SourceInner<E>>,
}

impl<E> Clone for EventSource<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E> fmt::Debug for EventSource<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channels = self.inner.channels.borrow();
        f.debug_struct("EventSource")
            .field("label", &self.inner.label)
            .field("channels", &channels.keys().collect::<Vec<_>>())
            .field("suppressed", &self.inner.suppressed.get())
            .finish()
    }
}

impl<E: EventPayload> EventSource<E> {
    /// `label` names the source in log output.
    pub fn new(label: &'static str, queue: DispatchQueue) -> Self {
        Self {
            inner: Rc::new(SourceInner {
                label,
                queue,
                channels: RefCell::new(IndexMap::new()),
                suppressed: Cell::new(0),
                next_binding: Cell::new(1),
            }),
        }
    }

    pub fn queue(&self) -> &DispatchQueue {
        &self.inner.queue
    }

    /// Register a channel. Declaring twice keeps the existing bindings.
    pub fn declare(&self, name: &'static str) {
        self.inner.channels.borrow_mut().entry(name).or_default();
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.inner.channels.borrow().contains_key(name)
    }

    /// Bindings currently on `name`; zero for undeclared channels.
    pub fn binding_count(&self, name: &str) -> usize {
        self.inner
            .channels
            .borrow()
            .get(name)
            .map_or(0, |bindings| bindings.len())
    }

    /// Subscribe `handler` to `name`. The same handler may be bound more
    /// than once; each binding gets its own delivery.
    pub fn bind(
        &self,
        name: &str,
        handler: Handler<E>,
        data: Option<SmolStr>,
    ) -> Option<BindingId> {
        let mut channels = self.inner.channels.borrow_mut();
        let Some(bindings) = channels.get_mut(name) else {
            tracing::warn!(source = self.inner.label, event = name, "bind to unknown event");
            return None;
        };
        let id = BindingId(self.inner.next_binding.get());
        self.inner.next_binding.set(id.0 + 1);
        bindings.push(Binding {
            id,
            handler,
            data,
            live: Rc::new(Cell::new(true)),
        });
        Some(id)
    }

    /// Remove bindings of `name`.
    ///
    /// Without a handler every binding goes. With a handler, bindings of that
    /// handler (by pointer identity) go, narrowed to matching `data` when
    /// given. Returns how many were removed.
    pub fn unbind(&self, name: &str, handler: Option<&Handler<E>>, data: Option<&str>) -> usize {
        let mut channels = self.inner.channels.borrow_mut();
        let Some(bindings) = channels.get_mut(name) else {
            tracing::warn!(source = self.inner.label, event = name, "unbind from unknown event");
            return 0;
        };
        let before = bindings.len();
        bindings.retain(|binding| {
            let matches = match (handler, data) {
                (None, _) => true,
                (Some(h), None) => Rc::ptr_eq(h, &binding.handler),
                (Some(h), Some(d)) => {
                    Rc::ptr_eq(h, &binding.handler) && binding.data.as_deref() == Some(d)
                }
            };
            if matches {
                binding.kill();
            }
            !matches
        });
        let removed = before - bindings.len();
        if removed == 0 {
            tracing::debug!(source = self.inner.label, event = name, "redundant unbind");
        }
        removed
    }

    /// Remove one binding by id, on whichever channel holds it.
    pub fn unbind_binding(&self, id: BindingId) -> bool {
        let mut channels = self.inner.channels.borrow_mut();
        for bindings in channels.values_mut() {
            if let Some(pos) = bindings.iter().position(|b| b.id == id) {
                bindings.remove(pos).kill();
                return true;
            }
        }
        tracing::debug!(source = self.inner.label, ?id, "redundant unbind");
        false
    }

    /// Queue `payload` for every binding of its channel.
    ///
    /// Returns the number of deliveries queued: zero while suppressed, for
    /// channels nobody listens to, and for undeclared channels.
    pub fn fire(&self, payload: E) -> usize {
        let name = payload.channel();
        if self.is_suppressed() {
            tracing::trace!(source = self.inner.label, event = name, "suppressed");
            return 0;
        }
        let deliveries: Vec<_> = {
            let channels = self.inner.channels.borrow();
            let Some(bindings) = channels.get(name) else {
                tracing::warn!(source = self.inner.label, event = name, "fire of unknown event");
                return 0;
            };
            bindings
                .iter()
                .map(|b| (b.handler.clone(), b.data.clone(), b.live.clone()))
                .collect()
        };

        let queue = &self.inner.queue;
        let event = Rc::new(Event {
            id: queue.next_event_id(),
            payload,
        });
        tracing::trace!(
            source = self.inner.label,
            event = name,
            id = event.id,
            deliveries = deliveries.len(),
            "fire"
        );
        let count = deliveries.len();
        for (handler, data, live) in deliveries {
            let event = event.clone();
            queue.push(live, move || handler(&event, data.as_deref()));
        }
        count
    }

    /// Nest (`true`) or un-nest (`false`) suppression. Un-nesting below zero
    /// is ignored. No event is fired when suppression ends.
    pub fn suppress(&self, on: bool) {
        let depth = self.inner.suppressed.get();
        let depth = if on { depth + 1 } else { depth.saturating_sub(1) };
        self.inner.suppressed.set(depth);
    }

    pub fn is_suppressed(&self) -> bool {
        self.inner.suppressed.get() > 0
    }
}
