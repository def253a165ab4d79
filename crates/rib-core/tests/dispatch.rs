//! Delivery order, suppression and unbind-before-drain across event sources
//! sharing one dispatch queue.

use std::cell::RefCell;
use std::rc::Rc;

use rib_core::model::MODEL_UPDATED;
use rib_core::tree::PAGE_TYPE;
use rib_core::{
    DesignRoot, DispatchQueue, Event, EventPayload, EventSource, ModelUpdate, WidgetRegistry,
    handler,
};

#[derive(Debug, Clone, PartialEq)]
enum Signal {
    Open(u32),
    Close(u32),
}

impl EventPayload for Signal {
    fn channel(&self) -> &'static str {
        match self {
            Signal::Open(_) => "open",
            Signal::Close(_) => "close",
        }
    }
}

fn source(label: &'static str, queue: &DispatchQueue) -> EventSource<Signal> {
    let source = EventSource::new(label, queue.clone());
    source.declare("open");
    source.declare("close");
    source
}

type Log = Rc<RefCell<Vec<(u64, &'static str, Signal)>>>;

fn listen(source: &EventSource<Signal>, name: &'static str, tag: &'static str, log: &Log) {
    let log = log.clone();
    source.bind(
        name,
        handler(move |event: &Event<Signal>, _| {
            log.borrow_mut().push((event.id, tag, event.payload.clone()))
        }),
        None,
    );
}

#[test]
fn test_fifo_across_sources_and_channels() {
    let queue = DispatchQueue::new();
    let a = source("a", &queue);
    let b = source("b", &queue);
    let log: Log = Rc::default();
    listen(&a, "open", "a1", &log);
    listen(&a, "open", "a2", &log);
    listen(&a, "close", "a-close", &log);
    listen(&b, "open", "b", &log);

    a.fire(Signal::Open(1));
    b.fire(Signal::Open(2));
    a.fire(Signal::Close(3));
    b.fire(Signal::Close(4));
    a.fire(Signal::Open(5));
    assert_eq!(queue.drain(), 6);

    let log = log.borrow();
    let order: Vec<_> = log.iter().map(|(_, tag, s)| (*tag, s.clone())).collect();
    assert_eq!(
        order,
        [
            ("a1", Signal::Open(1)),
            ("a2", Signal::Open(1)),
            ("b", Signal::Open(2)),
            ("a-close", Signal::Close(3)),
            ("a1", Signal::Open(5)),
            ("a2", Signal::Open(5)),
        ]
    );
    // Ids never go backwards; both deliveries of one fire share an id.
    assert!(log.windows(2).all(|w| w[0].0 <= w[1].0));
    let mut ids: Vec<_> = log.iter().map(|(id, _, _)| *id).collect();
    ids.dedup();
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_handlers_firing_more_events_append() {
    let queue = DispatchQueue::new();
    let a = source("a", &queue);
    let log: Log = Rc::default();
    {
        let relay = a.clone();
        a.bind(
            "open",
            handler(move |event: &Event<Signal>, _| {
                if let Signal::Open(n) = event.payload {
                    relay.fire(Signal::Close(n));
                }
            }),
            None,
        );
    }
    listen(&a, "open", "open", &log);
    listen(&a, "close", "close", &log);

    a.fire(Signal::Open(1));
    a.fire(Signal::Open(2));
    queue.drain();

    let tags: Vec<_> = log.borrow().iter().map(|(_, t, s)| (*t, s.clone())).collect();
    assert_eq!(
        tags,
        [
            ("open", Signal::Open(1)),
            ("open", Signal::Open(2)),
            ("close", Signal::Close(1)),
            ("close", Signal::Close(2)),
        ]
    );
}

#[test]
fn test_unbind_before_drain_cancels_delivery() {
    let queue = DispatchQueue::new();
    let a = source("a", &queue);
    let log: Log = Rc::default();
    let seen = log.clone();
    let h = handler(move |event: &Event<Signal>, _| {
        seen.borrow_mut().push((event.id, "h", event.payload.clone()))
    });
    a.bind("open", h.clone(), None);

    a.fire(Signal::Open(1));
    assert_eq!(a.unbind("open", Some(&h), None), 1);
    // Bound after the fire: not a recipient of it.
    listen(&a, "open", "late", &log);
    queue.drain();
    assert!(log.borrow().is_empty());

    a.fire(Signal::Open(2));
    queue.drain();
    assert_eq!(log.borrow().len(), 1);
    assert_eq!(log.borrow()[0].1, "late");
}

#[test]
fn test_suppressed_edits_are_not_replayed() {
    let queue = DispatchQueue::new();
    let root = DesignRoot::new(Rc::new(WidgetRegistry::builtin()), queue.clone()).unwrap();
    let seen = Rc::new(RefCell::new(Vec::new()));
    {
        let seen = seen.clone();
        root.events().bind(
            MODEL_UPDATED,
            handler(move |event: &Event<ModelUpdate>, _| seen.borrow_mut().push(event.payload.clone())),
            None,
        );
    }

    root.events().suppress(true);
    root.events().suppress(true);
    let page = root.create_node(PAGE_TYPE, true).unwrap();
    root.add_child(root.id(), page, None, None).unwrap();
    let label = root.create_node("Label", true).unwrap();
    root.add_child(page, label, None, None).unwrap();
    root.events().suppress(false);
    root.set_property(label, "text", Some("still quiet".into())).unwrap();
    root.events().suppress(false);
    assert!(queue.is_empty());

    root.set_property(label, "text", Some("heard".into())).unwrap();
    queue.drain();

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert!(matches!(
        &seen[0],
        ModelUpdate::PropertyChanged { node, new_value, .. }
            if *node == label && new_value.as_str() == Some("heard")
    ));
}
