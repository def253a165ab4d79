//! DOM events to canvas input.
//!
//! Every element the code generator emits for a node carries a `data-uid`
//! attribute. Events are mapped to the nearest such element, so clicks on
//! inner markup (an `<h1>` inside a header) land on the owning node.

use std::rc::Rc;

use gloo_events::{EventListener, EventListenerOptions};
use rib_core::{CanvasInput, DragSource, SmolStr, Uid};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{DataTransfer, DragEvent, Element, EventTarget};

use crate::frame::IframeFrame;

/// Drag data type carrying a palette widget type.
pub const DRAG_WIDGET_MIME: &str = "application/x-rib-widget";
/// Drag data type carrying the uid of a node being moved.
pub const DRAG_NODE_MIME: &str = "application/x-rib-node";

/// Uid of the nearest `data-uid` element at or above `target`.
pub fn uid_of(target: Option<EventTarget>) -> Option<Uid> {
    let element = target?.dyn_into::<Element>().ok()?;
    let marked = element.closest("[data-uid]").ok()??;
    Uid::parse(&marked.get_attribute("data-uid")?)
}

/// Store `source` on a drag that is starting.
pub fn set_drag_source(data: &DataTransfer, source: &DragSource) -> Result<(), JsValue> {
    match source {
        DragSource::Palette(widget_type) => data.set_data(DRAG_WIDGET_MIME, widget_type),
        DragSource::Node(uid) => data.set_data(DRAG_NODE_MIME, &uid.to_string()),
    }
}

/// Read back what [`set_drag_source`] stored.
pub fn drag_source(data: &DataTransfer) -> Option<DragSource> {
    if let Some(uid) = data
        .get_data(DRAG_NODE_MIME)
        .ok()
        .and_then(|text| Uid::parse(&text))
    {
        return Some(DragSource::Node(uid));
    }
    data.get_data(DRAG_WIDGET_MIME)
        .ok()
        .filter(|text| !text.is_empty())
        .map(|text| DragSource::Palette(SmolStr::new(text)))
}

/// `DragOver` or `Drop` input for a drag event over a node.
pub fn drag_input(event: &DragEvent, drop: bool) -> Option<CanvasInput> {
    let source = drag_source(&event.data_transfer()?)?;
    let target = uid_of(event.target())?;
    Some(if drop {
        CanvasInput::Drop {
            source,
            target,
            index: None,
        }
    } else {
        CanvasInput::DragOver {
            source,
            target,
            index: None,
        }
    })
}

/// Click and drag listeners on the canvas document.
///
/// Listeners are removed when this is dropped.
pub struct CanvasListeners {
    _listeners: Vec<EventListener>,
}

impl CanvasListeners {
    /// Listen on `frame`'s document, passing translated input to `on_input`.
    ///
    /// `None` when the iframe has no document yet.
    pub fn attach(frame: &IframeFrame, on_input: impl Fn(CanvasInput) + 'static) -> Option<Self> {
        let document = frame.document()?;
        let target: &EventTarget = document.as_ref();
        let on_input: Rc<dyn Fn(CanvasInput)> = Rc::new(on_input);

        let click = {
            let on_input = on_input.clone();
            EventListener::new(target, "click", move |event| {
                on_input(CanvasInput::Click(uid_of(event.target())));
            })
        };

        let drag_listener = |name: &'static str, drop: bool| {
            let on_input = on_input.clone();
            // Both must cancel the default for the drop to be accepted.
            EventListener::new_with_options(
                target,
                name,
                EventListenerOptions::enable_prevent_default(),
                move |event| {
                    let Some(drag) = event.dyn_ref::<DragEvent>() else {
                        return;
                    };
                    if let Some(input) = drag_input(drag, drop) {
                        event.prevent_default();
                        on_input(input);
                    }
                },
            )
        };
        let dragover = drag_listener("dragover", false);
        let drop = drag_listener("drop", true);

        tracing::debug!("canvas listeners attached");
        Some(Self {
            _listeners: vec![click, dragover, drop],
        })
    }
}
