//! The canvas document, hosted in an iframe.
//!
//! The iframe isolates the generated page markup (and whatever stylesheet
//! the shell loads into it) from the builder's own UI. Only the body is
//! replaced on reload, so listeners on the iframe document survive.

use rib_core::{CanvasFrame, DragSource, DropTarget, Uid};
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlIFrameElement};

/// Class put on the element a drag would drop into.
pub const DROP_TARGET_CLASS: &str = "rib-drop-target";

/// [`CanvasFrame`] over an `<iframe>`.
pub struct IframeFrame {
    iframe: HtmlIFrameElement,
}

impl IframeFrame {
    pub fn new(iframe: HtmlIFrameElement) -> Self {
        Self { iframe }
    }

    /// Look up the iframe by element id in the main document.
    pub fn from_id(id: &str) -> Option<Self> {
        let document = web_sys::window()?.document()?;
        let iframe = document
            .get_element_by_id(id)?
            .dyn_into::<HtmlIFrameElement>()
            .ok()?;
        Some(Self::new(iframe))
    }

    pub fn iframe(&self) -> &HtmlIFrameElement {
        &self.iframe
    }

    /// The iframe's document. `None` until the iframe is in the page.
    pub fn document(&self) -> Option<Document> {
        self.iframe.content_document()
    }

    /// The element rendered for `uid`.
    pub fn element(&self, uid: Uid) -> Option<Element> {
        self.document()?
            .query_selector(&format!("[data-uid=\"{uid}\"]"))
            .ok()?
    }

    fn clear_class(&self, class: &str) {
        let Some(document) = self.document() else {
            return;
        };
        let Ok(marked) = document.query_selector_all(&format!(".{class}")) else {
            return;
        };
        for i in 0..marked.length() {
            if let Some(element) = marked.item(i).and_then(|n| n.dyn_into::<Element>().ok()) {
                let _ = element.class_list().remove_1(class);
            }
        }
    }

    fn add_class(&self, uid: Uid, class: &str) {
        match self.element(uid) {
            Some(element) => {
                if let Err(e) = element.class_list().add_1(class) {
                    tracing::warn!(%uid, "failed to mark canvas element: {:?}", e);
                }
            }
            None => tracing::debug!(%uid, "no canvas element for node"),
        }
    }
}

impl CanvasFrame for IframeFrame {
    fn load(&mut self, html: &str) {
        match self.document().and_then(|d| d.body()) {
            Some(body) => body.set_inner_html(html),
            None => tracing::warn!("canvas iframe has no document yet"),
        }
    }

    fn set_selected(&mut self, node: Option<Uid>, class: &str) {
        self.clear_class(class);
        if let Some(uid) = node {
            self.add_class(uid, class);
        }
    }

    fn preview(&mut self, _source: &DragSource, target: Option<&DropTarget>) {
        self.clear_class(DROP_TARGET_CLASS);
        if let Some(target) = target {
            self.add_class(target.parent, DROP_TARGET_CLASS);
        }
    }
}
