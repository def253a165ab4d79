//! View synchronization.
//!
//! A view is any projection of the design that must stay in step with it:
//! the outline, the property sheet, the canvas. Views implement
//! [`DesignView`] and are driven by a [`ViewBinding`], which owns their
//! subscriptions:
//!
//! - the designer's `designReset`, `selectionChanged` and `activePageChanged`
//! - `modelUpdated` of the current design root
//!
//! When the design is reset the binding drops its subscription on the old
//! root, subscribes to the new one and then refreshes the view. It never
//! holds live subscriptions on two roots.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::designer::Designer;
use crate::events::{BindingId, Event, handler};
use crate::model::{
    ACTIVE_PAGE_CHANGED, DESIGN_RESET, DesignEvent, MODEL_UPDATED, ModelUpdate, RootId,
    SELECTION_CHANGED,
};
use crate::root::DesignRoot;

/// The event that caused a refresh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewEvent<'a> {
    Design(&'a DesignEvent),
    Model(&'a ModelUpdate),
}

/// A projection of the design.
pub trait DesignView: 'static {
    fn name(&self) -> &str;

    /// Bring the projection up to date. `event` is `None` for an explicit
    /// refresh, in which case everything is re-read.
    fn refresh(&mut self, designer: &Designer, event: Option<&ViewEvent<'_>>);
}

struct BindingState<V> {
    designer: Designer,
    view: RefCell<V>,
    designer_bindings: RefCell<Vec<BindingId>>,
    root_binding: RefCell<Option<(DesignRoot, BindingId)>>,
}

impl<V: DesignView> BindingState<V> {
    fn refresh(&self, event: Option<&ViewEvent<'_>>) {
        self.view.borrow_mut().refresh(&self.designer, event);
    }

    fn bind_root(self: &Rc<Self>) {
        let root = self.designer.root();
        let weak: Weak<Self> = Rc::downgrade(self);
        let id = root.events().bind(
            MODEL_UPDATED,
            handler(move |event: &Event<ModelUpdate>, _| {
                if let Some(state) = weak.upgrade() {
                    state.refresh(Some(&ViewEvent::Model(&event.payload)));
                }
            }),
            None,
        );
        if let Some(id) = id {
            *self.root_binding.borrow_mut() = Some((root, id));
        }
    }

    fn unbind_root(&self) {
        if let Some((root, id)) = self.root_binding.borrow_mut().take() {
            root.events().unbind_binding(id);
        }
    }

    fn on_design_event(self: &Rc<Self>, event: &DesignEvent) {
        if let DesignEvent::DesignReset { root, .. } = event {
            let bound = self.root_binding.borrow().as_ref().map(|(r, _)| r.id());
            if bound != Some(*root) {
                tracing::debug!(view = self.view.borrow().name(), %root, "rebinding view");
                self.unbind_root();
                self.bind_root();
            }
        }
        self.refresh(Some(&ViewEvent::Design(event)));
    }
}

/// Keeps one view subscribed to a designer. Unbinds on drop.
pub struct ViewBinding<V: DesignView> {
    state: Rc<BindingState<V>>,
}

impl<V: DesignView> fmt::Debug for ViewBinding<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewBinding")
            .field("view", &self.state.view.borrow().name())
            .field("root", &self.bound_root())
            .finish()
    }
}

impl<V: DesignView> ViewBinding<V> {
    /// Wrap `view` without subscribing yet.
    pub fn new(designer: &Designer, view: V) -> Self {
        Self {
            state: Rc::new(BindingState {
                designer: designer.clone(),
                view: RefCell::new(view),
                designer_bindings: RefCell::new(Vec::new()),
                root_binding: RefCell::new(None),
            }),
        }
    }

    /// Wrap, subscribe and render `view` in one step.
    pub fn attach(designer: &Designer, view: V) -> Self {
        let binding = Self::new(designer, view);
        binding.bind();
        binding
    }

    pub fn designer(&self) -> &Designer {
        &self.state.designer
    }

    pub fn view(&self) -> Ref<'_, V> {
        self.state.view.borrow()
    }

    pub fn view_mut(&self) -> RefMut<'_, V> {
        self.state.view.borrow_mut()
    }

    pub fn is_bound(&self) -> bool {
        !self.state.designer_bindings.borrow().is_empty()
    }

    /// The root whose `modelUpdated` this binding listens to.
    pub fn bound_root(&self) -> Option<RootId> {
        self.state
            .root_binding
            .borrow()
            .as_ref()
            .map(|(root, _)| root.id())
    }

    /// Subscribe and do a full refresh. Binding twice is a no-op.
    pub fn bind(&self) {
        if self.is_bound() {
            return;
        }
        let events = self.state.designer.events();
        let mut ids = Vec::with_capacity(3);
        for channel in [DESIGN_RESET, SELECTION_CHANGED, ACTIVE_PAGE_CHANGED] {
            let weak = Rc::downgrade(&self.state);
            let id = events.bind(
                channel,
                handler(move |event: &Event<DesignEvent>, _| {
                    if let Some(state) = weak.upgrade() {
                        state.on_design_event(&event.payload);
                    }
                }),
                None,
            );
            ids.extend(id);
        }
        *self.state.designer_bindings.borrow_mut() = ids;
        self.state.bind_root();
        tracing::debug!(view = self.state.view.borrow().name(), "view bound");
        self.state.refresh(None);
    }

    /// Drop every subscription. Pending deliveries to this view are cancelled.
    pub fn unbind(&self) {
        let ids: Vec<_> = self.state.designer_bindings.borrow_mut().drain(..).collect();
        let events = self.state.designer.events();
        for id in ids {
            events.unbind_binding(id);
        }
        self.state.unbind_root();
    }

    /// Full refresh outside of any event.
    pub fn refresh(&self) {
        self.state.refresh(None);
    }
}

impl<V: DesignView> Drop for ViewBinding<V> {
    fn drop(&mut self) {
        self.unbind();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventPayload;
    use crate::queue::DispatchQueue;
    use crate::tree::PAGE_TYPE;

    /// Records what it was refreshed with.
    #[derive(Default)]
    struct Probe {
        log: Vec<String>,
    }

    impl DesignView for Probe {
        fn name(&self) -> &str {
            "probe"
        }

        fn refresh(&mut self, _designer: &Designer, event: Option<&ViewEvent<'_>>) {
            let entry = match event {
                None => "full".to_owned(),
                Some(ViewEvent::Design(e)) => format!("design:{}", e.channel()),
                Some(ViewEvent::Model(m)) => format!("model:{}", m.kind()),
            };
            self.log.push(entry);
        }
    }

    fn designer() -> (Designer, DispatchQueue) {
        let queue = DispatchQueue::new();
        (Designer::with_defaults(queue.clone()).unwrap(), queue)
    }

    #[test]
    fn test_bind_refreshes_and_follows_model() {
        let (designer, queue) = designer();
        queue.drain();
        let binding = ViewBinding::attach(&designer, Probe::default());
        assert_eq!(binding.view().log, ["full"]);
        assert_eq!(binding.bound_root(), Some(designer.root_id()));

        let page = designer.pages()[0];
        designer.insert(page, "Button", None, None).unwrap();
        queue.drain();
        assert_eq!(
            binding.view().log,
            ["full", "model:nodeAdded", "design:selectionChanged"]
        );
    }

    #[test]
    fn test_unbind_is_idempotent_and_cancels_pending() {
        let (designer, queue) = designer();
        queue.drain();
        let binding = ViewBinding::attach(&designer, Probe::default());
        let page = designer.pages()[0];
        designer.insert(page, "Label", None, None).unwrap();
        binding.unbind();
        binding.unbind();
        assert!(!binding.is_bound());
        assert_eq!(binding.bound_root(), None);
        queue.drain();
        assert_eq!(binding.view().log, ["full"]);
        assert_eq!(designer.events().binding_count(SELECTION_CHANGED), 0);
        assert_eq!(designer.root().events().binding_count(MODEL_UPDATED), 0);
    }

    #[test]
    fn test_reset_rebinds_to_new_root() {
        let (designer, queue) = designer();
        queue.drain();
        let binding = ViewBinding::attach(&designer, Probe::default());
        let old_root = designer.root();

        designer.new_design().unwrap();
        // A stale edit on the old root after the reset reaches nobody.
        let stale = old_root.create_node(PAGE_TYPE, true).unwrap();
        old_root.add_child(old_root.id(), stale, None, None).unwrap();
        queue.drain();

        assert_eq!(binding.bound_root(), Some(designer.root_id()));
        assert_eq!(old_root.events().binding_count(MODEL_UPDATED), 0);
        assert_eq!(designer.root().events().binding_count(MODEL_UPDATED), 1);
        assert_eq!(binding.view().log, ["full", "design:designReset"]);

        let page = designer.pages()[0];
        designer.set_property(page, "title", "Home".into()).unwrap();
        queue.drain();
        assert_eq!(binding.view().log.last().unwrap(), "model:propertyChanged");
    }

    #[test]
    fn test_drop_unbinds() {
        let (designer, queue) = designer();
        {
            let _binding = ViewBinding::attach(&designer, Probe::default());
            assert_eq!(designer.events().binding_count(DESIGN_RESET), 1);
        }
        assert_eq!(designer.events().binding_count(DESIGN_RESET), 0);
        assert_eq!(designer.root().events().binding_count(MODEL_UPDATED), 0);
        queue.drain();
    }
}
