//! The editing session controller.
//!
//! A [`Designer`] owns the current [`DesignRoot`], the selection, the active
//! page, the undo history and the clipboard. Views hold a clone of it and
//! never touch the tree directly: every edit goes through here so that
//! history is recorded and derived state (selection, active page) stays
//! consistent with the tree.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::config::DesignerConfig;
use crate::document::{self, DocNode};
use crate::error::{DocumentError, EditError};
use crate::events::EventSource;
use crate::history::{History, UndoManager};
use crate::model::{
    ACTIVE_PAGE_CHANGED, DESIGN_RESET, DesignEvent, ModelUpdate, RootId, SELECTION_CHANGED,
};
use crate::node::{Node, NodeState, Uid};
use crate::queue::DispatchQueue;
use crate::registry::WidgetRegistry;
use crate::root::DesignRoot;
use crate::tree::{Change, DesignTree, PAGE_TYPE};
use crate::value::PropertyValue;

struct DesignerInner {
    registry: Rc<WidgetRegistry>,
    queue: DispatchQueue,
    config: DesignerConfig,
    events: EventSource<DesignEvent>,
    root: RefCell<DesignRoot>,
    selected: Cell<Option<Uid>>,
    active_page: Cell<Option<Uid>>,
    history: RefCell<History>,
    clipboard: RefCell<Option<DocNode>>,
}

/// Handle to an editing session. Cloning shares the session.
#[derive(Clone)]
pub struct Designer {
    inner: Rc<DesignerInner>,
}

impl fmt::Debug for Designer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Designer")
            .field("root", &self.root_id())
            .field("selected", &self.selected())
            .field("active_page", &self.active_page())
            .finish()
    }
}

impl Designer {
    /// Start a session on a new design.
    pub fn new(
        registry: Rc<WidgetRegistry>,
        queue: DispatchQueue,
        config: DesignerConfig,
    ) -> Result<Self, EditError> {
        let events = EventSource::new("designer", queue.clone());
        events.declare(DESIGN_RESET);
        events.declare(SELECTION_CHANGED);
        events.declare(ACTIVE_PAGE_CHANGED);

        let root = DesignRoot::new(registry.clone(), queue.clone())?;
        let designer = Self {
            inner: Rc::new(DesignerInner {
                history: RefCell::new(History::new(config.history_depth)),
                registry,
                queue,
                config,
                events,
                root: RefCell::new(root),
                selected: Cell::new(None),
                active_page: Cell::new(None),
                clipboard: RefCell::new(None),
            }),
        };
        designer.new_design()?;
        Ok(designer)
    }

    /// Session over the built-in catalog with default settings.
    pub fn with_defaults(queue: DispatchQueue) -> Result<Self, EditError> {
        Self::new(
            Rc::new(WidgetRegistry::builtin()),
            queue,
            DesignerConfig::default(),
        )
    }

    pub fn registry(&self) -> &Rc<WidgetRegistry> {
        &self.inner.registry
    }

    pub fn queue(&self) -> &DispatchQueue {
        &self.inner.queue
    }

    pub fn config(&self) -> &DesignerConfig {
        &self.inner.config
    }

    /// `designReset`, `selectionChanged` and `activePageChanged`.
    pub fn events(&self) -> &EventSource<DesignEvent> {
        &self.inner.events
    }

    /// The current design root. Replaced wholesale by [`reset`](Self::reset).
    pub fn root(&self) -> DesignRoot {
        self.inner.root.borrow().clone()
    }

    pub fn root_id(&self) -> RootId {
        self.inner.root.borrow().id()
    }

    /// Read access to the current tree.
    pub fn with_tree<R>(&self, f: impl FnOnce(&DesignTree) -> R) -> R {
        self.root().with_tree(f)
    }

    /// Suppress (or stop suppressing) the designer's and the current root's events.
    pub fn suppress(&self, on: bool) {
        self.inner.events.suppress(on);
        self.root().events().suppress(on);
    }

    // -- design lifecycle --

    /// Replace the design with `tree`. Selection, active page and history
    /// start over, then a single `designReset` is fired.
    pub fn reset(&self, tree: DesignTree) {
        let root = DesignRoot::from_tree(tree, self.inner.queue.clone());
        let previous = self.inner.root.replace(root.clone()).id();

        self.inner.selected.set(None);
        self.inner.active_page.set(root.pages().first().copied());
        self.inner.history.borrow_mut().clear();

        tracing::debug!(%previous, root = %root.id(), "design reset");
        self.inner.events.fire(DesignEvent::DesignReset {
            previous: Some(previous),
            root: root.id(),
        });
    }

    /// Start over with an empty design (one page when configured).
    pub fn new_design(&self) -> Result<(), EditError> {
        let mut tree = DesignTree::new(self.inner.registry.clone())?;
        if self.inner.config.initial_page {
            let page = tree.create_node(PAGE_TYPE, true)?;
            tree.add_child(tree.root(), page, None, None)?;
        }
        self.reset(tree);
        Ok(())
    }

    /// Replace the design with a parsed document.
    pub fn load(&self, doc: &DocNode) -> Result<(), DocumentError> {
        let tree = document::deserialize(self.inner.registry.clone(), doc)?;
        self.reset(tree);
        Ok(())
    }

    pub fn load_json(&self, json: &str) -> Result<(), DocumentError> {
        let doc: DocNode = serde_json::from_str(json)?;
        self.load(&doc)
    }

    pub fn to_document(&self) -> DocNode {
        self.with_tree(document::serialize)
    }

    pub fn to_json(&self) -> Result<String, DocumentError> {
        self.with_tree(document::to_json)
    }

    // -- queries --

    pub fn find(&self, uid: Uid) -> Option<Node> {
        self.root().find(uid)
    }

    pub fn node_state(&self, uid: Uid) -> NodeState {
        self.root().node_state(uid)
    }

    pub fn property(&self, node: Uid, name: &str) -> Result<PropertyValue, EditError> {
        self.root().property(node, name)
    }

    pub fn pages(&self) -> Vec<Uid> {
        self.root().pages()
    }

    // -- edits --

    fn record(&self, change: &Change) {
        self.inner.history.borrow_mut().record(change.inverse.clone());
        self.sync_state(&change.update);
    }

    /// Create an unattached node with auto-generated values.
    pub fn create_node(&self, widget_type: &str) -> Result<Uid, EditError> {
        self.root().create_node(widget_type, true)
    }

    pub fn copy_subtree(&self, node: Uid) -> Result<Uid, EditError> {
        self.root().copy_subtree(node)
    }

    pub fn add_child(
        &self,
        parent: Uid,
        node: Uid,
        zone: Option<&str>,
        index: Option<usize>,
    ) -> Result<ModelUpdate, EditError> {
        let change = self.root().add_child(parent, node, zone, index)?;
        self.record(&change);
        Ok(change.update)
    }

    /// Create a `widget_type` node and add it under `parent`. Nothing is left
    /// behind when the placement is rejected.
    pub fn insert(
        &self,
        parent: Uid,
        widget_type: &str,
        zone: Option<&str>,
        index: Option<usize>,
    ) -> Result<Uid, EditError> {
        let root = self.root();
        let node = root.create_node(widget_type, true)?;
        if let Err(error) = self.add_child(parent, node, zone, index) {
            let _ = root.discard(node);
            return Err(error);
        }
        if self.inner.config.select_on_insert {
            self.set_selected(Some(node));
        }
        Ok(node)
    }

    /// Add `node` into the first legal zone of `target`, else right after
    /// `target` in its own zone.
    fn place_near(&self, target: Uid, node: Uid) -> Result<ModelUpdate, EditError> {
        match self.add_child(target, node, None, None) {
            Ok(update) => Ok(update),
            Err(first) => match self.with_tree(|t| t.position(target)) {
                Some((parent, zone, index)) => {
                    self.add_child(parent, node, Some(&zone), Some(index + 1))
                }
                None => Err(first),
            },
        }
    }

    /// Like [`insert`](Self::insert), but falls back to placing the new node
    /// after `target` when `target` cannot hold it.
    pub fn insert_near(&self, target: Uid, widget_type: &str) -> Result<Uid, EditError> {
        let root = self.root();
        let node = root.create_node(widget_type, true)?;
        if let Err(error) = self.place_near(target, node) {
            let _ = root.discard(node);
            return Err(error);
        }
        if self.inner.config.select_on_insert {
            self.set_selected(Some(node));
        }
        Ok(node)
    }

    pub fn remove_child(&self, node: Uid) -> Result<ModelUpdate, EditError> {
        let change = self.root().remove_child(node)?;
        self.record(&change);
        Ok(change.update)
    }

    pub fn move_node(
        &self,
        node: Uid,
        zone: Option<&str>,
        index: Option<usize>,
    ) -> Result<ModelUpdate, EditError> {
        let change = self.root().move_node(node, zone, index)?;
        self.record(&change);
        Ok(change.update)
    }

    pub fn reparent_node(
        &self,
        node: Uid,
        parent: Uid,
        zone: Option<&str>,
        index: Option<usize>,
    ) -> Result<ModelUpdate, EditError> {
        let change = self.root().reparent_node(node, parent, zone, index)?;
        self.record(&change);
        Ok(change.update)
    }

    /// `Ok(None)` when the value was already set.
    pub fn set_property(
        &self,
        node: Uid,
        name: &str,
        value: PropertyValue,
    ) -> Result<Option<ModelUpdate>, EditError> {
        let change = self.root().set_property(node, name, Some(value))?;
        Ok(change.map(|change| {
            self.record(&change);
            change.update
        }))
    }

    /// Drop the explicit value so the property reads as its default.
    pub fn clear_property(&self, node: Uid, name: &str) -> Result<Option<ModelUpdate>, EditError> {
        let change = self.root().set_property(node, name, None)?;
        Ok(change.map(|change| {
            self.record(&change);
            change.update
        }))
    }

    /// Group edits into one undo step until the matching [`end_transaction`](Self::end_transaction).
    pub fn begin_transaction(&self) {
        self.inner.history.borrow_mut().begin_transaction();
    }

    pub fn end_transaction(&self) {
        self.inner.history.borrow_mut().end_transaction();
    }

    // -- selection and active page --

    pub fn selected(&self) -> Option<Uid> {
        self.inner.selected.get()
    }

    pub fn is_selected(&self, uid: Uid) -> bool {
        self.selected() == Some(uid)
    }

    pub fn active_page(&self) -> Option<Uid> {
        self.inner.active_page.get()
    }

    pub fn is_active_page(&self, uid: Uid) -> bool {
        self.active_page() == Some(uid)
    }

    /// Select `uid`, or clear the selection with `None`.
    ///
    /// Returns false when the node is not attached or not selectable.
    /// Selecting a node on another page activates that page first.
    pub fn set_selected(&self, uid: Option<Uid>) -> bool {
        let previous = self.selected();
        let Some(uid) = uid else {
            if previous.is_some() {
                self.change_selection(None);
            }
            return true;
        };
        if previous == Some(uid) {
            return true;
        }
        let (selectable, page) = self.with_tree(|t| {
            (t.is_attached(uid) && t.is_selectable(uid), t.page_of(uid))
        });
        if !selectable {
            tracing::debug!(%uid, "not selectable");
            return false;
        }
        if page.is_some() && page != self.active_page() {
            self.change_active_page(page);
        }
        self.change_selection(Some(uid));
        true
    }

    /// Make `page` the active page. Returns false unless it is a page of the design.
    pub fn set_active_page(&self, page: Uid) -> bool {
        if !self.with_tree(|t| t.is_page(page)) {
            tracing::debug!(%page, "not a page");
            return false;
        }
        if self.is_active_page(page) {
            return true;
        }
        let selected_page = self
            .selected()
            .and_then(|selected| self.with_tree(|t| t.page_of(selected)));
        if self.selected().is_some() && selected_page != Some(page) {
            self.change_selection(None);
        }
        self.change_active_page(Some(page));
        true
    }

    fn change_selection(&self, selected: Option<Uid>) {
        let previous = self.inner.selected.replace(selected);
        if previous != selected {
            self.inner
                .events
                .fire(DesignEvent::SelectionChanged { selected, previous });
        }
    }

    fn change_active_page(&self, page: Option<Uid>) {
        let previous = self.inner.active_page.replace(page);
        if previous != page {
            self.inner
                .events
                .fire(DesignEvent::ActivePageChanged { page, previous });
        }
    }

    /// Bring selection and active page back in line after a tree change.
    fn sync_state(&self, update: &ModelUpdate) {
        match update {
            ModelUpdate::NodeRemoved { parent, index, .. } => {
                let detached = |uid: Option<Uid>| {
                    uid.is_some_and(|uid| self.node_state(uid) != NodeState::Attached)
                };
                if detached(self.selected()) {
                    self.change_selection(None);
                }
                if detached(self.active_page()) {
                    let pages = self.pages();
                    let neighbour = if *parent == self.root_id() {
                        index
                            .checked_sub(1)
                            .and_then(|i| pages.get(i))
                            .or_else(|| pages.get(*index))
                            .copied()
                    } else {
                        pages.first().copied()
                    };
                    self.change_active_page(neighbour);
                }
            }
            ModelUpdate::NodeAdded { node, parent, .. } => {
                if *parent == self.root_id() && self.active_page().is_none() {
                    self.change_active_page(Some(*node));
                }
            }
            ModelUpdate::NodeMoved { .. } => {
                if let Some(selected) = self.selected() {
                    let page = self.with_tree(|t| t.page_of(selected));
                    if page.is_some() && page != self.active_page() {
                        self.change_active_page(page);
                    }
                }
            }
            ModelUpdate::PropertyChanged { .. } => {}
        }
    }

    // -- history --

    fn replay(&self, undo: bool) -> bool {
        let entry = {
            let mut history = self.inner.history.borrow_mut();
            if history.in_transaction() {
                tracing::warn!("undo/redo inside an open transaction");
                return false;
            }
            if undo {
                history.take_undo()
            } else {
                history.take_redo()
            }
        };
        let Some(entry) = entry else {
            return false;
        };

        let root = self.root();
        let result = entry.replay(|op| {
            let change = root.apply(op)?;
            Ok(change.map(|change| {
                self.sync_state(&change.update);
                change.inverse
            }))
        });
        match result {
            Ok(inverse) => {
                let mut history = self.inner.history.borrow_mut();
                if undo {
                    history.push_redo(inverse);
                } else {
                    history.push_undone(inverse);
                }
                true
            }
            Err(error) => {
                // The tree is back where it was, but this entry cannot be
                // replayed and older entries may depend on it.
                tracing::warn!(%error, undo, "history replay failed; clearing history");
                self.inner.history.borrow_mut().clear();
                false
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        self.inner.history.borrow().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.inner.history.borrow().can_redo()
    }

    pub fn undo(&self) -> bool {
        self.replay(true)
    }

    pub fn redo(&self) -> bool {
        self.replay(false)
    }

    pub fn clear_history(&self) {
        self.inner.history.borrow_mut().clear();
    }

    // -- clipboard --

    /// Keep a detached copy of `node` for [`paste`](Self::paste).
    pub fn copy(&self, node: Uid) -> bool {
        let root = self.root();
        if node == root.id() || root.node_state(node) != NodeState::Attached {
            return false;
        }
        let doc = root.with_tree(|t| document::serialize_node(t, node));
        *self.inner.clipboard.borrow_mut() = doc;
        self.inner.clipboard.borrow().is_some()
    }

    /// Copy `node`, then remove it.
    pub fn cut(&self, node: Uid) -> Result<ModelUpdate, EditError> {
        if !self.copy(node) {
            return Err(EditError::NotAttached(node));
        }
        self.remove_child(node)
    }

    pub fn has_clipboard(&self) -> bool {
        self.inner.clipboard.borrow().is_some()
    }

    /// Insert a fresh copy of the clipboard into `target`, or next to it when
    /// `target` cannot hold it.
    pub fn paste(&self, target: Uid) -> Result<Uid, DocumentError> {
        let Some(doc) = self.inner.clipboard.borrow().clone() else {
            return Err(DocumentError::Malformed("clipboard is empty".into()));
        };
        let root = self.root();
        let node = root.build_subtree(&doc)?;
        if let Err(error) = self.place_near(target, node) {
            let _ = root.discard(node);
            return Err(error.into());
        }
        Ok(node)
    }
}

impl UndoManager for Designer {
    fn can_undo(&self) -> bool {
        Designer::can_undo(self)
    }

    fn can_redo(&self) -> bool {
        Designer::can_redo(self)
    }

    fn undo(&mut self) -> bool {
        Designer::undo(self)
    }

    fn redo(&mut self) -> bool {
        Designer::redo(self)
    }

    fn clear_history(&mut self) {
        Designer::clear_history(self)
    }
}
