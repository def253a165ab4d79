//! A design tree paired with the event source that announces its changes.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::document::{self, DocNode};
use crate::error::{DocumentError, EditError};
use crate::events::EventSource;
use crate::model::{MODEL_UPDATED, ModelUpdate, RootId};
use crate::node::{Node, NodeState, Uid};
use crate::queue::DispatchQueue;
use crate::registry::WidgetRegistry;
use crate::tree::{Change, DesignTree, TreeOp};
use crate::value::PropertyValue;

struct RootInner {
    id: RootId,
    tree: RefCell<DesignTree>,
    events: EventSource<ModelUpdate>,
}

/// Owner of one design tree. Every committed edit fires `modelUpdated`.
///
/// Cloning shares the root.
#[derive(Clone)]
pub struct DesignRoot {
    inner: Rc<RootInner>,
}

impl fmt::Debug for DesignRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DesignRoot")
            .field("id", &self.inner.id)
            .field("nodes", &self.inner.tree.borrow().len())
            .finish()
    }
}

impl PartialEq for DesignRoot {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl DesignRoot {
    /// A root over an empty design.
    pub fn new(registry: Rc<WidgetRegistry>, queue: DispatchQueue) -> Result<Self, EditError> {
        Ok(Self::from_tree(DesignTree::new(registry)?, queue))
    }

    pub fn from_tree(tree: DesignTree, queue: DispatchQueue) -> Self {
        let events = EventSource::new("design-root", queue);
        events.declare(MODEL_UPDATED);
        Self {
            inner: Rc::new(RootInner {
                id: tree.root(),
                tree: RefCell::new(tree),
                events,
            }),
        }
    }

    /// Stable identity: the uid of the Design node.
    pub fn id(&self) -> RootId {
        self.inner.id
    }

    pub fn events(&self) -> &EventSource<ModelUpdate> {
        &self.inner.events
    }

    /// Read access to the tree. Do not edit the design from inside `f`.
    pub fn with_tree<R>(&self, f: impl FnOnce(&DesignTree) -> R) -> R {
        f(&self.inner.tree.borrow())
    }

    pub fn tree(&self) -> Ref<'_, DesignTree> {
        self.inner.tree.borrow()
    }

    fn edit<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut DesignTree) -> Result<T, EditError>,
    ) -> Result<T, EditError> {
        let result = f(&mut self.inner.tree.borrow_mut());
        if let Err(error) = &result {
            tracing::debug!(root = %self.inner.id, op, %error, "edit rejected");
        }
        result
    }

    fn publish(&self, change: &Change) {
        tracing::debug!(
            root = %self.inner.id,
            kind = change.update.kind(),
            node = %change.update.node(),
            "model updated"
        );
        self.inner.events.fire(change.update.clone());
    }

    fn commit(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut DesignTree) -> Result<Change, EditError>,
    ) -> Result<Change, EditError> {
        let change = self.edit(op, f)?;
        self.publish(&change);
        Ok(change)
    }

    pub fn node(&self, uid: Uid) -> Option<Node> {
        self.inner.tree.borrow().node(uid).cloned()
    }

    pub fn find(&self, uid: Uid) -> Option<Node> {
        self.inner.tree.borrow().find(uid).cloned()
    }

    pub fn node_state(&self, uid: Uid) -> NodeState {
        self.inner.tree.borrow().state(uid)
    }

    pub fn property(&self, node: Uid, name: &str) -> Result<PropertyValue, EditError> {
        self.inner.tree.borrow().property(node, name)
    }

    pub fn pages(&self) -> Vec<Uid> {
        self.inner.tree.borrow().pages().to_vec()
    }

    pub fn create_node(&self, widget_type: &str, autogen: bool) -> Result<Uid, EditError> {
        self.edit("create", |tree| tree.create_node(widget_type, autogen))
    }

    pub fn discard(&self, node: Uid) -> Result<(), EditError> {
        self.edit("discard", |tree| tree.discard(node))
    }

    /// Recreate a serialized subtree as unattached nodes with fresh uids.
    pub fn build_subtree(&self, doc: &DocNode) -> Result<Uid, DocumentError> {
        document::build_subtree(&mut self.inner.tree.borrow_mut(), doc)
    }

    pub fn copy_subtree(&self, node: Uid) -> Result<Uid, EditError> {
        self.edit("copy", |tree| tree.copy_subtree(node))
    }

    pub fn add_child(
        &self,
        parent: Uid,
        node: Uid,
        zone: Option<&str>,
        index: Option<usize>,
    ) -> Result<Change, EditError> {
        self.commit("add", |tree| tree.add_child(parent, node, zone, index))
    }

    pub fn remove_child(&self, node: Uid) -> Result<Change, EditError> {
        self.commit("remove", |tree| tree.remove_child(node))
    }

    pub fn move_node(
        &self,
        node: Uid,
        zone: Option<&str>,
        index: Option<usize>,
    ) -> Result<Change, EditError> {
        self.commit("move", |tree| tree.move_node(node, zone, index))
    }

    pub fn reparent_node(
        &self,
        node: Uid,
        parent: Uid,
        zone: Option<&str>,
        index: Option<usize>,
    ) -> Result<Change, EditError> {
        self.commit("reparent", |tree| tree.reparent_node(node, parent, zone, index))
    }

    /// `None` when the property already had this explicit value.
    pub fn set_property(
        &self,
        node: Uid,
        name: &str,
        value: Option<PropertyValue>,
    ) -> Result<Option<Change>, EditError> {
        let change = self.edit("set-property", |tree| tree.set_property(node, name, value))?;
        if let Some(change) = &change {
            self.publish(change);
        }
        Ok(change)
    }

    /// Apply a recorded operation, announcing the result.
    pub fn apply(&self, op: TreeOp) -> Result<Option<Change>, EditError> {
        let change = self.edit("apply", |tree| tree.apply(op))?;
        if let Some(change) = &change {
            self.publish(change);
        }
        Ok(change)
    }
}
