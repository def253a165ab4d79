//! The design tree: an arena of nodes rooted at a `Design` node.
//!
//! All structural rules come from the [`WidgetRegistry`]. Every mutating
//! operation validates completely before its first write, so a rejected edit
//! leaves the tree untouched. A successful edit returns a [`Change`]: the
//! [`ModelUpdate`] to publish plus the [`TreeOp`] that reverts it.
//!
//! The arena holds attached nodes and unattached ones (freshly created or
//! copied). Removing a node takes its whole subtree out of the arena.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use indexmap::IndexMap;
use smol_str::{SmolStr, format_smolstr};

use crate::error::EditError;
use crate::model::ModelUpdate;
use crate::node::{Node, NodeState, Uid, ZoneSlot};
use crate::registry::{Cardinality, WidgetRegistry};
use crate::value::PropertyValue;

/// Type of the root node.
pub const DESIGN_TYPE: &str = "Design";
/// Type of the root's children.
pub const PAGE_TYPE: &str = "Page";
/// Zone of the root that holds the pages.
pub const PAGE_ZONE: &str = "default";

/// Nodes taken out of the tree by a removal, in preorder.
///
/// Kept by the undo history so a removal can be reverted with the original uids.
#[derive(Debug, Clone, PartialEq)]
pub struct Subtree {
    root: Uid,
    nodes: Vec<Node>,
}

impl Subtree {
    pub fn root(&self) -> Uid {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, uid: Uid) -> bool {
        self.nodes.iter().any(|n| n.uid == uid)
    }
}

/// A replayable tree edit. Applying one yields its inverse.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeOp {
    /// Link an unattached node (already in the arena) under `parent`.
    Attach {
        node: Uid,
        parent: Uid,
        zone: Option<SmolStr>,
        index: Option<usize>,
    },
    /// Put a removed subtree back, keeping its uids.
    Restore {
        subtree: Subtree,
        parent: Uid,
        zone: SmolStr,
        index: usize,
    },
    Remove {
        node: Uid,
    },
    Move {
        node: Uid,
        parent: Uid,
        zone: Option<SmolStr>,
        index: Option<usize>,
    },
    /// `None` clears the explicit value so the property reads as its default.
    SetProperty {
        node: Uid,
        name: SmolStr,
        value: Option<PropertyValue>,
    },
}

/// Result of a committed edit.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub update: ModelUpdate,
    pub inverse: TreeOp,
}

/// The design document.
#[derive(Debug, Clone)]
pub struct DesignTree {
    registry: Rc<WidgetRegistry>,
    root: Uid,
    nodes: HashMap<Uid, Node>,
}

impl DesignTree {
    /// An empty design: a lone `Design` root.
    pub fn new(registry: Rc<WidgetRegistry>) -> Result<Self, EditError> {
        let mut tree = Self {
            registry,
            root: Uid::next(),
            nodes: HashMap::new(),
        };
        let root = tree.build_node(DESIGN_TYPE, false)?;
        tree.root = root.uid;
        tree.nodes.insert(root.uid, root);
        Ok(tree)
    }

    pub fn registry(&self) -> &Rc<WidgetRegistry> {
        &self.registry
    }

    pub fn root(&self) -> Uid {
        self.root
    }

    /// Any node in the arena, attached or not.
    pub fn node(&self, uid: Uid) -> Option<&Node> {
        self.nodes.get(&uid)
    }

    fn get(&self, uid: Uid) -> Result<&Node, EditError> {
        self.nodes.get(&uid).ok_or(EditError::NodeNotFound(uid))
    }

    pub fn widget_type(&self, uid: Uid) -> Option<&SmolStr> {
        self.node(uid).map(|n| &n.widget_type)
    }

    /// Number of nodes reachable from the root.
    pub fn len(&self) -> usize {
        self.walk(self.root).len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Nodes held by the tree, including unattached ones.
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    pub fn state(&self, uid: Uid) -> NodeState {
        if !self.nodes.contains_key(&uid) {
            NodeState::Removed
        } else if self.is_attached(uid) {
            NodeState::Attached
        } else {
            NodeState::Unattached
        }
    }

    pub fn is_attached(&self, uid: Uid) -> bool {
        self.ancestors_inclusive(uid).last() == Some(&self.root)
    }

    /// `uid` followed by its ancestors, nearest first.
    fn ancestors_inclusive(&self, uid: Uid) -> Vec<Uid> {
        let mut chain = Vec::new();
        let mut current = self.nodes.get(&uid);
        while let Some(node) = current {
            chain.push(node.uid);
            current = node.parent.and_then(|p| self.nodes.get(&p));
        }
        chain
    }

    /// Whether `ancestor` is `uid` or one of its ancestors.
    pub fn is_ancestor(&self, ancestor: Uid, uid: Uid) -> bool {
        self.ancestors_inclusive(uid).contains(&ancestor)
    }

    /// Depth-first search from the root. Unattached and removed nodes are not found.
    pub fn find(&self, uid: Uid) -> Option<&Node> {
        let mut stack = vec![self.root];
        while let Some(current) = stack.pop() {
            let node = self.nodes.get(&current)?;
            if current == uid {
                return Some(node);
            }
            let mut children: Vec<Uid> = node.children().collect();
            children.reverse();
            stack.extend(children);
        }
        None
    }

    /// Preorder walk of `from` and its descendants, zone by zone.
    pub fn walk(&self, from: Uid) -> Vec<Uid> {
        self.walk_with_depth(from).into_iter().map(|(uid, _)| uid).collect()
    }

    /// Preorder walk with depth relative to `from`.
    pub fn walk_with_depth(&self, from: Uid) -> Vec<(Uid, usize)> {
        let mut out = Vec::new();
        let mut stack = vec![(from, 0)];
        while let Some((uid, depth)) = stack.pop() {
            let Some(node) = self.nodes.get(&uid) else {
                continue;
            };
            out.push((uid, depth));
            let children: Vec<Uid> = node.children().collect();
            stack.extend(children.into_iter().rev().map(|c| (c, depth + 1)));
        }
        out
    }

    /// Parent, zone and index of an attached-or-linked node.
    pub fn position(&self, uid: Uid) -> Option<(Uid, SmolStr, usize)> {
        let node = self.nodes.get(&uid)?;
        let parent = node.parent?;
        let zone = node.zone.clone()?;
        let index = self
            .nodes
            .get(&parent)?
            .children_in(&zone)
            .iter()
            .position(|c| *c == uid)?;
        Some((parent, zone, index))
    }

    /// Pages in order.
    pub fn pages(&self) -> &[Uid] {
        self.nodes
            .get(&self.root)
            .map(|r| r.children_in(PAGE_ZONE))
            .unwrap_or_default()
    }

    /// The page `uid` belongs to (a page belongs to itself).
    pub fn page_of(&self, uid: Uid) -> Option<Uid> {
        let chain = self.ancestors_inclusive(uid);
        if chain.last() != Some(&self.root) || chain.len() < 2 {
            return None;
        }
        chain.get(chain.len() - 2).copied()
    }

    pub fn is_page(&self, uid: Uid) -> bool {
        self.node(uid).is_some_and(|n| n.parent == Some(self.root))
    }

    /// Explicit value or the registry default.
    pub fn property(&self, uid: Uid, name: &str) -> Result<PropertyValue, EditError> {
        let node = self.get(uid)?;
        let schema = self.registry.property_schema(&node.widget_type, name)?;
        Ok(node
            .properties
            .get(name)
            .cloned()
            .unwrap_or_else(|| schema.default_value()))
    }

    pub fn is_selectable(&self, uid: Uid) -> bool {
        self.node(uid)
            .and_then(|n| self.registry.is_selectable(&n.widget_type).ok())
            .unwrap_or(false)
    }

    fn build_node(&self, widget_type: &str, autogen: bool) -> Result<Node, EditError> {
        let zones = self
            .registry
            .zones(widget_type)?
            .iter()
            .map(|z| ZoneSlot {
                name: z.name.clone(),
                children: Vec::new(),
            })
            .collect();

        let mut properties = IndexMap::new();
        if autogen {
            for (name, schema) in self.registry.properties(widget_type)? {
                if let Some(prefix) = &schema.auto_generate {
                    let value = self.generate_value(&name, prefix);
                    properties.insert(name, PropertyValue::String(value));
                }
            }
        }

        Ok(Node {
            uid: Uid::next(),
            widget_type: widget_type.into(),
            parent: None,
            zone: None,
            zones,
            properties,
        })
    }

    /// `prefix` + the smallest positive number no node in the arena uses for `property`.
    fn generate_value(&self, property: &str, prefix: &str) -> SmolStr {
        let taken: HashSet<&str> = self
            .nodes
            .values()
            .filter_map(|n| n.properties.get(property).and_then(|v| v.as_str()))
            .collect();
        (1..)
            .map(|n| format_smolstr!("{prefix}{n}"))
            .find(|candidate| !taken.contains(candidate.as_str()))
            .unwrap_or_else(|| prefix.into())
    }

    /// Create an unattached node with registry defaults.
    ///
    /// With `autogen`, properties declaring an auto-generate prefix get a
    /// unique value such as `button3`.
    pub fn create_node(&mut self, widget_type: &str, autogen: bool) -> Result<Uid, EditError> {
        let node = self.build_node(widget_type, autogen)?;
        let uid = node.uid;
        self.nodes.insert(uid, node);
        Ok(uid)
    }

    /// Drop an unattached node (and its children) from the arena.
    pub fn discard(&mut self, uid: Uid) -> Result<(), EditError> {
        if uid == self.root {
            return Err(EditError::IsRoot(uid));
        }
        if self.get(uid)?.parent.is_some() {
            return Err(EditError::AlreadyAttached(uid));
        }
        for descendant in self.walk(uid) {
            self.nodes.remove(&descendant);
        }
        Ok(())
    }

    /// Pick and check the zone `child_type` would occupy under `parent`.
    ///
    /// `moving` is the node being relocated, which does not count against
    /// the zone's cardinality.
    fn resolve_zone(
        &self,
        parent: &Node,
        child_type: &str,
        zone: Option<&str>,
        moving: Option<Uid>,
    ) -> Result<SmolStr, EditError> {
        let has_room = |zone: &str| -> Result<bool, EditError> {
            let cardinality = self.registry.zone_cardinality(&parent.widget_type, zone)?;
            let occupied = parent
                .children_in(zone)
                .iter()
                .filter(|c| Some(**c) != moving)
                .count();
            Ok(cardinality == Cardinality::Many || occupied == 0)
        };

        let zone = match zone {
            Some(zone) => {
                if !self
                    .registry
                    .placement_allowed(&parent.widget_type, zone, child_type)?
                {
                    return Err(EditError::NotAllowed {
                        parent: parent.widget_type.clone(),
                        zone: zone.into(),
                        child: child_type.into(),
                    });
                }
                SmolStr::from(zone)
            }
            None => {
                let legal = self
                    .registry
                    .zones_for_child(&parent.widget_type, child_type)?;
                let Some(first) = legal.first().cloned() else {
                    return Err(EditError::NoZone {
                        parent: parent.widget_type.clone(),
                        child: child_type.into(),
                    });
                };
                let mut chosen = first;
                for candidate in &legal {
                    if has_room(candidate)? {
                        chosen = candidate.clone();
                        break;
                    }
                }
                chosen
            }
        };

        if !has_room(&zone)? {
            return Err(EditError::ZoneFull {
                parent: parent.uid,
                zone,
            });
        }
        Ok(zone)
    }

    /// Link an unattached node under `parent`.
    ///
    /// `zone` defaults to the first legal zone with room; `index` defaults
    /// to the end and is clamped to the zone length.
    pub fn add_child(
        &mut self,
        parent: Uid,
        node: Uid,
        zone: Option<&str>,
        index: Option<usize>,
    ) -> Result<Change, EditError> {
        if node == self.root {
            return Err(EditError::IsRoot(node));
        }
        let child = self.get(node)?;
        if child.parent.is_some() {
            return Err(EditError::AlreadyAttached(node));
        }
        let parent_node = self.get(parent)?;
        if self.is_ancestor(node, parent) {
            return Err(EditError::Cycle(node));
        }
        let zone = self.resolve_zone(parent_node, &child.widget_type, zone, None)?;
        let len = parent_node.children_in(&zone).len();
        let index = index.unwrap_or(len).min(len);

        self.link(parent, node, &zone, index);
        Ok(Change {
            update: ModelUpdate::NodeAdded {
                node,
                parent,
                zone,
                index,
            },
            inverse: TreeOp::Remove { node },
        })
    }

    fn link(&mut self, parent: Uid, node: Uid, zone: &str, index: usize) {
        if let Some(slot) = self.nodes.get_mut(&parent).and_then(|p| p.slot_mut(zone)) {
            slot.insert(index, node);
        }
        if let Some(child) = self.nodes.get_mut(&node) {
            child.parent = Some(parent);
            child.zone = Some(zone.into());
        }
    }

    fn unlink(&mut self, node: Uid) -> Option<(Uid, SmolStr, usize)> {
        let (parent, zone, index) = self.position(node)?;
        if let Some(slot) = self.nodes.get_mut(&parent).and_then(|p| p.slot_mut(&zone)) {
            slot.remove(index);
        }
        if let Some(child) = self.nodes.get_mut(&node) {
            child.parent = None;
            child.zone = None;
        }
        Some((parent, zone, index))
    }

    /// Detach `node` and its subtree. The subtree leaves the arena.
    pub fn remove_child(&mut self, node: Uid) -> Result<Change, EditError> {
        if node == self.root {
            return Err(EditError::IsRoot(node));
        }
        self.get(node)?;
        if self.position(node).is_none() {
            return Err(EditError::NotAttached(node));
        }
        let (subtree, parent, zone, index) = self.detach(node);
        Ok(Change {
            update: ModelUpdate::NodeRemoved {
                node,
                parent,
                zone: zone.clone(),
                index,
            },
            inverse: TreeOp::Restore {
                subtree,
                parent,
                zone,
                index,
            },
        })
    }

    fn detach(&mut self, node: Uid) -> (Subtree, Uid, SmolStr, usize) {
        let order = self.walk(node);
        let (parent, zone, index) = self
            .unlink(node)
            .unwrap_or((self.root, SmolStr::default(), 0));
        let nodes = order
            .into_iter()
            .filter_map(|uid| self.nodes.remove(&uid))
            .collect();
        (Subtree { root: node, nodes }, parent, zone, index)
    }

    /// Put a previously removed subtree back with its original uids.
    pub fn restore(
        &mut self,
        subtree: Subtree,
        parent: Uid,
        zone: &str,
        index: usize,
    ) -> Result<Change, EditError> {
        if let Some(clash) = subtree.nodes.iter().find(|n| self.nodes.contains_key(&n.uid)) {
            return Err(EditError::AlreadyAttached(clash.uid));
        }
        let root = subtree
            .nodes
            .first()
            .ok_or(EditError::NodeNotFound(subtree.root))?;
        let parent_node = self.get(parent)?;
        let zone = self.resolve_zone(parent_node, &root.widget_type, Some(zone), None)?;
        let len = parent_node.children_in(&zone).len();
        let index = index.min(len);

        let node = subtree.root;
        for mut n in subtree.nodes {
            if n.uid == node {
                n.parent = None;
                n.zone = None;
            }
            self.nodes.insert(n.uid, n);
        }
        self.link(parent, node, &zone, index);
        Ok(Change {
            update: ModelUpdate::NodeAdded {
                node,
                parent,
                zone,
                index,
            },
            inverse: TreeOp::Remove { node },
        })
    }

    /// Reorder or re-zone `node` within its current parent.
    pub fn move_node(
        &mut self,
        node: Uid,
        zone: Option<&str>,
        index: Option<usize>,
    ) -> Result<Change, EditError> {
        if node == self.root {
            return Err(EditError::IsRoot(node));
        }
        let parent = self
            .get(node)?
            .parent
            .ok_or(EditError::NotAttached(node))?;
        self.reparent_node(node, parent, zone, index)
    }

    /// Move `node` under `new_parent`. `index` is the position in the
    /// destination zone once the node has left its old place.
    pub fn reparent_node(
        &mut self,
        node: Uid,
        new_parent: Uid,
        zone: Option<&str>,
        index: Option<usize>,
    ) -> Result<Change, EditError> {
        if node == self.root {
            return Err(EditError::IsRoot(node));
        }
        let child = self.get(node)?;
        let Some((old_parent, old_zone, old_index)) = self.position(node) else {
            return Err(EditError::NotAttached(node));
        };
        if !self.registry.is_moveable(&child.widget_type)? {
            return Err(EditError::NotMoveable(node));
        }
        let parent_node = self.get(new_parent)?;
        if self.is_ancestor(node, new_parent) {
            return Err(EditError::Cycle(node));
        }
        // Staying in the same parent keeps the current zone unless told otherwise.
        let zone = match zone {
            None if new_parent == old_parent => Some(old_zone.as_str()),
            other => other,
        };
        let zone = self.resolve_zone(parent_node, &child.widget_type, zone, Some(node))?;
        let remaining = parent_node
            .children_in(&zone)
            .iter()
            .filter(|c| **c != node)
            .count();
        let index = index.unwrap_or(remaining).min(remaining);

        self.unlink(node);
        self.link(new_parent, node, &zone, index);
        Ok(Change {
            update: ModelUpdate::NodeMoved {
                node,
                old_parent,
                old_zone: old_zone.clone(),
                old_index,
                parent: new_parent,
                zone,
                index,
            },
            inverse: TreeOp::Move {
                node,
                parent: old_parent,
                zone: Some(old_zone),
                index: Some(old_index),
            },
        })
    }

    /// Set (or with `None`, clear) a property. Returns `None` when nothing changed.
    pub fn set_property(
        &mut self,
        node: Uid,
        name: &str,
        value: Option<PropertyValue>,
    ) -> Result<Option<Change>, EditError> {
        let n = self.get(node)?;
        let schema = self.registry.property_schema(&n.widget_type, name)?;
        if let Some(value) = &value {
            schema.check(name, value)?;
        }
        let old = n.properties.get(name).cloned();
        let default = schema.default_value();
        let old_value = old.clone().unwrap_or_else(|| default.clone());
        let new_value = value.clone().unwrap_or(default);
        // Compared as read, so setting or clearing to the value already
        // showing changes nothing.
        if old_value == new_value {
            return Ok(None);
        }

        if let Some(n) = self.nodes.get_mut(&node) {
            match value {
                Some(value) => {
                    n.properties.insert(name.into(), value);
                }
                None => {
                    n.properties.shift_remove(name);
                }
            }
        }
        Ok(Some(Change {
            update: ModelUpdate::PropertyChanged {
                node,
                property: name.into(),
                old_value,
                new_value,
            },
            inverse: TreeOp::SetProperty {
                node,
                name: name.into(),
                value: old,
            },
        }))
    }

    /// Apply a recorded operation.
    pub fn apply(&mut self, op: TreeOp) -> Result<Option<Change>, EditError> {
        match op {
            TreeOp::Attach {
                node,
                parent,
                zone,
                index,
            } => self.add_child(parent, node, zone.as_deref(), index).map(Some),
            TreeOp::Restore {
                subtree,
                parent,
                zone,
                index,
            } => self.restore(subtree, parent, &zone, index).map(Some),
            TreeOp::Remove { node } => self.remove_child(node).map(Some),
            TreeOp::Move {
                node,
                parent,
                zone,
                index,
            } => self.reparent_node(node, parent, zone.as_deref(), index).map(Some),
            TreeOp::SetProperty { node, name, value } => self.set_property(node, &name, value),
        }
    }

    /// Deep copy of `node` with fresh uids everywhere. The copy is unattached.
    pub fn copy_subtree(&mut self, node: Uid) -> Result<Uid, EditError> {
        if node == self.root {
            return Err(EditError::IsRoot(node));
        }
        self.get(node)?;
        let order = self.walk(node);
        let mapping: HashMap<Uid, Uid> = order.iter().map(|old| (*old, Uid::next())).collect();

        let mut copies = Vec::with_capacity(order.len());
        for old in &order {
            let Some(source) = self.nodes.get(old) else {
                continue;
            };
            let mut copy = source.clone();
            copy.uid = mapping[old];
            copy.parent = if *old == node {
                None
            } else {
                source.parent.and_then(|p| mapping.get(&p).copied())
            };
            if *old == node {
                copy.zone = None;
            }
            for slot in &mut copy.zones {
                for child in &mut slot.children {
                    *child = mapping[&*child];
                }
            }
            copies.push(copy);
        }
        for copy in copies {
            self.nodes.insert(copy.uid, copy);
        }
        Ok(mapping[&node])
    }

    /// Check every structural invariant of the attached tree.
    pub fn validate(&self) -> Result<(), String> {
        let root = self.get(self.root).map_err(|e| e.to_string())?;
        if root.widget_type != DESIGN_TYPE || root.parent.is_some() {
            return Err(format!("root {} is not a parentless Design", self.root));
        }
        let mut seen = HashSet::new();
        for uid in self.walk(self.root) {
            if !seen.insert(uid) {
                return Err(format!("node {uid} reachable twice"));
            }
            let node = self.get(uid).map_err(|e| e.to_string())?;
            for (name, value) in &node.properties {
                self.registry
                    .property_schema(&node.widget_type, name)
                    .map_err(|e| e.to_string())?
                    .check(name, value)
                    .map_err(|e| e.to_string())?;
            }
            for slot in &node.zones {
                let cardinality = self
                    .registry
                    .zone_cardinality(&node.widget_type, &slot.name)
                    .map_err(|e| e.to_string())?;
                if cardinality == Cardinality::One && slot.children.len() > 1 {
                    return Err(format!("zone {} of {uid} over capacity", slot.name));
                }
                for child in &slot.children {
                    let c = self.get(*child).map_err(|e| e.to_string())?;
                    if c.parent != Some(uid) || c.zone.as_ref() != Some(&slot.name) {
                        return Err(format!("node {child} has a stale parent link"));
                    }
                    let legal = self
                        .registry
                        .placement_allowed(&node.widget_type, &slot.name, &c.widget_type)
                        .map_err(|e| e.to_string())?;
                    if !legal {
                        return Err(format!(
                            "`{}` not allowed in zone {} of `{}`",
                            c.widget_type, slot.name, node.widget_type
                        ));
                    }
                }
            }
        }
        for page in self.pages() {
            if self.widget_type(*page).map(|t| t.as_str()) != Some(PAGE_TYPE) {
                return Err(format!("root child {page} is not a Page"));
            }
        }
        Ok(())
    }
}
