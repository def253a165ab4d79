//! JSON design documents.
//!
//! A document is a nested `{type, zone?, properties, children}` object.
//! Only explicitly set properties are stored. Loading rebuilds the tree
//! through the ordinary node operations, so a document that breaks a
//! registry rule is rejected the same way an interactive edit would be.
//! Loaded nodes get fresh uids.

use std::rc::Rc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::DocumentError;
use crate::node::Uid;
use crate::registry::WidgetRegistry;
use crate::tree::{DESIGN_TYPE, DesignTree};
use crate::value::PropertyValue;

/// Serialized form of one node and its subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocNode {
    #[serde(rename = "type")]
    pub widget_type: SmolStr,
    /// Zone of the parent. Absent on the root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<SmolStr>,
    #[serde(default)]
    pub properties: IndexMap<SmolStr, PropertyValue>,
    #[serde(default)]
    pub children: Vec<DocNode>,
}

impl DocNode {
    /// Number of nodes in this subtree.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(DocNode::count).sum::<usize>()
    }
}

/// Snapshot of `uid` and its descendants. The zone is recorded for every
/// node except `uid` itself when it has no parent.
pub fn serialize_node(tree: &DesignTree, uid: Uid) -> Option<DocNode> {
    let node = tree.node(uid)?;
    let children = node
        .children()
        .filter_map(|child| serialize_node(tree, child))
        .collect();
    Some(DocNode {
        widget_type: node.widget_type().clone(),
        zone: node.zone().cloned(),
        properties: node.explicit_properties().clone(),
        children,
    })
}

pub fn serialize(tree: &DesignTree) -> DocNode {
    serialize_node(tree, tree.root()).unwrap_or_else(|| DocNode {
        widget_type: DESIGN_TYPE.into(),
        zone: None,
        properties: IndexMap::new(),
        children: Vec::new(),
    })
}

/// Recreate `doc` inside `tree` as an unattached subtree.
///
/// Nothing is left in the arena when this fails.
pub fn build_subtree(tree: &mut DesignTree, doc: &DocNode) -> Result<Uid, DocumentError> {
    let uid = tree.create_node(&doc.widget_type, false)?;
    if let Err(error) = fill_node(tree, uid, doc) {
        // The partial subtree is still unattached, so this cannot fail.
        let _ = tree.discard(uid);
        return Err(error);
    }
    Ok(uid)
}

fn fill_node(tree: &mut DesignTree, uid: Uid, doc: &DocNode) -> Result<(), DocumentError> {
    for (name, value) in &doc.properties {
        tree.set_property(uid, name, Some(value.clone()))?;
    }
    for child in &doc.children {
        let child_uid = build_subtree(tree, child)?;
        if let Err(error) = tree.add_child(uid, child_uid, child.zone.as_deref(), None) {
            let _ = tree.discard(child_uid);
            return Err(error.into());
        }
    }
    Ok(())
}

/// Build a design tree from a document.
pub fn deserialize(registry: Rc<WidgetRegistry>, doc: &DocNode) -> Result<DesignTree, DocumentError> {
    if doc.widget_type != DESIGN_TYPE {
        return Err(DocumentError::Malformed(format!(
            "root must be a {DESIGN_TYPE}, found `{}`",
            doc.widget_type
        )));
    }
    let mut tree = DesignTree::new(registry)?;
    let root = tree.root();
    fill_node(&mut tree, root, doc)?;
    tracing::debug!(nodes = tree.len(), "design loaded");
    Ok(tree)
}

pub fn to_json(tree: &DesignTree) -> Result<String, DocumentError> {
    Ok(serde_json::to_string_pretty(&serialize(tree))?)
}

pub fn from_json(registry: Rc<WidgetRegistry>, json: &str) -> Result<DesignTree, DocumentError> {
    let doc: DocNode = serde_json::from_str(json)?;
    deserialize(registry, &doc)
}
