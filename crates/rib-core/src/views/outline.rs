use smol_str::{SmolStr, format_smolstr};

use crate::designer::Designer;
use crate::model::{DesignEvent, ModelUpdate};
use crate::node::Uid;
use crate::tree::DesignTree;
use crate::view::{DesignView, ViewEvent};

/// One line of the outline.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineRow {
    pub uid: Uid,
    pub depth: usize,
    pub widget_type: SmolStr,
    pub label: SmolStr,
    pub selected: bool,
}

/// The whole design as an indented list, root first.
#[derive(Debug, Default)]
pub struct OutlineView {
    rows: Vec<OutlineRow>,
    full_refreshes: usize,
}

fn make_row(tree: &DesignTree, selected: Option<Uid>, uid: Uid, depth: usize) -> Option<OutlineRow> {
    let node = tree.node(uid)?;
    let widget_type = node.widget_type().clone();
    let label = tree
        .registry()
        .label(&widget_type)
        .unwrap_or_else(|_| widget_type.clone());
    let id = node
        .explicit_properties()
        .get("id")
        .and_then(|v| v.as_str())
        .filter(|id| !id.is_empty());
    let label = match id {
        Some(id) => format_smolstr!("{label} ({id})"),
        None => label,
    };
    Some(OutlineRow {
        uid,
        depth,
        widget_type,
        label,
        selected: selected == Some(uid),
    })
}

impl OutlineView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[OutlineRow] {
        &self.rows
    }

    pub fn row(&self, uid: Uid) -> Option<&OutlineRow> {
        self.rows.iter().find(|r| r.uid == uid)
    }

    /// How many times the rows were rebuilt from scratch.
    pub fn full_refreshes(&self) -> usize {
        self.full_refreshes
    }

    /// Plain-text rendering, two spaces per level, `*` marking the selection.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for row in &self.rows {
            for _ in 0..row.depth {
                out.push_str("  ");
            }
            out.push_str(&row.label);
            if row.selected {
                out.push_str(" *");
            }
            out.push('\n');
        }
        out
    }

    fn rebuild(&mut self, designer: &Designer) {
        let selected = designer.selected();
        self.rows = designer.with_tree(|tree| {
            tree.walk_with_depth(tree.root())
                .into_iter()
                .filter_map(|(uid, depth)| make_row(tree, selected, uid, depth))
                .collect()
        });
        self.full_refreshes += 1;
    }

    /// Splice rows for a freshly added subtree in place.
    ///
    /// Deliveries run after the fact, so the tree may already hold later
    /// edits. The subtree goes right after the nearest row that precedes it
    /// in the tree's current order. Returns false when that cannot be
    /// worked out, and the caller rebuilds.
    fn insert_subtree(&mut self, designer: &Designer, node: Uid, parent: Uid) -> bool {
        if self.row(node).is_some() {
            // Already listed by an earlier splice or rebuild.
            return true;
        }
        let Some(parent_at) = self.rows.iter().position(|r| r.uid == parent) else {
            return false;
        };
        let depth = self.rows[parent_at].depth + 1;
        let selected = designer.selected();
        let placed = designer.with_tree(|tree| {
            if tree.node(node)?.parent() != Some(parent) || !tree.is_attached(node) {
                return None;
            }
            let order = tree.walk(parent);
            let offset = order.iter().position(|u| *u == node)?;
            let rows: Option<Vec<_>> = tree
                .walk_with_depth(node)
                .into_iter()
                .map(|(uid, d)| make_row(tree, selected, uid, depth + d))
                .collect();
            Some((order[..offset].to_vec(), rows?))
        });
        let Some((preceding, rows)) = placed else {
            return false;
        };
        if rows.iter().any(|r| self.row(r.uid).is_some()) {
            return false;
        }
        let at = preceding
            .iter()
            .rev()
            .find_map(|uid| self.rows.iter().position(|r| r.uid == *uid))
            .unwrap_or(parent_at);
        self.rows.splice(at + 1..at + 1, rows);
        true
    }

    fn relabel(&mut self, designer: &Designer, node: Uid) {
        let selected = designer.selected();
        if let Some(i) = self.rows.iter().position(|r| r.uid == node) {
            let depth = self.rows[i].depth;
            if let Some(row) = designer.with_tree(|tree| make_row(tree, selected, node, depth)) {
                self.rows[i] = row;
            }
        }
    }
}

impl DesignView for OutlineView {
    fn name(&self) -> &str {
        "outline"
    }

    fn refresh(&mut self, designer: &Designer, event: Option<&ViewEvent<'_>>) {
        match event {
            Some(ViewEvent::Model(ModelUpdate::NodeAdded { node, parent, .. })) => {
                if !self.insert_subtree(designer, *node, *parent) {
                    self.rebuild(designer);
                }
            }
            Some(ViewEvent::Model(ModelUpdate::PropertyChanged { node, property, .. })) => {
                if property == "id" {
                    self.relabel(designer, *node);
                }
            }
            Some(ViewEvent::Design(DesignEvent::SelectionChanged { .. })) => {
                let selected = designer.selected();
                for row in &mut self.rows {
                    row.selected = Some(row.uid) == selected;
                }
            }
            Some(ViewEvent::Design(DesignEvent::ActivePageChanged { .. })) => {}
            _ => self.rebuild(designer),
        }
    }
}
