//! The design canvas.
//!
//! The canvas shows the active page as generated markup inside a separate
//! document (an iframe in the browser). The document itself sits behind the
//! [`CanvasFrame`] seam. [`DesignCanvas`] decides what to load into it and
//! turns pointer input coming back out of it into designer operations.
//!
//! Drops are resolved against the registry: starting at the element under
//! the pointer, the first node with a legal zone that still has room gets the
//! widget. When the element under the pointer cannot hold it, the drop lands
//! right after that element in its own parent, and so on up the tree.

use smol_str::SmolStr;

use crate::codegen;
use crate::designer::Designer;
use crate::error::EditError;
use crate::model::{DesignEvent, ModelUpdate};
use crate::node::{Node, Uid};
use crate::registry::Cardinality;
use crate::tree::DesignTree;
use crate::view::{DesignView, ViewEvent};

/// The document the canvas renders into.
pub trait CanvasFrame: 'static {
    /// Replace the whole document body.
    fn load(&mut self, html: &str);

    /// Mark `node` (and unmark everything else) with `class`.
    fn set_selected(&mut self, node: Option<Uid>, class: &str);

    /// Show where a drag would land. Optimistic changes made here are
    /// discarded by the next [`load`](Self::load).
    fn preview(&mut self, _source: &DragSource, _target: Option<&DropTarget>) {}
}

/// What is being dragged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragSource {
    /// A new widget of this type, from the palette.
    Palette(SmolStr),
    /// An existing node.
    Node(Uid),
}

/// Pointer input from the frame, already mapped to node uids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanvasInput {
    /// Click on an element, or on empty space with `None`.
    Click(Option<Uid>),
    DragOver {
        source: DragSource,
        target: Uid,
        index: Option<usize>,
    },
    Drop {
        source: DragSource,
        target: Uid,
        index: Option<usize>,
    },
}

/// Resolved location of a drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropTarget {
    pub parent: Uid,
    pub zone: SmolStr,
    /// Position among the zone's other children. `None` appends.
    pub index: Option<usize>,
}

fn has_room(tree: &DesignTree, parent: &Node, zone: &str, moving: Option<Uid>) -> bool {
    match tree.registry().zone_cardinality(parent.widget_type(), zone) {
        Ok(Cardinality::Many) => true,
        Ok(_) => parent
            .children_in(zone)
            .iter()
            .all(|c| Some(*c) == moving),
        Err(_) => false,
    }
}

/// Where a `widget_type` dropped on `target` would go.
///
/// `moving` is the node being dragged, if any; it is never dropped into
/// its own subtree.
pub fn resolve_drop(
    tree: &DesignTree,
    widget_type: &str,
    moving: Option<Uid>,
    target: Uid,
    index: Option<usize>,
) -> Option<DropTarget> {
    let registry = tree.registry();
    let mut candidate = target;
    // Zone and index to prefer after climbing out of a child.
    let mut preferred: Option<(SmolStr, usize)> = None;
    loop {
        let node = tree.node(candidate)?;
        let inside_moving = moving.is_some_and(|m| tree.is_ancestor(m, candidate));
        if !inside_moving {
            let legal: Vec<SmolStr> = registry
                .zones_for_child(node.widget_type(), widget_type)
                .unwrap_or_default()
                .into_iter()
                .filter(|zone| has_room(tree, node, zone, moving))
                .collect();
            let after = preferred
                .as_ref()
                .filter(|(zone, _)| legal.contains(zone))
                .cloned();
            match after {
                Some((zone, index)) => {
                    return Some(DropTarget {
                        parent: candidate,
                        zone,
                        index: Some(index),
                    });
                }
                None => {
                    if let Some(zone) = legal.into_iter().next() {
                        return Some(DropTarget {
                            parent: candidate,
                            zone,
                            index: if preferred.is_none() { index } else { None },
                        });
                    }
                }
            }
        }

        let (parent, zone, position) = tree.position(candidate)?;
        // The dragged node leaves its slot first.
        let shift = moving
            .and_then(|m| tree.position(m))
            .is_some_and(|(p, z, i)| p == parent && z == zone && i <= position);
        preferred = Some((zone, if shift { position } else { position + 1 }));
        candidate = parent;
    }
}

/// Canvas view over the active page.
#[derive(Debug)]
pub struct DesignCanvas<F> {
    frame: F,
    page: Option<Uid>,
    preview: Option<DropTarget>,
    loads: usize,
}

impl<F: CanvasFrame> DesignCanvas<F> {
    pub fn new(frame: F) -> Self {
        Self {
            frame,
            page: None,
            preview: None,
            loads: 0,
        }
    }

    pub fn frame(&self) -> &F {
        &self.frame
    }

    pub fn frame_mut(&mut self) -> &mut F {
        &mut self.frame
    }

    /// The page currently loaded in the frame.
    pub fn page(&self) -> Option<Uid> {
        self.page
    }

    /// Drop target of the drag in progress.
    pub fn preview(&self) -> Option<&DropTarget> {
        self.preview.as_ref()
    }

    /// How many times the frame document was replaced.
    pub fn loads(&self) -> usize {
        self.loads
    }

    fn render(&mut self, designer: &Designer) {
        self.page = designer.active_page();
        let html = self
            .page
            .and_then(|page| designer.with_tree(|tree| codegen::render_page(tree, page)))
            .unwrap_or_default();
        self.frame.load(&html);
        self.frame
            .set_selected(designer.selected(), &designer.config().selected_class);
        self.preview = None;
        self.loads += 1;
    }

    fn source_of(designer: &Designer, source: &DragSource) -> Option<(SmolStr, Option<Uid>)> {
        match source {
            DragSource::Palette(widget_type) => Some((widget_type.clone(), None)),
            DragSource::Node(uid) => designer
                .find(*uid)
                .map(|node| (node.widget_type().clone(), Some(*uid))),
        }
    }

    fn resolve(
        designer: &Designer,
        source: &DragSource,
        target: Uid,
        index: Option<usize>,
    ) -> Option<DropTarget> {
        let (widget_type, moving) = Self::source_of(designer, source)?;
        designer.with_tree(|tree| resolve_drop(tree, &widget_type, moving, target, index))
    }

    /// Apply pointer input. Returns whether the design or the selection changed.
    pub fn handle(&mut self, designer: &Designer, input: CanvasInput) -> Result<bool, EditError> {
        match input {
            CanvasInput::Click(None) => Ok(designer.set_selected(None)),
            CanvasInput::Click(Some(uid)) => {
                // Clicks on unselectable chrome select the nearest selectable ancestor.
                let selectable = designer.with_tree(|tree| {
                    let mut current = Some(uid);
                    while let Some(c) = current {
                        if tree.is_selectable(c) {
                            return Some(c);
                        }
                        current = tree.node(c).and_then(Node::parent);
                    }
                    None
                });
                Ok(selectable.is_some_and(|uid| designer.set_selected(Some(uid))))
            }
            CanvasInput::DragOver {
                source,
                target,
                index,
            } => {
                self.preview = Self::resolve(designer, &source, target, index);
                self.frame.preview(&source, self.preview.as_ref());
                Ok(false)
            }
            CanvasInput::Drop {
                source,
                target,
                index,
            } => {
                self.preview = None;
                let Some(drop) = Self::resolve(designer, &source, target, index) else {
                    tracing::debug!(?source, %target, "no legal drop target");
                    return Ok(false);
                };
                match source {
                    DragSource::Palette(widget_type) => {
                        designer.insert(drop.parent, &widget_type, Some(&drop.zone), drop.index)?;
                    }
                    DragSource::Node(node) => {
                        designer.reparent_node(node, drop.parent, Some(&drop.zone), drop.index)?;
                    }
                }
                Ok(true)
            }
        }
    }
}

impl<F: CanvasFrame> DesignView for DesignCanvas<F> {
    fn name(&self) -> &str {
        "canvas"
    }

    fn refresh(&mut self, designer: &Designer, event: Option<&ViewEvent<'_>>) {
        match event {
            Some(ViewEvent::Design(DesignEvent::SelectionChanged { selected, .. })) => {
                self.frame
                    .set_selected(*selected, &designer.config().selected_class);
            }
            Some(ViewEvent::Model(ModelUpdate::PropertyChanged { node, .. })) => {
                let page = designer.with_tree(|tree| tree.page_of(*node));
                if page.is_some() && page == self.page {
                    self.render(designer);
                }
            }
            _ => self.render(designer),
        }
    }
}

/// A frame that only remembers what it was told.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct HeadlessFrame {
    pub html: String,
    pub selected: Option<Uid>,
    pub selected_class: SmolStr,
    pub preview: Option<DropTarget>,
}

impl CanvasFrame for HeadlessFrame {
    fn load(&mut self, html: &str) {
        html.clone_into(&mut self.html);
        self.preview = None;
    }

    fn set_selected(&mut self, node: Option<Uid>, class: &str) {
        self.selected = node;
        self.selected_class = class.into();
    }

    fn preview(&mut self, _source: &DragSource, target: Option<&DropTarget>) {
        self.preview = target.cloned();
    }
}
