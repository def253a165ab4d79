use crate::designer::Designer;
use crate::error::EditError;
use crate::model::ModelUpdate;
use crate::node::{Node, Uid};
use crate::registry::{Cardinality, PaletteEntry, WidgetRegistry};
use crate::tree::{DESIGN_TYPE, DesignTree};
use crate::view::{DesignView, ViewEvent};

#[derive(Debug, Clone, PartialEq)]
pub struct PaletteItem {
    pub entry: PaletteEntry,
    /// Can be inserted at the current insertion target.
    pub enabled: bool,
}

/// Insertable widget types, grouped by category in catalog order.
#[derive(Debug, Default)]
pub struct PaletteView {
    target: Option<Uid>,
    items: Vec<PaletteItem>,
}

fn has_room(registry: &WidgetRegistry, parent: &Node, zone: &str) -> bool {
    match registry.zone_cardinality(parent.widget_type(), zone) {
        Ok(Cardinality::Many) => true,
        Ok(Cardinality::One) => parent.children_in(zone).is_empty(),
        Err(_) => false,
    }
}

/// Whether `widget_type` fits into `target` or right after it, the way
/// [`Designer::insert_near`] places it.
fn insertable(tree: &DesignTree, target: Uid, widget_type: &str) -> bool {
    let registry = tree.registry();
    let Some(node) = tree.node(target) else {
        return false;
    };
    let inside = registry
        .zones_for_child(node.widget_type(), widget_type)
        .is_ok_and(|zones| zones.iter().any(|zone| has_room(registry, node, zone)));
    if inside {
        return true;
    }
    let Some((parent, zone, _)) = tree.position(target) else {
        return false;
    };
    tree.node(parent).is_some_and(|parent| {
        registry
            .placement_allowed(parent.widget_type(), &zone, widget_type)
            .unwrap_or(false)
            && has_room(registry, parent, &zone)
    })
}

impl PaletteView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[PaletteItem] {
        &self.items
    }

    pub fn item(&self, widget_type: &str) -> Option<&PaletteItem> {
        self.items.iter().find(|i| i.entry.widget_type == widget_type)
    }

    /// Categories in first-seen order, each with its items.
    pub fn grouped(&self) -> Vec<(&str, Vec<&PaletteItem>)> {
        let mut groups: Vec<(&str, Vec<&PaletteItem>)> = Vec::new();
        for item in &self.items {
            let category = item.entry.category.as_str();
            match groups.iter_mut().find(|(c, _)| *c == category) {
                Some((_, items)) => items.push(item),
                None => groups.push((category, vec![item])),
            }
        }
        groups
    }

    /// Where a new widget goes: the selection, else the active page.
    pub fn target(&self) -> Option<Uid> {
        self.target
    }

    /// Insert a new `widget_type` at the current target.
    pub fn insert(&self, designer: &Designer, widget_type: &str) -> Result<Uid, EditError> {
        match self.target {
            Some(target) => designer.insert_near(target, widget_type),
            None => Err(EditError::NoZone {
                parent: DESIGN_TYPE.into(),
                child: widget_type.into(),
            }),
        }
    }

    fn rebuild(&mut self, designer: &Designer) {
        self.target = designer.selected().or_else(|| designer.active_page());
        let target = self.target;
        self.items = designer.with_tree(|tree| {
            tree.registry()
                .palette_entries()
                .into_iter()
                .map(|entry| PaletteItem {
                    enabled: target.is_some_and(|t| insertable(tree, t, &entry.widget_type)),
                    entry,
                })
                .collect()
        });
    }
}

impl DesignView for PaletteView {
    fn name(&self) -> &str {
        "palette"
    }

    fn refresh(&mut self, designer: &Designer, event: Option<&ViewEvent<'_>>) {
        if let Some(ViewEvent::Model(ModelUpdate::PropertyChanged { .. })) = event {
            return;
        }
        self.rebuild(designer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::DispatchQueue;
    use crate::view::ViewBinding;

    #[test]
    fn test_enabled_follows_target() {
        let queue = DispatchQueue::new();
        let designer = Designer::with_defaults(queue.clone()).unwrap();
        let palette = ViewBinding::attach(&designer, PaletteView::new());
        let page = designer.pages()[0];
        assert_eq!(palette.view().target(), Some(page));
        assert!(palette.view().item("Button").unwrap().enabled);
        assert!(!palette.view().item("ListItem").unwrap().enabled);
        assert!(palette.view().item("Page").is_none());

        let list = designer.insert(page, "List", None, None).unwrap();
        queue.drain();
        assert_eq!(palette.view().target(), Some(list));
        assert!(palette.view().item("ListItem").unwrap().enabled);
        // Not inside the list, but next to it on the page.
        assert!(palette.view().item("Label").unwrap().enabled);
    }

    #[test]
    fn test_insert_at_target() {
        let queue = DispatchQueue::new();
        let designer = Designer::with_defaults(queue.clone()).unwrap();
        let palette = ViewBinding::attach(&designer, PaletteView::new());
        let page = designer.pages()[0];
        let list = palette.view().insert(&designer, "List").unwrap();
        queue.drain();
        let item = palette.view().insert(&designer, "ListItem").unwrap();
        queue.drain();
        // A list item holds nothing and its list only takes items.
        assert!(palette.view().insert(&designer, "Label").is_err());
        designer.set_selected(Some(list));
        queue.drain();
        let label = palette.view().insert(&designer, "Label").unwrap();

        designer.with_tree(|t| {
            assert_eq!(t.node(list).unwrap().parent(), Some(page));
            assert_eq!(t.node(item).unwrap().parent(), Some(list));
            assert_eq!(t.position(label), Some((page, "content".into(), 1)));
        });
    }

    #[test]
    fn test_grouped_by_category() {
        let queue = DispatchQueue::new();
        let designer = Designer::with_defaults(queue).unwrap();
        let palette = ViewBinding::attach(&designer, PaletteView::new());
        let view = palette.view();
        let categories: Vec<_> = view.grouped().into_iter().map(|(c, _)| c).collect();
        assert_eq!(
            categories,
            ["Toolbars", "Buttons", "Content", "Form Elements", "Lists", "Layout"]
        );
    }

    #[test]
    fn test_full_zone_disables_entry() {
        let queue = DispatchQueue::new();
        let designer = Designer::with_defaults(queue.clone()).unwrap();
        let palette = ViewBinding::attach(&designer, PaletteView::new());
        let page = designer.pages()[0];
        assert!(palette.view().item("Header").unwrap().enabled);

        designer.insert(page, "Header", None, None).unwrap();
        designer.set_selected(None);
        queue.drain();
        assert_eq!(palette.view().target(), Some(page));
        assert!(!palette.view().item("Header").unwrap().enabled);
        assert!(palette.view().item("Footer").unwrap().enabled);
        assert!(palette.view().insert(&designer, "Header").is_err());
    }
}
