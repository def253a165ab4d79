use smol_str::SmolStr;

use crate::designer::Designer;
use crate::error::EditError;
use crate::model::{DesignEvent, ModelUpdate};
use crate::node::Uid;
use crate::tree::PAGE_TYPE;
use crate::view::{DesignView, ViewEvent};

#[derive(Debug, Clone, PartialEq)]
pub struct PageRow {
    pub uid: Uid,
    pub title: SmolStr,
    pub active: bool,
}

/// The design's pages in order, the active one flagged.
#[derive(Debug, Default)]
pub struct PageListView {
    rows: Vec<PageRow>,
}

impl PageListView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[PageRow] {
        &self.rows
    }

    pub fn active_index(&self) -> Option<usize> {
        self.rows.iter().position(|r| r.active)
    }

    /// Make the page at `index` active.
    pub fn activate(&self, designer: &Designer, index: usize) -> bool {
        self.rows
            .get(index)
            .is_some_and(|row| designer.set_active_page(row.uid))
    }

    /// Append a page and make it active.
    pub fn add_page(&self, designer: &Designer) -> Result<Uid, EditError> {
        let page = designer.insert(designer.root_id(), PAGE_TYPE, None, None)?;
        designer.set_active_page(page);
        Ok(page)
    }

    /// Remove the page at `index`. `Ok(None)` when there is no such row.
    pub fn remove_page(
        &self,
        designer: &Designer,
        index: usize,
    ) -> Result<Option<ModelUpdate>, EditError> {
        match self.rows.get(index) {
            Some(row) => designer.remove_child(row.uid).map(Some),
            None => Ok(None),
        }
    }

    fn rebuild(&mut self, designer: &Designer) {
        let active = designer.active_page();
        self.rows = designer.with_tree(|tree| {
            tree.pages()
                .iter()
                .map(|&uid| PageRow {
                    uid,
                    title: tree
                        .property(uid, "title")
                        .map(|v| SmolStr::new(v.to_string()))
                        .unwrap_or_default(),
                    active: active == Some(uid),
                })
                .collect()
        });
    }
}

impl DesignView for PageListView {
    fn name(&self) -> &str {
        "pages"
    }

    fn refresh(&mut self, designer: &Designer, event: Option<&ViewEvent<'_>>) {
        match event {
            Some(ViewEvent::Design(DesignEvent::SelectionChanged { .. })) => {}
            Some(ViewEvent::Design(DesignEvent::ActivePageChanged { .. })) => {
                let active = designer.active_page();
                for row in &mut self.rows {
                    row.active = Some(row.uid) == active;
                }
            }
            Some(ViewEvent::Model(ModelUpdate::PropertyChanged { node, .. }))
                if !self.rows.iter().any(|r| r.uid == *node) => {}
            _ => self.rebuild(designer),
        }
    }
}
