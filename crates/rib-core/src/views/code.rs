use crate::codegen;
use crate::designer::Designer;
use crate::model::DesignEvent;
use crate::view::{DesignView, ViewEvent};

/// Generated HTML of the whole design.
#[derive(Debug, Default)]
pub struct CodeView {
    html: String,
    generations: usize,
}

impl CodeView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn generations(&self) -> usize {
        self.generations
    }
}

impl DesignView for CodeView {
    fn name(&self) -> &str {
        "code"
    }

    fn refresh(&mut self, designer: &Designer, event: Option<&ViewEvent<'_>>) {
        if let Some(ViewEvent::Design(
            DesignEvent::SelectionChanged { .. } | DesignEvent::ActivePageChanged { .. },
        )) = event
        {
            return;
        }
        self.html = designer.with_tree(codegen::render_document);
        self.generations += 1;
    }
}
