use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::DocumentError;

/// Designer session settings.
///
/// Every field has a default, so a config file only names what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DesignerConfig {
    /// Undo steps kept before the oldest is dropped.
    pub history_depth: usize,
    /// Start new designs with one page.
    pub initial_page: bool,
    /// Select widgets inserted from the palette.
    pub select_on_insert: bool,
    /// Class the canvas puts on the selected element.
    pub selected_class: SmolStr,
}

impl Default for DesignerConfig {
    fn default() -> Self {
        Self {
            history_depth: 100,
            initial_page: true,
            select_on_insert: true,
            selected_class: SmolStr::new_static("ui-selected"),
        }
    }
}

impl DesignerConfig {
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(json)?)
    }
}
