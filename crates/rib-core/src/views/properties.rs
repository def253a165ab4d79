use smol_str::SmolStr;

use crate::designer::Designer;
use crate::error::EditError;
use crate::model::{DesignEvent, ModelUpdate};
use crate::node::Uid;
use crate::value::{PropertyKind, PropertyValue};
use crate::view::{DesignView, ViewEvent};

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRow {
    pub name: SmolStr,
    pub kind: PropertyKind,
    pub value: PropertyValue,
    /// No explicit value is stored; `value` is the registry default.
    pub is_default: bool,
    pub options: Vec<SmolStr>,
}

/// Property sheet of the selected node.
#[derive(Debug, Default)]
pub struct PropertyView {
    node: Option<Uid>,
    rows: Vec<PropertyRow>,
}

impl PropertyView {
    pub fn new() -> Self {
        Self::default()
    }

    /// The node whose properties are shown.
    pub fn node(&self) -> Option<Uid> {
        self.node
    }

    pub fn rows(&self) -> &[PropertyRow] {
        &self.rows
    }

    pub fn row(&self, name: &str) -> Option<&PropertyRow> {
        self.rows.iter().find(|r| r.name == name)
    }

    /// Parse `text` as the property's kind and set it on the shown node.
    pub fn apply(
        &self,
        designer: &Designer,
        name: &str,
        text: &str,
    ) -> Result<Option<ModelUpdate>, EditError> {
        let Some(node) = self.node else {
            return Err(EditError::InvalidValue {
                property: name.into(),
                reason: "no node is selected".into(),
            });
        };
        let widget_type = designer
            .find(node)
            .map(|n| n.widget_type().clone())
            .ok_or(EditError::NodeNotFound(node))?;
        let kind = designer.registry().property_kind(&widget_type, name)?;
        let value = kind.parse(text).ok_or_else(|| EditError::InvalidValue {
            property: name.into(),
            reason: format!("`{text}` is not a valid {}", kind.as_str()),
        })?;
        designer.set_property(node, name, value)
    }

    /// Drop the explicit value of `name` on the shown node.
    pub fn reset(&self, designer: &Designer, name: &str) -> Result<Option<ModelUpdate>, EditError> {
        match self.node {
            Some(node) => designer.clear_property(node, name),
            None => Ok(None),
        }
    }

    fn rebuild(&mut self, designer: &Designer) {
        self.node = designer.selected();
        self.rows = match self.node {
            Some(node) => designer.with_tree(|tree| {
                let Some(n) = tree.node(node) else {
                    return Vec::new();
                };
                let schemas = match tree.registry().properties(n.widget_type()) {
                    Ok(schemas) => schemas,
                    Err(error) => {
                        tracing::warn!(%node, %error, "property schema lookup failed");
                        return Vec::new();
                    }
                };
                schemas
                    .into_iter()
                    .map(|(name, schema)| {
                        let explicit = n.explicit_properties().get(&name);
                        PropertyRow {
                            kind: schema.kind,
                            value: explicit.cloned().unwrap_or_else(|| schema.default_value()),
                            is_default: explicit.is_none(),
                            options: schema.options.clone(),
                            name,
                        }
                    })
                    .collect()
            }),
            None => Vec::new(),
        };
    }
}

impl DesignView for PropertyView {
    fn name(&self) -> &str {
        "properties"
    }

    fn refresh(&mut self, designer: &Designer, event: Option<&ViewEvent<'_>>) {
        match event {
            // Property edits on other nodes cannot change this sheet.
            Some(ViewEvent::Model(update))
                if !update.is_structural() && Some(update.node()) != self.node => {}
            Some(ViewEvent::Design(DesignEvent::ActivePageChanged { .. })) => {}
            _ => self.rebuild(designer),
        }
    }
}
