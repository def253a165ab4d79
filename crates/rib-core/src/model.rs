//! Event payloads published by the design root and the designer.
//!
//! Each channel carries a closed enum so handlers match exhaustively instead
//! of probing payload fields.

use smol_str::SmolStr;

use crate::events::EventPayload;
use crate::node::Uid;
use crate::value::PropertyValue;

/// Channel of [`DesignEvent::DesignReset`].
pub const DESIGN_RESET: &str = "designReset";
/// Channel of [`DesignEvent::SelectionChanged`].
pub const SELECTION_CHANGED: &str = "selectionChanged";
/// Channel of [`DesignEvent::ActivePageChanged`].
pub const ACTIVE_PAGE_CHANGED: &str = "activePageChanged";
/// Channel of every [`ModelUpdate`].
pub const MODEL_UPDATED: &str = "modelUpdated";

/// Identity of a design root. Equal to the uid of its Design node.
pub type RootId = Uid;

/// Controller-level events.
#[derive(Debug, Clone, PartialEq)]
pub enum DesignEvent {
    /// The design root was replaced wholesale.
    DesignReset {
        previous: Option<RootId>,
        root: RootId,
    },
    SelectionChanged {
        selected: Option<Uid>,
        previous: Option<Uid>,
    },
    ActivePageChanged {
        page: Option<Uid>,
        previous: Option<Uid>,
    },
}

impl EventPayload for DesignEvent {
    fn channel(&self) -> &'static str {
        match self {
            DesignEvent::DesignReset { .. } => DESIGN_RESET,
            DesignEvent::SelectionChanged { .. } => SELECTION_CHANGED,
            DesignEvent::ActivePageChanged { .. } => ACTIVE_PAGE_CHANGED,
        }
    }
}

/// A committed change to the design tree, published on `modelUpdated`.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelUpdate {
    NodeAdded {
        node: Uid,
        parent: Uid,
        zone: SmolStr,
        index: usize,
    },
    /// The node and its whole subtree left the tree. Descendants are not announced.
    NodeRemoved {
        node: Uid,
        parent: Uid,
        zone: SmolStr,
        index: usize,
    },
    /// Reorder, re-zone or reparent. Identity and uid are preserved.
    NodeMoved {
        node: Uid,
        old_parent: Uid,
        old_zone: SmolStr,
        old_index: usize,
        parent: Uid,
        zone: SmolStr,
        index: usize,
    },
    PropertyChanged {
        node: Uid,
        property: SmolStr,
        old_value: PropertyValue,
        new_value: PropertyValue,
    },
}

impl ModelUpdate {
    /// Subtype name, as shown in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ModelUpdate::NodeAdded { .. } => "nodeAdded",
            ModelUpdate::NodeRemoved { .. } => "nodeRemoved",
            ModelUpdate::NodeMoved { .. } => "nodeMoved",
            ModelUpdate::PropertyChanged { .. } => "propertyChanged",
        }
    }

    /// The node the update is about.
    pub fn node(&self) -> Uid {
        match self {
            ModelUpdate::NodeAdded { node, .. }
            | ModelUpdate::NodeRemoved { node, .. }
            | ModelUpdate::NodeMoved { node, .. }
            | ModelUpdate::PropertyChanged { node, .. } => *node,
        }
    }

    pub fn is_structural(&self) -> bool {
        !matches!(self, ModelUpdate::PropertyChanged { .. })
    }
}

impl EventPayload for ModelUpdate {
    fn channel(&self) -> &'static str {
        MODEL_UPDATED
    }
}
