//! Error types for registry queries, design edits and document loading.

use smol_str::SmolStr;
use thiserror::Error;

use crate::node::Uid;

/// A query referenced something the widget registry does not declare.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RegistryError {
    /// Widget type is not in the catalog.
    #[error("unknown widget type `{0}`")]
    UnknownType(SmolStr),

    /// Zone is not declared by the widget type (or any ancestor).
    #[error("widget type `{widget}` has no zone `{zone}`")]
    UnknownZone { widget: SmolStr, zone: SmolStr },

    /// Property is not declared by the widget type (or any ancestor).
    #[error("widget type `{widget}` has no property `{property}`")]
    UnknownProperty { widget: SmolStr, property: SmolStr },

    /// The catalog itself is malformed.
    #[error("invalid widget catalog: {0}")]
    Catalog(String),
}

/// A structural or property edit was rejected. The tree is left unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum EditError {
    /// Registry lookup failed.
    #[error(transparent)]
    Schema(#[from] RegistryError),

    /// No node with this uid exists.
    #[error("node {0} not found")]
    NodeNotFound(Uid),

    /// Node must be attached to the design for this operation.
    #[error("node {0} is not attached to the design")]
    NotAttached(Uid),

    /// Node already has a parent.
    #[error("node {0} already has a parent")]
    AlreadyAttached(Uid),

    /// The design root cannot be moved, copied into a zone or removed.
    #[error("node {0} is the design root")]
    IsRoot(Uid),

    /// Widget type is declared as not moveable.
    #[error("node {0} cannot be moved")]
    NotMoveable(Uid),

    /// Zone with cardinality "1" already holds a child.
    #[error("zone `{zone}` of node {parent} is full")]
    ZoneFull { parent: Uid, zone: SmolStr },

    /// Registry forbids this parent/zone/child combination.
    #[error("`{child}` is not allowed in zone `{zone}` of `{parent}`")]
    NotAllowed {
        parent: SmolStr,
        zone: SmolStr,
        child: SmolStr,
    },

    /// No zone of the parent accepts the child.
    #[error("`{parent}` has no zone accepting `{child}`")]
    NoZone { parent: SmolStr, child: SmolStr },

    /// Target parent lies inside the subtree being moved.
    #[error("node {0} cannot become a descendant of itself")]
    Cycle(Uid),

    /// Value does not match the property's declared kind or options.
    #[error("invalid value for property `{property}`: {reason}")]
    InvalidValue { property: SmolStr, reason: String },
}

/// Loading or saving a design document failed.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DocumentError {
    /// JSON could not be parsed or produced.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// A node of the document violates the widget registry.
    #[error("invalid design: {0}")]
    Edit(#[from] EditError),

    /// Document shape is wrong (e.g. root is not a Design).
    #[error("malformed design document: {0}")]
    Malformed(String),
}
