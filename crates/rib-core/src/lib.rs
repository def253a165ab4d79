//! rib-core: the design model of the rib GUI builder, without any DOM.
//!
//! This crate provides:
//! - `EventSource` + `DispatchQueue` - named channels with deferred, FIFO delivery
//! - `WidgetRegistry` - the widget catalog: zones, properties, containment rules
//! - `DesignTree` - the node arena every edit goes through
//! - `DesignRoot` / `Designer` - the editing session: selection, active page, undo, clipboard
//! - `ViewBinding` + views - headless projections that follow the design
//! - JSON documents and static HTML generation

pub mod canvas;
pub mod codegen;
pub mod config;
pub mod designer;
pub mod document;
pub mod error;
pub mod events;
pub mod history;
pub mod model;
pub mod node;
pub mod queue;
pub mod registry;
pub mod root;
pub mod tree;
pub mod value;
pub mod view;
pub mod views;

pub use canvas::{CanvasFrame, CanvasInput, DesignCanvas, DragSource, DropTarget, HeadlessFrame};
pub use config::DesignerConfig;
pub use designer::Designer;
pub use document::DocNode;
pub use error::{DocumentError, EditError, RegistryError};
pub use events::{BindingId, Event, EventPayload, EventSource, Handler, handler};
pub use history::UndoManager;
pub use model::{DesignEvent, ModelUpdate, RootId};
pub use node::{Node, NodeState, Uid};
pub use queue::DispatchQueue;
pub use registry::{Cardinality, PaletteEntry, PropertySchema, WidgetRegistry, ZoneDescriptor};
pub use root::DesignRoot;
pub use smol_str::SmolStr;
pub use tree::{DesignTree, TreeOp};
pub use value::{PropertyKind, PropertyValue};
pub use view::{DesignView, ViewBinding, ViewEvent};
