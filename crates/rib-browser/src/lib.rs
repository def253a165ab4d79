//! Browser DOM layer for the rib GUI builder.
//!
//! This crate hosts the design canvas in an iframe and turns DOM events into
//! `rib-core` canvas input. It assumes a `wasm32-unknown-unknown` target
//! environment.
//!
//! # Architecture
//!
//! - `frame`: `CanvasFrame` over an iframe document
//! - `input`: click and drag events mapped to `CanvasInput` through `data-uid`
//! - `runtime`: draining the dispatch queue after the current task, console logging
//!
//! # Re-exports
//!
//! This crate re-exports `rib-core` for convenience, so consumers only need
//! to depend on `rib-browser`.

pub use rib_core;
pub use rib_core::*;

pub mod frame;
pub mod input;
pub mod runtime;

pub use frame::IframeFrame;
pub use input::{CanvasListeners, DRAG_NODE_MIME, DRAG_WIDGET_MIME, uid_of};
pub use runtime::{init_logging, schedule_on_microtask};
