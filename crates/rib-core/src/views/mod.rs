//! Headless projections kept in sync by a [`ViewBinding`](crate::view::ViewBinding).
//!
//! Each view holds plain data (rows, flags, markup) for a front end to draw.

mod code;
mod outline;
mod pages;
mod palette;
mod properties;

pub use code::CodeView;
pub use outline::{OutlineRow, OutlineView};
pub use pages::{PageListView, PageRow};
pub use palette::{PaletteItem, PaletteView};
pub use properties::{PropertyRow, PropertyView};
