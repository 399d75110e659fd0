//! Terminal UI module using ratatui.
//!
//! - `render`: frame layout, overlays and toasts
//! - `input`: keyboard event handling
//! - `styles`: color scheme and text styling
//! - `tabs`: per-tab content (today, reports, budgets, settings)

pub mod input;
pub mod render;
pub mod styles;
pub mod tabs;
