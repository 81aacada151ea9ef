//! Rendering of finished statistics trees
//!
//! Two generators are provided, each accessed through a `generate` function:
//! - **Console**: one `name (count)` line per node, indented by depth, optionally colored
//! - **JSON**: the whole tree, including per-day series, as a pretty-printed document

mod console;
mod json;

pub use console::generate as generate_console;
pub use json::generate as generate_json;
