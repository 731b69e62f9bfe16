//! TUI rendering components.

mod render;

pub use render::{draw, entry_lines, short_id};
