pub mod commands;
pub mod ui;
pub mod util;

pub use util::{ReviewFile, default_review_path, emit_outcome, resolve_configuration};
