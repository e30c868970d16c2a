//! Configuration Management
//!
//! Unified configuration system with hierarchical resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/deepreport/config.toml)
//! 3. Project config (.deepreport/config.toml)
//! 4. Environment variables (DEEPREPORT_*)
//! 5. Run request payload (highest priority)

mod loader;
mod request;
mod types;

pub use loader::{ConfigFormat, ConfigLoader};
pub use request::{ReportConfiguration, RunRequest};
pub use types::*;
