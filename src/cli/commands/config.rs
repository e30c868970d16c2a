//! Config Command
//!
//! Manage deepreport configuration.
//!
//! Usage:
//!   deepreport config show [-g] [-f toml|json|yaml]
//!   deepreport config path
//!   deepreport config init [-g] [--force]

use crate::cli::ui::Output;
use crate::config::{ConfigFormat, ConfigLoader};
use crate::types::Result;

/// Show configuration
pub fn show(global: bool, format: ConfigFormat) -> Result<()> {
    if global {
        match ConfigLoader::global_config_path() {
            Some(global_path) if global_path.exists() => {
                let content = std::fs::read_to_string(&global_path)?;
                println!("# Global Config: {}\n", global_path.display());
                println!("{}", content);
            }
            Some(_) => {
                println!("No global config found.");
                println!("Run 'deepreport config init --global' to create one.");
            }
            None => println!("Cannot determine global config directory."),
        }
    } else {
        // Merged effective config
        ConfigLoader::show_config(format)?;
    }
    Ok(())
}

/// Show configuration paths
pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

/// Initialize global or project configuration
pub fn init(global: bool, force: bool) -> Result<()> {
    let output = Output::new();
    if global {
        let path = ConfigLoader::init_global(force)?;
        output.success("Initialized global configuration");
        println!("  Config: {}", path.display());
    } else {
        let path = ConfigLoader::init_project(force)?;
        output.success("Initialized project configuration");
        println!("  Config: {}", path.display());
    }
    Ok(())
}
