//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/deepreport/config.toml)
//! 3. Project config (.deepreport/config.toml)
//! 4. Environment variables (DEEPREPORT_* prefix)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::types::{ReportError, Result};

const ENV_PREFIX: &str = "DEEPREPORT_";
const APP_DIR: &str = "deepreport";

/// Output format for `config show`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigFormat {
    #[default]
    Toml,
    Json,
    Yaml,
}

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain using Figment:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        let config = Self::figment(
            Self::global_config_path().as_deref(),
            &Self::project_config_path(),
            ENV_PREFIX,
        )
        .extract::<Config>()
        .map_err(|e| ReportError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Err(ReportError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| ReportError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    fn figment(global: Option<&Path>, project: &Path, env_prefix: &str) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = global
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(global_path));
        }

        if project.exists() {
            debug!("Loading project config from: {}", project.display());
            figment = figment.merge(Toml::file(project));
        }

        // e.g. DEEPREPORT_PLANNER_MODEL -> planner.model
        figment.merge(Env::prefixed(env_prefix).split('_').lowercase(true))
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/deepreport/)
    pub fn global_dir() -> Option<PathBuf> {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| {
                directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(".config"))
            })
            .map(|p| p.join(APP_DIR))
    }

    /// Get path to global config file
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get path to project config file
    pub fn project_config_path() -> PathBuf {
        Self::project_dir().join("config.toml")
    }

    /// Get project data directory
    pub fn project_dir() -> PathBuf {
        PathBuf::from(".deepreport")
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Show config file paths
    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
    }

    /// Render the effective configuration
    pub fn render(config: &Config, format: ConfigFormat) -> Result<String> {
        match format {
            ConfigFormat::Json => Ok(serde_json::to_string_pretty(config)?),
            ConfigFormat::Toml => {
                toml::to_string_pretty(config).map_err(|e| ReportError::Config(e.to_string()))
            }
            ConfigFormat::Yaml => {
                serde_yaml::to_string(config).map_err(|e| ReportError::Config(e.to_string()))
            }
        }
    }

    /// Show current effective configuration
    pub fn show_config(format: ConfigFormat) -> Result<()> {
        let config = Self::load()?;
        println!("{}", Self::render(&config, format)?);
        Ok(())
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Initialize global configuration
    pub fn init_global(force: bool) -> Result<PathBuf> {
        let global_dir = Self::global_dir().ok_or_else(|| {
            ReportError::Config("Cannot determine global config directory".to_string())
        })?;
        let path = global_dir.join("config.toml");
        Self::write_template(&path, Self::default_global_config(), force)?;
        Ok(path)
    }

    /// Initialize project configuration
    pub fn init_project(force: bool) -> Result<PathBuf> {
        let path = Self::project_config_path();
        Self::write_template(&path, Self::default_project_config(), force)?;
        Ok(path)
    }

    fn write_template(path: &Path, content: &str, force: bool) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        if path.exists() && !force {
            info!("Config exists: {}", path.display());
            return Ok(());
        }

        fs::write(path, content)?;
        info!("Created config: {}", path.display());
        Ok(())
    }

    // =========================================================================
    // Internal
    // =========================================================================

    fn default_global_config() -> &'static str {
        r#"# deepreport Global Configuration
# User-wide defaults. Project settings in .deepreport/config.toml override these.
# API keys are read from the environment (ANTHROPIC_API_KEY, TAVILY_API_KEY, ...).

version = "1.0"

# Model used for planning and section grading
[planner]
provider = "anthropic"
model = "claude-3-7-sonnet-latest"
temperature = 0.7
max_tokens = 8000

# Model used for query generation and drafting
[writer]
provider = "anthropic"
model = "claude-3-5-sonnet-latest"
temperature = 0.7
max_tokens = 8000

# Search backend: "tavily", "exa", "azure_ai_search"
[search]
api = "tavily"
max_results_per_round = 10

[retry]
max_retries = 3
min_delay_ms = 500
max_delay_secs = 30
"#
    }

    fn default_project_config() -> &'static str {
        r#"# deepreport Project Configuration
# Project-specific settings that override global defaults.

version = "1.0"

[report]
number_of_queries = 2
max_search_depth = 2
research_all_sections = false
plan_review = false

# Provider-specific options, filtered to the keys the selected backend accepts
[search.options]
# max_results = 5
# include_domains = ["arxiv.org"]

[run]
timeout_secs = 1800
"#
    }
}
