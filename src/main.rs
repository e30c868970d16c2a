use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use deepreport::cli::commands::resume::ResumeOptions;
use deepreport::cli::commands::run::RunOptions;
use deepreport::config::ConfigFormat;
use deepreport::report::RunStatus;

/// Parse config output format from string
fn parse_config_format(s: &str) -> Result<ConfigFormat, String> {
    match s.to_lowercase().as_str() {
        "toml" => Ok(ConfigFormat::Toml),
        "json" => Ok(ConfigFormat::Json),
        "yaml" | "yml" => Ok(ConfigFormat::Yaml),
        _ => Err(format!(
            "Invalid format '{}'. Valid values: toml, json, yaml",
            s
        )),
    }
}

#[derive(Parser)]
#[command(name = "deepreport")]
#[command(
    version,
    about = "Plan-and-execute research reports from a language model and web search"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a report for a topic
    Run {
        #[arg(help = "Report topic (optional with --request)")]
        topic: Option<String>,
        #[arg(long, help = "Request payload file (JSON or YAML)")]
        request: Option<PathBuf>,
        #[arg(long, help = "Search backend: tavily, exa, azure_ai_search")]
        search_api: Option<String>,
        #[arg(long, help = "Planner provider (anthropic, openai, azure-openai, ollama)")]
        planner_provider: Option<String>,
        #[arg(long, help = "Planner model")]
        planner_model: Option<String>,
        #[arg(long, help = "Writer provider (anthropic, openai, azure-openai, ollama)")]
        writer_provider: Option<String>,
        #[arg(long, help = "Writer model")]
        writer_model: Option<String>,
        #[arg(short = 'd', long = "depth", help = "Refinement rounds per section")]
        max_search_depth: Option<usize>,
        #[arg(short = 'n', long = "queries", help = "Search queries per round")]
        number_of_queries: Option<usize>,
        #[arg(long, help = "File with the report structure template")]
        structure: Option<PathBuf>,
        #[arg(long, help = "Research every planned section")]
        research_all: bool,
        #[arg(long, help = "Stop after planning for review")]
        review: bool,
        #[arg(long, help = "Review file path (default: .deepreport/review.json)")]
        review_file: Option<PathBuf>,
        #[arg(long, short, help = "Write the JSON result to a file")]
        output: Option<PathBuf>,
    },

    /// Continue a run paused for plan review
    Resume {
        #[arg(long, help = "Review file path (default: .deepreport/review.json)")]
        token: Option<PathBuf>,
        #[arg(long, help = "Accept the plan and generate the report")]
        approve: bool,
        #[arg(long, help = "Revise the plan with this feedback")]
        feedback: Option<String>,
        #[arg(long, short, help = "Write the JSON result to a file")]
        output: Option<PathBuf>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(short = 'g', long, help = "Show global config file only")]
        global: bool,
        #[arg(
            short = 'f',
            long,
            default_value = "toml",
            value_parser = parse_config_format,
            help = "Output format: toml, json, yaml"
        )]
        format: ConfigFormat,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mdeepreport encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Backtrace when RUST_BACKTRACE=1
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn exit_code(status: Option<RunStatus>) -> ExitCode {
    match status {
        Some(RunStatus::Failed) => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    }
}

fn run_cli() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    // Logs go to stderr so stdout stays the JSON result
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let code = match cli.command {
        Commands::Run {
            topic,
            request,
            search_api,
            planner_provider,
            planner_model,
            writer_provider,
            writer_model,
            max_search_depth,
            number_of_queries,
            structure,
            research_all,
            review,
            review_file,
            output,
        } => {
            let status = deepreport::cli::commands::run::run(RunOptions {
                topic,
                request,
                search_api,
                planner_provider,
                planner_model,
                writer_provider,
                writer_model,
                max_search_depth,
                number_of_queries,
                structure,
                research_all,
                review,
                review_file,
                output,
            })?;
            exit_code(status)
        }
        Commands::Resume {
            token,
            approve,
            feedback,
            output,
        } => {
            let status = deepreport::cli::commands::resume::run(ResumeOptions {
                token,
                approve,
                feedback,
                output,
            })?;
            exit_code(status)
        }
        Commands::Config { action } => {
            match action {
                ConfigAction::Show { global, format } => {
                    deepreport::cli::commands::config::show(global, format)?;
                }
                ConfigAction::Path => {
                    deepreport::cli::commands::config::path()?;
                }
                ConfigAction::Init { global, force } => {
                    deepreport::cli::commands::config::init(global, force)?;
                }
            }
            ExitCode::SUCCESS
        }
    };

    Ok(code)
}
