use clap::{Parser, Subcommand};
use curator::{
    commands::{
        check::{self, CheckCommand},
        compile::{self, CompileCommand},
        config::{self, ConfigAction},
        inspect::{self, InspectCommand},
    },
    common::{with_legacy_compile, LEGACY_NOTICE},
    init_tracing, CliError, GlobalOpts,
};
use curator_config::Config;
use curator_logger as logger;

/// Subcommand names, for the legacy `compile` insertion
const COMMANDS: &[&str] = &["compile", "check", "inspect", "config", "help"];

#[derive(Parser)]
#[command(name = "curator")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Dataset curation for ROOT files",
    long_about = "curator builds YAML manifests describing datasets of ROOT files and checks existing ones."
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or extend a manifest from a list of files
    Compile(CompileCommand),
    /// Load manifests and report inconsistencies
    Check(CheckCommand),
    /// Describe the objects stored in data files
    Inspect(InspectCommand),
    /// Configure the curator tool
    #[command(subcommand_required = false, arg_required_else_help = false)]
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

fn run(cli: Cli, config: &Config) -> Result<(), CliError> {
    match cli.command {
        Commands::Compile(cmd) => compile::handle_compile(cmd, config).map(|_| ()),
        Commands::Check(cmd) => check::handle_check(cmd, config),
        Commands::Inspect(cmd) => inspect::handle_inspect(cmd),
        Commands::Config { action } => config::handle_config(action, &cli.global),
    }
}

fn main() {
    let (args, legacy) = with_legacy_compile(std::env::args_os().collect(), COMMANDS);
    let cli = Cli::parse_from(args);

    if let Err(e) =
        logger::init_with_verbosity(cli.global.verbosity_level(), cli.global.no_log_file)
    {
        eprintln!("Warning: Failed to initialize logger: {}", e);
    }
    init_tracing();

    if legacy {
        logger::warn(LEGACY_NOTICE);
    }

    let config = Config::load().unwrap_or_else(|e| {
        logger::warn(&format!("Failed to load config, using defaults: {}", e));
        Config::default()
    });

    match run(cli, &config) {
        Ok(()) => {}
        Err(CliError::CheckFailed(_)) => std::process::exit(1),
        Err(e) => {
            logger::error(&e.to_string());
            logger::show_log_path();
            std::process::exit(1);
        }
    }
}
