//! Task runner for the dbtools workspace.
//!
//! `cargo run -p dbtools-xtask -- build` compiles the converter binaries,
//! `cargo run -p dbtools-xtask -- test` builds them and runs each one on its
//! sample input.

mod tasks;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;

use dbtools_shared::Tool;

use tasks::Workspace;

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Build and smoke-test the dbtools converters.",
    long_about = None,
)]
struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Build release binaries of the converters, one at a time.
    Build {
        /// Only build this tool (repeatable; default: all).
        #[arg(long = "tool", value_name = "NAME")]
        tools: Vec<Tool>,
    },

    /// Build, then run each converter with --help and on its sample input.
    Test {
        /// Use the binaries already in the target directory.
        #[arg(long)]
        skip_build: bool,

        /// Only test this tool (repeatable; default: all).
        #[arg(long = "tool", value_name = "NAME")]
        tools: Vec<Tool>,

        /// Where to write converter output (default: target/smoke).
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,
    },

    /// Write a default converter config file.
    InitConfig {
        /// Target path (default: $DBTOOLS_CONFIG or ~/.dbtools/dbtools.toml).
        #[arg(long, value_name = "PATH")]
        path: Option<PathBuf>,
    },
}

fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "dbtools=warn",
        1 => "dbtools=info",
        2 => "dbtools=debug",
        _ => "dbtools=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(&cli);

    match cli.command {
        Command::Build { tools } => tasks::build(&Workspace::locate()?, &tasks::selected(&tools)),
        Command::Test {
            skip_build,
            tools,
            out_dir,
        } => {
            let ws = Workspace::locate()?;
            let tools = tasks::selected(&tools);
            if !skip_build {
                tasks::build(&ws, &tools)?;
            }
            let out_dir = out_dir.unwrap_or_else(|| ws.target_dir.join("smoke"));
            tasks::smoke_test(&ws, &tools, &out_dir)
        }
        Command::InitConfig { path } => {
            let path = match path {
                Some(path) => {
                    dbtools_shared::init_config_at(&path)?;
                    path
                }
                None => dbtools_shared::init_config()?,
            };
            println!("Wrote default config to {}", path.display());
            Ok(())
        }
    }
}
