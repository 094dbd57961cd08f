//! Shared front-end for the dbtools converter binaries.
//!
//! Every binary flattens [`CommonArgs`] into its own clap parser, applies its
//! tool-specific flags to a [`ConvertOptions`] and hands off to [`run`].

use std::path::PathBuf;

use clap::Args;
use color_eyre::eyre::{Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};

use dbtools_core::{ConvertJob, ConvertReport, ProgressReporter, SilentProgress};
use dbtools_shared::{AppConfig, ConvertOptions, Tool};

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

/// Flags every converter accepts.
#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Input file.
    #[arg(short = 'f', long = "file", value_name = "INPUT")]
    pub file: PathBuf,

    /// Output file (overwritten if present).
    #[arg(short = 'o', long = "out", value_name = "OUTPUT")]
    pub out: PathBuf,

    /// Do not check the input and output file extensions.
    #[arg(short = 'i', long = "ignore-ext")]
    pub ignore_ext: bool,

    /// Verbose output (-l); repeat for debug (-ll) and trace (-lll) logs.
    #[arg(short = 'l', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Print version.
    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    pub version: Option<bool>,

    /// Config file (defaults to $DBTOOLS_CONFIG, then ~/.dbtools/dbtools.toml).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text")]
    pub log_format: LogFormat,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Initialise tracing. `RUST_LOG` wins over the `-l` count.
pub fn init_tracing(common: &CommonArgs) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match common.verbose {
        0 => "dbtools=warn",
        1 => "dbtools=info",
        2 => "dbtools=debug",
        _ => "dbtools=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match common.log_format {
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

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Load config, apply the tool's flags and run one conversion.
pub async fn run(
    tool: Tool,
    common: &CommonArgs,
    configure: impl FnOnce(&mut ConvertOptions),
) -> Result<()> {
    init_tracing(common);

    let config = match &common.config {
        Some(path) => dbtools_shared::load_config_from(path)?,
        None => dbtools_shared::load_config()?,
    };
    let options = options_for(&config, common, configure);

    if common.verbose > 0 {
        println!(
            "Generating {}: '{}' from",
            tool.output().description(),
            common.out.display()
        );
        println!(
            "{}: '{}'.",
            tool.input().description(),
            common.file.display()
        );
    }

    let job = ConvertJob {
        input: common.file.clone(),
        output: common.out.clone(),
        from: tool.input(),
        to: tool.output(),
        options,
        signature: signature(tool),
    };

    let result = if common.verbose > 0 {
        dbtools_core::convert(&job, &CliProgress::new()).await
    } else {
        dbtools_core::convert(&job, &SilentProgress).await
    };
    let report = result.wrap_err_with(|| format!("{tool} failed"))?;

    tracing::debug!(records = report.records, "done");
    Ok(())
}

/// Merge config defaults, common flags and tool flags, in that order.
pub fn options_for(
    config: &AppConfig,
    common: &CommonArgs,
    configure: impl FnOnce(&mut ConvertOptions),
) -> ConvertOptions {
    let mut options = ConvertOptions::from(config);
    if common.ignore_ext {
        options.check_extensions = false;
    }
    configure(&mut options);
    options
}

/// Tool name and version, written into generated SQL dumps.
pub fn signature(tool: Tool) -> String {
    format!("{} {}", tool.name(), env!("CARGO_PKG_VERSION"))
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Spinner on stderr, only used with `-l`.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(style);
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, report: &ConvertReport) {
        self.spinner.finish_and_clear();
        println!(
            "Converted {} records ({} fields) of table '{}' in {:.1}s",
            report.records,
            report.fields,
            report.table,
            report.elapsed.as_secs_f64()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    #[command(name = "test", version, disable_version_flag = true)]
    struct TestCli {
        #[command(flatten)]
        common: CommonArgs,
    }

    #[test]
    fn parses_common_flags() {
        let cli = TestCli::try_parse_from([
            "test", "-f", "in.csv", "-o", "out.json", "-i", "-ll", "--log-format", "json",
        ])
        .unwrap();
        assert_eq!(cli.common.file, PathBuf::from("in.csv"));
        assert_eq!(cli.common.out, PathBuf::from("out.json"));
        assert!(cli.common.ignore_ext);
        assert_eq!(cli.common.verbose, 2);
        assert!(matches!(cli.common.log_format, LogFormat::Json));
    }

    #[test]
    fn file_and_out_are_required() {
        assert!(TestCli::try_parse_from(["test", "-f", "in.csv"]).is_err());
        assert!(TestCli::try_parse_from(["test", "-o", "out.csv"]).is_err());
    }

    #[test]
    fn short_v_prints_version() {
        let err = TestCli::try_parse_from(["test", "-v"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn ignore_ext_disables_check() {
        let cli = TestCli::try_parse_from(["test", "-f", "a", "-o", "b", "-i"]).unwrap();
        let options = options_for(&AppConfig::default(), &cli.common, |o| o.tz = true);
        assert!(!options.check_extensions);
        assert!(options.tz);
    }

    #[test]
    fn signature_carries_version() {
        assert_eq!(
            signature(Tool::Csv2Sql),
            format!("ccsv2sql {}", env!("CARGO_PKG_VERSION"))
        );
    }
}
