//! Build and smoke-test steps. Everything runs sequentially: one subprocess
//! at a time, the first failure aborts.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use color_eyre::eyre::{Result, WrapErr, bail, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use dbtools_shared::{Format, Tool};

/// Cargo package holding the converter binaries.
const CLI_PACKAGE: &str = "dbtools-cli";

/// Paths and programs the tasks run against.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Workspace root (holds the top-level `Cargo.toml`).
    pub root: PathBuf,
    /// Cargo binary, from `$CARGO` when run through cargo.
    pub cargo: OsString,
    /// Cargo target directory, from `$CARGO_TARGET_DIR` or `<root>/target`.
    pub target_dir: PathBuf,
}

impl Workspace {
    /// Locate the workspace this xtask was compiled in.
    pub fn locate() -> Result<Self> {
        let root = Path::new(env!("CARGO_MANIFEST_DIR"))
            .ancestors()
            .nth(2)
            .ok_or_else(|| eyre!("xtask manifest dir has no workspace root"))?
            .to_path_buf();

        let cargo = std::env::var_os("CARGO").unwrap_or_else(|| "cargo".into());
        let target_dir = match std::env::var_os("CARGO_TARGET_DIR") {
            Some(dir) if !dir.is_empty() => root.join(dir),
            _ => root.join("target"),
        };

        debug!(root = %root.display(), target = %target_dir.display(), "located workspace");
        Ok(Self {
            root,
            cargo,
            target_dir,
        })
    }

    /// Release binary of `tool`.
    pub fn binary(&self, tool: Tool) -> PathBuf {
        self.target_dir
            .join("release")
            .join(format!("{}{}", tool.name(), std::env::consts::EXE_SUFFIX))
    }

    /// Sample input for `format`.
    pub fn sample(&self, format: Format) -> PathBuf {
        self.root
            .join("fixtures")
            .join("samples")
            .join(format!("sample.{}", format.extension()))
    }

    /// `cargo build --release -p dbtools-cli --bin <tool>`, run from the root.
    pub fn build_command(&self, tool: Tool) -> Command {
        let mut cmd = Command::new(&self.cargo);
        cmd.args(["build", "--release", "-p", CLI_PACKAGE, "--bin", tool.name()])
            .current_dir(&self.root);
        cmd
    }

    /// `<bin> -f <sample> -o <out_dir>/out.<ext>`, plus the output path.
    pub fn convert_command(&self, tool: Tool, out_dir: &Path) -> (Command, PathBuf) {
        let output = out_dir.join(format!("out.{}", tool.output().extension()));
        let mut cmd = Command::new(self.binary(tool));
        cmd.arg("-f")
            .arg(self.sample(tool.input()))
            .arg("-o")
            .arg(&output)
            .current_dir(&self.root);
        (cmd, output)
    }
}

/// The requested tools in build order; all of them when none are named.
pub fn selected(tools: &[Tool]) -> Vec<Tool> {
    if tools.is_empty() {
        return Tool::ALL.to_vec();
    }
    Tool::ALL
        .into_iter()
        .filter(|t| tools.contains(t))
        .collect()
}

/// Build each tool's release binary in order.
pub fn build(ws: &Workspace, tools: &[Tool]) -> Result<()> {
    let bar = ProgressBar::new(tools.len() as u64);
    if let Ok(style) = ProgressStyle::with_template("{prefix:.cyan} [{bar:24}] {pos}/{len}") {
        bar.set_style(style.progress_chars("=> "));
    }
    bar.set_prefix("build");

    for &tool in tools {
        bar.suspend(|| {
            println!("Building {tool}...");
            run(&mut ws.build_command(tool), &format!("build of {tool}"))
        })?;
        bar.inc(1);
    }

    bar.finish_and_clear();
    info!(count = tools.len(), "build complete");
    Ok(())
}

/// Run each tool with `--help`, then on its sample input, and print the output.
pub fn smoke_test(ws: &Workspace, tools: &[Tool], out_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(out_dir)
        .wrap_err_with(|| format!("failed to create {}", out_dir.display()))?;

    for &tool in tools {
        println!("Testing {tool}...");

        let mut help = Command::new(ws.binary(tool));
        help.arg("--help").current_dir(&ws.root);
        run(&mut help, &format!("{tool} --help"))?;

        let (mut convert, output) = ws.convert_command(tool, out_dir);
        run(&mut convert, &format!("{tool} on sample.{}", tool.input().extension()))?;

        let text = std::fs::read_to_string(&output)
            .wrap_err_with(|| format!("failed to read {}", output.display()))?;
        println!("{}", text.trim_end());
    }

    info!(count = tools.len(), out_dir = %out_dir.display(), "smoke test passed");
    Ok(())
}

/// Run a subprocess with inherited stdio and wait for it.
fn run(cmd: &mut Command, what: &str) -> Result<()> {
    debug!(command = ?cmd, "running");

    let status = cmd
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .wrap_err_with(|| format!("failed to run {what}"))?;

    if !status.success() {
        bail!("{what} failed with {status}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace(cargo: &str, target_dir: &Path) -> Workspace {
        Workspace {
            root: Workspace::locate().unwrap().root,
            cargo: cargo.into(),
            target_dir: target_dir.to_path_buf(),
        }
    }

    fn args(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn selection_keeps_build_order() {
        assert_eq!(selected(&[]), Tool::ALL.to_vec());
        assert_eq!(
            selected(&[Tool::Sql2Mongo, Tool::Csv2Sql]),
            vec![Tool::Csv2Sql, Tool::Sql2Mongo]
        );
    }

    #[test]
    fn every_tool_has_a_sample() {
        let ws = Workspace::locate().unwrap();
        assert!(ws.root.join("Cargo.toml").is_file());
        for tool in Tool::ALL {
            let sample = ws.sample(tool.input());
            assert!(sample.is_file(), "missing {}", sample.display());
        }
    }

    #[test]
    fn build_command_targets_cli_package() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace("cargo", dir.path());
        let cmd = ws.build_command(Tool::Mongo2Sql);

        assert_eq!(cmd.get_program(), "cargo");
        assert_eq!(
            args(&cmd),
            ["build", "--release", "-p", "dbtools-cli", "--bin", "cmongo2sql"]
        );
        assert_eq!(cmd.get_current_dir(), Some(ws.root.as_path()));
    }

    #[test]
    fn convert_command_uses_sample_and_out_dir() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace("cargo", dir.path());
        let (cmd, output) = ws.convert_command(Tool::Sql2Csv, dir.path());

        assert_eq!(cmd.get_program(), ws.binary(Tool::Sql2Csv).as_os_str());
        assert_eq!(output, dir.path().join("out.csv"));

        let args = args(&cmd);
        assert_eq!(args[0], "-f");
        assert!(args[1].ends_with("sample.sql"));
        assert_eq!(args[2], "-o");
        assert_eq!(args[3], output.to_string_lossy());
    }

    #[cfg(unix)]
    #[test]
    fn build_stops_at_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = build(&workspace("false", dir.path()), &Tool::ALL).unwrap_err();
        assert!(err.to_string().contains("build of ccsv2mongo failed"));
    }

    #[cfg(unix)]
    #[test]
    fn build_succeeds_when_every_step_does() {
        let dir = tempfile::tempdir().unwrap();
        build(&workspace("true", dir.path()), &Tool::ALL).unwrap();
    }

    #[test]
    fn smoke_test_fails_without_binaries() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace("cargo", dir.path());
        let err = smoke_test(&ws, &[Tool::Csv2Mongo], &dir.path().join("out")).unwrap_err();
        assert!(err.to_string().contains("ccsv2mongo --help"));
    }
}
