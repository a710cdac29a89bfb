use oneflow_extract::config::{Config, PostprocessOptions};
use oneflow_extract::error::ExtractError;
use oneflow_extract::pipeline;
use oneflow_extract::utils;

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    name = "oneflow-extract",
    about = "Relocate export-annotated definitions and regenerate the python package tree",
    version
)]
struct Args {
    /// Output root; wiped before every run
    #[arg(long = "out_dir", default_value = "python")]
    out_dir: PathBuf,
    /// Directory the input layout is resolved against
    #[arg(long = "src_root", default_value = ".")]
    src_root: PathBuf,
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Only process the small fixed debug subset
    #[arg(short, long, default_value_t = false)]
    debug: bool,
    /// Skip unused-import removal
    #[arg(long = "skip_autoflake", visible_alias = "sa", default_value_t = false)]
    skip_autoflake: bool,
    /// Skip black formatting
    #[arg(long = "skip_black", visible_alias = "sb", default_value_t = false)]
    skip_black: bool,
    /// Skip import sorting
    #[arg(long = "skip_isort", visible_alias = "si", default_value_t = false)]
    skip_isort: bool,
    /// Also write a tree dump next to every emitted file
    #[arg(long = "save_ast", visible_alias = "ast", default_value_t = false)]
    save_ast: bool,
    /// Include files under the test directory of each input root
    #[arg(long = "include_tests", default_value_t = false)]
    include_tests: bool,
    /// Worker threads for the parallel phases
    #[arg(short, long)]
    jobs: Option<usize>,
}

impl Args {
    fn into_config(self) -> Config {
        let mut config = Config::new(self.src_root, self.out_dir);
        config.debug_subset = self.debug;
        config.include_tests = self.include_tests;
        config.save_ast = self.save_ast;
        config.jobs = self.jobs;
        config.postprocess = PostprocessOptions {
            autoflake: !self.skip_autoflake,
            isort: !self.skip_isort,
            black: !self.skip_black,
            quiet: self.verbose == 0,
        };
        config
    }
}

/// Accept the historical single-dash spellings `-sa`, `-sb` and `-si`.
fn normalize_legacy_flags(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    args.into_iter()
        .map(|arg| match arg.to_str() {
            Some("-sa") => OsString::from("--skip_autoflake"),
            Some("-sb") => OsString::from("--skip_black"),
            Some("-si") => OsString::from("--skip_isort"),
            _ => arg,
        })
        .collect()
}

/// Quiet unless asked: warnings only, `-v` progress, `-vv` per-file detail, `-vvv` everything.
fn log_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn init_tracing(verbosity: u8) {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(log_level(verbosity))
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn run(args: Args) -> Result<()> {
    let config = args.into_config();
    info!(
        src_root = %config.src_root.display(),
        out_dir = %config.out_dir.display(),
        debug = config.debug_subset,
        save_ast = config.save_ast,
        jobs = ?config.jobs,
        "starting extraction"
    );
    let summary = pipeline::run(&config)
        .with_context(|| format!("extraction into {} failed", config.out_dir.display()))?;
    utils::print_summary(&summary);
    info!(
        relocations = summary.relocations,
        modules = summary.destinations,
        "extraction completed"
    );
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse_from(normalize_legacy_flags(std::env::args_os()));
    init_tracing(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            let code = err
                .downcast_ref::<ExtractError>()
                .map_or(1, ExtractError::exit_code);
            ExitCode::from(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::parse_from(normalize_legacy_flags(args.iter().map(OsString::from)))
    }

    #[test]
    fn test_legacy_short_flags() {
        let args = parse(&["oneflow-extract", "-sa", "-sb", "-si", "--ast", "-v"]);
        assert!(args.skip_autoflake && args.skip_black && args.skip_isort);
        assert!(args.save_ast);
        let config = args.into_config();
        assert!(!config.postprocess.any());
        assert!(!config.postprocess.quiet);
    }

    #[test]
    fn test_progress_logging_needs_verbose() {
        assert_eq!(log_level(parse(&["oneflow-extract"]).verbose), "warn");
        assert_eq!(log_level(parse(&["oneflow-extract", "-v"]).verbose), "info");
        assert_eq!(log_level(parse(&["oneflow-extract", "-vv"]).verbose), "debug");
        assert_eq!(log_level(parse(&["oneflow-extract", "-vvv"]).verbose), "trace");
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["oneflow-extract"]).into_config();
        assert_eq!(config.out_dir, PathBuf::from("python"));
        assert!(config.postprocess.autoflake && config.postprocess.quiet);
        assert!(!config.debug_subset);
    }
}
