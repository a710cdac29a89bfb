use std::path::Path;
use std::process::Command;

use tracing::{info, warn};

use crate::config::PostprocessOptions;
use crate::error::ExtractError;

/// Detect the Python executable name available on this system.
/// Tries `python3` first (Linux/macOS convention), then falls back to `python`.
pub fn detect_python() -> Result<String, ExtractError> {
    for candidate in &["python3", "python"] {
        if let Ok(output) = Command::new(candidate).arg("--version").output()
            && output.status.success()
        {
            return Ok(candidate.to_string());
        }
    }
    Err(ExtractError::ToolLaunch {
        tool: "python".to_string(),
        source: std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "neither python3 nor python is on PATH",
        ),
    })
}

/// One whole-tree pass, run as `python -m <module> <args>` inside the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPass {
    pub module: &'static str,
    pub args: Vec<&'static str>,
}

/// Passes to run, in order: unused-import removal, import sorting, formatting.
pub fn planned_passes(options: &PostprocessOptions) -> Vec<ToolPass> {
    let mut passes = Vec::new();
    if options.autoflake {
        passes.push(ToolPass {
            module: "autoflake",
            args: vec![
                "--in-place",
                "--remove-all-unused-imports",
                "--recursive",
                ".",
            ],
        });
    }
    let quiet: &[&'static str] = if options.quiet { &["--quiet"] } else { &[] };
    if options.isort {
        let mut args = vec!["."];
        args.extend_from_slice(quiet);
        passes.push(ToolPass {
            module: "isort",
            args,
        });
    }
    if options.black {
        let mut args = vec!["."];
        args.extend_from_slice(quiet);
        passes.push(ToolPass {
            module: "black",
            args,
        });
    }
    passes
}

/// Run the enabled passes over `out_dir`. The first non-zero exit aborts.
pub fn run_postprocess(out_dir: &Path, options: &PostprocessOptions) -> Result<(), ExtractError> {
    let passes = planned_passes(options);
    if passes.is_empty() {
        info!("all postprocess passes skipped");
        return Ok(());
    }
    let python = detect_python()?;

    for pass in passes {
        info!(tool = pass.module, dir = %out_dir.display(), "[postprocess]");
        let status = Command::new(&python)
            .arg("-m")
            .arg(pass.module)
            .args(&pass.args)
            .current_dir(out_dir)
            .status()
            .map_err(|source| ExtractError::ToolLaunch {
                tool: pass.module.to_string(),
                source,
            })?;
        if !status.success() {
            warn!(tool = pass.module, %status, "postprocess tool failed");
            return Err(ExtractError::PostprocessTool {
                tool: pass.module.to_string(),
                status,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passes_follow_switches_and_order() {
        let all = planned_passes(&PostprocessOptions::default());
        let names: Vec<_> = all.iter().map(|p| p.module).collect();
        assert_eq!(names, vec!["autoflake", "isort", "black"]);
        assert_eq!(all[1].args, vec![".", "--quiet"]);

        let loud = PostprocessOptions {
            autoflake: false,
            quiet: false,
            ..PostprocessOptions::default()
        };
        let passes = planned_passes(&loud);
        assert_eq!(passes.len(), 2);
        assert_eq!(passes[0].args, vec!["."]);
    }

    #[test]
    fn test_disabled_runs_nothing() {
        assert!(planned_passes(&PostprocessOptions::disabled()).is_empty());
        let tmp = std::env::temp_dir();
        assert!(run_postprocess(&tmp, &PostprocessOptions::disabled()).is_ok());
    }
}
