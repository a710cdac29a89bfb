//! Run configuration: input layout, rewrite rules and output switches.
//!
//! Nothing here is global; the binary builds a [`Config`] from its flags and
//! hands it to [`crate::pipeline::run`].

use std::path::{Component, Path, PathBuf};

use crate::error::ExtractError;

/// Root namespace for the main package.
pub const ONEFLOW_NAMESPACE: &str = "oneflow";
/// Root namespace for the legacy single-client compatibility package.
pub const SINGLE_CLIENT_NAMESPACE: &str = "oneflow.compatible.single_client";

/// Identifiers and prefixes the rewriter looks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteRules {
    /// Bare callee name of the export annotation, e.g. `@oneflow_export("nn.relu")`.
    pub annotation: String,
    /// Internal namespace that imports are rewritten away from.
    pub legacy_prefix: String,
    /// Public namespace that replaces `legacy_prefix`.
    pub canonical_prefix: String,
    /// Imported names containing this marker are private export plumbing.
    pub private_marker: String,
    /// Top-level string statements containing this text are license boilerplate.
    pub boilerplate_marker: String,
    /// `from X import ...` statements for these modules are dropped.
    pub dropped_modules: Vec<String>,
}

impl Default for RewriteRules {
    fn default() -> Self {
        Self {
            annotation: "oneflow_export".to_string(),
            legacy_prefix: "oneflow.python".to_string(),
            canonical_prefix: "oneflow".to_string(),
            private_marker: "__export_symbols__".to_string(),
            boilerplate_marker: "Copyright 2020 The OneFlow Authors".to_string(),
            dropped_modules: vec!["__future__".to_string()],
        }
    }
}

impl RewriteRules {
    /// `oneflow.python` → `oneflow`, `oneflow.python.x` → `oneflow.x`; `None` when untouched.
    pub fn canonicalize(&self, dotted: &str) -> Option<String> {
        if dotted == self.legacy_prefix {
            return Some(self.canonical_prefix.clone());
        }
        dotted
            .strip_prefix(self.legacy_prefix.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
            .map(|rest| format!("{}.{}", self.canonical_prefix, rest))
    }

    /// True when `dotted` names the annotation itself or the module defining it.
    pub fn mentions_annotation(&self, dotted: &str) -> bool {
        dotted.split('.').any(|segment| segment == self.annotation)
    }
}

/// A directory of sources copied under `dst` with a fixed root namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRoot {
    pub src: PathBuf,
    pub dst: PathBuf,
    pub namespace: String,
}

/// A single file mapped to an explicit destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMapping {
    pub src: PathBuf,
    pub dst: PathBuf,
    pub namespace: String,
}

impl EntryMapping {
    pub fn new(src: &str, dst: &str, namespace: &str) -> Self {
        Self {
            src: PathBuf::from(src),
            dst: PathBuf::from(dst),
            namespace: namespace.to_string(),
        }
    }
}

/// Where sources live and where they land, relative to the source root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub roots: Vec<InputRoot>,
    pub entries: Vec<EntryMapping>,
    /// Replaces roots and entries when `--debug` is set.
    pub debug_entries: Vec<EntryMapping>,
    /// File names never picked up from input roots.
    pub skipped_files: Vec<String>,
    /// First relative component marking test-only files.
    pub test_dir: String,
}

impl Layout {
    /// The OneFlow source checkout.
    pub fn oneflow() -> Self {
        Self {
            roots: vec![
                InputRoot {
                    src: PathBuf::from("oneflow/python"),
                    dst: PathBuf::from("oneflow"),
                    namespace: ONEFLOW_NAMESPACE.to_string(),
                },
                InputRoot {
                    src: PathBuf::from("oneflow/compatible_single_client_python"),
                    dst: PathBuf::from("oneflow/compatible/single_client"),
                    namespace: SINGLE_CLIENT_NAMESPACE.to_string(),
                },
            ],
            entries: vec![
                EntryMapping::new("oneflow/init.py", "oneflow/__init__.py", ONEFLOW_NAMESPACE),
                EntryMapping::new("oneflow/__main__.py", "oneflow/__main__.py", ONEFLOW_NAMESPACE),
                EntryMapping::new(
                    "oneflow/single_client_init.py",
                    "oneflow/compatible/single_client/__init__.py",
                    SINGLE_CLIENT_NAMESPACE,
                ),
                EntryMapping::new(
                    "oneflow/single_client_main.py",
                    "oneflow/compatible/single_client/__main__.py",
                    SINGLE_CLIENT_NAMESPACE,
                ),
            ],
            debug_entries: vec![
                EntryMapping::new(
                    "oneflow/python/ops/nn_ops.py",
                    "oneflow/ops/nn_ops.py",
                    ONEFLOW_NAMESPACE,
                ),
                EntryMapping::new(
                    "oneflow/python/advanced/distribute_ops.py",
                    "oneflow/advanced/distribute_ops.py",
                    ONEFLOW_NAMESPACE,
                ),
            ],
            skipped_files: vec!["version.py".to_string()],
            test_dir: "test".to_string(),
        }
    }
}

/// External formatting passes run over the output directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostprocessOptions {
    pub autoflake: bool,
    pub isort: bool,
    pub black: bool,
    /// Pass `--quiet` to isort and black.
    pub quiet: bool,
}

impl Default for PostprocessOptions {
    fn default() -> Self {
        Self {
            autoflake: true,
            isort: true,
            black: true,
            quiet: true,
        }
    }
}

impl PostprocessOptions {
    pub fn disabled() -> Self {
        Self {
            autoflake: false,
            isort: false,
            black: false,
            quiet: true,
        }
    }

    pub fn any(&self) -> bool {
        self.autoflake || self.isort || self.black
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub src_root: PathBuf,
    pub out_dir: PathBuf,
    pub layout: Layout,
    pub rules: RewriteRules,
    pub debug_subset: bool,
    pub include_tests: bool,
    pub save_ast: bool,
    /// Worker count for the parallel phases; `None` uses rayon's global pool.
    pub jobs: Option<usize>,
    pub postprocess: PostprocessOptions,
}

impl Config {
    pub fn new(src_root: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            src_root: src_root.into(),
            out_dir: out_dir.into(),
            layout: Layout::oneflow(),
            rules: RewriteRules::default(),
            debug_subset: false,
            include_tests: false,
            save_ast: false,
            jobs: None,
            postprocess: PostprocessOptions::default(),
        }
    }

    /// Checks run before anything destructive happens.
    pub fn validate(&self) -> Result<(), ExtractError> {
        validate_out_dir(&self.out_dir)?;
        if self.jobs == Some(0) {
            return Err(ExtractError::Config("--jobs must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// The output directory is wiped at the start of a run, so refuse anything that
/// could name a home or root directory.
pub fn validate_out_dir(out_dir: &Path) -> Result<(), ExtractError> {
    let raw = out_dir.as_os_str();
    if raw.is_empty() {
        return Err(ExtractError::Config("--out_dir must not be empty".to_string()));
    }
    if raw == "~" || raw == "/" {
        return Err(ExtractError::Config(format!(
            "--out_dir must not be {}",
            out_dir.display()
        )));
    }
    if !out_dir
        .components()
        .any(|c| matches!(c, Component::Normal(_)))
    {
        return Err(ExtractError::Config(format!(
            "--out_dir {} does not name a directory of its own",
            out_dir.display()
        )));
    }
    Ok(())
}
