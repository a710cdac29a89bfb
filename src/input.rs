use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::{Config, EntryMapping, InputRoot};
use crate::error::ExtractError;
use crate::naming::{PACKAGE_INIT, SOURCE_EXTENSION, module_from_path};
use crate::rewriter::parse_suite;
use crate::utils::SourceUnit;

/// An input file and where its contents go, before it is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub src: PathBuf,
    /// Destination-relative path, e.g. `oneflow/ops/nn_ops.py`.
    pub dst: PathBuf,
    pub namespace: String,
    pub is_test: bool,
}

impl SourceSpec {
    fn from_entry(src_root: &Path, entry: &EntryMapping) -> Self {
        Self {
            src: src_root.join(&entry.src),
            dst: entry.dst.clone(),
            namespace: entry.namespace.clone(),
            is_test: false,
        }
    }
}

fn is_python_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == SOURCE_EXTENSION)
}

fn is_skipped(config: &Config, path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return true;
    };
    config.layout.skipped_files.iter().any(|skip| skip == name)
        || name.contains(config.rules.annotation.as_str())
}

/// An empty `__init__.py` directly under a root is superseded by the entry mapping.
fn is_empty_root_init(rel: &Path, path: &Path) -> Result<bool, ExtractError> {
    let init = format!("{PACKAGE_INIT}.{SOURCE_EXTENSION}");
    if rel != Path::new(&init) {
        return Ok(false);
    }
    let code = fs::read_to_string(path).map_err(|e| ExtractError::io(path, e))?;
    Ok(code.trim().is_empty())
}

fn discover_root(config: &Config, root: &InputRoot) -> Result<Vec<SourceSpec>, ExtractError> {
    let base = config.src_root.join(&root.src);
    if !base.is_dir() {
        warn!(root = %base.display(), "input root not found; skipping");
        return Ok(Vec::new());
    }

    let mut specs = Vec::new();
    for entry in WalkDir::new(&base).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(&base).to_path_buf();
            ExtractError::io(path, e.into())
        })?;
        let path = entry.path();
        if !entry.file_type().is_file() || !is_python_file(path) || is_skipped(config, path) {
            continue;
        }
        let rel = path
            .strip_prefix(&base)
            .map_err(|_| ExtractError::InvalidPath {
                path: path.to_path_buf(),
                reason: format!("not under input root {}", base.display()),
            })?;
        if is_empty_root_init(rel, path)? {
            debug!(src = %path.display(), "skipping empty root __init__");
            continue;
        }

        let is_test = matches!(
            rel.components().next(),
            Some(Component::Normal(first)) if first == config.layout.test_dir.as_str()
        );
        if is_test && !config.include_tests {
            debug!(src = %path.display(), "[skip test]");
            continue;
        }
        specs.push(SourceSpec {
            src: path.to_path_buf(),
            dst: root.dst.join(rel),
            namespace: root.namespace.clone(),
            is_test,
        });
    }
    Ok(specs)
}

/// All inputs in discovery order: roots first (file-name sorted), then entries.
pub fn discover(config: &Config) -> Result<Vec<SourceSpec>, ExtractError> {
    if config.debug_subset {
        let specs: Vec<SourceSpec> = config
            .layout
            .debug_entries
            .iter()
            .map(|entry| SourceSpec::from_entry(&config.src_root, entry))
            .collect();
        info!(files = specs.len(), "debug subset selected");
        return Ok(specs);
    }

    let mut specs = Vec::new();
    for root in &config.layout.roots {
        specs.extend(discover_root(config, root)?);
    }
    specs.extend(
        config
            .layout
            .entries
            .iter()
            .filter(|entry| !is_skipped(config, &entry.src))
            .map(|entry| SourceSpec::from_entry(&config.src_root, entry)),
    );
    info!(files = specs.len(), "discovered source files");
    Ok(specs)
}

/// Read and parse one input file.
pub fn load_unit(spec: &SourceSpec) -> Result<SourceUnit, ExtractError> {
    let code = fs::read_to_string(&spec.src).map_err(|e| ExtractError::io(&spec.src, e))?;
    let suite = parse_suite(&spec.src, &code)?;
    let module = module_from_path(&spec.dst)?;
    debug!(src = %spec.src.display(), %module, bytes = code.len(), "loaded source");
    Ok(SourceUnit {
        src: spec.src.clone(),
        module,
        namespace: spec.namespace.clone(),
        code,
        suite,
        is_test: spec.is_test,
    })
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::config::Layout;

    fn write(root: &Path, rel: &str, code: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, code).unwrap();
    }

    fn config(root: &Path) -> Config {
        let mut config = Config::new(root, root.join("out"));
        config.layout = Layout {
            roots: vec![InputRoot {
                src: PathBuf::from("pkg/python"),
                dst: PathBuf::from("pkg"),
                namespace: "pkg".to_string(),
            }],
            entries: vec![EntryMapping::new("pkg/init.py", "pkg/__init__.py", "pkg")],
            debug_entries: vec![EntryMapping::new("pkg/python/b.py", "pkg/b.py", "pkg")],
            skipped_files: vec!["version.py".to_string()],
            test_dir: "test".to_string(),
        };
        config
    }

    #[test]
    fn test_discovery_order_and_filters() {
        let tmp = tempdir().expect("tempdir");
        let root = tmp.path();
        write(root, "pkg/python/__init__.py", "");
        write(root, "pkg/python/b.py", "x = 1\n");
        write(root, "pkg/python/a/z.py", "x = 1\n");
        write(root, "pkg/python/version.py", "v = 1\n");
        write(root, "pkg/python/oneflow_export.py", "def oneflow_export(*a): ...\n");
        write(root, "pkg/python/notes.txt", "hi\n");
        write(root, "pkg/python/test/test_b.py", "x = 1\n");
        write(root, "pkg/init.py", "");

        let specs = discover(&config(root)).unwrap();
        let dsts: Vec<_> = specs.iter().map(|s| s.dst.to_str().unwrap()).collect();
        assert_eq!(dsts, vec!["pkg/a/z.py", "pkg/b.py", "pkg/__init__.py"]);
    }

    #[test]
    fn test_tests_included_on_request() {
        let tmp = tempdir().expect("tempdir");
        let root = tmp.path();
        write(root, "pkg/python/test/test_b.py", "x = 1\n");
        let mut config = config(root);
        config.include_tests = true;
        let specs = discover(&config).unwrap();
        assert!(specs.iter().any(|s| s.is_test && s.dst == Path::new("pkg/test/test_b.py")));
    }

    #[test]
    fn test_non_empty_root_init_is_kept() {
        let tmp = tempdir().expect("tempdir");
        let root = tmp.path();
        write(root, "pkg/python/__init__.py", "x = 1\n");
        let specs = discover(&config(root)).unwrap();
        assert_eq!(specs[0].dst, PathBuf::from("pkg/__init__.py"));
    }

    #[test]
    fn test_debug_subset_replaces_layout() {
        let tmp = tempdir().expect("tempdir");
        let mut config = config(tmp.path());
        config.debug_subset = true;
        let specs = discover(&config).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].dst, PathBuf::from("pkg/b.py"));
    }

    #[test]
    fn test_load_unit_resolves_module() {
        let tmp = tempdir().expect("tempdir");
        write(tmp.path(), "ops.py", "def f():\n    pass\n");
        let unit = load_unit(&SourceSpec {
            src: tmp.path().join("ops.py"),
            dst: PathBuf::from("pkg/ops/__init__.py"),
            namespace: "pkg".to_string(),
            is_test: false,
        })
        .unwrap();
        assert_eq!(unit.module, "pkg.ops");
        assert_eq!(unit.suite.len(), 1);
    }

    #[test]
    fn test_missing_entry_file_is_io_error() {
        let err = load_unit(&SourceSpec {
            src: PathBuf::from("/definitely/not/here.py"),
            dst: PathBuf::from("pkg/here.py"),
            namespace: "pkg".to_string(),
            is_test: false,
        })
        .unwrap_err();
        assert!(matches!(err, ExtractError::Io { .. }));
    }
}
