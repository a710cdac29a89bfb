//! Mapping between filesystem paths and dotted module paths.
//!
//! All functions are pure (no I/O).

use std::path::{Component, Path, PathBuf};

use crate::error::ExtractError;

pub const SOURCE_EXTENSION: &str = "py";
pub const PACKAGE_INIT: &str = "__init__";

/// How a destination module is laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    /// `a/b/c.py`
    Leaf,
    /// `a/b/c/__init__.py`
    Package,
}

/// `a.b.c` → `a.b`; a single segment has no parent.
pub fn parent_module(dotted: &str) -> &str {
    dotted.rsplit_once('.').map_or("", |(parent, _)| parent)
}

/// `a.b.c` → `c`
pub fn last_segment(dotted: &str) -> &str {
    dotted.rsplit_once('.').map_or(dotted, |(_, last)| last)
}

pub fn join_module(parent: &str, child: &str) -> String {
    match (parent.is_empty(), child.is_empty()) {
        (_, true) => parent.to_string(),
        (true, false) => child.to_string(),
        (false, false) => format!("{parent}.{child}"),
    }
}

/// `__main__`, `__init__` and friends.
pub fn is_dunder(segment: &str) -> bool {
    segment.len() > 4 && segment.starts_with("__") && segment.ends_with("__")
}

pub fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_alphabetic() => {
            chars.all(|c| c == '_' || c.is_alphanumeric())
        }
        _ => false,
    }
}

/// True when every `.`-separated segment is a non-empty identifier.
pub fn is_dotted_name(dotted: &str) -> bool {
    !dotted.is_empty() && dotted.split('.').all(is_identifier)
}

/// Destination-relative file path → dotted module.
///
/// `oneflow/ops/nn_ops.py` → `oneflow.ops.nn_ops`, `oneflow/__init__.py` → `oneflow`.
pub fn module_from_path(path: &Path) -> Result<String, ExtractError> {
    let invalid = |reason: &str| ExtractError::InvalidPath {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(
                part.to_str()
                    .ok_or_else(|| invalid("path is not valid UTF-8"))?,
            ),
            Component::CurDir => {}
            _ => return Err(invalid("expected a relative path without `..`")),
        }
    }

    let file = parts
        .pop()
        .ok_or_else(|| invalid("path has no file name"))?;
    let stem = file
        .strip_suffix(SOURCE_EXTENSION)
        .and_then(|s| s.strip_suffix('.'))
        .ok_or_else(|| invalid("not a python source file"))?;
    if stem != PACKAGE_INIT {
        parts.push(stem);
    }
    if parts.is_empty() {
        return Err(invalid("a top-level __init__ has no module name"));
    }
    Ok(parts.join("."))
}

/// Dotted module → destination-relative file path.
pub fn path_from_module(module: &str, kind: ModuleKind) -> PathBuf {
    let mut path: PathBuf = module.split('.').collect();
    match kind {
        ModuleKind::Leaf => {
            path.set_extension(SOURCE_EXTENSION);
        }
        ModuleKind::Package => {
            path.push(format!("{PACKAGE_INIT}.{SOURCE_EXTENSION}"));
        }
    }
    path
}
