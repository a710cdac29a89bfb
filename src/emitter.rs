use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ExtractError;
use crate::merge::MergedModule;
use crate::naming::{ModuleKind, path_from_module};
use crate::rewriter::parse_suite;

pub const AST_DUMP_EXTENSION: &str = "ast";

#[derive(Debug, Clone, Copy)]
pub struct EmitOptions<'a> {
    pub out_dir: &'a Path,
    /// Also write a debug dump of the merged tree next to each file.
    pub save_ast: bool,
}

/// Writes one merged module. The destination must not exist yet.
pub fn emit(
    module: &MergedModule,
    kind: ModuleKind,
    options: EmitOptions<'_>,
) -> Result<PathBuf, ExtractError> {
    let dst = options.out_dir.join(path_from_module(&module.module, kind));
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).map_err(|e| ExtractError::io(parent, e))?;
    }

    let code = module.render();
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&dst)
        .map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => ExtractError::EmissionConflict { path: dst.clone() },
            _ => ExtractError::io(&dst, e),
        })?;
    file.write_all(code.as_bytes())
        .map_err(|e| ExtractError::io(&dst, e))?;

    if options.save_ast {
        let suite = parse_suite(&dst, &code)?;
        let dump_path = dst.with_extension(AST_DUMP_EXTENSION);
        fs::write(&dump_path, format!("{suite:#?}\n"))
            .map_err(|e| ExtractError::io(&dump_path, e))?;
    }

    debug!(
        module = %module.module,
        ?kind,
        trees = module.trees.len(),
        path = %dst.display(),
        "emitted module"
    );
    Ok(dst)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::utils::SourceTree;

    fn module(name: &str, code: &str) -> MergedModule {
        MergedModule {
            module: name.to_string(),
            trees: vec![SourceTree {
                origin: PathBuf::from("src.py"),
                code: code.to_string(),
            }],
        }
    }

    #[test]
    fn test_leaf_and_package_paths() {
        let tmp = tempdir().expect("tempdir");
        let options = EmitOptions {
            out_dir: tmp.path(),
            save_ast: false,
        };
        let leaf = emit(&module("oneflow.ops.nn_ops", "x = 1\n"), ModuleKind::Leaf, options).unwrap();
        let pkg = emit(&module("oneflow.nn", "y = 2\n"), ModuleKind::Package, options).unwrap();
        assert_eq!(leaf, tmp.path().join("oneflow/ops/nn_ops.py"));
        assert_eq!(pkg, tmp.path().join("oneflow/nn/__init__.py"));
        assert_eq!(fs::read_to_string(&leaf).unwrap(), "x = 1\n");
    }

    #[test]
    fn test_existing_destination_is_a_conflict() {
        let tmp = tempdir().expect("tempdir");
        let options = EmitOptions {
            out_dir: tmp.path(),
            save_ast: false,
        };
        emit(&module("oneflow.a", "x = 1\n"), ModuleKind::Leaf, options).unwrap();
        let err = emit(&module("oneflow.a", "x = 2\n"), ModuleKind::Leaf, options).unwrap_err();
        assert!(matches!(err, ExtractError::EmissionConflict { .. }), "got {err:?}");
        assert_eq!(
            fs::read_to_string(tmp.path().join("oneflow/a.py")).unwrap(),
            "x = 1\n"
        );
    }

    #[test]
    fn test_save_ast_writes_dump() {
        let tmp = tempdir().expect("tempdir");
        let options = EmitOptions {
            out_dir: tmp.path(),
            save_ast: true,
        };
        let path = emit(&module("oneflow.m", "def f():\n    return 1\n"), ModuleKind::Leaf, options)
            .unwrap();
        let dump = fs::read_to_string(path.with_extension(AST_DUMP_EXTENSION)).unwrap();
        assert!(dump.contains("FunctionDef"), "got:\n{dump}");
    }
}
