//! Import statement rules: drop annotation plumbing, canonicalize the legacy namespace.

use rustpython_parser::ast::{Alias, StmtImport, StmtImportFrom};

use super::walk::{Action, ImportStmt};
use crate::config::RewriteRules;

pub fn rewrite_import(rules: &RewriteRules, stmt: ImportStmt<'_>, text: &str) -> Action {
    match stmt {
        ImportStmt::Import(import) => rewrite_plain_import(rules, import),
        ImportStmt::From(import) => rewrite_from_import(rules, import, text),
    }
}

fn is_plumbing(rules: &RewriteRules, alias: &Alias) -> bool {
    let name = alias.name.as_str();
    rules.mentions_annotation(name) || name.contains(rules.private_marker.as_str())
}

/// `import a.b as c, d`
fn rewrite_plain_import(rules: &RewriteRules, import: &StmtImport) -> Action {
    if import.names.iter().any(|alias| is_plumbing(rules, alias)) {
        return Action::Remove;
    }

    let mut changed = false;
    let names: Vec<String> = import
        .names
        .iter()
        .map(|alias| {
            let name = match rules.canonicalize(alias.name.as_str()) {
                Some(canonical) => {
                    changed = true;
                    canonical
                }
                None => alias.name.to_string(),
            };
            match &alias.asname {
                Some(asname) => format!("{name} as {asname}"),
                None => name,
            }
        })
        .collect();

    if changed {
        Action::Replace(format!("import {}", names.join(", ")))
    } else {
        Action::Keep
    }
}

/// `from a.b import c`; only the module path is rewritten, the rest of the
/// statement text is kept as written.
fn rewrite_from_import(rules: &RewriteRules, import: &StmtImportFrom, text: &str) -> Action {
    if import.names.iter().any(|alias| is_plumbing(rules, alias)) {
        return Action::Remove;
    }
    let Some(module) = import.module.as_ref().map(|m| m.as_str()) else {
        return Action::Keep;
    };
    if rules.dropped_modules.iter().any(|dropped| dropped == module)
        || rules.mentions_annotation(module)
    {
        return Action::Remove;
    }
    match rules.canonicalize(module) {
        Some(canonical) => Action::Replace(text.replacen(module, &canonical, 1)),
        None => Action::Keep,
    }
}

#[cfg(test)]
mod tests {
    use rustpython_parser::Parse;
    use rustpython_parser::ast::{Ranged, Stmt, Suite};

    use super::*;
    use crate::rewriter::span::offsets;

    fn action(code: &str) -> Action {
        let rules = RewriteRules::default();
        let suite = Suite::parse(code, "<test>").expect("parse");
        let stmt = &suite[0];
        let text = &code[offsets(stmt.range())];
        match stmt {
            Stmt::Import(import) => rewrite_import(&rules, ImportStmt::Import(import), text),
            Stmt::ImportFrom(import) => rewrite_import(&rules, ImportStmt::From(import), text),
            other => panic!("not an import: {other:?}"),
        }
    }

    #[test]
    fn test_from_import_legacy_module_is_canonicalized() {
        assert_eq!(
            action("from oneflow.python.framework.tensor import Tensor as T\n"),
            Action::Replace("from oneflow.framework.tensor import Tensor as T".to_string())
        );
    }

    #[test]
    fn test_from_import_keeps_multiline_layout() {
        let code = "from oneflow.python.nn import (\n    Module,\n    Parameter,\n)\n";
        assert_eq!(
            action(code),
            Action::Replace("from oneflow.nn import (\n    Module,\n    Parameter,\n)".to_string())
        );
    }

    #[test]
    fn test_plain_import_is_canonicalized() {
        assert_eq!(
            action("import oneflow.python.framework.id_util as id_util, os\n"),
            Action::Replace("import oneflow.framework.id_util as id_util, os".to_string())
        );
        assert_eq!(
            action("import oneflow.python\n"),
            Action::Replace("import oneflow".to_string())
        );
    }

    #[test]
    fn test_annotation_plumbing_is_dropped() {
        assert_eq!(
            action("from oneflow.python.oneflow_export import oneflow_export\n"),
            Action::Remove
        );
        assert_eq!(action("from somewhere import oneflow_export, other\n"), Action::Remove);
        assert_eq!(action("import oneflow.python.oneflow_export\n"), Action::Remove);
        assert_eq!(
            action("from oneflow.python.framework import __export_symbols__\n"),
            Action::Remove
        );
        assert_eq!(action("from __future__ import absolute_import\n"), Action::Remove);
    }

    #[test]
    fn test_unrelated_imports_are_kept() {
        assert_eq!(action("import numpy as np\n"), Action::Keep);
        assert_eq!(action("from . import sibling\n"), Action::Keep);
        assert_eq!(action("from oneflow.nn import Module\n"), Action::Keep);
    }
}
