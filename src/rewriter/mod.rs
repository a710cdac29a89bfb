//! Rewriter module: per-file export extraction.
//!
//! # Submodules
//! - [`walk`] statement traversal and the [`StatementVisitor`] capability trait
//! - [`export`] export-annotation recognition and argument parsing
//! - [`imports`] import canonicalization and plumbing removal
//! - `span` byte-span edits over the original text
//!
//! # Entry points
//! - [`rewrite`] rewrites a loaded [`SourceUnit`]
//! - [`rewrite_source`] parses and rewrites raw text

pub mod export;
pub mod imports;
mod span;
pub mod walk;

use std::path::Path;

use rustpython_parser::Parse;
use rustpython_parser::ast::{Constant, Expr, StmtExpr, Suite};
use tracing::{debug, warn};

use crate::config::RewriteRules;
use crate::error::ExtractError;
use crate::utils::{RelocationRecord, SourceUnit};
use export::{ExportTarget, as_export_call, is_export_call};
pub use walk::{Action, Definition, ImportStmt, StatementVisitor, walk};

/// Rewritten file text plus the definitions it gave away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOutput {
    pub code: String,
    pub relocations: Vec<RelocationRecord>,
}

struct ExportRewriter<'a> {
    rules: &'a RewriteRules,
    namespace: &'a str,
    path: &'a Path,
    relocations: Vec<RelocationRecord>,
}

impl StatementVisitor for ExportRewriter<'_> {
    fn visit_expr(&mut self, stmt: &StmtExpr, depth: usize) -> Result<Action, ExtractError> {
        match stmt.value.as_ref() {
            Expr::Constant(c) if depth == 0 => match &c.value {
                Constant::Str(s) if s.contains(self.rules.boilerplate_marker.as_str()) => {
                    Ok(Action::Remove)
                }
                _ => Ok(Action::Keep),
            },
            // legacy standalone invocation
            expr if is_export_call(expr, &self.rules.annotation) => Ok(Action::Remove),
            _ => Ok(Action::Keep),
        }
    }

    fn visit_import(&mut self, stmt: ImportStmt<'_>, text: &str) -> Result<Action, ExtractError> {
        Ok(imports::rewrite_import(self.rules, stmt, text))
    }

    fn visit_definition(
        &mut self,
        def: &Definition<'_>,
        depth: usize,
    ) -> Result<Action, ExtractError> {
        let exports: Vec<&Expr> = def
            .decorators
            .iter()
            .filter(|d| is_export_call(d, &self.rules.annotation))
            .collect();
        let Some(call) = exports
            .first()
            .and_then(|first| as_export_call(first, &self.rules.annotation))
        else {
            return Ok(Action::Keep);
        };

        let target =
            ExportTarget::from_call(call, self.namespace).map_err(|reason| ExtractError::Parse {
                path: self.path.to_path_buf(),
                definition: Some(def.name.to_string()),
                reason,
            })?;
        if !target.ignored.is_empty() {
            warn!(
                path = %self.path.display(),
                definition = def.name,
                ignored = ?target.ignored,
                "only the first export path is used"
            );
        }
        if exports.len() > 1 {
            warn!(
                path = %self.path.display(),
                definition = def.name,
                count = exports.len(),
                "definition carries several export annotations; the first one wins"
            );
        }

        let mut definition = def.render_without(&exports);
        if def.name != target.symbol {
            definition.push_str(&format!("\n{} = {}\n", target.symbol, def.name));
        }
        let import = target.import_statement(def.name);
        debug!(
            path = %self.path.display(),
            definition = def.name,
            depth,
            target = %target.module,
            symbol = %target.symbol,
            "relocating definition"
        );
        self.relocations.push(RelocationRecord {
            target_module: target.module,
            target_symbol: target.symbol,
            local_name: def.name.to_string(),
            definition,
            import: import.clone(),
        });
        Ok(Action::Replace(import))
    }
}

/// Rewrite an already parsed unit. Touches nothing but the returned value.
pub fn rewrite(unit: &SourceUnit, rules: &RewriteRules) -> Result<RewriteOutput, ExtractError> {
    rewrite_suite(&unit.src, &unit.code, &unit.suite, &unit.namespace, rules)
}

/// Parse `code` and rewrite it against `namespace`.
pub fn rewrite_source(
    path: &Path,
    code: &str,
    namespace: &str,
    rules: &RewriteRules,
) -> Result<RewriteOutput, ExtractError> {
    let suite = parse_suite(path, code)?;
    rewrite_suite(path, code, &suite, namespace, rules)
}

pub fn parse_suite(path: &Path, code: &str) -> Result<Suite, ExtractError> {
    Suite::parse(code, &path.to_string_lossy()).map_err(|err| ExtractError::Parse {
        path: path.to_path_buf(),
        definition: None,
        reason: err.to_string(),
    })
}

fn rewrite_suite(
    path: &Path,
    code: &str,
    suite: &Suite,
    namespace: &str,
    rules: &RewriteRules,
) -> Result<RewriteOutput, ExtractError> {
    let mut rewriter = ExportRewriter {
        rules,
        namespace,
        path,
        relocations: Vec::new(),
    };
    let mut code = walk(code, suite, &mut rewriter)?;
    if code.trim().is_empty() {
        code.clear();
    }
    Ok(RewriteOutput {
        code,
        relocations: rewriter.relocations,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
