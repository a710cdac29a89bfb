//! Export-annotation recognition and argument parsing.
//!
//! All functions are pure (no I/O, no state).

use rustpython_parser::ast::{Constant, Expr, ExprCall};

use crate::naming::{is_dotted_name, join_module, last_segment, parent_module};

/// Where an annotated definition goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTarget {
    pub module: String,
    pub symbol: String,
    /// Positional arguments after the first; accepted but not acted on.
    pub ignored: Vec<String>,
}

/// A call whose callee is the bare annotation name, e.g. `oneflow_export("nn.relu")`.
pub fn as_export_call<'a>(expr: &'a Expr, annotation: &str) -> Option<&'a ExprCall> {
    match expr {
        Expr::Call(call) => match call.func.as_ref() {
            Expr::Name(name) if name.id.as_str() == annotation => Some(call),
            _ => None,
        },
        _ => None,
    }
}

pub fn is_export_call(expr: &Expr, annotation: &str) -> bool {
    as_export_call(expr, annotation).is_some()
}

impl ExportTarget {
    /// Reads `("a.b.c", ...)`: module `<namespace>.a.b`, symbol `c`.
    pub fn from_call(call: &ExprCall, namespace: &str) -> Result<Self, String> {
        if !call.keywords.is_empty() {
            return Err("export annotation takes positional arguments only".to_string());
        }
        let mut paths = Vec::with_capacity(call.args.len());
        for (i, arg) in call.args.iter().enumerate() {
            match arg {
                Expr::Constant(c) => match &c.value {
                    Constant::Str(s) => paths.push(s.clone()),
                    _ => return Err(format!("argument {i} is not a string literal")),
                },
                _ => return Err(format!("argument {i} is not a string literal")),
            }
        }

        let mut paths = paths.into_iter();
        let dotted = paths
            .next()
            .ok_or_else(|| "export annotation needs a dotted path argument".to_string())?;
        if !is_dotted_name(&dotted) {
            return Err(format!("`{dotted}` is not a dotted name"));
        }

        Ok(Self {
            module: join_module(namespace, parent_module(&dotted)),
            symbol: last_segment(&dotted).to_string(),
            ignored: paths.collect(),
        })
    }

    /// `from <module> import <symbol>`, aliased back to `local` when the names differ.
    pub fn import_statement(&self, local: &str) -> String {
        if local == self.symbol {
            format!("from {} import {}", self.module, self.symbol)
        } else {
            format!("from {} import {} as {}", self.module, self.symbol, local)
        }
    }
}

#[cfg(test)]
mod tests {
    use rustpython_parser::Parse;
    use rustpython_parser::ast::{Expr, Stmt, Suite};

    use super::*;

    fn call_expr(code: &str) -> Expr {
        let suite = Suite::parse(code, "<test>").expect("parse");
        match suite.into_iter().next() {
            Some(Stmt::Expr(stmt)) => *stmt.value,
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    fn target(code: &str) -> Result<ExportTarget, String> {
        let expr = call_expr(code);
        let call = as_export_call(&expr, "oneflow_export").expect("export call");
        ExportTarget::from_call(call, "oneflow")
    }

    #[test]
    fn test_recognizes_only_bare_annotation_calls() {
        assert!(is_export_call(&call_expr("oneflow_export('a')"), "oneflow_export"));
        assert!(!is_export_call(&call_expr("flow.oneflow_export('a')"), "oneflow_export"));
        assert!(!is_export_call(&call_expr("oneflow_export"), "oneflow_export"));
        assert!(!is_export_call(&call_expr("register('a')"), "oneflow_export"));
    }

    #[test]
    fn test_target_splits_module_and_symbol() {
        let t = target("oneflow_export('nn.functional.relu')").unwrap();
        assert_eq!(t.module, "oneflow.nn.functional");
        assert_eq!(t.symbol, "relu");
        assert!(t.ignored.is_empty());
    }

    #[test]
    fn test_single_segment_targets_namespace_root() {
        let t = target("oneflow_export('ones')").unwrap();
        assert_eq!(t.module, "oneflow");
        assert_eq!(t.symbol, "ones");
    }

    #[test]
    fn test_extra_paths_are_ignored() {
        let t = target("oneflow_export('nn.ReLU', 'nn.relu')").unwrap();
        assert_eq!(t.symbol, "ReLU");
        assert_eq!(t.ignored, vec!["nn.relu".to_string()]);
    }

    #[test]
    fn test_malformed_arguments() {
        assert!(target("oneflow_export()").is_err());
        assert!(target("oneflow_export(name)").is_err());
        assert!(target("oneflow_export(1)").is_err());
        assert!(target("oneflow_export('a', 2)").is_err());
        assert!(target("oneflow_export(path='a.b')").is_err());
        assert!(target("oneflow_export('a..b')").is_err());
        assert!(target("oneflow_export('')").is_err());
    }

    #[test]
    fn test_import_statement_aliases_when_names_differ() {
        let t = ExportTarget {
            module: "oneflow.a.b".to_string(),
            symbol: "c".to_string(),
            ignored: Vec::new(),
        };
        assert_eq!(t.import_statement("c"), "from oneflow.a.b import c");
        assert_eq!(t.import_statement("foo"), "from oneflow.a.b import c as foo");
    }
}
