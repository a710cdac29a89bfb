//! Statement traversal.
//!
//! [`walk`] visits top-level statements and, recursively, every nested
//! statement list: class and function bodies as well as the blocks of `if`,
//! `for`, `while`, `with`, `try` and `match`. A [`StatementVisitor`] decides
//! per statement whether it stays, goes, or is replaced; the walker turns
//! those decisions into span edits.

use std::ops::Range;

use rustpython_parser::ast::{self, Expr, Ranged, Stmt};

use super::span::{
    Edit, apply_edits, decorator_at, dedent, indentation, leading_edge, offsets, removal_span,
    trailing_edge,
};
use crate::error::ExtractError;

/// What happens to a visited statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Keep,
    Remove,
    /// Replace the statement with this text (indentation is added by the walker).
    Replace(String),
}

#[derive(Debug, Clone, Copy)]
pub enum ImportStmt<'a> {
    Import(&'a ast::StmtImport),
    From(&'a ast::StmtImportFrom),
}

/// A function or class definition as seen by a visitor.
pub struct Definition<'a> {
    pub name: &'a str,
    pub decorators: &'a [Expr],
    /// Whole lines from the first decorator to the end of the body.
    pub span: Range<usize>,
    pub indent: &'a str,
    source: &'a str,
    nested: Vec<Edit>,
}

impl<'a> Definition<'a> {
    fn new(
        source: &'a str,
        name: &'a str,
        decorators: &'a [Expr],
        range: Range<usize>,
        nested: Vec<Edit>,
    ) -> Self {
        let first = decorators
            .iter()
            .map(|d| decorator_at(source, offsets(d.range()).start))
            .fold(range.start, usize::min);
        Self {
            name,
            decorators,
            span: leading_edge(source, first)..range.end,
            indent: indentation(source, first),
            source,
            nested,
        }
    }

    /// Definition text with `stripped` decorators removed and nested rewrites
    /// applied, moved to column zero.
    pub fn render_without(&self, stripped: &[&Expr]) -> String {
        let mut edits = self.nested.clone();
        for decorator in stripped {
            let range = offsets(decorator.range());
            let at = decorator_at(self.source, range.start);
            edits.push(Edit::delete(
                leading_edge(self.source, at)..trailing_edge(self.source, range.end),
            ));
        }
        let mut text = dedent(
            &apply_edits(self.source, self.span.clone(), edits),
            self.indent,
        );
        if !text.ends_with('\n') {
            text.push('\n');
        }
        text
    }
}

/// Capability interface the walker drives. One method per statement shape
/// the rewrite cares about; everything else is kept untouched.
pub trait StatementVisitor {
    /// Expression statements: docstrings, bare calls.
    fn visit_expr(&mut self, stmt: &ast::StmtExpr, depth: usize) -> Result<Action, ExtractError>;

    /// `import` / `from ... import`; `text` is the statement's source.
    fn visit_import(&mut self, stmt: ImportStmt<'_>, text: &str) -> Result<Action, ExtractError>;

    /// Function, async function and class definitions. Bodies have already
    /// been walked when this is called.
    fn visit_definition(
        &mut self,
        def: &Definition<'_>,
        depth: usize,
    ) -> Result<Action, ExtractError>;
}

/// Walks `suite` and returns the rewritten source.
pub fn walk<V: StatementVisitor>(
    source: &str,
    suite: &[Stmt],
    visitor: &mut V,
) -> Result<String, ExtractError> {
    let edits = walk_block(source, suite, 0, visitor)?;
    Ok(apply_edits(source, 0..source.len(), edits))
}

/// Statement lists directly inside a compound statement that is not a definition.
fn inner_blocks(stmt: &Stmt) -> Vec<&[Stmt]> {
    match stmt {
        Stmt::If(s) => vec![s.body.as_slice(), s.orelse.as_slice()],
        Stmt::For(s) => vec![s.body.as_slice(), s.orelse.as_slice()],
        Stmt::AsyncFor(s) => vec![s.body.as_slice(), s.orelse.as_slice()],
        Stmt::While(s) => vec![s.body.as_slice(), s.orelse.as_slice()],
        Stmt::With(s) => vec![s.body.as_slice()],
        Stmt::AsyncWith(s) => vec![s.body.as_slice()],
        Stmt::Try(s) => try_blocks(&s.body, &s.handlers, &s.orelse, &s.finalbody),
        Stmt::TryStar(s) => try_blocks(&s.body, &s.handlers, &s.orelse, &s.finalbody),
        Stmt::Match(s) => s.cases.iter().map(|case| case.body.as_slice()).collect(),
        _ => Vec::new(),
    }
}

fn try_blocks<'a>(
    body: &'a [Stmt],
    handlers: &'a [ast::ExceptHandler],
    orelse: &'a [Stmt],
    finalbody: &'a [Stmt],
) -> Vec<&'a [Stmt]> {
    let mut blocks = vec![body];
    blocks.extend(handlers.iter().map(|handler| match handler {
        ast::ExceptHandler::ExceptHandler(h) => h.body.as_slice(),
    }));
    blocks.push(orelse);
    blocks.push(finalbody);
    blocks
}

fn walk_block<V: StatementVisitor>(
    source: &str,
    body: &[Stmt],
    depth: usize,
    visitor: &mut V,
) -> Result<Vec<Edit>, ExtractError> {
    let mut edits = Vec::new();
    let mut removed = 0usize;
    let mut last_removal = None;

    for stmt in body {
        let range = offsets(stmt.range());
        let mut edge = leading_edge(source, range.start);
        let mut indent = indentation(source, range.start);
        let (action, nested) = match stmt {
            Stmt::Expr(expr) => (visitor.visit_expr(expr, depth)?, Vec::new()),
            Stmt::Import(import) => (
                visitor.visit_import(ImportStmt::Import(import), &source[range.clone()])?,
                Vec::new(),
            ),
            Stmt::ImportFrom(import) => (
                visitor.visit_import(ImportStmt::From(import), &source[range.clone()])?,
                Vec::new(),
            ),
            Stmt::FunctionDef(def) => {
                let nested = walk_block(source, &def.body, depth + 1, visitor)?;
                let def = Definition::new(
                    source,
                    def.name.as_str(),
                    &def.decorator_list,
                    range.clone(),
                    nested,
                );
                edge = def.span.start;
                indent = def.indent;
                (visitor.visit_definition(&def, depth)?, def.nested)
            }
            Stmt::AsyncFunctionDef(def) => {
                let nested = walk_block(source, &def.body, depth + 1, visitor)?;
                let def = Definition::new(
                    source,
                    def.name.as_str(),
                    &def.decorator_list,
                    range.clone(),
                    nested,
                );
                edge = def.span.start;
                indent = def.indent;
                (visitor.visit_definition(&def, depth)?, def.nested)
            }
            Stmt::ClassDef(class) => {
                let nested = walk_block(source, &class.body, depth + 1, visitor)?;
                let def = Definition::new(
                    source,
                    class.name.as_str(),
                    &class.decorator_list,
                    range.clone(),
                    nested,
                );
                edge = def.span.start;
                indent = def.indent;
                (visitor.visit_definition(&def, depth)?, def.nested)
            }
            compound => {
                let mut nested = Vec::new();
                for block in inner_blocks(compound) {
                    nested.extend(walk_block(source, block, depth + 1, visitor)?);
                }
                (Action::Keep, nested)
            }
        };

        match action {
            Action::Keep => edits.extend(nested),
            Action::Remove => {
                removed += 1;
                let span = removal_span(source, edge, range.end);
                last_removal = Some((edits.len(), span.start..range.end, indent));
                edits.push(Edit::delete(span));
            }
            Action::Replace(text) => {
                let text = text
                    .lines()
                    .map(|line| format!("{indent}{line}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                edits.push(Edit {
                    span: edge..range.end,
                    text,
                });
            }
        }
    }

    // An indented block cannot be empty.
    if depth > 0
        && removed == body.len()
        && let Some((index, span, indent)) = last_removal
    {
        edits[index] = Edit {
            span,
            text: format!("{indent}pass"),
        };
    }

    Ok(edits)
}
