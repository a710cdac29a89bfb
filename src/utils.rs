use std::path::PathBuf;

use rustpython_parser::ast::Suite;

/// One parsed input file.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub src: PathBuf,
    /// Destination dotted module of the file's own contents.
    pub module: String,
    /// Root namespace export paths are resolved against.
    pub namespace: String,
    pub code: String,
    pub suite: Suite,
    pub is_test: bool,
}

/// A statement sequence destined for one output module, rendered as source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTree {
    /// Input file the statements came from.
    pub origin: PathBuf,
    pub code: String,
}

impl SourceTree {
    pub fn is_empty(&self) -> bool {
        self.code.trim().is_empty()
    }
}

/// A definition moved out of its file by an export annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocationRecord {
    pub target_module: String,
    pub target_symbol: String,
    /// Name the definition had in its original file.
    pub local_name: String,
    /// Cleaned definition source, dedented to column zero.
    pub definition: String,
    /// Statement left in the original file in place of the definition.
    pub import: String,
}

/// Result of rewriting one [`SourceUnit`].
#[derive(Debug, Clone)]
pub struct RewrittenUnit {
    pub src: PathBuf,
    pub module: String,
    pub tree: SourceTree,
    pub relocations: Vec<RelocationRecord>,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub out_dir: PathBuf,
    pub units: usize,
    pub relocations: usize,
    pub destinations: usize,
    pub packages: usize,
    pub leaves: usize,
}

pub fn print_summary(summary: &RunSummary) {
    println!("\noneflow-extract summary");
    println!("{:-<44}", "");
    println!("  {:<28} {:>12}", "source files rewritten", summary.units);
    println!("  {:<28} {:>12}", "definitions relocated", summary.relocations);
    println!("  {:<28} {:>12}", "modules emitted", summary.destinations);
    println!("  {:<28} {:>12}", "  packages (__init__)", summary.packages);
    println!("  {:<28} {:>12}", "  leaf modules", summary.leaves);
    println!("{:-<44}", "");
    println!("  output: {}", summary.out_dir.display());
}
