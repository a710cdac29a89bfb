/// oneflow-extract library crate.
///
/// Exposes the extraction pipeline modules as a public API so that
/// integration tests in tests/ can import them via `oneflow_extract::`.
///
/// The binary entry point (src/main.rs) uses these same modules.
pub mod config;
pub mod emitter;
pub mod error;
pub mod input;
pub mod merge;
pub mod module_tree;
pub mod naming;
pub mod pipeline;
pub mod postprocess;
pub mod rewriter;
pub mod utils;
