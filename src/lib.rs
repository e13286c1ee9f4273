//! File-granularity import cycle analysis for Go modules.
//!
//! `modcycle` resolves a Go module's imports down to individual files
//! rather than whole packages, detects import cycles at that finer
//! granularity, and renders the result as a Graphviz DOT graph. See
//! [`model`] for the entity graph, [`builder`] for how the graph is
//! constructed from a streamed event log, and [`cycles`] for the marking
//! pass that flags which files and packages participate in a cycle.

pub mod builder;
pub mod color;
pub mod config;
pub mod cycles;
pub mod dirwalk;
pub mod dot;
pub mod error;
pub mod events;
pub mod model;
pub mod modfile;
pub mod pipeline;
pub mod visitor;

pub use error::{Error, Result};

use std::path::Path;

use config::Config;
use model::Model;
use pipeline::CancellationToken;

/// Resolve the module rooted at (or above) `start`, run the full
/// analysis pipeline, and mark import cycles. This is the single
/// entry point the CLI and any embedding code should call.
pub fn analyze(start: &Path, cancel: &CancellationToken) -> Result<(Model, String)> {
    let module_root = modfile::find_module_root(start)?;
    let module_path = modfile::read_module_path(&module_root)?;
    let model = pipeline::run(&module_path, &module_root, cancel)?;
    Ok((model, module_path))
}

/// Render an already-analyzed model to DOT.
pub fn render(model: &Model, config: &Config) -> String {
    dot::emit(model, config)
}
