//! Concurrency orchestration (spec.md §5): three cooperating stages joined
//! by `std::sync::mpsc` channels and coordinated through a single
//! cancellation token, run via `std::thread::scope` rather than an async
//! runtime — the core crate this tool is modeled on carries no async
//! dependency, and a three-stage pipeline doesn't need one either.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;

use crate::builder::PrimitiveBuilder;
use crate::cycles;
use crate::dirwalk;
use crate::error::{Error, Result};
use crate::events::Event;
use crate::model::Model;
use crate::visitor::DependencyVisitor;

#[derive(Clone)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk `module_root` for Go files, visit each with the dependency
/// visitor, absorb the resulting events into a builder, then mark import
/// cycles. Returns the finished, cycle-marked model.
pub fn run(module_path: &str, module_root: &Path, cancel: &CancellationToken) -> Result<Model> {
    let (dir_tx, dir_rx) = mpsc::channel::<PathBuf>();
    let (event_tx, event_rx) = mpsc::channel::<Event>();

    let cancel_walk = cancel.clone();
    let cancel_visit = cancel.clone();
    let module_root_owned = module_root.to_path_buf();

    let model = std::thread::scope(|scope| -> Result<Model> {
        let walk_handle = scope.spawn(move || -> Result<()> {
            let dirs = dirwalk::walk_package_dirs(&module_root_owned)?;
            for dir in dirs {
                if cancel_walk.is_cancelled() {
                    break;
                }
                if dir_tx.send(dir).is_err() {
                    break;
                }
            }
            Ok(())
        });

        let visit_handle = scope.spawn(move || -> Result<()> {
            let mut visitor = DependencyVisitor::new(event_tx)?;
            for dir in dir_rx {
                if cancel_visit.is_cancelled() {
                    break;
                }
                let Ok(files) = dirwalk::go_files_in(&dir) else {
                    continue;
                };
                for file in files {
                    if let Err(e) = visitor.visit_file(&dir, &file) {
                        tracing::warn!(file = %file.display(), error = %e, "skipping malformed file");
                    }
                }
            }
            Ok(())
        });

        let mut builder = PrimitiveBuilder::new(module_path, module_root);
        let mut first_err: Option<Error> = None;
        for event in event_rx {
            if cancel.is_cancelled() {
                continue;
            }
            if let Err(e) = builder.add_node(event) {
                first_err = Some(e);
                cancel.cancel();
            }
        }

        walk_handle
            .join()
            .map_err(|_| Error::Parse("dirwalk thread panicked".into()))??;
        visit_handle
            .join()
            .map_err(|_| Error::Parse("visitor thread panicked".into()))??;

        if let Some(err) = first_err {
            return Err(err);
        }
        Ok(builder.into_model())
    })?;

    let mut model = model;
    cycles::mark_cycles(&mut model);
    Ok(model)
}
