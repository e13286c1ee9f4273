//! The cycle marker (spec.md §4.3): a DFS run from every file as base,
//! walking two distinct edge sources and marking every entity from the
//! top of the stack down to, but excluding, position 0 whenever a
//! back-edge lands on a file still on the stack. The routine is total —
//! running it from every file as base finds cycles unreachable from any
//! single starting point — so the outer loop below never short-circuits
//! once a cycle is found.

use std::collections::HashSet;

use crate::model::{FileId, Model};

pub fn mark_cycles(model: &mut Model) {
    let bases = model.file_ids_in_order();
    for base in &bases {
        run_referenced_types_pass(model, base);
        run_referenced_files_pass(model, base);
    }
}

/// First edge source: `Import::referenced_types`. A back-edge here also
/// flags the triggering `Import` itself, not just the `File`/`Package`.
fn run_referenced_types_pass(model: &mut Model, base: &FileId) {
    let mut stack = Vec::new();
    let mut on_stack = HashSet::new();
    visit_referenced_types(model, base, &mut stack, &mut on_stack);
}

fn visit_referenced_types(
    model: &mut Model,
    current: &FileId,
    stack: &mut Vec<FileId>,
    on_stack: &mut HashSet<FileId>,
) {
    stack.push(current.clone());
    on_stack.insert(current.clone());

    let edges: Vec<(String, FileId)> = match model.file(current) {
        Some(file) => {
            let mut edges = Vec::new();
            for local in &file.import_order {
                let Some(imp) = file.imports.get(local) else {
                    continue;
                };
                for member in &imp.referenced_order {
                    let Some(&decl_id) = imp.referenced_types.get(member) else {
                        continue;
                    };
                    let Some(decl) = model.decls.get(&decl_id) else {
                        continue;
                    };
                    edges.push((local.clone(), decl.file.clone()));
                }
            }
            edges
        }
        None => Vec::new(),
    };

    for (local, target) in edges {
        if on_stack.contains(&target) {
            mark_stack_excluding_base(model, stack);
            mark_import_in_cycle(model, current, &local, &target);
        } else if model.file(&target).is_some() {
            visit_referenced_types(model, &target, stack, on_stack);
        }
    }

    stack.pop();
    on_stack.remove(current);
}

/// Second edge source: the deduplicated sweep in `File::referenced_files`.
/// Marks `File`/`Package` only — the spec treats this as an independent
/// edge source from `referenced_types`, even though both derive from the
/// same underlying declaration references.
fn run_referenced_files_pass(model: &mut Model, base: &FileId) {
    let mut stack = Vec::new();
    let mut on_stack = HashSet::new();
    visit_referenced_files(model, base, &mut stack, &mut on_stack);
}

fn visit_referenced_files(
    model: &mut Model,
    current: &FileId,
    stack: &mut Vec<FileId>,
    on_stack: &mut HashSet<FileId>,
) {
    stack.push(current.clone());
    on_stack.insert(current.clone());

    let targets: Vec<FileId> = match model.file(current) {
        Some(file) => file.referenced_files(model),
        None => Vec::new(),
    };

    for target in targets {
        if on_stack.contains(&target) {
            mark_stack_excluding_base(model, stack);
        } else if model.file(&target).is_some() {
            visit_referenced_files(model, &target, stack, on_stack);
        }
    }

    stack.pop();
    on_stack.remove(current);
}

fn mark_stack_excluding_base(model: &mut Model, stack: &[FileId]) {
    for fid in &stack[1..] {
        mark_file_and_package(model, fid);
    }
}

fn mark_file_and_package(model: &mut Model, fid: &FileId) {
    let pkg_id = model.file_owner.get(fid).cloned();
    if let Some(f) = model.file_mut(fid) {
        f.in_cycle = true;
    }
    if let Some(pkg_id) = pkg_id {
        if let Some(pkg) = model.packages.get_mut(&pkg_id) {
            pkg.in_cycle = true;
        }
    }
}

fn mark_import_in_cycle(model: &mut Model, file_id: &FileId, local: &str, target: &FileId) {
    if let Some(f) = model.file_mut(file_id) {
        if let Some(imp) = f.imports.get_mut(local) {
            imp.in_cycle = true;
            imp.referenced_files_in_cycle.insert(target.clone());
        }
    }
}
