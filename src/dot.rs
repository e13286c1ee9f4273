//! DOT emitter (spec.md §4.5): hand-written serialization via
//! `std::fmt::Write`, following the original tool's `internal/dot/
//! marshal.go` template-string approach rather than pulling in a graph
//! rendering crate — the emitter is specified only at its interface
//! boundary, so there is nothing here for a heavier dependency to buy us.

use std::collections::HashSet;
use std::fmt::Write as _;

use crate::color::Palette;
use crate::config::{Config, Resolution};
use crate::model::{Model, Package, PackageId};

pub fn emit(model: &Model, config: &Config) -> String {
    let mut out = String::new();
    write_header(&mut out, &model.module_path);
    match config.resolution {
        Resolution::File => write_file_resolution(&mut out, model, &config.palette),
        Resolution::Package => write_package_resolution(&mut out, model, &config.palette),
    }
    write_footer(&mut out);
    out
}

fn write_header(out: &mut String, module_path: &str) {
    let _ = writeln!(out, "digraph {} {{", sanitize(module_path));
    let _ = writeln!(out, "    rankdir=LR;");
    let _ = writeln!(out, "    compound=true;");
    let _ = writeln!(
        out,
        "    node [shape=box style=filled fontname=\"monospace\"];"
    );
}

fn write_footer(out: &mut String) {
    let _ = writeln!(out, "}}");
}

/// Replace every character DOT doesn't accept in a bare identifier with
/// `_` (spec.md §4.5, "package name `a-a` sanitizes to `a_a`").
pub fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Non-stub packages with at least one file, sorted by
/// ASCII-case-insensitive relative path for stable output.
fn sorted_packages(model: &Model) -> Vec<&Package> {
    let mut pkgs: Vec<&Package> = model
        .packages()
        .into_iter()
        .filter(|p| !p.is_stub && !p.files.is_empty())
        .collect();
    pkgs.sort_by(|a, b| {
        a.module_relative_path()
            .to_ascii_lowercase()
            .cmp(&b.module_relative_path().to_ascii_lowercase())
            .then_with(|| a.uid.0.cmp(&b.uid.0))
    });
    pkgs
}

fn cluster_name(pkg: &Package) -> String {
    format!("cluster_{}", sanitize(&pkg.uid.0))
}

fn package_node_name(pkg: &Package) -> String {
    format!("pkg_{}", sanitize(&pkg.uid.0))
}

fn file_node_name(pkg: &Package, filename: &str) -> String {
    format!("{}_{}", sanitize(&pkg.uid.0), sanitize(filename))
}

fn write_file_resolution(out: &mut String, model: &Model, palette: &Palette) {
    for pkg in sorted_packages(model) {
        let half = palette.half_for(pkg.in_cycle);
        let _ = writeln!(out, "    subgraph {} {{", cluster_name(pkg));
        let _ = writeln!(out, "        label=\"{}\";", pkg.module_relative_path());
        let _ = writeln!(out, "        color=\"{}\";", half.package_name.hex());
        let _ = writeln!(out, "        bgcolor=\"{}\";", half.package_background.hex());

        let mut files: Vec<_> = pkg
            .file_order
            .iter()
            .filter_map(|fid| pkg.files.get(fid))
            .filter(|f| !f.is_stub && !f.decls.is_empty())
            .collect();
        files.sort_by(|a, b| {
            a.filename
                .to_ascii_lowercase()
                .cmp(&b.filename.to_ascii_lowercase())
        });

        for file in &files {
            let fhalf = palette.half_for(file.in_cycle);
            let _ = writeln!(
                out,
                "        \"{}\" [label=\"{}\" fontcolor=\"{}\" fillcolor=\"{}\"];",
                file_node_name(pkg, &file.filename),
                file.filename,
                fhalf.file_name.hex(),
                fhalf.file_background.hex()
            );
        }
        let _ = writeln!(out, "    }}");
    }

    for pkg in sorted_packages(model) {
        for fid in &pkg.file_order {
            let Some(file) = pkg.files.get(fid) else {
                continue;
            };
            if file.is_stub || file.decls.is_empty() {
                continue;
            }
            for target_fid in file.referenced_files(model) {
                let Some(target_pkg_id) = model.file_owner.get(&target_fid) else {
                    continue;
                };
                let Some(target_pkg) = model.packages.get(target_pkg_id) else {
                    continue;
                };
                if target_pkg.is_stub || target_pkg.files.is_empty() {
                    continue;
                }
                let Some(target_file) = target_pkg.files.get(&target_fid) else {
                    continue;
                };
                if target_file.is_stub {
                    continue;
                }
                let half = palette.half_for(file.in_cycle && target_file.in_cycle);
                let _ = writeln!(
                    out,
                    "    \"{}\" -> \"{}\" [color=\"{}\"];",
                    file_node_name(pkg, &file.filename),
                    file_node_name(target_pkg, &target_file.filename),
                    half.import_arrow.hex()
                );
            }
        }
    }
}

fn write_package_resolution(out: &mut String, model: &Model, palette: &Palette) {
    for pkg in sorted_packages(model) {
        let half = palette.half_for(pkg.in_cycle);
        let _ = writeln!(
            out,
            "    \"{}\" [label=\"{}\" fontcolor=\"{}\" fillcolor=\"{}\"];",
            package_node_name(pkg),
            pkg.module_relative_path(),
            half.package_name.hex(),
            half.package_background.hex()
        );
    }

    let mut seen_edges: HashSet<(PackageId, PackageId)> = HashSet::new();
    for pkg in sorted_packages(model) {
        for fid in &pkg.file_order {
            let Some(file) = pkg.files.get(fid) else {
                continue;
            };
            if file.is_stub {
                continue;
            }
            for local in &file.import_order {
                let Some(imp) = file.imports.get(local) else {
                    continue;
                };
                let Some(target_pkg) = model.packages.get(&imp.target) else {
                    continue;
                };
                if target_pkg.is_stub || target_pkg.files.is_empty() {
                    continue;
                }
                if !seen_edges.insert((pkg.uid.clone(), target_pkg.uid.clone())) {
                    continue;
                }
                let half = palette.half_for(imp.in_cycle);
                let _ = writeln!(
                    out,
                    "    \"{}\" -> \"{}\" [color=\"{}\"];",
                    package_node_name(pkg),
                    package_node_name(target_pkg),
                    half.import_arrow.hex()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_dots_and_dashes() {
        assert_eq!(sanitize("a-a"), "a_a");
        assert_eq!(sanitize("example.com/m"), "example_com_m");
    }

    #[test]
    fn emit_skips_empty_stub_packages() {
        use crate::builder::PrimitiveBuilder;
        use crate::events::Event;
        use std::path::PathBuf;

        let mut b = PrimitiveBuilder::new("example.com/m", "/mod");
        b.add_node(Event::Package {
            name: "a".into(),
            dir_path: PathBuf::from("/mod/a"),
        })
        .unwrap();
        b.add_node(Event::File {
            abs_path: "/mod/a/a.go".into(),
            dir_path: PathBuf::from("/mod/a"),
        })
        .unwrap();
        b.add_node(Event::Import {
            import_path: "example.com/m/missing".into(),
            aliased: false,
            local_name: "missing".into(),
        })
        .unwrap();
        b.add_node(Event::FuncDecl {
            name: "AFn".into(),
            receiver_type: None,
        })
        .unwrap();

        let model = b.into_model();
        let config = Config::default();
        let rendered = emit(&model, &config);

        assert!(rendered.starts_with("digraph example_com_m {"));
        assert!(rendered.contains("a.go"));
        assert!(!rendered.contains("missing"));
    }

    /// Packages `x`/`y` and `z`/`w` each form their own independent cycle;
    /// `x` also has a plain, non-cyclic import of `z`. That edge must stay
    /// base-colored even though both `x` and `z` are individually
    /// `in_cycle` (via unrelated cycles) — the per-edge `Import::in_cycle`
    /// flag, not an AND of the two endpoints' package-level flags, is
    /// what must drive edge color.
    #[test]
    fn package_resolution_edge_color_uses_per_edge_cycle_flag_not_endpoint_and() {
        use crate::builder::PrimitiveBuilder;
        use crate::cycles;
        use crate::events::Event;
        use std::path::PathBuf;

        let mut b = PrimitiveBuilder::new("example.com/m", "/mod");

        b.add_node(Event::Package { name: "x".into(), dir_path: PathBuf::from("/mod/x") }).unwrap();
        b.add_node(Event::File { abs_path: "/mod/x/x.go".into(), dir_path: PathBuf::from("/mod/x") }).unwrap();
        b.add_node(Event::Import { import_path: "example.com/m/y".into(), aliased: false, local_name: "y".into() }).unwrap();
        b.add_node(Event::Import { import_path: "example.com/m/z".into(), aliased: false, local_name: "z".into() }).unwrap();
        b.add_node(Event::FuncDecl { name: "XFn".into(), receiver_type: None }).unwrap();
        b.add_node(Event::Selector { import_name: "y".into(), member: "YFn".into() }).unwrap();
        b.add_node(Event::Selector { import_name: "z".into(), member: "ZFn".into() }).unwrap();

        b.add_node(Event::Package { name: "y".into(), dir_path: PathBuf::from("/mod/y") }).unwrap();
        b.add_node(Event::File { abs_path: "/mod/y/y.go".into(), dir_path: PathBuf::from("/mod/y") }).unwrap();
        b.add_node(Event::Import { import_path: "example.com/m/x".into(), aliased: false, local_name: "x".into() }).unwrap();
        b.add_node(Event::FuncDecl { name: "YFn".into(), receiver_type: None }).unwrap();
        b.add_node(Event::Selector { import_name: "x".into(), member: "XFn".into() }).unwrap();

        b.add_node(Event::Package { name: "z".into(), dir_path: PathBuf::from("/mod/z") }).unwrap();
        b.add_node(Event::File { abs_path: "/mod/z/z.go".into(), dir_path: PathBuf::from("/mod/z") }).unwrap();
        b.add_node(Event::Import { import_path: "example.com/m/w".into(), aliased: false, local_name: "w".into() }).unwrap();
        b.add_node(Event::FuncDecl { name: "ZFn".into(), receiver_type: None }).unwrap();
        b.add_node(Event::Selector { import_name: "w".into(), member: "WFn".into() }).unwrap();

        b.add_node(Event::Package { name: "w".into(), dir_path: PathBuf::from("/mod/w") }).unwrap();
        b.add_node(Event::File { abs_path: "/mod/w/w.go".into(), dir_path: PathBuf::from("/mod/w") }).unwrap();
        b.add_node(Event::Import { import_path: "example.com/m/z".into(), aliased: false, local_name: "z".into() }).unwrap();
        b.add_node(Event::FuncDecl { name: "WFn".into(), receiver_type: None }).unwrap();
        b.add_node(Event::Selector { import_name: "z".into(), member: "ZFn".into() }).unwrap();

        let mut model = b.into_model();
        cycles::mark_cycles(&mut model);

        let x = model.packages.get(&PackageId("example.com/m/x".into())).unwrap();
        let z = model.packages.get(&PackageId("example.com/m/z".into())).unwrap();
        assert!(x.in_cycle, "x is in the x<->y cycle");
        assert!(z.in_cycle, "z is in the z<->w cycle");

        let mut config = Config::default();
        config.resolution = Resolution::Package;
        let rendered = emit(&model, &config);

        let x_to_z = "\"pkg_example_com_m_x\" -> \"pkg_example_com_m_z\" [color=\"#555555\"];";
        assert!(
            rendered.contains(x_to_z),
            "x->z must be base-colored, not cycle-colored, despite both endpoints being in_cycle:\n{rendered}"
        );
        let x_to_y = "\"pkg_example_com_m_x\" -> \"pkg_example_com_m_y\" [color=\"#c62828\"];";
        assert!(rendered.contains(x_to_y), "x->y is the genuine cycle edge:\n{rendered}");
    }
}
