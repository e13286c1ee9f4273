use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn modcycle() -> Command {
    cargo_bin_cmd!("modcycle")
}

fn go_mod(dir: &Path, module_path: &str) {
    fs::write(dir.join("go.mod"), format!("module {module_path}\n\ngo 1.21\n")).unwrap();
}

fn go_file(dir: &Path, name: &str, contents: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(name), contents).unwrap();
}

mod cli_basics {
    use super::*;

    #[test]
    fn shows_help() {
        modcycle()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("USAGE"));
    }

    #[test]
    fn shows_version() {
        modcycle()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("modcycle"));
    }

    #[test]
    fn rejects_unknown_flag() {
        modcycle().arg("--nope").assert().failure();
    }

    #[test]
    fn errors_without_go_mod() {
        let dir = TempDir::new().unwrap();
        modcycle()
            .arg("--path")
            .arg(dir.path())
            .assert()
            .failure();
    }
}

mod scenarios {
    use super::*;

    /// S1: a single package with no imports produces a cycle-free graph.
    #[test]
    fn s1_no_cycles() {
        let dir = TempDir::new().unwrap();
        go_mod(dir.path(), "example.com/m");
        go_file(dir.path(), "main.go", "package main\n\nfunc main() {}\n");

        modcycle()
            .arg("--path")
            .arg(dir.path())
            .assert()
            .success()
            .stdout(
                predicate::str::contains("digraph")
                    .and(predicate::str::contains("#7a0000").not()),
            );
    }

    /// S2: packages `a` and `b` import each other directly; an uninvolved
    /// `notincycle` package stays unmarked.
    #[test]
    fn s2_direct_cycle() {
        let dir = TempDir::new().unwrap();
        go_mod(dir.path(), "example.com/m");
        go_file(
            &dir.path().join("a"),
            "a.go",
            "package a\n\nimport \"example.com/m/b\"\n\nfunc AFn() { b.BFn() }\n",
        );
        go_file(
            &dir.path().join("b"),
            "b.go",
            "package b\n\nimport \"example.com/m/a\"\n\nfunc BFn() { a.AFn() }\n",
        );
        go_file(
            &dir.path().join("notincycle"),
            "n.go",
            "package notincycle\n\nfunc NFn() {}\n",
        );

        modcycle()
            .arg("--path")
            .arg(dir.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("#7a0000"));
    }

    /// S3: a transitive cycle a -> b -> c -> a.
    #[test]
    fn s3_transitive_cycle() {
        let dir = TempDir::new().unwrap();
        go_mod(dir.path(), "example.com/m");
        go_file(
            &dir.path().join("a"),
            "a.go",
            "package a\n\nimport \"example.com/m/b\"\n\nfunc AFn() { b.BFn() }\n",
        );
        go_file(
            &dir.path().join("b"),
            "b.go",
            "package b\n\nimport \"example.com/m/c\"\n\nfunc BFn() { c.CFn() }\n",
        );
        go_file(
            &dir.path().join("c"),
            "c.go",
            "package c\n\nimport \"example.com/m/a\"\n\nfunc CFn() { a.AFn() }\n",
        );

        modcycle()
            .arg("--path")
            .arg(dir.path())
            .arg("--resolution")
            .arg("package")
            .assert()
            .success()
            .stdout(predicate::str::contains("#7a0000"));
    }

    /// S4: two independent cycles (a<->b, a<->c) sharing vertex `a`.
    #[test]
    fn s4_independent_cycles_sharing_a_vertex() {
        let dir = TempDir::new().unwrap();
        go_mod(dir.path(), "example.com/m");
        go_file(
            &dir.path().join("a"),
            "a.go",
            "package a\n\nimport (\n\t\"example.com/m/b\"\n\t\"example.com/m/c\"\n)\n\nfunc AFn() { b.BFn(); c.CFn() }\n",
        );
        go_file(
            &dir.path().join("b"),
            "b.go",
            "package b\n\nimport \"example.com/m/a\"\n\nfunc BFn() { a.AFn() }\n",
        );
        go_file(
            &dir.path().join("c"),
            "c.go",
            "package c\n\nimport \"example.com/m/a\"\n\nfunc CFn() { a.AFn() }\n",
        );

        modcycle()
            .arg("--path")
            .arg(dir.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("#7a0000"));
    }

    /// S5: two cycles (a<->b, b<->c) interlinked through shared vertex `b`.
    #[test]
    fn s5_interlinked_cycles_sharing_b_vertex() {
        let dir = TempDir::new().unwrap();
        go_mod(dir.path(), "example.com/m");
        go_file(
            &dir.path().join("a"),
            "a.go",
            "package a\n\nimport \"example.com/m/b\"\n\nfunc AFn() { b.BFn() }\n",
        );
        go_file(
            &dir.path().join("b"),
            "b.go",
            "package b\n\nimport (\n\t\"example.com/m/a\"\n\t\"example.com/m/c\"\n)\n\nfunc BFn() { a.AFn(); c.CFn() }\n",
        );
        go_file(
            &dir.path().join("c"),
            "c.go",
            "package c\n\nimport \"example.com/m/b\"\n\nfunc CFn() { b.BFn() }\n",
        );

        modcycle()
            .arg("--path")
            .arg(dir.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("#7a0000"));
    }

    /// S6: `main.go` at the module root references `a.AFn` before the
    /// directory walk reaches `a/a.go` — the builder must stub `AFn` and
    /// fix it up in place once the real declaration arrives.
    #[test]
    fn s6_forward_reference_stub_fixup() {
        let dir = TempDir::new().unwrap();
        go_mod(dir.path(), "example.com/m");
        go_file(
            dir.path(),
            "main.go",
            "package main\n\nimport \"example.com/m/a\"\n\nfunc main() { a.AFn() }\n",
        );
        go_file(&dir.path().join("a"), "a.go", "package a\n\nfunc AFn() {}\n");

        modcycle()
            .arg("--path")
            .arg(dir.path())
            .assert()
            .success()
            .stdout(
                predicate::str::contains("main.go").and(predicate::str::contains("a.go")),
            );
    }

    /// S7 (spec.md §8): a package `a-a` imports `b.b`, which imports back
    /// into `a-a` (a genuine cycle), and `main` imports `a-a` without being
    /// part of that cycle. DOT identifiers must sanitize the hyphen/dot
    /// to `_`, the `a-a`<->`b.b` edges must be cycle-colored, and the
    /// `main`->`a-a` edge must stay base-colored even though `a-a` is
    /// itself `in_cycle` — the false positive the old per-endpoint
    /// `pkg.in_cycle && target_pkg.in_cycle` check would have produced.
    #[test]
    fn s7_dot_identifier_sanitization() {
        let dir = TempDir::new().unwrap();
        go_mod(dir.path(), "example.com/m");
        go_file(
            dir.path(),
            "main.go",
            "package main\n\nimport aa \"example.com/m/a-a\"\n\nfunc main() { aa.AFn() }\n",
        );
        go_file(
            &dir.path().join("a-a"),
            "a.go",
            "package a\n\nimport bb \"example.com/m/b.b\"\n\nfunc AFn() { bb.BFn() }\n",
        );
        go_file(
            &dir.path().join("b.b"),
            "b.go",
            "package b\n\nimport aa \"example.com/m/a-a\"\n\nfunc BFn() { aa.AFn() }\n",
        );

        let output = modcycle()
            .arg("--path")
            .arg(dir.path())
            .arg("--resolution")
            .arg("package")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let dot = String::from_utf8(output).unwrap();

        // Node identifiers (not the human-readable `label="..."` text) must
        // sanitize the hyphen/dot away.
        assert!(dot.contains("\"pkg_example_com_m_a_a\""), "a-a must sanitize to a_a:\n{dot}");
        assert!(dot.contains("\"pkg_example_com_m_b_b\""), "b.b must sanitize to b_b:\n{dot}");

        let a_to_b = "\"pkg_example_com_m_a_a\" -> \"pkg_example_com_m_b_b\" [color=\"#c62828\"];";
        let b_to_a = "\"pkg_example_com_m_b_b\" -> \"pkg_example_com_m_a_a\" [color=\"#c62828\"];";
        assert!(dot.contains(a_to_b), "a-a <-> b.b must be cycle-colored:\n{dot}");
        assert!(dot.contains(b_to_a), "a-a <-> b.b must be cycle-colored:\n{dot}");

        // "main"'s package UID is its own (unsanitized) directory path, so
        // compute its sanitized node name from the tempdir path rather than
        // hardcoding it.
        let main_uid = dir.path().to_string_lossy().to_string();
        let main_node = format!(
            "pkg_{}",
            main_uid
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
                .collect::<String>()
        );
        let main_to_a = format!("\"{main_node}\" -> \"pkg_example_com_m_a_a\" [color=\"#555555\"];");
        let main_to_a_miscolored =
            format!("\"{main_node}\" -> \"pkg_example_com_m_a_a\" [color=\"#c62828\"];");
        assert!(
            dot.contains(&main_to_a),
            "main->a-a must stay base-colored despite a-a being in_cycle:\n{dot}"
        );
        assert!(
            !dot.contains(&main_to_a_miscolored),
            "main->a-a must not be miscolored as a cycle edge:\n{dot}"
        );
    }
}
