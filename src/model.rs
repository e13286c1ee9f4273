//! The cross-linked entity model: packages, files, imports, and declarations.
//!
//! Entities are plain values stored in UID-keyed arenas on [`Model`] rather
//! than linked through shared pointers (see spec.md §9, "Cyclic object
//! graph"). `Decl` is the one entity that needs identity independent of its
//! owning collection, because stub fix-up relocates a `Decl` from a stub
//! file's collection into a real file's collection while everything that
//! already points at it keeps working; `Decl`s therefore live in their own
//! arena keyed by [`DeclId`], and both `File::decls` and
//! `Import::referenced_types` hold `DeclId`s rather than `Decl` values.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Stable identity for a [`Package`]: a module-qualified import path for
/// non-`main` packages, or the package's directory path for `main`
/// packages (which have no import path of their own).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageId(pub String);

/// Stable identity for a [`File`]: its absolute path, or a synthetic
/// `STUB://<package-uid>/stub.go` sentinel for stub files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub String);

/// Opaque identity for a [`Decl`], stable across stub fix-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(pub u64);

impl std::fmt::Display for PackageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn stub_file_id(pkg: &PackageId) -> FileId {
    FileId(format!("STUB://{}/stub.go", pkg.0))
}

#[derive(Debug, Clone)]
pub struct Package {
    pub uid: PackageId,
    pub dir_path: PathBuf,
    pub module_path: String,
    pub module_root: PathBuf,
    pub name: String,
    pub is_stub: bool,
    pub in_cycle: bool,
    /// Insertion-ordered file UIDs; `files` holds the owned entities.
    pub file_order: Vec<FileId>,
    pub files: HashMap<FileId, File>,
}

impl Package {
    /// Directory path with the module root (or module path, failing that)
    /// prefix stripped; `main` packages get a `:main` suffix (or bare
    /// `"main"` if the stripped path is empty) so that multiple executable
    /// packages in different directories stay distinguishable (spec.md §3,
    /// "Invariants").
    pub fn module_relative_path(&self) -> String {
        let stripped = self
            .dir_path
            .strip_prefix(&self.module_root)
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_else(|_| {
                let dir = self.dir_path.to_string_lossy();
                dir.strip_prefix(self.module_path.as_str())
                    .unwrap_or(&dir)
                    .trim_start_matches('/')
                    .to_string()
            });
        let stripped = stripped.trim_matches('/');
        if self.name == "main" {
            if stripped.is_empty() {
                "main".to_string()
            } else {
                format!("{stripped}:main")
            }
        } else {
            stripped.to_string()
        }
    }
}

#[derive(Debug, Clone)]
pub struct File {
    pub uid: FileId,
    pub package: PackageId,
    pub filename: String,
    pub abs_path: String,
    pub is_stub: bool,
    pub in_cycle: bool,
    pub import_order: Vec<String>,
    pub imports: HashMap<String, Import>,
    pub decl_order: Vec<String>,
    pub decls: HashMap<String, DeclId>,
}

impl File {
    /// Deduplicated files reachable through this file's imports' resolved
    /// declarations, in first-seen order (spec.md §4.4).
    pub fn referenced_files(&self, model: &Model) -> Vec<FileId> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for local in &self.import_order {
            let Some(imp) = self.imports.get(local) else {
                continue;
            };
            for member in &imp.referenced_order {
                let Some(&decl_id) = imp.referenced_types.get(member) else {
                    continue;
                };
                let Some(decl) = model.decls.get(&decl_id) else {
                    continue;
                };
                if seen.insert(decl.file.clone()) {
                    out.push(decl.file.clone());
                }
            }
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct Decl {
    pub file: FileId,
    /// The receiver type's own `Decl`, for methods (`Receiver.Name`).
    pub receiver: Option<DeclId>,
    /// Bare declared name (`Name` in `Receiver.Name`, or the whole UID for
    /// free declarations).
    pub name: String,
}

impl Decl {
    pub fn uid(&self, model: &Model) -> String {
        match self.receiver {
            Some(recv_id) => {
                let recv_name = model
                    .decls
                    .get(&recv_id)
                    .map(|d| d.name.clone())
                    .unwrap_or_default();
                format!("{recv_name}.{}", self.name)
            }
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Import {
    pub local_name: String,
    pub import_path: String,
    pub aliased: bool,
    pub target: PackageId,
    pub in_cycle: bool,
    pub referenced_order: Vec<String>,
    pub referenced_types: HashMap<String, DeclId>,
    pub referenced_files_in_cycle: HashSet<FileId>,
}

/// The cross-linked model, owned exclusively by the builder thread
/// (spec.md §5, "Shared-resource policy").
#[derive(Debug, Default)]
pub struct Model {
    pub module_path: String,
    pub module_root: PathBuf,
    pub package_order: Vec<PackageId>,
    pub packages: HashMap<PackageId, Package>,
    /// Which package currently owns a given file UID; used for the global
    /// duplicate-path check and for locating a file to mutate during
    /// fix-up without scanning every package.
    pub file_owner: HashMap<FileId, PackageId>,
    pub decls: HashMap<DeclId, Decl>,
    next_decl_id: u64,

    pub current_package: Option<PackageId>,
    pub current_file: Option<FileId>,
}

impl Model {
    pub fn new(module_path: impl Into<String>, module_root: impl Into<PathBuf>) -> Self {
        Model {
            module_path: module_path.into(),
            module_root: module_root.into(),
            ..Default::default()
        }
    }

    pub fn alloc_decl_id(&mut self) -> DeclId {
        self.next_decl_id += 1;
        DeclId(self.next_decl_id)
    }

    pub fn package_uid_for(&self, dir_path: &Path, name: &str) -> PackageId {
        if name == "main" {
            return PackageId(dir_path.to_string_lossy().to_string());
        }
        let rel = dir_path
            .strip_prefix(&self.module_root)
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_default();
        let rel = rel.trim_matches('/');
        if rel.is_empty() {
            PackageId(self.module_path.clone())
        } else {
            PackageId(format!("{}/{}", self.module_path, rel))
        }
    }

    pub fn stub_package_uid_for_import(&self, import_path: &str) -> PackageId {
        PackageId(import_path.to_string())
    }

    pub fn packages(&self) -> Vec<&Package> {
        self.package_order
            .iter()
            .filter_map(|id| self.packages.get(id))
            .collect()
    }

    pub fn files(&self) -> Vec<&File> {
        let mut out = Vec::new();
        for pkg in self.packages() {
            for fid in &pkg.file_order {
                if let Some(f) = pkg.files.get(fid) {
                    out.push(f);
                }
            }
        }
        out
    }

    /// All file UIDs in a stable (package-insertion, then file-insertion)
    /// order, used as the outer loop of the cycle marker (spec.md §4.3).
    pub fn file_ids_in_order(&self) -> Vec<FileId> {
        self.files().into_iter().map(|f| f.uid.clone()).collect()
    }

    pub fn file(&self, id: &FileId) -> Option<&File> {
        let pkg_id = self.file_owner.get(id)?;
        self.packages.get(pkg_id)?.files.get(id)
    }

    pub fn file_mut(&mut self, id: &FileId) -> Option<&mut File> {
        let pkg_id = self.file_owner.get(id)?.clone();
        self.packages.get_mut(&pkg_id)?.files.get_mut(id)
    }

    pub(crate) fn new_stub_file(pkg: &Package) -> File {
        let fid = stub_file_id(&pkg.uid);
        File {
            uid: fid,
            package: pkg.uid.clone(),
            filename: "stub.go".to_string(),
            abs_path: String::new(),
            is_stub: true,
            in_cycle: false,
            import_order: Vec::new(),
            imports: HashMap::new(),
            decl_order: Vec::new(),
            decls: HashMap::new(),
        }
    }
}
