//! The primitive builder: absorbs the event stream and constructs the
//! linked entity graph, tolerating out-of-order discovery via
//! stub-and-fixup (spec.md §4.2).

use std::collections::HashMap;

use crate::error::{BuilderError, Result};
use crate::events::{DeclKind, Event};
use crate::model::{Decl, DeclId, File, FileId, Import, Model, Package, PackageId};

pub struct PrimitiveBuilder {
    pub model: Model,
}

impl PrimitiveBuilder {
    pub fn new(module_path: impl Into<String>, module_root: impl Into<std::path::PathBuf>) -> Self {
        PrimitiveBuilder {
            model: Model::new(module_path, module_root),
        }
    }

    pub fn into_model(self) -> Model {
        self.model
    }

    /// Absorb a single event, mutating the model in place. Idempotent on
    /// duplicate `Package` events for the same directory; fails with
    /// `DuplicateFile` on a distinct file event re-declaring an
    /// already-seen absolute path.
    pub fn add_node(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Package { name, dir_path } => self.on_package(name, dir_path),
            Event::File { abs_path, dir_path } => self.on_file(abs_path, dir_path),
            Event::Import {
                import_path,
                aliased,
                local_name,
            } => self.on_import(import_path, aliased, local_name),
            Event::FuncDecl { name, receiver_type } => self.on_func_decl(name, receiver_type),
            Event::GenDecl { kind, name } => self.on_gen_decl(kind, name),
            Event::Selector { import_name, member } => self.on_selector(import_name, member),
        }
    }

    fn on_package(&mut self, name: String, dir_path: std::path::PathBuf) -> Result<()> {
        let uid = self.model.package_uid_for(&dir_path, &name);
        let module_path = self.model.module_path.clone();
        let module_root = self.model.module_root.clone();

        match self.model.packages.get(&uid) {
            None => {
                let pkg = Package {
                    uid: uid.clone(),
                    dir_path,
                    module_path,
                    module_root,
                    name,
                    is_stub: false,
                    in_cycle: false,
                    file_order: Vec::new(),
                    files: HashMap::new(),
                };
                self.model.package_order.push(uid.clone());
                self.model.packages.insert(uid.clone(), pkg);
            }
            Some(existing) if existing.is_stub => {
                let pkg = self.model.packages.get_mut(&uid).unwrap();
                pkg.dir_path = dir_path;
                pkg.module_path = module_path;
                pkg.module_root = module_root;
                pkg.name = name;
                pkg.is_stub = false;
                // Drop stub files with no decls now that the real package
                // definition has arrived (spec.md §3, "Lifecycle").
                let empty_stub_files: Vec<FileId> = pkg
                    .file_order
                    .iter()
                    .filter(|fid| {
                        pkg.files
                            .get(*fid)
                            .map(|f| f.is_stub && f.decls.is_empty())
                            .unwrap_or(false)
                    })
                    .cloned()
                    .collect();
                for fid in &empty_stub_files {
                    pkg.files.remove(fid);
                    pkg.file_order.retain(|x| x != fid);
                    self.model.file_owner.remove(fid);
                }
            }
            Some(existing) => {
                if existing.dir_path != dir_path || existing.name != name {
                    return Err(BuilderError::DuplicatePackage { uid: uid.0 }.into());
                }
                // Identical re-declaration: idempotent no-op.
            }
        }
        self.model.current_package = Some(uid);
        Ok(())
    }

    fn on_file(&mut self, abs_path: String, _dir_path: std::path::PathBuf) -> Result<()> {
        let pkg_uid = self
            .model
            .current_package
            .clone()
            .ok_or(BuilderError::UndefinedPackage)?;
        let fid = FileId(abs_path.clone());

        if let Some(owner) = self.model.file_owner.get(&fid) {
            let existing_is_stub = self
                .model
                .packages
                .get(owner)
                .and_then(|p| p.files.get(&fid))
                .map(|f| f.is_stub)
                .unwrap_or(false);
            if !existing_is_stub {
                return Err(BuilderError::DuplicateFile { path: abs_path }.into());
            }
        }

        let filename = std::path::Path::new(&abs_path)
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| abs_path.clone());

        let file = File {
            uid: fid.clone(),
            package: pkg_uid.clone(),
            filename,
            abs_path,
            is_stub: false,
            in_cycle: false,
            import_order: Vec::new(),
            imports: HashMap::new(),
            decl_order: Vec::new(),
            decls: HashMap::new(),
        };
        let pkg = self
            .model
            .packages
            .get_mut(&pkg_uid)
            .ok_or(BuilderError::UndefinedPackage)?;
        if !pkg.files.contains_key(&fid) {
            pkg.file_order.push(fid.clone());
        }
        pkg.files.insert(fid.clone(), file);
        self.model.file_owner.insert(fid.clone(), pkg_uid);
        self.model.current_file = Some(fid);
        Ok(())
    }

    fn on_import(&mut self, import_path: String, aliased: bool, local_name: String) -> Result<()> {
        let pkg_uid = self
            .model
            .current_package
            .clone()
            .ok_or(BuilderError::UndefinedPackage)?;
        let file_uid = self
            .model
            .current_file
            .clone()
            .ok_or(BuilderError::UndefinedFile)?;

        if let Some(cur) = self
            .model
            .file(&file_uid)
            .and_then(|f| f.imports.get(&local_name))
        {
            if cur.import_path != import_path {
                return Err(BuilderError::DuplicateImport {
                    file: file_uid.0,
                    name: local_name,
                }
                .into());
            }
            return Ok(());
        }

        let target_uid = self.model.stub_package_uid_for_import(&import_path);
        if !self.model.packages.contains_key(&target_uid) {
            let stub_pkg = Package {
                uid: target_uid.clone(),
                dir_path: std::path::PathBuf::new(),
                module_path: self.model.module_path.clone(),
                module_root: self.model.module_root.clone(),
                name: local_name.clone(),
                is_stub: true,
                in_cycle: false,
                file_order: Vec::new(),
                files: HashMap::new(),
            };
            let stub_file = Model::new_stub_file(&stub_pkg);
            let stub_file_id = stub_file.uid.clone();

            let mut stub_pkg = stub_pkg;
            stub_pkg.file_order.push(stub_file_id.clone());
            stub_pkg.files.insert(stub_file_id.clone(), stub_file);

            self.model.package_order.push(target_uid.clone());
            self.model.packages.insert(target_uid.clone(), stub_pkg);
            self.model
                .file_owner
                .insert(stub_file_id, target_uid.clone());
        }

        let import = Import {
            local_name: local_name.clone(),
            import_path,
            aliased,
            target: target_uid,
            in_cycle: false,
            referenced_order: Vec::new(),
            referenced_types: HashMap::new(),
            referenced_files_in_cycle: Default::default(),
        };

        let pkg = self
            .model
            .packages
            .get_mut(&pkg_uid)
            .ok_or(BuilderError::UndefinedPackage)?;
        let file = pkg
            .files
            .get_mut(&file_uid)
            .ok_or(BuilderError::UndefinedFile)?;
        file.import_order.push(local_name.clone());
        file.imports.insert(local_name, import);
        Ok(())
    }

    fn on_func_decl(&mut self, name: String, receiver_type: Option<String>) -> Result<()> {
        if name.is_empty() {
            return Err(BuilderError::InvalidFunctionName(name).into());
        }
        let receiver_decl = match &receiver_type {
            Some(rt) => Some(self.find_or_stub_receiver_decl(rt)?),
            None => None,
        };
        self.insert_decl(name, receiver_decl)
    }

    /// Resolve a method's receiver type to its `Decl`, stubbing a
    /// placeholder in the current package if the type hasn't been
    /// declared yet (its own `GenDecl` may come later in directory-walk
    /// order, or later in the same file). `insert_decl`'s own stub-fixup
    /// search relocates this placeholder in place once the real type
    /// declaration arrives, since it is keyed under the same bare name.
    fn find_or_stub_receiver_decl(&mut self, receiver_type_name: &str) -> Result<DeclId> {
        if let Some(id) = self.find_decl_by_bare_uid(receiver_type_name) {
            return Ok(id);
        }
        let pkg_uid = self
            .model
            .current_package
            .clone()
            .ok_or(BuilderError::UndefinedPackage)?;

        let stub_file_id = {
            let pkg = self
                .model
                .packages
                .get(&pkg_uid)
                .ok_or(BuilderError::UndefinedPackage)?;
            pkg.file_order
                .iter()
                .find(|fid| pkg.files.get(*fid).map(|f| f.is_stub).unwrap_or(false))
                .cloned()
        };
        let stub_file_id = match stub_file_id {
            Some(id) => id,
            None => {
                let pkg = self
                    .model
                    .packages
                    .get(&pkg_uid)
                    .ok_or(BuilderError::UndefinedPackage)?;
                let stub = Model::new_stub_file(pkg);
                let id = stub.uid.clone();
                let pkg = self
                    .model
                    .packages
                    .get_mut(&pkg_uid)
                    .ok_or(BuilderError::UndefinedPackage)?;
                pkg.file_order.push(id.clone());
                pkg.files.insert(id.clone(), stub);
                self.model.file_owner.insert(id.clone(), pkg_uid.clone());
                id
            }
        };

        if let Some(&existing) = self
            .model
            .packages
            .get(&pkg_uid)
            .and_then(|p| p.files.get(&stub_file_id))
            .and_then(|f| f.decls.get(receiver_type_name))
        {
            return Ok(existing);
        }

        let id = self.model.alloc_decl_id();
        self.model.decls.insert(
            id,
            Decl {
                file: stub_file_id.clone(),
                receiver: None,
                name: receiver_type_name.to_string(),
            },
        );
        let pkg = self
            .model
            .packages
            .get_mut(&pkg_uid)
            .ok_or(BuilderError::UndefinedPackage)?;
        let stub_file = pkg
            .files
            .get_mut(&stub_file_id)
            .ok_or(BuilderError::UndefinedFile)?;
        stub_file.decl_order.push(receiver_type_name.to_string());
        stub_file.decls.insert(receiver_type_name.to_string(), id);
        Ok(id)
    }

    fn on_gen_decl(&mut self, kind: DeclKind, name: String) -> Result<()> {
        if name.is_empty() {
            let err = match kind {
                DeclKind::Const | DeclKind::Var => BuilderError::InvalidVarName(name),
                DeclKind::Type => BuilderError::InvalidTypeName(name),
            };
            return Err(err.into());
        }
        self.insert_decl(name, None)
    }

    /// Shared insertion path for `FuncDecl`/`GenDecl` events: computes the
    /// qualified UID, then runs stub fix-up against the current package's
    /// stub files before falling back to a fresh `Decl`.
    fn insert_decl(&mut self, name: String, receiver: Option<DeclId>) -> Result<()> {
        let pkg_uid = self
            .model
            .current_package
            .clone()
            .ok_or(BuilderError::UndefinedPackage)?;
        let file_uid = self
            .model
            .current_file
            .clone()
            .ok_or(BuilderError::UndefinedFile)?;

        let qualified = match receiver {
            Some(recv_id) => {
                let recv_name = self
                    .model
                    .decls
                    .get(&recv_id)
                    .map(|d| d.name.clone())
                    .unwrap_or_default();
                format!("{recv_name}.{name}")
            }
            None => name.clone(),
        };

        if let Some(existing_id) = self
            .model
            .file(&file_uid)
            .and_then(|f| f.decls.get(&qualified))
            .copied()
        {
            if self.model.decls.get(&existing_id).map(|d| &d.file) == Some(&file_uid) {
                return Err(BuilderError::DuplicateDecl {
                    file: file_uid.0,
                    name: qualified,
                }
                .into());
            }
        }

        // Search every stub file in the current package for a decl already
        // stubbed under this qualified UID.
        let mut fixup: Option<(FileId, DeclId)> = None;
        if let Some(pkg) = self.model.packages.get(&pkg_uid) {
            for fid in &pkg.file_order {
                if let Some(f) = pkg.files.get(fid) {
                    if f.is_stub {
                        if let Some(&decl_id) = f.decls.get(&qualified) {
                            fixup = Some((fid.clone(), decl_id));
                            break;
                        }
                    }
                }
            }
        }

        let decl_id = if let Some((stub_file_id, decl_id)) = fixup {
            if let Some(decl) = self.model.decls.get_mut(&decl_id) {
                decl.file = file_uid.clone();
                decl.receiver = receiver;
                decl.name = name;
            }
            if let Some(pkg) = self.model.packages.get_mut(&pkg_uid) {
                if let Some(stub_file) = pkg.files.get_mut(&stub_file_id) {
                    stub_file.decls.remove(&qualified);
                    stub_file.decl_order.retain(|n| n != &qualified);
                    if stub_file.decls.is_empty() {
                        pkg.files.remove(&stub_file_id);
                        pkg.file_order.retain(|f| f != &stub_file_id);
                        self.model.file_owner.remove(&stub_file_id);
                    }
                }
            }
            decl_id
        } else {
            let id = self.model.alloc_decl_id();
            self.model.decls.insert(
                id,
                Decl {
                    file: file_uid.clone(),
                    receiver,
                    name,
                },
            );
            id
        };

        let pkg = self
            .model
            .packages
            .get_mut(&pkg_uid)
            .ok_or(BuilderError::UndefinedPackage)?;
        let file = pkg
            .files
            .get_mut(&file_uid)
            .ok_or(BuilderError::UndefinedFile)?;
        if !file.decls.contains_key(&qualified) {
            file.decl_order.push(qualified.clone());
        }
        file.decls.insert(qualified, decl_id);
        Ok(())
    }

    fn find_decl_by_bare_uid(&self, bare_uid: &str) -> Option<DeclId> {
        let pkg_uid = self.model.current_package.as_ref()?;
        let pkg = self.model.packages.get(pkg_uid)?;
        for fid in &pkg.file_order {
            let f = pkg.files.get(fid)?;
            if let Some(&id) = f.decls.get(bare_uid) {
                return Some(id);
            }
        }
        None
    }

    fn on_selector(&mut self, import_name: String, member: String) -> Result<()> {
        let pkg_uid = self
            .model
            .current_package
            .clone()
            .ok_or(BuilderError::UndefinedPackage)?;
        let file_uid = self
            .model
            .current_file
            .clone()
            .ok_or(BuilderError::UndefinedFile)?;

        let target_uid = {
            let pkg = self
                .model
                .packages
                .get(&pkg_uid)
                .ok_or(BuilderError::UndefinedPackage)?;
            let file = pkg
                .files
                .get(&file_uid)
                .ok_or(BuilderError::UndefinedFile)?;
            file.imports
                .get(&import_name)
                .map(|i| i.target.clone())
                .ok_or_else(|| BuilderError::UndefinedImport {
                    name: import_name.clone(),
                })?
        };

        let resolved = self.resolve_or_stub_member(&target_uid, &member);

        let pkg = self
            .model
            .packages
            .get_mut(&pkg_uid)
            .ok_or(BuilderError::UndefinedPackage)?;
        let file = pkg
            .files
            .get_mut(&file_uid)
            .ok_or(BuilderError::UndefinedFile)?;
        let import = file
            .imports
            .get_mut(&import_name)
            .ok_or(BuilderError::UndefinedImport {
                name: import_name.clone(),
            })?;
        if let Some(decl_id) = resolved {
            if !import.referenced_types.contains_key(&member) {
                import.referenced_order.push(member.clone());
                import.referenced_types.insert(member, decl_id);
            }
        }
        Ok(())
    }

    /// Resolve `member` against the target package's non-stub files first;
    /// failing that, record a provisional `Decl` in the target package's
    /// stub file if one exists (spec.md §4.2, "Qualified-identifier
    /// event").
    fn resolve_or_stub_member(&mut self, target_uid: &PackageId, member: &str) -> Option<DeclId> {
        let pkg = self.model.packages.get(target_uid)?;
        for fid in &pkg.file_order {
            if let Some(f) = pkg.files.get(fid) {
                if !f.is_stub {
                    if let Some(&id) = f.decls.get(member) {
                        return Some(id);
                    }
                }
            }
        }
        let stub_file_id = pkg
            .file_order
            .iter()
            .find(|fid| pkg.files.get(*fid).map(|f| f.is_stub).unwrap_or(false))
            .cloned()?;

        if let Some(&existing) = pkg.files.get(&stub_file_id).and_then(|f| f.decls.get(member)) {
            return Some(existing);
        }

        let id = self.model.alloc_decl_id();
        self.model.decls.insert(
            id,
            Decl {
                file: stub_file_id.clone(),
                receiver: None,
                name: member.to_string(),
            },
        );
        let pkg = self.model.packages.get_mut(target_uid)?;
        let stub_file = pkg.files.get_mut(&stub_file_id)?;
        stub_file.decl_order.push(member.to_string());
        stub_file.decls.insert(member.to_string(), id);
        Some(id)
    }
}
