//! # Schema Loader
//!
//! Loads a root `.proto` file together with everything it transitively imports.
//!
//! Loading never stops at the first problem. The import graph is walked depth-first with an
//! explicit [`LoadContext`] that accumulates every parse, resolution and cycle error, so the
//! caller sees the complete list in one pass. Only when the walk is clean are the files linked
//! into a [`DescriptorPool`], which performs name resolution; link errors are accumulated the
//! same way.
use super::{
    store::{DescriptorStore, ImportPath, ResolveError, StoredFile},
    tree::ServiceTree,
};
use prost_reflect::{DescriptorPool, FileDescriptor};
use std::{
    collections::HashSet,
    fmt,
    path::{Path, PathBuf},
};

/// A single structural problem found while loading.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("invalid root file path '{0}'")]
    InvalidRoot(PathBuf),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("import cycle detected: {}", .0.join(" -> "))]
    ImportCycle(Vec<String>),
    #[error("{file}: {message}")]
    Link { file: String, message: String },
}

/// The failure side of a load: a non-empty, ordered list of errors.
#[derive(Debug)]
pub struct LoadErrors(Vec<SchemaError>);

impl LoadErrors {
    pub fn errors(&self) -> &[SchemaError] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<SchemaError> {
        self.0
    }
}

impl fmt::Display for LoadErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for LoadErrors {}

impl<'a> IntoIterator for &'a LoadErrors {
    type Item = &'a SchemaError;
    type IntoIter = std::slice::Iter<'a, SchemaError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Outcome of [`load`]: either a fully linked schema or every error found.
pub type LoadResult = Result<Schema, LoadErrors>;

/// A successfully loaded definition graph.
#[derive(Debug)]
pub struct Schema {
    store: DescriptorStore,
    pool: DescriptorPool,
    root: FileDescriptor,
}

impl Schema {
    /// The parsed files, in the order they were discovered.
    pub fn store(&self) -> &DescriptorStore {
        &self.store
    }

    /// The linked descriptors of every loaded file.
    pub fn pool(&self) -> &DescriptorPool {
        &self.pool
    }

    pub fn root(&self) -> &FileDescriptor {
        &self.root
    }

    /// Services declared in the root file, ready for selection.
    pub fn service_tree(&self) -> ServiceTree {
        ServiceTree::build(&self.root)
    }
}

/// Loads `root` and its transitive imports.
///
/// Imports are searched in `import_path` first and then in the directory containing `root`.
/// The root itself is registered under its bare file name, so an import of that same name
/// resolves to the root and is reported as an import cycle.
pub fn load(root: impl AsRef<Path>, import_path: &ImportPath) -> LoadResult {
    let root = root.as_ref();
    tracing::debug!(root = %root.display(), "loading proto schema");

    let (Some(root_dir), Some(root_name)) = (root.parent(), root.file_name()) else {
        return Err(LoadErrors(vec![SchemaError::InvalidRoot(root.to_path_buf())]));
    };
    let root_name = root_name.to_string_lossy().into_owned();

    let store = DescriptorStore::new(import_path.clone()).with_fallback_dir(root_dir);
    let mut ctx = LoadContext::new(store);

    match StoredFile::read(&root_name, root) {
        Ok(file) => match ctx.store.register(file) {
            Ok(_) => ctx.visit(&root_name),
            Err(conflict) => ctx.errors.push(ResolveError::from(conflict).into()),
        },
        Err(err) => ctx.errors.push(err.into()),
    }

    ctx.finish(&root_name)
}

/// Mutable state of a single load: the store being filled and the errors found so far.
struct LoadContext {
    store: DescriptorStore,
    errors: Vec<SchemaError>,
    /// Import chain currently being walked, used to report cycles.
    in_progress: Vec<String>,
    visited: HashSet<String>,
    /// Imports that already produced an error; later references stay silent.
    failed: HashSet<String>,
    /// Files in dependency order (dependencies before dependents).
    order: Vec<String>,
}

impl LoadContext {
    fn new(store: DescriptorStore) -> Self {
        Self {
            store,
            errors: Vec::new(),
            in_progress: Vec::new(),
            visited: HashSet::new(),
            failed: HashSet::new(),
            order: Vec::new(),
        }
    }

    /// Walks the imports of an already registered file.
    fn visit(&mut self, name: &str) {
        let imports = match self.store.lookup_name(name) {
            Some(file) => file.imports().to_vec(),
            None => return,
        };

        self.in_progress.push(name.to_string());

        for import in imports {
            if let Some(start) = self.in_progress.iter().position(|n| *n == import) {
                let mut cycle = self.in_progress[start..].to_vec();
                cycle.push(import);
                tracing::debug!(?cycle, "import cycle");
                self.errors.push(SchemaError::ImportCycle(cycle));
                continue;
            }

            if self.visited.contains(&import) || self.failed.contains(&import) {
                continue;
            }

            match self.store.resolve_import(name, &import) {
                Ok(file) => {
                    let resolved = file.name().to_string();
                    self.visit(&resolved);
                }
                Err(err) => {
                    tracing::debug!(%err, "failed to resolve import");
                    self.failed.insert(import);
                    self.errors.push(err.into());
                }
            }
        }

        self.in_progress.pop();
        self.visited.insert(name.to_string());
        self.order.push(name.to_string());
    }

    fn finish(mut self, root_name: &str) -> LoadResult {
        if !self.errors.is_empty() {
            tracing::warn!(errors = self.errors.len(), "failed to load proto schema");
            return Err(LoadErrors(self.errors));
        }

        let pool = self.link();
        if !self.errors.is_empty() {
            tracing::warn!(errors = self.errors.len(), "failed to link proto schema");
            return Err(LoadErrors(self.errors));
        }

        match pool.get_file_by_name(root_name) {
            Some(root) => {
                tracing::debug!(files = self.store.len(), "proto schema loaded");
                Ok(Schema {
                    store: self.store,
                    pool,
                    root,
                })
            }
            None => Err(LoadErrors(vec![SchemaError::Link {
                file: root_name.to_string(),
                message: "root file missing from linked descriptors".to_string(),
            }])),
        }
    }

    /// Adds every stored file to a fresh pool, dependencies first.
    fn link(&mut self) -> DescriptorPool {
        let mut pool = DescriptorPool::new();
        let mut unlinked: HashSet<String> = HashSet::new();

        for name in &self.order {
            let Some(file) = self.store.lookup_name(name) else {
                continue;
            };

            // Dependents of a file that failed to link would only repeat its error.
            if file.imports().iter().any(|dep| unlinked.contains(dep)) {
                unlinked.insert(name.clone());
                continue;
            }

            if let Err(err) = pool.add_file_descriptor_proto(file.proto().clone()) {
                unlinked.insert(name.clone());
                self.errors.push(SchemaError::Link {
                    file: name.clone(),
                    message: err.to_string(),
                });
            }
        }

        pool
    }
}
