//! # Descriptor Store
//!
//! Append-only registry of parsed `.proto` files and the search path used to find imports.
//!
//! Files are keyed twice: by their canonical path on disk (a file is never loaded twice) and by
//! their import name (the string other files use in `import "..."`, which also becomes the
//! descriptor's file name once linked).
use super::parser::{self, ParseError};
use prost_types::FileDescriptorProto;
use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};

/// Ordered list of directories searched when resolving an `import` statement.
///
/// The first directory containing the requested file wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportPath(Vec<PathBuf>);

impl ImportPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<P: Into<PathBuf>> FromIterator<P> for ImportPath {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl From<Vec<PathBuf>> for ImportPath {
    fn from(dirs: Vec<PathBuf>) -> Self {
        Self(dirs)
    }
}

/// A parsed, not yet linked, definition file.
#[derive(Debug, Clone)]
pub struct StoredFile {
    name: String,
    path: PathBuf,
    proto: FileDescriptorProto,
}

impl StoredFile {
    /// Reads and parses the file at `path`, registering it under the import name `name`.
    pub fn read(name: &str, path: &Path) -> Result<Self, ResolveError> {
        let source = fs::read_to_string(path).map_err(|source| ResolveError::Read {
            file: name.to_string(),
            source,
        })?;
        let proto = parser::parse_file(name, &source).map_err(|error| ResolveError::Syntax {
            file: name.to_string(),
            error,
        })?;
        let path = fs::canonicalize(path).map_err(|source| ResolveError::Read {
            file: name.to_string(),
            source,
        })?;

        Ok(Self {
            name: name.to_string(),
            path,
            proto,
        })
    }

    /// The import name, e.g. `common/types.proto`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical location on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn package(&self) -> &str {
        self.proto.package()
    }

    /// Targets of this file's `import` statements, in declaration order.
    pub fn imports(&self) -> &[String] {
        &self.proto.dependency
    }

    pub fn proto(&self) -> &FileDescriptorProto {
        &self.proto
    }
}

/// Returned by [`DescriptorStore::register`] when the file is already known.
#[derive(Debug, Clone, thiserror::Error)]
#[error("'{name}' conflicts with already loaded file '{existing}'")]
pub struct RegisterConflict {
    pub name: String,
    pub existing: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("{from}: import \"{import}\" was not found in any import path")]
    NotFound { from: String, import: String },
    #[error("{file}: failed to read file: {source}")]
    Read {
        file: String,
        #[source]
        source: io::Error,
    },
    #[error("{file}:{error}")]
    Syntax { file: String, error: ParseError },
    #[error(transparent)]
    Conflict(#[from] RegisterConflict),
}

#[derive(Debug, Default)]
pub struct DescriptorStore {
    import_path: ImportPath,
    /// Searched after every `import_path` entry; usually the root file's directory.
    fallback_dir: Option<PathBuf>,
    files: Vec<StoredFile>,
    by_path: HashMap<PathBuf, usize>,
    by_name: HashMap<String, usize>,
}

impl DescriptorStore {
    pub fn new(import_path: ImportPath) -> Self {
        Self {
            import_path,
            ..Default::default()
        }
    }

    /// Adds a directory searched after the whole import path.
    pub fn with_fallback_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fallback_dir = Some(dir.into());
        self
    }

    pub fn import_path(&self) -> &ImportPath {
        &self.import_path
    }

    /// Inserts a parsed file. A file whose canonical path or import name is already present is
    /// rejected and the store is left untouched.
    pub fn register(&mut self, file: StoredFile) -> Result<&StoredFile, RegisterConflict> {
        let existing = self
            .by_path
            .get(file.path())
            .or_else(|| self.by_name.get(file.name()));

        if let Some(&index) = existing {
            return Err(RegisterConflict {
                name: file.name.clone(),
                existing: self.files[index].name.clone(),
            });
        }

        let index = self.files.len();
        tracing::debug!(name = file.name(), path = %file.path().display(), "registered proto file");
        self.by_path.insert(file.path.clone(), index);
        self.by_name.insert(file.name.clone(), index);
        self.files.push(file);
        Ok(&self.files[index])
    }

    /// Looks a file up by its location on disk.
    pub fn lookup(&self, path: &Path) -> Option<&StoredFile> {
        let index = match self.by_path.get(path) {
            Some(index) => *index,
            None => *self.by_path.get(&fs::canonicalize(path).ok()?)?,
        };
        self.files.get(index)
    }

    /// Looks a file up by its import name.
    pub fn lookup_name(&self, name: &str) -> Option<&StoredFile> {
        self.by_name.get(name).and_then(|&index| self.files.get(index))
    }

    /// Resolves `import` as written in the file `from`.
    ///
    /// Already registered files are returned directly. Otherwise every import path entry is
    /// tried in order, then the fallback directory; the first hit is parsed and registered.
    pub fn resolve_import(
        &mut self,
        from: &str,
        import: &str,
    ) -> Result<&StoredFile, ResolveError> {
        if let Some(&index) = self.by_name.get(import) {
            return Ok(&self.files[index]);
        }

        let candidate = self
            .import_path
            .dirs()
            .iter()
            .chain(self.fallback_dir.iter())
            .map(|dir| dir.join(import))
            .find(|path| path.is_file())
            .ok_or_else(|| ResolveError::NotFound {
                from: from.to_string(),
                import: import.to_string(),
            })?;

        tracing::debug!(from, import, path = %candidate.display(), "resolved import");
        let file = StoredFile::read(import, &candidate)?;
        Ok(self.register(file)?)
    }

    /// All registered files in insertion order.
    pub fn files(&self) -> impl ExactSizeIterator<Item = &StoredFile> {
        self.files.iter()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixtures() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/protos")
    }

    #[test]
    fn resolves_imports_in_import_path_order() {
        let import_path: ImportPath = [fixtures().join("third_party"), fixtures().join("app")]
            .into_iter()
            .collect();
        let mut store = DescriptorStore::new(import_path);

        let file = store
            .resolve_import("app.proto", "vendor/money.proto")
            .expect("import should resolve");
        assert_eq!(file.name(), "vendor/money.proto");
        assert_eq!(file.package(), "vendor");
        assert!(file.path().ends_with("third_party/vendor/money.proto"));
        assert_eq!(store.len(), 1);

        // Second resolution hits the registered copy.
        store
            .resolve_import("other.proto", "vendor/money.proto")
            .expect("import should resolve");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn falls_back_to_root_directory() {
        let mut store =
            DescriptorStore::new(ImportPath::new()).with_fallback_dir(fixtures().join("greeter"));

        let file = store
            .resolve_import("svc.proto", "common/types.proto")
            .expect("import should resolve");
        assert_eq!(file.package(), "common");

        let path = fixtures().join("greeter/common/types.proto");
        assert!(store.lookup(&path).is_some());
        assert!(store.lookup_name("common/types.proto").is_some());
    }

    #[test]
    fn missing_import_is_not_found() {
        let mut store = DescriptorStore::new(ImportPath::new());
        let err = store.resolve_import("a.proto", "nowhere.proto").unwrap_err();
        match err {
            ResolveError::NotFound { from, import } => {
                assert_eq!(from, "a.proto");
                assert_eq!(import, "nowhere.proto");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(store.is_empty());
    }

    #[test]
    fn register_rejects_same_file_twice() {
        let path = fixtures().join("greeter/common/types.proto");
        let mut store = DescriptorStore::new(ImportPath::new());

        store
            .register(StoredFile::read("common/types.proto", &path).unwrap())
            .unwrap();

        // Same path under a different name.
        let conflict = store
            .register(StoredFile::read("types.proto", &path).unwrap())
            .unwrap_err();
        assert_eq!(conflict.existing, "common/types.proto");
        assert_eq!(store.len(), 1);
    }
}
