//! # Schema Loading
//!
//! Everything needed to go from a `.proto` file on disk to navigable descriptors:
//!
//! * [`parser`]: the structural proto grammar, producing unlinked `FileDescriptorProto`s.
//! * [`store`]: the append-only [`DescriptorStore`] and the [`ImportPath`] it searches.
//! * [`loader`]: [`load`], which walks the import graph and reports every error at once.
//! * [`tree`]: the [`ServiceTree`] projection used to select a method.
pub mod loader;
pub mod parser;
pub mod store;
pub mod tree;

pub use loader::{LoadErrors, LoadResult, Schema, SchemaError, load};
pub use store::{DescriptorStore, ImportPath, ResolveError, StoredFile};
pub use tree::{SelectionHandle, ServiceNode, ServiceTree};
