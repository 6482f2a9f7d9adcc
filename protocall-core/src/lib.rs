//! # Protocall Core
//!
//! `protocall-core` is the library behind the `protocall` CLI. It loads `.proto` service
//! definitions at runtime and calls their unary methods against any address, with no
//! generated code anywhere in the path.
//!
//! ## Key Components
//!
//! * **[`schema::load`]:** Parses a root file and every file it imports, then links them into
//!   a `prost_reflect::DescriptorPool`. All structural problems are reported together as
//!   [`schema::LoadErrors`].
//! * **[`schema::ServiceTree`]:** The services of the root file and their methods, addressed by
//!   [`schema::SelectionHandle`]s.
//! * **[`message`]:** Zero-valued instances plus JSON text and wire conversions for any
//!   message descriptor.
//! * **[`invoke::InvocationEngine`]:** Drives one blocking unary call from request text to an
//!   [`invoke::InvocationOutcome`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use protocall_core::{invoke::InvocationEngine, schema::{ImportPath, load}};
//!
//! # fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = load("protos/greeter.proto", &ImportPath::from_iter(["protos/include"]))?;
//! let tree = schema.service_tree();
//! let handle = tree.find_method("helloworld.Greeter", "SayHello").ok_or("no such method")?;
//! let method = tree.resolve_selection(handle).ok_or("not a method")?;
//!
//! let mut engine = InvocationEngine::grpc()?;
//! let outcome = engine.invoke(&method, r#"{"name": "world"}"#, "localhost:50051");
//! println!("{}", outcome.to_text());
//! # Ok(())
//! # }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports `prost`, `prost-reflect`, and `tonic` so consumers use versions
//! compatible with the descriptors and statuses it hands out.
pub mod grpc;
pub mod invoke;
pub mod message;
pub mod schema;

// Re-exports
pub use prost;
pub use prost_reflect;
pub use tonic;
