//! # Generic gRPC Transport
//!
//! Low-level building blocks for calling a method knowing nothing but its path.
//!
//! Unlike generated `tonic` clients, nothing here is typed by message: requests and responses
//! travel as already-encoded protobuf bytes, and the only per-method information is the
//! `/package.Service/Method` path.
pub mod codec;
pub mod transport;

pub use codec::BytesCodec;
pub use transport::{GrpcTransport, Transport, TransportError, code_name};
