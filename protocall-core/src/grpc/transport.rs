//! # Generic Unary Transport
//!
//! The invocation engine only needs one capability from the network: send bytes to a method
//! path at an address and get bytes (or a failure status) back. [`Transport`] captures exactly
//! that, and [`GrpcTransport`] implements it on top of a `tonic` channel.
//!
//! ## Blocking model
//!
//! [`GrpcTransport`] owns a current-thread tokio runtime and blocks the calling thread for the
//! whole round trip. There is no deadline: a peer that never answers blocks until the
//! connection itself fails. It must not be called from inside another tokio runtime; embedders
//! running one should move the call onto a blocking thread.
use super::codec::BytesCodec;
use bytes::Bytes;
use std::str::FromStr;
use tonic::{Code, transport::Endpoint};

/// A failed call: the gRPC status code, its message and any opaque detail payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}: {message}", code_label(.code))]
pub struct TransportError {
    pub code: Code,
    pub message: String,
    pub details: Bytes,
}

impl TransportError {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Bytes::new(),
        }
    }
}

impl From<tonic::Status> for TransportError {
    fn from(status: tonic::Status) -> Self {
        Self {
            code: status.code(),
            message: status.message().to_string(),
            details: Bytes::copy_from_slice(status.details()),
        }
    }
}

/// Capability to perform one unary call with pre-encoded bytes.
pub trait Transport {
    /// Sends `request` to `path` (`/package.Service/Method`) at `address` and waits for the reply.
    fn unary(&mut self, address: &str, path: &str, request: Bytes)
        -> Result<Bytes, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn unary(
        &mut self,
        address: &str,
        path: &str,
        request: Bytes,
    ) -> Result<Bytes, TransportError> {
        (**self).unary(address, path, request)
    }
}

/// Plaintext HTTP/2 gRPC transport. Every call opens its own connection.
#[derive(Debug)]
pub struct GrpcTransport {
    runtime: tokio::runtime::Runtime,
}

impl GrpcTransport {
    pub fn new() -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self { runtime })
    }
}

impl Transport for GrpcTransport {
    fn unary(
        &mut self,
        address: &str,
        path: &str,
        request: Bytes,
    ) -> Result<Bytes, TransportError> {
        self.runtime.block_on(unary_call(address, path, request))
    }
}

async fn unary_call(address: &str, path: &str, request: Bytes) -> Result<Bytes, TransportError> {
    let uri = endpoint_uri(address);

    let endpoint = Endpoint::from_shared(uri.clone()).map_err(|err| {
        TransportError::new(
            Code::InvalidArgument,
            format!("invalid address '{address}': {}", error_chain(&err)),
        )
    })?;

    let channel = endpoint.connect().await.map_err(|err| {
        TransportError::new(
            Code::Unavailable,
            format!("failed to connect to '{uri}': {}", error_chain(&err)),
        )
    })?;

    let path = http::uri::PathAndQuery::from_str(path).map_err(|err| {
        TransportError::new(Code::InvalidArgument, format!("invalid method path '{path}': {err}"))
    })?;

    let mut client = tonic::client::Grpc::new(channel);
    client.ready().await.map_err(|err| {
        TransportError::new(
            Code::Unavailable,
            format!("client was not ready: {}", error_chain(&err)),
        )
    })?;

    let response = client
        .unary(tonic::Request::new(request), path, BytesCodec)
        .await?;

    Ok(response.into_inner())
}

/// Bare `host:port` addresses are reached over plaintext HTTP/2.
fn endpoint_uri(address: &str) -> String {
    if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{address}")
    }
}

/// Joins an error with its sources; tonic's transport errors hide the useful part in them.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

fn code_label(code: &Code) -> String {
    format!("{} ({})", code_name(*code), *code as i32)
}

/// Canonical upper-case name of a status code, e.g. `UNAVAILABLE`.
pub fn code_name(code: Code) -> &'static str {
    match code {
        Code::Ok => "OK",
        Code::Cancelled => "CANCELLED",
        Code::Unknown => "UNKNOWN",
        Code::InvalidArgument => "INVALID_ARGUMENT",
        Code::DeadlineExceeded => "DEADLINE_EXCEEDED",
        Code::NotFound => "NOT_FOUND",
        Code::AlreadyExists => "ALREADY_EXISTS",
        Code::PermissionDenied => "PERMISSION_DENIED",
        Code::ResourceExhausted => "RESOURCE_EXHAUSTED",
        Code::FailedPrecondition => "FAILED_PRECONDITION",
        Code::Aborted => "ABORTED",
        Code::OutOfRange => "OUT_OF_RANGE",
        Code::Unimplemented => "UNIMPLEMENTED",
        Code::Internal => "INTERNAL",
        Code::Unavailable => "UNAVAILABLE",
        Code::DataLoss => "DATA_LOSS",
        Code::Unauthenticated => "UNAUTHENTICATED",
    }
}
