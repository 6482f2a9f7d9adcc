//! # Generic Invocation Engine
//!
//! Orchestrates one unary call from request text to an [`InvocationOutcome`]:
//!
//! 1. The request text is parsed against the method's input descriptor. A failure stops the
//!    call before the transport is touched.
//! 2. The request is encoded to wire bytes and sent to `/<service full name>/<method name>`.
//! 3. The response bytes are decoded against the output descriptor and rendered as text.
//!
//! Streaming methods are rejected up front with a [`InvocationOutcome::RequestParseFailure`].
//!
//! The engine holds nothing between calls except its transport, so one engine may serve any
//! number of unrelated methods in sequence.
use crate::{
    grpc::{GrpcTransport, Transport, TransportError, code_name},
    message::{self, MessageError},
};
use prost_reflect::MethodDescriptor;
use tonic::Code;

/// The result of one invocation. Exactly one variant is produced per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationOutcome {
    /// The response message rendered as JSON text.
    Success(String),
    /// The request could not be built. Nothing was sent.
    RequestParseFailure(String),
    /// The transport or the peer reported a failure.
    TransportFailure(TransportError),
}

impl InvocationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, InvocationOutcome::Success(_))
    }

    /// Text shown to the operator: the response itself, or one of the error envelopes
    /// `{"request_parse_error": ...}` and `{"grpc_error": {...}}`.
    ///
    /// `details_bin` is the status details decoded as UTF-8 with invalid sequences replaced by
    /// U+FFFD, so binary details are lossy there. `details_length` is always the raw byte count.
    pub fn to_text(&self) -> String {
        match self {
            InvocationOutcome::Success(text) => text.clone(),
            InvocationOutcome::RequestParseFailure(detail) => {
                pretty(serde_json::json!({ "request_parse_error": detail }))
            }
            InvocationOutcome::TransportFailure(err) => pretty(serde_json::json!({
                "grpc_error": {
                    "code": code_name(err.code),
                    "message": err.message,
                    "details_length": err.details.len(),
                    "details_bin": String::from_utf8_lossy(&err.details),
                }
            })),
        }
    }
}

fn pretty(value: serde_json::Value) -> String {
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
}

#[derive(Debug)]
pub struct InvocationEngine<T = GrpcTransport> {
    transport: T,
}

impl InvocationEngine<GrpcTransport> {
    /// An engine backed by a plaintext gRPC transport.
    pub fn grpc() -> std::io::Result<Self> {
        Ok(Self::new(GrpcTransport::new()?))
    }
}

impl<T: Transport> InvocationEngine<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Performs one blocking unary call of `method` at `address` with `request_text` as body.
    pub fn invoke(
        &mut self,
        method: &MethodDescriptor,
        request_text: &str,
        address: &str,
    ) -> InvocationOutcome {
        if let Some(shape) = streaming_shape(method) {
            tracing::warn!(method = method.full_name(), shape, "rejected streaming method");
            return InvocationOutcome::RequestParseFailure(format!(
                "unsupported call shape: '{}' is a {shape} method, only unary calls are supported",
                method.full_name()
            ));
        }

        let request = match message::from_text(method.input(), request_text) {
            Ok(request) => request,
            Err(err) => {
                tracing::warn!(method = method.full_name(), error = %err, "invalid request text");
                return InvocationOutcome::RequestParseFailure(err.to_string());
            }
        };

        let path = method_path(method);
        tracing::info!(%path, address, "invoking");

        let response = match self
            .transport
            .unary(address, &path, message::to_wire(&request))
        {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(%path, address, error = %err, "call failed");
                return InvocationOutcome::TransportFailure(err);
            }
        };

        match decode_response(method, &response) {
            Ok(text) => InvocationOutcome::Success(text),
            Err(err) => {
                tracing::warn!(%path, error = %err, "malformed response");
                InvocationOutcome::TransportFailure(TransportError::new(
                    Code::Internal,
                    format!("failed to decode response: {err}"),
                ))
            }
        }
    }
}

/// The zero-valued request of `method`, rendered as editable text.
pub fn request_template(method: &MethodDescriptor) -> Result<String, MessageError> {
    message::to_text(&message::instantiate(method.input()))
}

/// Endpoint path of `method`, e.g. `/pkg.Svc/Get`.
pub fn method_path(method: &MethodDescriptor) -> String {
    format!("/{}/{}", method.parent_service().full_name(), method.name())
}

fn streaming_shape(method: &MethodDescriptor) -> Option<&'static str> {
    match (method.is_client_streaming(), method.is_server_streaming()) {
        (false, false) => None,
        (true, false) => Some("client-streaming"),
        (false, true) => Some("server-streaming"),
        (true, true) => Some("bidirectional-streaming"),
    }
}

fn decode_response(method: &MethodDescriptor, bytes: &[u8]) -> Result<String, MessageError> {
    let response = message::from_wire(method.output(), bytes)?;
    message::to_text(&response)
}
