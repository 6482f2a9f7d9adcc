use bytes::Bytes;
use protocall_core::{
    grpc::{GrpcTransport, Transport, TransportError},
    invoke::{InvocationEngine, InvocationOutcome, method_path, request_template},
    message,
    prost_reflect::MethodDescriptor,
    schema::{ImportPath, load},
    tonic::Code,
};
use std::path::{Path, PathBuf};


fn protos() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/protos")
}

fn method(proto: &str, service: &str, name: &str) -> MethodDescriptor {
    let schema = load(protos().join(proto), &ImportPath::new()).unwrap();
    let tree = schema.service_tree();
    let handle = tree.find_method(service, name).unwrap();
    tree.resolve_selection(handle).unwrap()
}

/// Records every call and answers with a canned reply.
#[derive(Debug, Default)]
struct RecordingTransport {
    calls: Vec<(String, String, Bytes)>,
    reply: Option<Result<Bytes, TransportError>>,
}

impl RecordingTransport {
    fn replying(reply: Result<Bytes, TransportError>) -> Self {
        Self {
            calls: Vec::new(),
            reply: Some(reply),
        }
    }
}

impl Transport for RecordingTransport {
    fn unary(
        &mut self,
        address: &str,
        path: &str,
        request: Bytes,
    ) -> Result<Bytes, TransportError> {
        self.calls.push((address.to_string(), path.to_string(), request));
        self.reply.clone().unwrap_or_else(|| Ok(Bytes::new()))
    }
}

fn json(text: &str) -> serde_json::Value {
    serde_json::from_str(text).unwrap()
}

#[test]
fn test_request_template_shows_every_field() {
    let get = method("greeter/svc.proto", "pkg.Svc", "Get");
    let template = request_template(&get).unwrap();

    assert_eq!(json(&template), serde_json::json!({ "id": 0, "name": "" }));
}

#[test]
fn test_method_path() {
    let get = method("greeter/svc.proto", "pkg.Svc", "Get");
    assert_eq!(method_path(&get), "/pkg.Svc/Get");
}

#[test]
fn test_invalid_request_never_reaches_the_transport() {
    let get = method("greeter/svc.proto", "pkg.Svc", "Get");
    let mut engine = InvocationEngine::new(RecordingTransport::default());

    let outcome = engine.invoke(&get, r#"{"id": "not-a-number"}"#, "localhost:50051");
    assert!(matches!(outcome, InvocationOutcome::RequestParseFailure(_)));

    let outcome = engine.invoke(&get, "{ not json", "localhost:50051");
    assert!(matches!(outcome, InvocationOutcome::RequestParseFailure(_)));

    assert!(engine.transport().calls.is_empty());
}

#[test]
fn test_streaming_methods_are_rejected_before_any_call() {
    let watch = method("greeter/svc.proto", "pkg.Svc", "Watch");
    let mut engine = InvocationEngine::new(RecordingTransport::default());

    let outcome = engine.invoke(&watch, "{}", "localhost:50051");

    match &outcome {
        InvocationOutcome::RequestParseFailure(detail) => {
            assert!(detail.contains("unsupported call shape"), "{detail}");
            assert!(detail.contains("server-streaming"), "{detail}");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(json(&outcome.to_text())["request_parse_error"].is_string());
    assert!(engine.transport().calls.is_empty());
}

#[test]
fn test_successful_call_round_trips_through_the_transport() {
    let get = method("greeter/svc.proto", "pkg.Svc", "Get");
    let response = message::from_text(
        get.output(),
        r#"{"id": 7, "status": "STATUS_ACTIVE", "labels": ["a"], "counters": {"hits": 2}}"#,
    )
    .unwrap();
    let mut engine =
        InvocationEngine::new(RecordingTransport::replying(Ok(message::to_wire(&response))));

    let outcome = engine.invoke(&get, r#"{"id": 7, "name": "widget"}"#, "localhost:50051");

    let InvocationOutcome::Success(text) = outcome else {
        panic!("unexpected outcome: {outcome:?}");
    };
    assert_eq!(
        json(&text),
        serde_json::json!({
            "id": 7,
            "status": "STATUS_ACTIVE",
            "labels": ["a"],
            "counters": { "hits": 2 },
        })
    );

    let calls = &engine.transport().calls;
    assert_eq!(calls.len(), 1);
    let (address, path, request) = &calls[0];
    assert_eq!(address, "localhost:50051");
    assert_eq!(path, "/pkg.Svc/Get");

    let sent = message::from_wire(get.input(), request).unwrap();
    let expected = message::from_text(get.input(), r#"{"id": 7, "name": "widget"}"#).unwrap();
    assert_eq!(sent, expected);
}

#[test]
fn test_transport_failure_is_reported_with_its_status() {
    let get = method("greeter/svc.proto", "pkg.Svc", "Get");
    let failure = TransportError::new(Code::Unavailable, "connection refused");
    let mut engine = InvocationEngine::new(RecordingTransport::replying(Err(failure.clone())));

    let outcome = engine.invoke(&get, "{}", "localhost:1");

    assert_eq!(outcome, InvocationOutcome::TransportFailure(failure));
    assert_eq!(
        json(&outcome.to_text()),
        serde_json::json!({
            "grpc_error": {
                "code": "UNAVAILABLE",
                "message": "connection refused",
                "details_length": 0,
                "details_bin": "",
            }
        })
    );
    assert_eq!(engine.transport().calls.len(), 1);
}

#[test]
fn test_malformed_response_is_an_internal_failure() {
    let get = method("greeter/svc.proto", "pkg.Svc", "Get");
    let garbage = Bytes::from_static(&[0x0a, 0x05, 0x01]);
    let mut engine = InvocationEngine::new(RecordingTransport::replying(Ok(garbage)));

    let outcome = engine.invoke(&get, "{}", "localhost:50051");

    match outcome {
        InvocationOutcome::TransportFailure(err) => assert_eq!(err.code, Code::Internal),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn test_engine_is_reusable_across_methods() {
    let get = method("greeter/svc.proto", "pkg.Svc", "Get");
    let reset = method("greeter/svc.proto", "pkg.Admin", "Reset");
    let mut engine = InvocationEngine::new(RecordingTransport::default());

    assert!(engine.invoke(&get, "{}", "localhost:50051").is_success());
    assert_eq!(
        engine.invoke(&reset, "{}", "localhost:50051"),
        InvocationOutcome::Success("{}".to_string())
    );

    let paths: Vec<_> = engine
        .into_transport()
        .calls
        .into_iter()
        .map(|(_, path, _)| path)
        .collect();
    assert_eq!(paths, ["/pkg.Svc/Get", "/pkg.Admin/Reset"]);
}

#[test]
fn test_unary_call_against_a_live_server() {
    let addr = raw_echo_server::spawn();
    let echo = method("echo/echo.proto", "echo.Echo", "Echo");
    let mut engine = InvocationEngine::new(GrpcTransport::new().unwrap());

    let outcome = engine.invoke(&echo, r#"{"message": "hello", "count": 3}"#, &addr.to_string());

    let InvocationOutcome::Success(text) = outcome else {
        panic!("unexpected outcome: {outcome:?}");
    };
    assert_eq!(
        json(&text),
        serde_json::json!({ "message": "hello", "count": 3 })
    );
}

#[test]
fn test_status_from_a_live_server_keeps_its_details() {
    let addr = raw_echo_server::spawn();
    let fail = method("echo/echo.proto", "echo.Echo", "Fail");
    let mut engine = InvocationEngine::grpc().unwrap();

    let outcome = engine.invoke(&fail, "{}", &format!("http://{addr}"));

    let InvocationOutcome::TransportFailure(err) = &outcome else {
        panic!("unexpected outcome: {outcome:?}");
    };
    assert_eq!(err.code, Code::FailedPrecondition);
    assert_eq!(err.message, "echo refused");
    assert_eq!(err.details.as_ref(), raw_echo_server::FAIL_DETAILS);

    let envelope = json(&outcome.to_text());
    assert_eq!(envelope["grpc_error"]["code"], "FAILED_PRECONDITION");
    assert_eq!(envelope["grpc_error"]["details_length"], 6);
    assert_eq!(envelope["grpc_error"]["details_bin"], "detail");
}

#[test]
fn test_unknown_method_on_a_live_server_is_unimplemented() {
    let addr = raw_echo_server::spawn();
    let get = method("greeter/svc.proto", "pkg.Svc", "Get");
    let mut engine = InvocationEngine::grpc().unwrap();

    match engine.invoke(&get, "{}", &addr.to_string()) {
        InvocationOutcome::TransportFailure(err) => assert_eq!(err.code, Code::Unimplemented),
        other => panic!("unexpected outcome: {other:?}"),
    }
}
