//! Verify request building and envelope discrimination against the JSON test
//! vectors stored in `test-vectors/`.
//!
//! Comparing parsed JSON (not raw strings) avoids false negatives from
//! field-ordering differences.

use flux_core::request::{parse_envelope, RequestHandler};
use flux_core::{FluxError, HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};
use serde_json::Value;
use url::Url;

/// Request building never reaches the transport.
struct Unreachable;

impl Transport for Unreachable {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        panic!("unexpected request to {}", request.url);
    }
}

fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        other => panic!("unknown method: {other}"),
    }
}

#[test]
fn request_test_vectors() {
    let raw = include_str!("../../test-vectors/requests.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let api_url = Url::parse(vectors["api_url"].as_str().unwrap()).unwrap();
    let api_key = vectors["api_key"].as_str().unwrap();
    let handler = RequestHandler::new(api_url, api_key, "Flux-Rust-API", Box::new(Unreachable), None);

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let path = case["path"].as_str().unwrap();
        let method = parse_method(case["method"].as_str().unwrap());

        let req = match method {
            HttpMethod::Get => {
                let query: Vec<(&str, &str)> = case["query"]
                    .as_array()
                    .unwrap()
                    .iter()
                    .map(|pair| (pair[0].as_str().unwrap(), pair[1].as_str().unwrap()))
                    .collect();
                handler.build_get(path, &query).unwrap()
            }
            HttpMethod::Post => handler.build_post(path, &case["body"]).unwrap(),
        };

        assert_eq!(req.method, method, "{name}: method");
        assert_eq!(req.url, case["expected_url"].as_str().unwrap(), "{name}: url");
        assert_eq!(req.header("user-agent"), Some("Flux-Rust-API"), "{name}: user agent");
        assert!(!req.headers.iter().any(|(_, v)| v.contains(api_key)), "{name}: key in headers");

        if method == HttpMethod::Post {
            let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
            assert_eq!(body, case["body"], "{name}: body");
            assert_eq!(req.header("content-type"), Some("application/json"), "{name}: content type");
        } else {
            assert!(req.body.is_none(), "{name}: GET has no body");
        }
    }
}

#[test]
fn envelope_test_vectors() {
    let raw = include_str!("../../test-vectors/envelope.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let status = case["response"]["status"].as_u64().unwrap() as u16;
        let body = case["response"]["body"].as_str().unwrap();
        let expected = &case["expected"];

        let result = parse_envelope(HttpResponse::new(status, body));

        if let Some(ok) = expected.get("ok") {
            let envelope = result.unwrap_or_else(|err| panic!("{name}: unexpected error {err}"));
            assert_eq!(Value::Object(envelope), *ok, "{name}: envelope");
        } else if let Some(api) = expected.get("api_error") {
            let err = match result {
                Err(FluxError::Api(err)) => err,
                other => panic!("{name}: expected an API error, got {other:?}"),
            };
            assert_eq!(err.code(), api["code"].as_i64().unwrap(), "{name}: code");
            assert_eq!(err.meta(), api["meta"].as_str(), "{name}: meta");
            assert_eq!(err.kind().map(|kind| kind.as_str()), api["kind"].as_str(), "{name}: kind");
        } else {
            let kind = expected["transport"].as_str().unwrap();
            let err = match result {
                Err(FluxError::Transport(err)) => err,
                other => panic!("{name}: expected a transport error, got {other:?}"),
            };
            let matched = match kind {
                "invalid_body" => matches!(err, TransportError::InvalidBody { status: s, .. } if s == status),
                "not_an_object" => matches!(err, TransportError::NotAnObject { status: s } if s == status),
                "malformed_error" => matches!(err, TransportError::MalformedError { status: s, .. } if s == status),
                other => panic!("{name}: unknown transport kind {other}"),
            };
            assert!(matched, "{name}: expected {kind}, got {err:?}");
        }
    }
}
