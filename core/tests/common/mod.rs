//! Shared helpers for the integration tests that do not need a server.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use flux_core::{FluxApi, HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};
use parking_lot::Mutex;
use serde_json::Value;

pub const API_URL: &str = "https://flux.example.com/api/v2";
pub const API_KEY: &str = "test-key";

enum Scripted {
    Reply(HttpResponse),
    Fail,
}

/// Replays queued responses in order and records every request it sees.
///
/// Clones share the same queue and log, so the test keeps a handle after
/// moving one into the client.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    replies: Arc<Mutex<VecDeque<Scripted>>>,
    seen: Arc<Mutex<Vec<HttpRequest>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, status: u16, body: impl Into<String>) -> &Self {
        self.replies
            .lock()
            .push_back(Scripted::Reply(HttpResponse::new(status, body)));
        self
    }

    pub fn reply_json(&self, body: Value) -> &Self {
        self.reply(200, body.to_string())
    }

    /// Queue a connection failure.
    pub fn fail(&self) -> &Self {
        self.replies.lock().push_back(Scripted::Fail);
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.seen.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.seen.lock().len()
    }

    /// The path after `{api_url}/{api_key}/`, without the query string.
    pub fn path(request: &HttpRequest) -> &str {
        let prefix_len = API_URL.len() + API_KEY.len() + 2;
        let rest = &request.url[prefix_len..];
        rest.split('?').next().unwrap_or(rest)
    }

    pub fn query(request: &HttpRequest) -> Vec<(String, String)> {
        let url = url::Url::parse(&request.url).unwrap();
        url.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    pub fn json_body(request: &HttpRequest) -> Value {
        assert_eq!(request.method, HttpMethod::Post);
        serde_json::from_str(request.body.as_deref().unwrap()).unwrap()
    }
}

impl Transport for ScriptedTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.seen.lock().push(request.clone());
        match self.replies.lock().pop_front() {
            Some(Scripted::Reply(response)) => Ok(response),
            Some(Scripted::Fail) => Err(TransportError::Request("connection refused".into())),
            None => panic!("unexpected request: {} {}", request.method, request.url),
        }
    }
}

pub fn api(transport: &ScriptedTransport) -> FluxApi {
    FluxApi::builder(API_URL, API_KEY)
        .with_transport(transport.clone())
        .build()
        .unwrap()
}
