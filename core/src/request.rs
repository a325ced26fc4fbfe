//! Authenticated request dispatch and envelope discrimination.
//!
//! # Design
//! `RequestHandler` is immutable after construction and shared behind an
//! `Arc` by the facade, lazy users and the query builder. Each call is split
//! into `build_get` / `build_post` (produces an `HttpRequest`) and
//! `parse_envelope` (consumes an `HttpResponse`); `get` and `post` glue the
//! two together around one `Transport::execute`.
//!
//! The website authenticates by API key as a path segment:
//! `{api_url}/{api_key}/{path}`. The key is percent-encoded so it stays one
//! segment. It never appears in a header, in the query string, or in debug
//! log lines.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::error::{ApiError, FluxError, TransportError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};
use crate::logger::ApiLogger;

/// A success envelope: the top-level JSON object, returned verbatim.
pub type Envelope = serde_json::Map<String, Value>;

/// Builds, sends and interprets every request made by the client.
pub struct RequestHandler {
    api_url: Url,
    api_key: String,
    user_agent: String,
    transport: Box<dyn Transport>,
    logger: Option<Arc<dyn ApiLogger>>,
}

impl RequestHandler {
    pub fn new(
        api_url: Url,
        api_key: impl Into<String>,
        user_agent: impl Into<String>,
        transport: Box<dyn Transport>,
        logger: Option<Arc<dyn ApiLogger>>,
    ) -> Self {
        Self {
            api_url,
            api_key: api_key.into(),
            user_agent: user_agent.into(),
            transport,
            logger,
        }
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Build a GET request for `path` with `query` appended as a form-encoded
    /// query string.
    pub fn build_get(&self, path: &str, query: &[(&str, &str)]) -> Result<HttpRequest, FluxError> {
        let mut url = self.endpoint(path)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(HttpRequest {
            method: HttpMethod::Get,
            url: url.into(),
            headers: self.common_headers(),
            body: None,
        })
    }

    /// Build a POST request carrying `body` as JSON.
    pub fn build_post(&self, path: &str, body: &Value) -> Result<HttpRequest, FluxError> {
        let url = self.endpoint(path)?;
        let mut headers = self.common_headers();
        headers.push(("content-type".to_string(), "application/json".to_string()));
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: url.into(),
            headers,
            body: Some(body.to_string()),
        })
    }

    pub fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Envelope, FluxError> {
        let request = self.build_get(path, query)?;
        self.dispatch(&request, path)
    }

    pub fn post(&self, path: &str, body: &Value) -> Result<Envelope, FluxError> {
        let request = self.build_post(path, body)?;
        self.dispatch(&request, path)
    }

    fn dispatch(&self, request: &HttpRequest, path: &str) -> Result<Envelope, FluxError> {
        self.debug(|| match &request.body {
            Some(body) => format!("{} {path} {body}", request.method),
            None => format!("{} {path}", request.method),
        });
        let response = self.transport.execute(request)?;
        self.debug(|| format!("HTTP {} {path}: {}", response.status, response.body));
        parse_envelope(response)
    }

    fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        let base = self.api_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        let key = urlencoding::encode(&self.api_key);
        Ok(Url::parse(&format!("{base}/{key}/{path}"))?)
    }

    fn common_headers(&self) -> Vec<(String, String)> {
        vec![
            ("user-agent".to_string(), self.user_agent.clone()),
            ("accept".to_string(), "application/json".to_string()),
        ]
    }

    fn debug(&self, message: impl FnOnce() -> String) {
        if let Some(logger) = &self.logger {
            logger.log(&message());
        }
    }
}

impl fmt::Debug for RequestHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHandler")
            .field("api_url", &self.api_url.as_str())
            .field("api_key", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .field("debug_logging", &self.logger.is_some())
            .finish_non_exhaustive()
    }
}

/// Discriminate a response into a success envelope or a failure.
///
/// The body must be a JSON object whatever the status code; anything else
/// is a transport failure and the `error` field is never consulted. An
/// object with an `error` field is an [`ApiError`].
pub fn parse_envelope(response: HttpResponse) -> Result<Envelope, FluxError> {
    let status = response.status;
    let value: Value = serde_json::from_str(&response.body)
        .map_err(|source| TransportError::InvalidBody { status, source })?;
    let Value::Object(mut envelope) = value else {
        return Err(TransportError::NotAnObject { status }.into());
    };

    let Some(error) = envelope.remove("error") else {
        return Ok(envelope);
    };
    let Some(code) = error.as_i64() else {
        return Err(TransportError::MalformedError { status, value: error }.into());
    };
    let meta = match envelope.remove("meta") {
        None | Some(Value::Null) => None,
        Some(Value::String(meta)) => Some(meta),
        Some(other) => Some(other.to_string()),
    };
    Err(ApiError::new(code, meta).into())
}

/// Decode a whole envelope into `T`.
pub(crate) fn decode<T: DeserializeOwned>(envelope: Envelope) -> Result<T, FluxError> {
    serde_json::from_value(Value::Object(envelope)).map_err(FluxError::Decode)
}

/// Take `field` out of an envelope and decode it into `T`.
pub(crate) fn decode_field<T: DeserializeOwned>(
    envelope: &mut Envelope,
    field: &'static str,
) -> Result<T, FluxError> {
    let value = envelope
        .remove(field)
        .ok_or_else(|| <serde_json::Error as serde::de::Error>::missing_field(field))
        .map_err(FluxError::Decode)?;
    serde_json::from_value(value).map_err(FluxError::Decode)
}
