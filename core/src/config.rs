//! Client configuration.
//!
//! # Design
//! `FluxApiBuilder` is the one way to construct a client. `ClientConfig` is
//! a serde-friendly mirror of the builder's plain settings so applications
//! can embed it in their own configuration files, or read it from the
//! environment with [`ClientConfig::from_env`]. Everything is validated in
//! [`FluxApiBuilder::build`]; the resulting client is immutable.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::client::FluxApi;
use crate::error::ConfigError;
use crate::http::{Transport, UreqTransport};
use crate::logger::{ApiLogger, LogApiLogger, StderrApiLogger};
use crate::request::RequestHandler;

pub const DEFAULT_USER_AGENT: &str = "Flux-Rust-API";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Plain client settings.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    pub api_url: String,
    pub api_key: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Log requests and responses through the `log` crate.
    #[serde(default)]
    pub debug: bool,
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            debug: false,
        }
    }

    /// Read `FLUX_API_URL`, `FLUX_API_KEY` and the optional
    /// `FLUX_USER_AGENT`, `FLUX_TIMEOUT_MS`, `FLUX_DEBUG`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::MissingVar(name));

        let mut config = Self::new(required("FLUX_API_URL")?, required("FLUX_API_KEY")?);
        if let Some(user_agent) = lookup("FLUX_USER_AGENT") {
            config.user_agent = user_agent;
        }
        if let Some(timeout) = lookup("FLUX_TIMEOUT_MS") {
            config.timeout_ms = timeout.parse().map_err(|_| ConfigError::InvalidVar {
                name: "FLUX_TIMEOUT_MS",
                value: timeout.clone(),
            })?;
        }
        if let Some(debug) = lookup("FLUX_DEBUG") {
            config.debug = match debug.as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" | "" => false,
                _ => {
                    return Err(ConfigError::InvalidVar {
                        name: "FLUX_DEBUG",
                        value: debug,
                    })
                }
            };
        }
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .field("timeout_ms", &self.timeout_ms)
            .field("debug", &self.debug)
            .finish()
    }
}

/// Builds a [`FluxApi`].
///
/// ```no_run
/// use std::time::Duration;
///
/// let api = flux_core::FluxApi::builder("https://example.com/index.php?route=/api/v2", "key")
///     .user_agent("my-plugin/1.0")
///     .timeout(Duration::from_secs(10))
///     .with_log_debug_logging()
///     .build()
///     .unwrap();
/// let website = api.website().unwrap();
/// println!("running {}", website.version);
/// ```
#[must_use]
pub struct FluxApiBuilder {
    api_url: String,
    api_key: String,
    user_agent: String,
    timeout: Duration,
    logger: Option<Arc<dyn ApiLogger>>,
    transport: Option<Box<dyn Transport>>,
}

impl FluxApiBuilder {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            logger: None,
            transport: None,
        }
    }

    pub fn from_config(config: ClientConfig) -> Self {
        let timeout = config.timeout();
        let builder = Self::new(config.api_url, config.api_key)
            .user_agent(config.user_agent)
            .timeout(timeout);
        if config.debug {
            builder.with_log_debug_logging()
        } else {
            builder
        }
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Applies to every request made by the client. Ignored when a custom
    /// transport is set.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `true` logs to standard error, `false` turns debug logging off.
    pub fn debug(self, debug: bool) -> Self {
        if debug {
            self.with_stderr_debug_logging()
        } else {
            self.with_custom_debug_logger(None)
        }
    }

    pub fn with_stderr_debug_logging(self) -> Self {
        self.with_custom_debug_logger(Some(Arc::new(StderrApiLogger)))
    }

    pub fn with_log_debug_logging(self) -> Self {
        self.with_custom_debug_logger(Some(Arc::new(LogApiLogger)))
    }

    pub fn with_custom_debug_logger(mut self, logger: Option<Arc<dyn ApiLogger>>) -> Self {
        self.logger = logger;
        self
    }

    /// Replace the default `ureq` transport.
    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    pub fn build(self) -> Result<FluxApi, ConfigError> {
        let api_url = Url::parse(&self.api_url)?;
        if !matches!(api_url.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(api_url.scheme().to_string()));
        }
        if self.api_key.is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }
        if self.api_key.contains('/') {
            return Err(ConfigError::ApiKeyHasSlash);
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }

        let timeout = self.timeout;
        let transport = self
            .transport
            .unwrap_or_else(|| Box::new(UreqTransport::new(timeout)) as Box<dyn Transport>);
        let requests =
            RequestHandler::new(api_url, self.api_key, self.user_agent, transport, self.logger);
        Ok(FluxApi::new(Arc::new(requests)))
    }
}

impl fmt::Debug for FluxApiBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FluxApiBuilder")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .field("timeout", &self.timeout)
            .field("debug_logging", &self.logger.is_some())
            .field("custom_transport", &self.transport.is_some())
            .finish()
    }
}
