//! Error types for the Flux API client.
//!
//! # Design
//! Failures come in tiers. `TransportError` covers everything that went
//! wrong before a well-formed envelope was available: connectivity,
//! timeouts, bodies that are not a JSON object. `ApiError` is the server
//! saying no, with its numeric code and optional meta string. Call sites
//! that document specific codes promote them into their own enums
//! (`RegisterError`, `VerifyError`, ...) whose named variants carry no code;
//! every other code passes through untouched in the `Other` variant.
//!
//! Version parsing failures (`UnknownVersionError`) are not a `FluxError`
//! variant: they mean the client's catalog is older or newer than the
//! website, not that a request failed.

use std::fmt;

use thiserror::Error;

use crate::user::UserKey;

macro_rules! error_codes {
    ($($variant:ident = $code:literal => $name:literal,)+) => {
        /// Every code the website assigns a meaning to.
        ///
        /// The code space is sparse: some integers are reserved and never
        /// map to a variant.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ErrorCode {
            $($variant,)+
        }

        impl ErrorCode {
            pub const ALL: &'static [ErrorCode] = &[$(ErrorCode::$variant,)+];

            /// The integer sent in the `error` field.
            pub const fn code(self) -> i64 {
                match self {
                    $(ErrorCode::$variant => $code,)+
                }
            }

            /// Look up the meaning of a raw code. Reserved and unknown codes
            /// return `None`.
            pub const fn from_code(code: i64) -> Option<Self> {
                match code {
                    $($code => Some(ErrorCode::$variant),)+
                    _ => None,
                }
            }

            pub const fn as_str(self) -> &'static str {
                match self {
                    $(ErrorCode::$variant => $name,)+
                }
            }
        }
    };
}

error_codes! {
    UnknownError = 0 => "UNKNOWN_ERROR",
    InvalidApiKey = 1 => "INVALID_API_KEY",
    InvalidApiMethod = 3 => "INVALID_API_METHOD",
    NoUniqueSiteIdAvailable = 4 => "NO_UNIQUE_SITE_ID_AVAILABLE",
    InvalidGetPostContents = 6 => "INVALID_GET_POST_CONTENTS",
    InvalidEmailAddress = 7 => "INVALID_EMAIL_ADDRESS",
    InvalidUsername = 8 => "INVALID_USERNAME",
    InvalidUuid = 9 => "INVALID_UUID",
    EmailAlreadyExists = 10 => "EMAIL_ALREADY_EXISTS",
    UsernameAlreadyExists = 11 => "USERNAME_ALREADY_EXISTS",
    UuidAlreadyExists = 12 => "UUID_ALREADY_EXISTS",
    UnableToCreateAccount = 13 => "UNABLE_TO_CREATE_ACCOUNT",
    UnableToSendRegistrationEmail = 14 => "UNABLE_TO_SEND_REGISTRATION_EMAIL",
    UnableToFindUser = 16 => "UNABLE_TO_FIND_USER",
    UnableToFindGroup = 17 => "UNABLE_TO_FIND_GROUP",
    ReportContentTooLarge = 19 => "REPORT_CONTENT_TOO_LARGE",
    UserCreatingReportBanned = 21 => "USER_CREATING_REPORT_BANNED",
    UserAlreadyHasOpenReport = 22 => "USER_ALREADY_HAS_OPEN_REPORT",
    UnableToUpdateUsername = 24 => "UNABLE_TO_UPDATE_USERNAME",
    UnableToUpdateServerInfo = 25 => "UNABLE_TO_UPDATE_SERVER_INFO",
    CannotReportYourself = 26 => "CANNOT_REPORT_YOURSELF",
    InvalidServerId = 27 => "INVALID_SERVER_ID",
    InvalidValidateCode = 28 => "INVALID_VALIDATE_CODE",
    UnableToSetUserDiscordId = 29 => "UNABLE_TO_SET_USER_DISCORD_ID",
    UnableToSetDiscordBotUrl = 30 => "UNABLE_TO_SET_DISCORD_BOT_URL",
    AccountAlreadyActivated = 32 => "ACCOUNT_ALREADY_ACTIVATED",
    UnableToSetDiscordGuildId = 33 => "UNABLE_TO_SET_DISCORD_GUILD_ID",
    DiscordIntegrationDisabled = 34 => "DISCORD_INTEGRATION_DISABLED",
    RequestNotAuthorized = 36 => "REQUEST_NOT_AUTHORIZED",
    InvalidIntegration = 37 => "INVALID_INTEGRATION",
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error envelope returned by the website: `{"error": <code>, "meta": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
#[error("API error code {code} ({}) with {}", kind_label(.code), meta_label(.meta))]
pub struct ApiError {
    code: i64,
    meta: Option<String>,
}

impl ApiError {
    pub fn new(code: i64, meta: Option<String>) -> Self {
        Self { code, meta }
    }

    pub fn code(&self) -> i64 {
        self.code
    }

    pub fn meta(&self) -> Option<&str> {
        self.meta.as_deref()
    }

    /// The semantic meaning of the code, if it is an assigned one.
    pub fn kind(&self) -> Option<ErrorCode> {
        ErrorCode::from_code(self.code)
    }
}

fn kind_label(code: &i64) -> &'static str {
    ErrorCode::from_code(*code).map_or("unassigned", ErrorCode::as_str)
}

fn meta_label(meta: &Option<String>) -> String {
    match meta {
        Some(meta) => format!("meta {meta}"),
        None => "no meta".to_string(),
    }
}

/// Failures below the application layer. The underlying cause is always
/// reachable through `source()`.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request URL could not be assembled.
    #[error("invalid request URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("request timed out")]
    Timeout(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Connection refused, DNS failure, TLS failure, broken body stream.
    #[error("request failed: {0}")]
    Request(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("HTTP {status}: response body is not valid JSON")]
    InvalidBody {
        status: u16,
        #[source]
        source: serde_json::Error,
    },

    #[error("HTTP {status}: response body is JSON but not an object")]
    NotAnObject { status: u16 },

    /// The envelope has an `error` field that is not an integer code.
    #[error("HTTP {status}: error field is not an integer: {value}")]
    MalformedError {
        status: u16,
        value: serde_json::Value,
    },
}

/// The error returned by every generic client operation.
#[derive(Debug, Error)]
pub enum FluxError {
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Api(#[from] ApiError),

    /// A success envelope whose fields do not have the expected shape.
    #[error("unexpected response shape: {0}")]
    Decode(#[source] serde_json::Error),

    /// An attribute was read from a user the website does not know.
    #[error("user {0} does not exist")]
    UserNotFound(UserKey),

    #[error(transparent)]
    InvalidUserKey(#[from] InvalidUserKey),
}

impl FluxError {
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            FluxError::Api(err) => Some(err),
            _ => None,
        }
    }

    /// The semantic kind of an application error, `None` for every other
    /// failure and for unassigned codes.
    pub fn kind(&self) -> Option<ErrorCode> {
        self.api_error().and_then(ApiError::kind)
    }
}

/// Failures of [`FluxApi::register_user`](crate::FluxApi::register_user).
#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("username is not valid")]
    InvalidUsername,

    #[error("username already exists")]
    UsernameAlreadyExists,

    #[error("a user with this UUID already exists")]
    UuidAlreadyExists,

    #[error("the website could not send the registration email")]
    CannotSendEmail,

    #[error(transparent)]
    Other(FluxError),
}

impl From<FluxError> for RegisterError {
    fn from(err: FluxError) -> Self {
        match err.kind() {
            Some(ErrorCode::InvalidUsername) => RegisterError::InvalidUsername,
            Some(ErrorCode::UsernameAlreadyExists) => RegisterError::UsernameAlreadyExists,
            Some(ErrorCode::UuidAlreadyExists) => RegisterError::UuidAlreadyExists,
            Some(ErrorCode::UnableToSendRegistrationEmail) => RegisterError::CannotSendEmail,
            _ => RegisterError::Other(err),
        }
    }
}

/// Failures of integration verification (Minecraft, Discord).
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("verification code is not valid")]
    InvalidValidateCode,

    #[error(transparent)]
    Other(FluxError),
}

impl From<FluxError> for VerifyError {
    fn from(err: FluxError) -> Self {
        match err.kind() {
            Some(ErrorCode::InvalidValidateCode) => VerifyError::InvalidValidateCode,
            _ => VerifyError::Other(err),
        }
    }
}

/// Failures of [`FluxUser::create_report`](crate::FluxUser::create_report).
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("the reporting user is banned")]
    ReporterBanned,

    #[error("the reporting user already has an open report for this user")]
    AlreadyHasOpenReport,

    #[error("users cannot report themselves")]
    CannotReportSelf,

    #[error(transparent)]
    Other(FluxError),
}

impl From<FluxError> for ReportError {
    fn from(err: FluxError) -> Self {
        match err.kind() {
            Some(ErrorCode::UserCreatingReportBanned) => ReportError::ReporterBanned,
            Some(ErrorCode::UserAlreadyHasOpenReport) => ReportError::AlreadyHasOpenReport,
            Some(ErrorCode::CannotReportYourself) => ReportError::CannotReportSelf,
            _ => ReportError::Other(err),
        }
    }
}

/// Failures of [`FluxUser::activate`](crate::FluxUser::activate).
#[derive(Debug, Error)]
pub enum ActivateError {
    #[error("account is already activated")]
    AccountAlreadyActivated,

    #[error(transparent)]
    Other(FluxError),
}

impl From<FluxError> for ActivateError {
    fn from(err: FluxError) -> Self {
        match err.kind() {
            Some(ErrorCode::AccountAlreadyActivated) => ActivateError::AccountAlreadyActivated,
            _ => ActivateError::Other(err),
        }
    }
}

/// The website reported a version this client has no catalog entry for.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot parse version string '{version}'; try updating the API client or the software using it")]
pub struct UnknownVersionError {
    pub version: String,
}

/// Rejected construction of a [`UserKey`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidUserKey {
    #[error("a user key needs exactly one identifier, got none")]
    Missing,

    #[error("a user key needs exactly one identifier, got {0}")]
    Conflicting(usize),

    #[error("username must not be empty")]
    EmptyUsername,

    #[error("Discord id must be positive")]
    ZeroDiscordId,
}

/// Invalid client configuration, reported by
/// [`FluxApiBuilder::build`](crate::FluxApiBuilder::build).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("API URL must use http or https, got {0}")]
    UnsupportedScheme(String),

    #[error("API key must not be empty")]
    EmptyApiKey,

    #[error("API key must be a single path segment")]
    ApiKeyHasSlash,

    #[error("timeout must be greater than zero")]
    ZeroTimeout,

    #[error("missing environment variable {0}")]
    MissingVar(&'static str),

    #[error("environment variable {name} has an invalid value: {value}")]
    InvalidVar { name: &'static str, value: String },
}
