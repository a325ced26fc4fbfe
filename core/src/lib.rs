//! Synchronous client core for the Flux Networks website API.
//!
//! # Overview
//! Every operation goes through a single `RequestHandler`: it puts the API
//! key in the URL path, sends the request through a pluggable `Transport`
//! and turns the response into either a success envelope or a typed error.
//! On top of it sit lazily resolved users, the filtered user list builder,
//! the websend module and the `FluxApi` facade.
//!
//! # Design
//! - Requests and responses are plain owned data (`HttpRequest`,
//!   `HttpResponse`), so the network round-trip can be swapped out in tests.
//! - Errors come in tiers: `TransportError` (no usable response),
//!   `ApiError` (the website returned an error code) and per-operation
//!   enums such as `RegisterError` that name the codes an operation
//!   documents.
//! - The client is immutable after `FluxApiBuilder::build` and can be shared
//!   between threads.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod error;
pub mod filter;
pub mod http;
pub mod logger;
pub mod request;
pub mod types;
pub mod user;
pub mod version;
pub mod websend;

pub use client::FluxApi;
pub use config::{ClientConfig, FluxApiBuilder};
pub use error::{
    ActivateError, ApiError, ConfigError, ErrorCode, FluxError, InvalidUserKey, RegisterError,
    ReportError, TransportError, UnknownVersionError, VerifyError,
};
pub use filter::{FilteredUserListBuilder, UserFilter};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use logger::ApiLogger;
pub use types::{Announcement, CustomProfileField, Group, UserInfo, Website};
pub use user::{FluxUser, UserKey};
pub use version::FluxVersion;
