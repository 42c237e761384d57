//! Shared infrastructure for JSON HTTP services.
//!
//! This crate provides the plumbing every handler needs:
//!
//! - [`read_json`] / [`StrictJson`]: strict, size-bounded JSON body decoding
//!   with a classified [`Error`]
//! - [`Decodable`] and [`decodable!`]: the declared JSON shape of a decode
//!   destination
//! - [`write_json`], [`Envelope`] and [`ApiError`]: JSON responses
//! - [`Logger`]: leveled JSON-lines logging to a shared sink
//! - [`middleware`]: per-request logging
//! - [`context_set`] / [`context_get`]: typed request-scoped values
//! - [`extract_bearer_token`]: `Authorization: Bearer` parsing
//! - [`logging`]: logger and diagnostics configuration
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use axum::{http::StatusCode, routing::post, Router};
//! use serde::Deserialize;
//! use servekit::{decodable, Envelope, Level, Logger, RequestLogLayer, StrictJson};
//!
//! #[derive(Deserialize)]
//! struct Login {
//!     email: String,
//!     password: String,
//! }
//!
//! decodable!(Login { "email": String, "password": String });
//!
//! async fn login(StrictJson(login): StrictJson<Login>) -> (StatusCode, Envelope) {
//!     let _ = login.password;
//!     (StatusCode::CREATED, Envelope::new().with("email", login.email))
//! }
//!
//! let logger = Arc::new(Logger::stdout(Level::Info));
//! let app: Router = Router::new()
//!     .route("/v1/tokens", post(login))
//!     .layer(RequestLogLayer::new(logger));
//! ```
//!
//! # Testing Support
//!
//! The [`test_utils`] module provides in-memory log sinks. Enable the
//! `test-utils` feature to access it from dependent crates.

#![deny(warnings)]

mod context;
mod decode;
mod error;
mod extract;
pub mod logger;
pub mod logging;
pub mod middleware;
mod response;
mod shape;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use context::{context_get, context_set, context_try_get, extract_bearer_token, ContextKey};
pub use decode::{read_json, read_json_body, read_json_with_default_limit, MAX_BYTES};
pub use error::{Error, ErrorKind, FieldError, FieldErrorKind, Result};
pub use extract::{JsonRejection, StrictJson};
pub use logger::{Level, LogEntry, Logger, ParseLevelError, Properties};
pub use logging::{init_logging, LogFormat, LogOutput, LoggerConfig, LoggingConfig};
pub use middleware::{RequestLog, RequestLogLayer};
pub use response::{write_json, ApiError, Envelope};
pub use shape::{Decodable, Field, JsonType};
