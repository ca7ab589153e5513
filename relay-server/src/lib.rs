//! # relay-server
//!
//! Typed RPC over HTTP/JSON for relay.
//!
//! This crate provides:
//! - Procedure registration with typed input/output/error capture
//! - The request dispatcher: routing, authorization, validation
//! - REST routes with captured path variables
//! - Per-host request rate limiting
//! - Documentation generated from registered schemas
//! - Configuration loading and the process-wide logging sink

pub mod config;
pub mod context;
pub mod dispatch;
pub mod docs;
pub mod error;
pub mod logging;
pub mod problem;
pub mod ratelimit;
pub mod registry;
pub mod request;
pub mod rest;
pub mod server;

pub use config::{Config, ConfigError};
pub use context::{AuthorizationFn, Context};
pub use dispatch::HttpReply;
pub use docs::documentation;
pub use error::ServerError;
pub use problem::{
    ErrorId, Fault, Problem, ValidationProblem, ERROR_AUTHENTICATION_FAILED, ERROR_INTERNAL,
    ERROR_JSON_UNMARSHAL, ERROR_NONE, ERROR_PROCEDURE_NOT_FOUND, ERROR_REST_PROCEDURE_NOT_FOUND,
    ERROR_STATIC_CONTENT_NOT_FOUND, ERROR_VALIDATION_FAILED,
};
pub use ratelimit::{RateDecision, RateLimiter, DEFAULT_MAX_REQUESTS_PER_MINUTE};
pub use registry::{Procedure, ProcedureMeta, ProcedureParams};
pub use request::RequestContext;
pub use rest::RestRoute;
pub use server::Server;
