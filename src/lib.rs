//! # relay
//!
//! A small server framework exposing typed remote procedures over
//! HTTP/JSON, backed by an embedded key/value record store.
//!
//! Records describe themselves once through an explicit schema builder;
//! the same schema drives the binary storage codec, request validation,
//! and generated documentation. Procedures register typed handlers at
//! startup and the dispatcher does the rest: routing, rate limiting,
//! authorization, JSON decode, validation, and response shaping.
//!
//! ```no_run
//! use relay::{Config, Context, Problem, ProcedureParams, RequestContext, Server};
//! use relay::{wire_record, Record, Schema};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Default, Deserialize)]
//! #[serde(default)]
//! struct EchoRequest {
//!     #[serde(rename = "Text")]
//!     text: String,
//! }
//!
//! impl Record for EchoRequest {
//!     const NAME: &'static str = "EchoRequest";
//!
//!     fn build_schema() -> Schema<Self> {
//!         Schema::builder("EchoRequest")
//!             .field(0, "Text", |v: &EchoRequest| &v.text, |v: &mut EchoRequest| &mut v.text)
//!             .required()
//!             .finish()
//!     }
//! }
//!
//! wire_record!(EchoRequest);
//!
//! #[derive(Debug, Default, Serialize)]
//! struct EchoResponse {
//!     #[serde(rename = "Text")]
//!     text: String,
//! }
//!
//! impl Record for EchoResponse {
//!     const NAME: &'static str = "EchoResponse";
//!
//!     fn build_schema() -> Schema<Self> {
//!         Schema::builder("EchoResponse")
//!             .field(0, "Text", |v: &EchoResponse| &v.text, |v: &mut EchoResponse| &mut v.text)
//!             .finish()
//!     }
//! }
//!
//! wire_record!(EchoResponse);
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut ctx = Context::initialize(Config::default())?;
//!     ctx.rpc(
//!         ProcedureParams {
//!             name: "Echo".to_string(),
//!             authorization_not_required: true,
//!             ..ProcedureParams::default()
//!         },
//!         |_ctx: &mut RequestContext, input: EchoRequest| {
//!             Ok::<_, Problem>(EchoResponse { text: input.text })
//!         },
//!     );
//!     let _server = Server::new(ctx);
//!     // block on _server.run() inside your async runtime
//!     Ok(())
//! }
//! ```

pub use relay_codec::{
    describe, pack, unpack, validate, wire_record, Buffer, FieldError, Id128, PackError,
    ParseIdError, Record, Schema, SchemaBuilder, UnpackError, Wire,
};
pub use relay_server::{
    documentation, Config, ConfigError, Context, ErrorId, Fault, HttpReply, Problem,
    ProcedureMeta, ProcedureParams, RateLimiter, RequestContext, Server, ServerError,
    ValidationProblem,
};
pub use relay_store::{
    bucket, iterate, iterate_collect, iterate_collect_all, iterate_find, iterate_remove, Store,
    StoreError,
};
