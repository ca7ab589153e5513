//! Procedure registration.
//!
//! Each handler shape gets its own typed builder; every builder boxes
//! the handler into one uniform `(context, raw body) -> Reply` closure
//! that decodes the input, validates required fields, invokes the
//! handler, and shapes the success or error response. Registration
//! happens at startup; contract violations (duplicate names, malformed
//! REST patterns) are programmer errors and abort the process.

use crate::context::Context;
use crate::problem::{Fault, Problem, ValidationProblem, ERROR_INTERNAL, ERROR_JSON_UNMARSHAL};
use crate::request::RequestContext;
use crate::rest::RestRoute;
use hyper::Method;
use relay_codec::{describe, validate, Record};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::sync::Arc;

/// Registration options. `name` is the procedure name, or the route
/// pattern when `rest` is set.
#[derive(Default)]
pub struct ProcedureParams {
    pub name: String,
    pub description: String,
    pub category: String,
    /// Skip the authorization predicate for this procedure.
    pub authorization_not_required: bool,
    /// The handler writes the success response itself.
    pub custom_response: bool,
    /// Register under the REST route table instead of the direct one.
    pub rest: bool,
    /// Methods qualifying a REST route; empty accepts any.
    pub rest_methods: Vec<Method>,
    /// Opaque per-procedure data, reachable from the request context.
    pub user_data: Option<Arc<dyn Any + Send + Sync>>,
}

impl ProcedureParams {
    pub fn new(name: impl Into<String>) -> ProcedureParams {
        ProcedureParams {
            name: name.into(),
            ..ProcedureParams::default()
        }
    }
}

/// Immutable descriptor captured at registration.
pub struct ProcedureMeta {
    pub name: String,
    pub description: String,
    pub category: String,
    pub authorization_not_required: bool,
    pub custom_response: bool,
    /// HTML documentation synthesized from the input/output schemas.
    pub documentation: String,
    pub user_data: Option<Arc<dyn Any + Send + Sync>>,
}

/// Uniform response produced by a boxed handler.
pub(crate) enum Reply {
    /// Success; the payload is the JSON-encoded output, if any.
    Success(Option<Vec<u8>>),
    /// Failure; the payload is the JSON-encoded full error record.
    Failure(Vec<u8>),
}

pub(crate) type HandlerFn = Box<dyn Fn(&mut RequestContext, &[u8]) -> Reply + Send + Sync>;

/// A registered procedure: metadata plus the uniform handler closure.
pub struct Procedure {
    pub meta: Arc<ProcedureMeta>,
    pub(crate) handler: HandlerFn,
}

impl Context {
    /// Registers a handler taking a typed input and returning a typed
    /// output.
    pub fn rpc<In, Out, E, F>(&mut self, params: ProcedureParams, handler: F)
    where
        In: Record + DeserializeOwned,
        Out: Record + Serialize,
        E: Fault,
        F: Fn(&mut RequestContext, In) -> Result<Out, E> + Send + Sync + 'static,
    {
        let meta = build_meta(&params, Some(describe::<In>()), Some(describe::<Out>()));
        let boxed: HandlerFn = Box::new(move |ctx, body| {
            let input: In = match decode_input(body) {
                Ok(input) => input,
                Err(reply) => return reply,
            };
            if let Some(reply) = reject_invalid(&input) {
                return reply;
            }
            shape_output(handler(ctx, input))
        });
        self.install(params, meta, boxed);
    }

    /// Registers a handler with no input record.
    pub fn rpc_no_input<Out, E, F>(&mut self, params: ProcedureParams, handler: F)
    where
        Out: Record + Serialize,
        E: Fault,
        F: Fn(&mut RequestContext) -> Result<Out, E> + Send + Sync + 'static,
    {
        let meta = build_meta(&params, None, Some(describe::<Out>()));
        let boxed: HandlerFn = Box::new(move |ctx, _body| shape_output(handler(ctx)));
        self.install(params, meta, boxed);
    }

    /// Registers a handler with no output record.
    pub fn rpc_no_output<In, E, F>(&mut self, params: ProcedureParams, handler: F)
    where
        In: Record + DeserializeOwned,
        E: Fault,
        F: Fn(&mut RequestContext, In) -> Result<(), E> + Send + Sync + 'static,
    {
        let meta = build_meta(&params, Some(describe::<In>()), None);
        let boxed: HandlerFn = Box::new(move |ctx, body| {
            let input: In = match decode_input(body) {
                Ok(input) => input,
                Err(reply) => return reply,
            };
            if let Some(reply) = reject_invalid(&input) {
                return reply;
            }
            shape_empty(handler(ctx, input))
        });
        self.install(params, meta, boxed);
    }

    /// Registers a handler with neither input nor output record.
    pub fn rpc_plain<E, F>(&mut self, params: ProcedureParams, handler: F)
    where
        E: Fault,
        F: Fn(&mut RequestContext) -> Result<(), E> + Send + Sync + 'static,
    {
        let meta = build_meta(&params, None, None);
        let boxed: HandlerFn = Box::new(move |ctx, _body| shape_empty(handler(ctx)));
        self.install(params, meta, boxed);
    }

    fn install(&mut self, params: ProcedureParams, meta: Arc<ProcedureMeta>, handler: HandlerFn) {
        let procedure = Procedure { meta, handler };
        if params.rest {
            let route = RestRoute::parse(&params.name, params.rest_methods, procedure);
            self.rest_routes.push(route);
        } else {
            if self.procedures.contains_key(&params.name) {
                panic!("procedure name already registered: {}", params.name);
            }
            self.procedures.insert(params.name, procedure);
        }
    }
}

fn build_meta(
    params: &ProcedureParams,
    request_doc: Option<String>,
    response_doc: Option<String>,
) -> Arc<ProcedureMeta> {
    let documentation = build_documentation(params, request_doc, response_doc);
    Arc::new(ProcedureMeta {
        name: params.name.clone(),
        description: params.description.clone(),
        category: params.category.clone(),
        authorization_not_required: params.authorization_not_required,
        custom_response: params.custom_response,
        documentation,
        user_data: params.user_data.clone(),
    })
}

fn build_documentation(
    params: &ProcedureParams,
    request_doc: Option<String>,
    response_doc: Option<String>,
) -> String {
    let mut out = String::new();
    let url_prefix = if params.rest { "rest/" } else { "rpc/" };
    out.push_str(&format!(
        "<h3 class=\"leftpad_10\"> <b>URL: {}{}</b> </h3>\n",
        url_prefix, params.name
    ));
    out.push_str("<div class=\"rpc_description\">\n");
    if !params.description.is_empty() {
        out.push_str(&format!("<b>Description</b>: {}\n", params.description));
    }

    out.push_str("<h4>Request:</h4>\n<code>");
    match &request_doc {
        Some(doc) => out.push_str(doc),
        None => out.push_str("empty\n"),
    }
    out.push_str("</code>");

    out.push_str("<h4>Response:</h4>\n<code>");
    if params.custom_response {
        out.push_str("Custom response\n");
    } else {
        match &response_doc {
            Some(doc) => out.push_str(doc),
            None => out.push_str("empty\n"),
        }
    }
    out.push_str("</code>");

    out.push_str("</div>\n<hr class=\"solid\">\n");
    out
}

fn encode_fault<E: Fault>(fault: &E) -> Vec<u8> {
    serde_json::to_vec(fault).unwrap_or_else(|e| {
        tracing::error!("failed to encode error record: {}", e);
        let fallback = Problem::new(ERROR_INTERNAL, "error record failed to encode");
        serde_json::to_vec(&fallback).unwrap_or_default()
    })
}

fn decode_input<In: Record + DeserializeOwned>(body: &[u8]) -> Result<In, Reply> {
    // A zero-length body is not a decode failure; validation still runs
    // against the default value.
    if body.is_empty() {
        return Ok(In::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        Reply::Failure(encode_fault(&Problem::new(
            ERROR_JSON_UNMARSHAL,
            e.to_string(),
        )))
    })
}

fn reject_invalid<In: Record>(input: &In) -> Option<Reply> {
    let errors = validate(input);
    if errors.is_empty() {
        return None;
    }
    Some(Reply::Failure(encode_fault(&ValidationProblem::new(errors))))
}

fn shape_output<Out: Serialize, E: Fault>(result: Result<Out, E>) -> Reply {
    match result {
        Ok(output) => match serde_json::to_vec(&output) {
            Ok(body) => Reply::Success(Some(body)),
            Err(e) => {
                tracing::error!("failed to encode response: {}", e);
                Reply::Failure(encode_fault(&Problem::new(
                    ERROR_INTERNAL,
                    "response failed to encode",
                )))
            }
        },
        Err(fault) => shape_fault(fault),
    }
}

fn shape_empty<E: Fault>(result: Result<(), E>) -> Reply {
    match result {
        Ok(()) => Reply::Success(None),
        Err(fault) => shape_fault(fault),
    }
}

fn shape_fault<E: Fault>(fault: E) -> Reply {
    // A returned error record whose code is empty or `none` still
    // counts as success.
    if fault.problem().error_id.is_success() {
        return Reply::Success(None);
    }
    Reply::Failure(encode_fault(&fault))
}
