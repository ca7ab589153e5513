//! The request lifecycle: rate check, route resolution, authorization,
//! handler invocation, and response shaping.

use crate::context::Context;
use crate::problem::{
    Problem, ERROR_AUTHENTICATION_FAILED, ERROR_PROCEDURE_NOT_FOUND,
    ERROR_REST_PROCEDURE_NOT_FOUND, ERROR_STATIC_CONTENT_NOT_FOUND,
};
use crate::ratelimit::RateDecision;
use crate::registry::Reply;
use crate::request::RequestContext;
use bytes::Bytes;
use hyper::{HeaderMap, Method, StatusCode};
use relay_codec::Id128;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

/// Response bodies longer than this are not echoed into the log.
const MAX_LOGGED_RESPONSE: usize = 10_000;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Transport-agnostic response assembled by the dispatcher.
pub struct HttpReply {
    pub status: StatusCode,
    pub content_type: Option<&'static str>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpReply {
    fn json(status: StatusCode, body: impl Into<Bytes>) -> HttpReply {
        HttpReply {
            status,
            content_type: Some(JSON_CONTENT_TYPE),
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    fn empty(status: StatusCode) -> HttpReply {
        HttpReply {
            status,
            content_type: None,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }
}

fn problem_reply(problem: &Problem) -> HttpReply {
    HttpReply::json(
        StatusCode::BAD_REQUEST,
        serde_json::to_vec(problem).unwrap_or_default(),
    )
}

/// Drives one request through the full lifecycle and produces the
/// response. The HTTP server is a thin adapter around this.
pub async fn handle_request(
    ctx: &Context,
    method: Method,
    uri: &str,
    host: &str,
    body: Bytes,
) -> HttpReply {
    let started = Instant::now();
    let request_id = Id128::generate();
    tracing::info!(
        "[{}][in] {} ({}): {}",
        host,
        uri,
        request_id,
        String::from_utf8_lossy(&body)
    );

    match ctx.limiter.check(host) {
        RateDecision::Limited(count) => {
            tracing::info!("[{}] rate limited ({} requests this window)", host, count);
            return HttpReply::empty(StatusCode::TOO_MANY_REQUESTS);
        }
        RateDecision::Pass(_) => {}
    }

    let path = uri.split('?').next().unwrap_or(uri);

    let (procedure, vars) = if let Some(index) = path.find("/rpc/") {
        let name = &path[index + "/rpc/".len()..];
        match ctx.procedures.get(name) {
            Some(procedure) => (procedure, BTreeMap::new()),
            None => {
                tracing::info!("[{}] procedure not found: {} ({})", host, name, request_id);
                return problem_reply(&Problem::code(ERROR_PROCEDURE_NOT_FOUND));
            }
        }
    } else if let Some(index) = path.find("/rest/") {
        // The route path is taken relative to "/rest/" itself.
        let rest_path = &path[index + "/rest/".len()..];
        let matched = ctx
            .rest_routes
            .iter()
            .find_map(|route| route.matches(rest_path, &method).map(|vars| (route, vars)));
        match matched {
            Some((route, vars)) => (&route.procedure, vars),
            None => {
                tracing::info!(
                    "[{}] rest procedure not found: {} ({})",
                    host,
                    rest_path,
                    request_id
                );
                return problem_reply(&Problem::code(ERROR_REST_PROCEDURE_NOT_FOUND));
            }
        }
    } else {
        return serve_static(ctx, path).await;
    };

    let meta = procedure.meta.clone();
    let mut request_context = RequestContext {
        request_id,
        host: host.to_string(),
        uri: uri.to_string(),
        method,
        vars,
        body: body.clone(),
        session_token: None,
        response_headers: HeaderMap::new(),
        procedure: meta.clone(),
        custom: None,
    };

    if !meta.authorization_not_required {
        if let Some(authorize) = &ctx.authorization {
            if !authorize(&mut request_context) {
                tracing::info!(
                    "[{}] authorization failed for {} ({})",
                    host,
                    meta.name,
                    request_id
                );
                let mut reply =
                    problem_reply(&Problem::new(ERROR_AUTHENTICATION_FAILED, "Unauthorized"));
                reply.headers.extend(request_context.response_headers);
                return reply;
            }
        }
    }

    let outcome = (procedure.handler)(&mut request_context, &body);

    let mut reply = match outcome {
        Reply::Success(payload) => {
            if meta.custom_response {
                match request_context.custom.take() {
                    Some(custom) => HttpReply {
                        status: custom.status,
                        content_type: custom.content_type,
                        headers: HeaderMap::new(),
                        body: custom.body,
                    },
                    None => HttpReply::empty(StatusCode::OK),
                }
            } else {
                match payload {
                    Some(encoded) => HttpReply::json(StatusCode::OK, encoded),
                    None => HttpReply::empty(StatusCode::OK),
                }
            }
        }
        Reply::Failure(encoded) => HttpReply::json(StatusCode::BAD_REQUEST, encoded),
    };
    reply.headers.extend(request_context.response_headers);

    let elapsed = started.elapsed();
    let preview = if reply.body.len() > MAX_LOGGED_RESPONSE {
        "<response body too big>".into()
    } else {
        String::from_utf8_lossy(&reply.body)
    };
    tracing::info!(
        "[{}][out, {:?}] {} ({}): {}",
        host,
        elapsed,
        meta.name,
        request_id,
        preview
    );
    reply
}

async fn serve_static(ctx: &Context, path: &str) -> HttpReply {
    let name = path.trim_start_matches('/');
    let Some(file) = ctx.static_data.get(name) else {
        return problem_reply(&Problem::code(ERROR_STATIC_CONTENT_NOT_FOUND));
    };
    match tokio::fs::read(file).await {
        Ok(data) => HttpReply {
            status: StatusCode::OK,
            content_type: Some(content_type_for(file)),
            headers: HeaderMap::new(),
            body: Bytes::from(data),
        },
        Err(e) => {
            tracing::error!("static content {} unreadable: {}", file.display(), e);
            problem_reply(&Problem::code(ERROR_STATIC_CONTENT_NOT_FOUND))
        }
    }
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("js") => "application/javascript",
        Some("css") => "text/css",
        Some("json") => "application/json",
        Some("wasm") => "application/wasm",
        Some("png") => "image/png",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::problem::{ErrorId, Fault, ERROR_JSON_UNMARSHAL, ERROR_VALIDATION_FAILED};
    use crate::registry::ProcedureParams;
    use relay_codec::{wire_record, Record, Schema};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct LoginRequest {
        #[serde(rename = "Username")]
        username: String,
        #[serde(rename = "Password")]
        password: String,
    }

    impl Record for LoginRequest {
        const NAME: &'static str = "LoginRequest";

        fn build_schema() -> Schema<Self> {
            Schema::builder("LoginRequest")
                .field(
                    0,
                    "Username",
                    |v: &LoginRequest| &v.username,
                    |v: &mut LoginRequest| &mut v.username,
                )
                .required()
                .description("login or email")
                .field(
                    0,
                    "Password",
                    |v: &LoginRequest| &v.password,
                    |v: &mut LoginRequest| &mut v.password,
                )
                .required()
                .finish()
        }
    }

    wire_record!(LoginRequest);

    #[derive(Debug, Default, Serialize)]
    struct LoginResponse {
        #[serde(rename = "SessionToken")]
        session_token: String,
    }

    impl Record for LoginResponse {
        const NAME: &'static str = "LoginResponse";

        fn build_schema() -> Schema<Self> {
            Schema::builder("LoginResponse")
                .field(
                    0,
                    "SessionToken",
                    |v: &LoginResponse| &v.session_token,
                    |v: &mut LoginResponse| &mut v.session_token,
                )
                .finish()
        }
    }

    wire_record!(LoginResponse);

    fn login_context(max_requests: u32) -> Context {
        let mut ctx = Context::initialize(Config {
            stdout_logging: false,
            max_requests_per_minute: max_requests,
            ..Config::default()
        })
        .unwrap();
        ctx.rpc(
            ProcedureParams {
                name: "Login".to_string(),
                authorization_not_required: true,
                ..ProcedureParams::default()
            },
            |_ctx: &mut RequestContext, input: LoginRequest| {
                if input.password == "wrong" {
                    return Err(Problem::code("invalid_credentials"));
                }
                Ok(LoginResponse {
                    session_token: format!("token-for-{}", input.username),
                })
            },
        );
        ctx
    }

    async fn post(ctx: &Context, uri: &str, body: &str) -> (StatusCode, serde_json::Value) {
        let reply = handle_request(
            ctx,
            Method::POST,
            uri,
            "127.0.0.1",
            Bytes::from(body.to_string()),
        )
        .await;
        let json = if reply.body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&reply.body).unwrap()
        };
        (reply.status, json)
    }

    #[tokio::test]
    async fn test_login_success() {
        let ctx = login_context(120);
        let (status, body) =
            post(&ctx, "/rpc/Login", r#"{"Username":"u","Password":"p"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["SessionToken"], "token-for-u");
    }

    #[tokio::test]
    async fn test_validation_failure_lists_missing_fields() {
        let ctx = login_context(120);
        let (status, body) = post(&ctx, "/rpc/Login", r#"{"Username":""}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ErrorID"], ERROR_VALIDATION_FAILED);
        let problems = body["ValidationProblem"].as_array().unwrap();
        assert_eq!(problems.len(), 2);
        assert_eq!(problems[0]["Field"], "Username");
        assert_eq!(problems[0]["Reason"], "field is missing");
        assert_eq!(problems[1]["Field"], "Password");
    }

    #[tokio::test]
    async fn test_empty_body_still_validates() {
        let ctx = login_context(120);
        let (status, body) = post(&ctx, "/rpc/Login", "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ErrorID"], ERROR_VALIDATION_FAILED);
    }

    #[tokio::test]
    async fn test_malformed_json_rejected() {
        let ctx = login_context(120);
        let (status, body) = post(&ctx, "/rpc/Login", "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ErrorID"], ERROR_JSON_UNMARSHAL);
        assert!(body["Message"].as_str().unwrap().len() > 0);
    }

    #[tokio::test]
    async fn test_handler_error_becomes_400_with_full_record() {
        let ctx = login_context(120);
        let (status, body) =
            post(&ctx, "/rpc/Login", r#"{"Username":"u","Password":"wrong"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ErrorID"], "invalid_credentials");
    }

    #[tokio::test]
    async fn test_procedure_not_found() {
        let ctx = login_context(120);
        let (status, body) = post(&ctx, "/rpc/Missing", "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ErrorID"], ERROR_PROCEDURE_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_authorization_failure() {
        let mut ctx = login_context(120);
        ctx.rpc_no_input(
            ProcedureParams::new("Protected"),
            |_ctx: &mut RequestContext| Ok::<_, Problem>(LoginResponse::default()),
        );
        let ctx = ctx.with_authorization(|_ctx| false);

        let (status, body) = post(&ctx, "/rpc/Protected", "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ErrorID"], ERROR_AUTHENTICATION_FAILED);
        assert_eq!(body["Message"], "Unauthorized");

        // Login opted out of authorization and still works.
        let (status, _) = post(&ctx, "/rpc/Login", r#"{"Username":"u","Password":"p"}"#).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rate_limit_bound() {
        let ctx = login_context(2);
        let body = r#"{"Username":"u","Password":"p"}"#;
        let (first, _) = post(&ctx, "/rpc/Login", body).await;
        let (second, _) = post(&ctx, "/rpc/Login", body).await;
        let (third, _) = post(&ctx, "/rpc/Login", body).await;
        assert_eq!(first, StatusCode::OK);
        assert_eq!(second, StatusCode::OK);
        assert_eq!(third, StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_rest_route_with_variables() {
        let mut ctx = login_context(120);
        ctx.rpc_no_input(
            ProcedureParams {
                name: "sessions/{id}".to_string(),
                authorization_not_required: true,
                rest: true,
                rest_methods: vec![Method::GET],
                ..ProcedureParams::default()
            },
            |ctx: &mut RequestContext| {
                Ok::<_, Problem>(LoginResponse {
                    session_token: ctx.vars["id"].clone(),
                })
            },
        );

        let reply = handle_request(
            &ctx,
            Method::GET,
            "/rest/sessions/42",
            "127.0.0.1",
            Bytes::new(),
        )
        .await;
        assert_eq!(reply.status, StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(&reply.body).unwrap();
        assert_eq!(body["SessionToken"], "42");

        let miss = handle_request(
            &ctx,
            Method::DELETE,
            "/rest/sessions/42",
            "127.0.0.1",
            Bytes::new(),
        )
        .await;
        let body: serde_json::Value = serde_json::from_slice(&miss.body).unwrap();
        assert_eq!(body["ErrorID"], ERROR_REST_PROCEDURE_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_custom_response() {
        let mut ctx = login_context(120);
        ctx.rpc_plain(
            ProcedureParams {
                name: "docs.html".to_string(),
                authorization_not_required: true,
                custom_response: true,
                ..ProcedureParams::default()
            },
            |ctx: &mut RequestContext| {
                ctx.respond_with_type(StatusCode::OK, "text/html", "<html></html>");
                Ok::<_, Problem>(())
            },
        );

        let reply = handle_request(
            &ctx,
            Method::GET,
            "/rpc/docs.html",
            "127.0.0.1",
            Bytes::new(),
        )
        .await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.content_type, Some("text/html"));
        assert_eq!(&reply.body[..], b"<html></html>");
    }

    #[tokio::test]
    async fn test_success_with_empty_error_code() {
        #[derive(Debug, Default, Serialize)]
        struct WideProblem {
            #[serde(flatten)]
            problem: Problem,
            #[serde(rename = "Hint")]
            hint: String,
        }

        impl Fault for WideProblem {
            fn problem(&self) -> &Problem {
                &self.problem
            }
        }

        let mut ctx = login_context(120);
        ctx.rpc_no_output(
            ProcedureParams {
                name: "Touch".to_string(),
                authorization_not_required: true,
                ..ProcedureParams::default()
            },
            |_ctx: &mut RequestContext, _input: LoginRequest| {
                // An error record whose code is `none` counts as success.
                Err(WideProblem {
                    problem: Problem {
                        error_id: ErrorId::from("none"),
                        message: String::new(),
                    },
                    hint: "ignored".to_string(),
                })
            },
        );

        let (status, body) =
            post(&ctx, "/rpc/Touch", r#"{"Username":"u","Password":"p"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_static_content() {
        let dir = tempfile::TempDir::new().unwrap();
        let page = dir.path().join("index.html");
        std::fs::write(&page, "<h1>hi</h1>").unwrap();

        let mut ctx = login_context(120);
        ctx.static_content("index.html", &page);

        let reply =
            handle_request(&ctx, Method::GET, "/index.html", "127.0.0.1", Bytes::new()).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.content_type, Some("text/html; charset=utf-8"));
        assert_eq!(&reply.body[..], b"<h1>hi</h1>");

        let miss =
            handle_request(&ctx, Method::GET, "/missing.css", "127.0.0.1", Bytes::new()).await;
        assert_eq!(miss.status, StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_slice(&miss.body).unwrap();
        assert_eq!(body["ErrorID"], ERROR_STATIC_CONTENT_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_response_headers_forwarded() {
        let mut ctx = login_context(120);
        ctx.rpc_no_input(
            ProcedureParams {
                name: "WithCookie".to_string(),
                authorization_not_required: true,
                ..ProcedureParams::default()
            },
            |ctx: &mut RequestContext| {
                ctx.response_headers.insert(
                    hyper::header::SET_COOKIE,
                    "session=abc".parse().unwrap(),
                );
                Ok::<_, Problem>(LoginResponse::default())
            },
        );

        let reply = handle_request(
            &ctx,
            Method::POST,
            "/rpc/WithCookie",
            "127.0.0.1",
            Bytes::new(),
        )
        .await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(
            reply.headers.get(hyper::header::SET_COOKIE).unwrap(),
            "session=abc"
        );
    }
}
