//! Per-request context handed to handlers and the authorization
//! predicate.

use crate::registry::ProcedureMeta;
use bytes::Bytes;
use hyper::{HeaderMap, Method, StatusCode};
use relay_codec::Id128;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Response written directly by a custom-response handler.
#[derive(Debug, Clone)]
pub(crate) struct CustomReply {
    pub status: StatusCode,
    pub content_type: Option<&'static str>,
    pub body: Bytes,
}

/// Everything a handler can learn about the request it is serving.
pub struct RequestContext {
    /// Fresh identifier assigned when the request arrived.
    pub request_id: Id128,
    /// Client address without the port.
    pub host: String,
    pub uri: String,
    pub method: Method,
    /// Path variables captured by a REST route.
    pub vars: BTreeMap<String, String>,
    /// Raw request body, for handlers that bypass the typed input.
    pub body: Bytes,
    /// Slot the authorization predicate may fill for handlers.
    pub session_token: Option<String>,
    /// Extra headers merged into the response (cookies and the like).
    pub response_headers: HeaderMap,
    /// Metadata of the procedure being invoked, including user data.
    pub procedure: Arc<ProcedureMeta>,
    pub(crate) custom: Option<CustomReply>,
}

impl RequestContext {
    /// Writes the response body for a custom-response procedure.
    pub fn respond(&mut self, status: StatusCode, body: impl Into<Bytes>) {
        self.custom = Some(CustomReply {
            status,
            content_type: None,
            body: body.into(),
        });
    }

    /// Like [`respond`](Self::respond) with an explicit content type.
    pub fn respond_with_type(
        &mut self,
        status: StatusCode,
        content_type: &'static str,
        body: impl Into<Bytes>,
    ) {
        self.custom = Some(CustomReply {
            status,
            content_type: Some(content_type),
            body: body.into(),
        });
    }
}
