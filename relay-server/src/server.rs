//! HTTP server loop.

use crate::context::Context;
use crate::dispatch;
use crate::error::ServerError;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::header::CONTENT_TYPE;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

/// HTTP front end over a fully registered [`Context`].
pub struct Server {
    context: Arc<Context>,
    shutdown: broadcast::Sender<()>,
}

impl Server {
    /// Wraps a context whose procedures are all registered. The tables
    /// are read-only from here on.
    pub fn new(context: Context) -> Server {
        let (shutdown, _) = broadcast::channel(1);
        Server {
            context: Arc::new(context),
            shutdown,
        }
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    /// Runs the accept loop until [`shutdown`](Self::shutdown) fires.
    /// Also spawns the rate limiter's periodic reset task.
    pub async fn run(&self) -> Result<(), ServerError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.context.config().port));
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("{} procedures registered", self.context.procedure_count());
        tracing::info!("listening on port {}", self.context.config().port);

        let reset_context = self.context.clone();
        let reset_shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            reset_context.limiter.run_reset_loop(reset_shutdown).await;
        });

        let mut shutdown_rx = self.shutdown.subscribe();
        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, remote)) => {
                            let context = self.context.clone();
                            tokio::spawn(async move {
                                let host = remote.ip().to_string();
                                let io = TokioIo::new(stream);
                                let service = service_fn(move |request| {
                                    let context = context.clone();
                                    let host = host.clone();
                                    async move {
                                        Ok::<_, Infallible>(serve(context, request, host).await)
                                    }
                                });
                                if let Err(e) = http1::Builder::new()
                                    .serve_connection(io, service)
                                    .await
                                {
                                    tracing::debug!("[{}] connection error: {}", remote, e);
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!("accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("server shutting down");
                    break;
                }
            }
        }
        Ok(())
    }

    /// Initiates server shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(());
    }
}

/// Adapts one hyper request onto the dispatcher.
async fn serve(
    context: Arc<Context>,
    request: Request<Incoming>,
    host: String,
) -> Response<Full<Bytes>> {
    let method = request.method().clone();
    let uri = request.uri().to_string();
    let body = match request.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            tracing::debug!("[{}] failed to read request body: {}", host, e);
            Bytes::new()
        }
    };

    let reply = dispatch::handle_request(&context, method, &uri, &host, body).await;

    let mut builder = Response::builder().status(reply.status);
    if let Some(content_type) = reply.content_type {
        builder = builder.header(CONTENT_TYPE, content_type);
    }
    let mut response = builder.body(Full::new(reply.body)).unwrap();
    response.headers_mut().extend(reply.headers);
    response
}
