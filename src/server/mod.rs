//! JSON query API over HTTP/1.1
//!
//! The histogram and summary are built once before the server starts; each
//! request derives its view from the shared read-only [`ApiState`].

pub mod query;
pub mod routes;

use crate::errors::{AppError, AppResult};
use bytes::Bytes;
use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::{
    net::TcpListener,
    pin,
    sync::{Semaphore, TryAcquireError},
    task::JoinSet,
};
use tracing::{debug, error, info, warn};

pub use routes::{route, ApiResponse, ApiState};

/// Request-level failures, each mapped to an HTTP status
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("{0}")]
    Internal(#[from] AppError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Internal(AppError::InvalidTimeRange(_) | AppError::InvalidArgument(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn full(body: impl Into<Bytes>) -> BoxBody<Bytes, hyper::Error> {
    Full::new(body.into())
        .map_err(|never| match never {})
        .boxed()
}

fn build_response(resp: ApiResponse) -> Response<BoxBody<Bytes, hyper::Error>> {
    let status = resp.status;
    match Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(full(resp.body))
    {
        Ok(r) => r,
        Err(e) => {
            error!("Error building response: {e}");
            let mut fallback = Response::new(full("{\"error\":\"internal error\"}"));
            *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        }
    }
}

async fn srv(
    req: Request<hyper::body::Incoming>,
    state: Arc<ApiState>,
) -> Result<Response<BoxBody<Bytes, hyper::Error>>, hyper::Error> {
    let resp = route(&state, req.method(), req.uri().path(), req.uri().query());
    debug!("{} {} -> {}", req.method(), req.uri(), resp.status);
    Ok(build_response(resp))
}

/// Accept connections on `listener` until `shutdown` resolves
///
/// At most `concurrency_limit` connections are served at once; connections
/// beyond that are dropped immediately.
pub async fn run_httpd<SF, S, F>(
    listener: TcpListener,
    concurrency_limit: usize,
    shutdown: F,
    make_service: SF,
) -> AppResult<()>
where
    SF: Send + Sync + 'static + Clone + Fn() -> S,
    S: Service<
            hyper::Request<hyper::body::Incoming>,
            Response = hyper::Response<BoxBody<Bytes, hyper::Error>>,
            Error = hyper::Error,
        > + Send
        + 'static,
    S::Future: Send + 'static,
    F: Future<Output = ()>,
{
    let sem = Arc::new(Semaphore::new(concurrency_limit.max(1)));
    let mut join_set = JoinSet::new();

    pin!(shutdown);
    loop {
        tokio::select! {
            () = &mut shutdown => {
                info!("Shutdown signal received, stopping accept loop.");
                break;
            }

            incoming = listener.accept() => {
                let (stream, addr) = match incoming {
                    Ok(sa) => sa,
                    Err(e) => {
                        error!("Error accepting connection: {e}");
                        continue;
                    }
                };
                debug!("Accepted connection from {addr}");

                let sem = Arc::clone(&sem);
                let service_factory = make_service.clone();

                join_set.spawn(async move {
                    let permit = match sem.try_acquire() {
                        Ok(p) => p,
                        Err(TryAcquireError::Closed) => {
                            error!("Semaphore closed");
                            return;
                        }
                        Err(TryAcquireError::NoPermits) => {
                            warn!("httpd over connection capacity, load shedding");
                            drop(stream);
                            return;
                        }
                    };

                    let builder = auto::Builder::new(TokioExecutor::new());
                    let serve_future =
                        builder.serve_connection(TokioIo::new(stream), service_factory());

                    if let Err(e) = serve_future.await {
                        error!("Error serving {addr}: {e}");
                    }
                    drop(permit);
                });
            }
        }
    }

    drop(listener);
    while join_set.join_next().await.is_some() {}
    Ok(())
}

/// Serve the query API on an already bound listener until `shutdown` resolves
pub async fn serve_listener<F>(
    listener: TcpListener,
    concurrency_limit: usize,
    state: ApiState,
    shutdown: F,
) -> AppResult<()>
where
    F: Future<Output = ()>,
{
    let state = Arc::new(state);
    run_httpd(listener, concurrency_limit, shutdown, move || {
        let state = Arc::clone(&state);
        hyper::service::service_fn(move |req| srv(req, Arc::clone(&state)))
    })
    .await
}

/// Bind `addr` and serve the query API until Ctrl-C
pub async fn serve(addr: SocketAddr, concurrency_limit: usize, state: ApiState) -> AppResult<()> {
    let listener = TcpListener::bind(addr).await.map_err(AppError::Io)?;
    let local = listener.local_addr().map_err(AppError::Io)?;
    info!("Query API listening on http://{}", local);
    println!("Serving query API on http://{} (Ctrl-C to stop)", local);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };
    serve_listener(listener, concurrency_limit, state, shutdown).await
}
