//! Minimal obi example: two routes sharing a base middleware chain.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use bytes::Bytes;
use http::HeaderValue;
use http_body_util::{BodyExt, Full};
use hyper::service::Service;
use obi::middleware::{self, Chain};
use obi::{BoxError, BoxedHandler, Handler, HandlerService, Request, Response};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt::init();

    let base = Chain::new([middleware::infallible(access_log), request_id()]);
    let admin = base.append([middleware::constructor(require_token("s3cret"))]);

    let users = HandlerService::new(base.then_fn(Some(get_user))?);
    let stats = HandlerService::new(admin.then_fn(Some(get_stats))?);

    for (svc, path, token) in [
        (&users, "/users/42", None),
        (&stats, "/admin/stats", None),
        (&stats, "/admin/stats", Some("s3cret")),
    ] {
        let mut req = http::Request::get(path);
        if let Some(token) = token {
            req = req.header("authorization", format!("Bearer {token}"));
        }
        let res = svc.call(req.body(Full::new(Bytes::new()))?).await?;
        let status = res.status();
        let body = res.into_body().collect().await?.to_bytes();
        info!(%path, %status, body = %String::from_utf8_lossy(&body), "response");
    }

    Ok(())
}

// Logs method, path, status and latency for every request.
fn access_log(next: BoxedHandler) -> BoxedHandler {
    (move |req: Request| {
        let next = Arc::clone(&next);
        async move {
            let method = req.method().clone();
            let path = req.path().to_owned();
            let started = Instant::now();
            let res = next.call(req).await;
            info!(%method, %path, status = %res.status_code(), elapsed = ?started.elapsed(), "served");
            res
        }
    })
    .into_boxed_handler()
}

// Numbers requests and echoes the id back in `x-request-id`.
fn request_id() -> middleware::BoxedConstructor {
    let counter = Arc::new(AtomicU64::new(1));
    middleware::infallible(move |next| {
        let counter = Arc::clone(&counter);
        (move |req: Request| {
            let next = Arc::clone(&next);
            let id = counter.fetch_add(1, Ordering::Relaxed);
            async move {
                let mut res = next.call(req).await;
                res.headers_mut().insert("x-request-id", HeaderValue::from(id));
                res
            }
        })
        .into_boxed_handler()
    })
}

// Refuses to build without a token, so a misconfigured route fails at startup.
fn require_token(
    token: &'static str,
) -> impl Fn(BoxedHandler) -> Result<BoxedHandler, BoxError> + Send + Sync + 'static {
    move |next: BoxedHandler| {
        if token.is_empty() {
            return Err("admin token must not be empty".into());
        }
        let expected = format!("Bearer {token}");
        Ok((move |req: Request| {
            let next = Arc::clone(&next);
            let allowed = req.header("authorization") == Some(expected.as_str());
            async move {
                if allowed {
                    next.call(req).await
                } else {
                    Response::status(http::StatusCode::UNAUTHORIZED)
                }
            }
        })
        .into_boxed_handler())
    }
}

async fn get_user(req: Request) -> Response {
    let id = req.path().rsplit('/').next().unwrap_or("unknown");
    Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#))
}

async fn get_stats(_req: Request) -> Response {
    Response::json(r#"{"requests":3}"#)
}
