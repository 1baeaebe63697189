//! Bridge from a composed handler to hyper.
//!
//! obi does not listen on sockets. Whatever serves requests (a hyper
//! connection loop, a test harness) drives the composed handler through
//! [`HandlerService`]:
//!
//! ```rust,ignore
//! let svc = HandlerService::new(chain.then_fn(Some(app))?);
//! ConnBuilder::new(TokioExecutor::new()).serve_connection(io, svc).await?;
//! ```

use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::service::Service;
use tracing::warn;

use crate::handler::BoxedHandler;
use crate::request::Request;
use crate::response::Response;

/// A [`hyper::service::Service`] that feeds every request to one handler.
///
/// Cloning is cheap: clones share the handler.
#[derive(Clone)]
pub struct HandlerService {
    handler: BoxedHandler,
}

impl HandlerService {
    pub fn new(handler: BoxedHandler) -> Self {
        Self { handler }
    }
}

impl fmt::Debug for HandlerService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerService").finish_non_exhaustive()
    }
}

impl<B> Service<http::Request<B>> for HandlerService
where
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: fmt::Display,
{
    type Response = http::Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<B>) -> Self::Future {
        let handler = Arc::clone(&self.handler);
        Box::pin(async move { Ok(dispatch(handler, req).await) })
    }
}

/// Buffers one request and runs it through the handler.
///
/// Every failure is answered here, so hyper never sees an error.
async fn dispatch<B>(handler: BoxedHandler, req: http::Request<B>) -> http::Response<Full<Bytes>>
where
    B: Body,
    B::Error: fmt::Display,
{
    let (head, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(method = %head.method, path = head.uri.path(), "failed to read request body: {e}");
            return Response::status(StatusCode::BAD_REQUEST).into_inner();
        }
    };

    handler.call(Request::from_parts(head, body)).await.into_inner()
}
