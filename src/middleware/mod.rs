//! Middleware layer.
//!
//! Middleware is the right place for cross-cutting concerns: structured
//! tracing, metrics, request-id injection, authentication-header inspection.
//! obi ships none of them. It only decides the order they run in.
//!
//! A piece of middleware is described by a [`Constructor`]: given the next
//! handler, it returns a handler that wraps it, or an error if it cannot be
//! built. A [`Chain`] holds constructors in order and folds them around a
//! terminal handler:
//!
//! ```rust
//! use obi::middleware::{self, Chain};
//! use obi::{BoxedHandler, Handler, Request, Response};
//!
//! fn server_header(next: BoxedHandler) -> BoxedHandler {
//!     (move |req: Request| {
//!         let next = next.clone();
//!         async move {
//!             let mut res = next.call(req).await;
//!             res.headers_mut().insert("server", http::HeaderValue::from_static("obi"));
//!             res
//!         }
//!     })
//!     .into_boxed_handler()
//! }
//!
//! async fn app(_req: Request) -> Response {
//!     Response::text("app")
//! }
//!
//! let chain = Chain::new([middleware::infallible(server_header)]);
//! let handler = chain.then_fn(Some(app)).unwrap();
//! ```
//!
//! ```text
//!   request ──▶ c1 ──▶ c2 ──▶ … ──▶ cn ──▶ terminal
//!  response ◀── c1 ◀── c2 ◀── … ◀── cn ◀──┘
//! ```

mod chain;

use std::convert::Infallible;
use std::sync::Arc;

use crate::error::BoxError;
use crate::handler::BoxedHandler;

pub use chain::Chain;

/// Builds one middleware layer around the handler it is given.
///
/// Implemented for every `Fn(BoxedHandler) -> Result<BoxedHandler, E>` whose
/// error converts into [`BoxError`]. Called exactly once per
/// materialization. A constructor is free to ignore `next` entirely, e.g. to
/// short-circuit every request.
pub trait Constructor: Send + Sync + 'static {
    fn wrap(&self, next: BoxedHandler) -> Result<BoxedHandler, BoxError>;
}

impl<F, E> Constructor for F
where
    F: Fn(BoxedHandler) -> Result<BoxedHandler, E> + Send + Sync + 'static,
    E: Into<BoxError>,
{
    fn wrap(&self, next: BoxedHandler) -> Result<BoxedHandler, BoxError> {
        self(next).map_err(Into::into)
    }
}

/// A shared, type-erased constructor as stored in a [`Chain`].
pub type BoxedConstructor = Arc<dyn Constructor>;

/// Erases a constructor's type so it can sit next to others in a chain.
pub fn constructor(c: impl Constructor) -> BoxedConstructor {
    Arc::new(c)
}

/// Lifts a wrapper that cannot fail into a constructor.
pub fn infallible<F>(f: F) -> BoxedConstructor
where
    F: Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static,
{
    constructor(move |next: BoxedHandler| Ok::<_, Infallible>(f(next)))
}
