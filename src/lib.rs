//! # obi
//!
//! Ordered, immutable middleware chains for async HTTP handlers.
//! Nothing more. Nothing less.
//!
//! ## The contract
//!
//! You bring the middleware and the application handler. obi puts them in
//! order: the first layer you list runs first, the handler runs last, and the
//! chain you built stays exactly as you built it no matter how many routes
//! derive from it.
//!
//! What obi leaves to others:
//!
//! - **Routing** — pick the handler, then wrap it
//! - **Middleware** — auth, logging, compression are plain constructors you write or import
//! - **Serving** — hyper drives the composed handler via [`HandlerService`]
//!
//! ## Quick start
//!
//! ```rust
//! use obi::middleware::{self, Chain};
//! use obi::{BoxedHandler, Handler, Request, Response};
//!
//! fn timing(next: BoxedHandler) -> BoxedHandler {
//!     (move |req: Request| {
//!         let next = next.clone();
//!         async move {
//!             let started = std::time::Instant::now();
//!             let res = next.call(req).await;
//!             tracing::info!(elapsed = ?started.elapsed(), "request served");
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
//! let common = Chain::new([middleware::infallible(timing)]);
//! let handler = common.then_fn(Some(app)).expect("middleware failed to build");
//! ```

mod error;
mod handler;
mod request;
mod response;
mod service;

pub mod dispatcher;
pub mod middleware;

pub use error::{BoxError, Error};
pub use handler::{BoxFuture, BoxedHandler, ErasedHandler, Handler};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use service::HandlerService;
