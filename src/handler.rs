//! Handler trait and type erasure.
//!
//! # How handlers are stored
//!
//! A chain wraps handlers of *different* concrete types around each other:
//! the terminal is usually an `async fn`, every layer above it is whatever
//! closure its constructor returned. To nest them we hide each concrete type
//! behind one trait object, [`ErasedHandler`], and pass them around as
//! [`BoxedHandler`].
//!
//! ```text
//! async fn app(req: Request) -> Response { … }    ← user writes this
//!        ↓ app.into_boxed_handler()
//! Arc::new(FnHandler(app))                        ← heap-allocated wrapper
//!        ↓  BoxedHandler = Arc<dyn ErasedHandler>
//! constructor.wrap(handler)                       ← one layer per constructor
//!        ↓
//! handler.call(req)  at request time              ← one vtable dispatch per layer
//! ```
//!
//! Because a `BoxedHandler` is an `Arc`, handing the same handler to several
//! places is a reference-count bump, and two handles can be compared for
//! identity with [`Arc::ptr_eq`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// A heap-allocated, type-erased future that resolves to a [`Response`].
///
/// `Send + 'static` so the runtime driving the handler may move it across
/// threads.
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Object-safe dispatch interface shared by every handler.
///
/// Middleware calls the next layer through this trait:
/// `next.call(req).await`.
pub trait ErasedHandler: Send + Sync + 'static {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A type-erased handler shared across layers and concurrent requests.
pub type BoxedHandler = Arc<dyn ErasedHandler>;

/// Implemented for every function usable as a handler.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` or closure with the shape:
///
/// ```text
/// Fn(Request) -> impl Future<Output = impl IntoResponse>
/// ```
///
/// The trait is **sealed**: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    /// Erases the concrete type so the handler can sit in a chain.
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

/// Newtype that bridges a concrete function to [`ErasedHandler`].
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}
