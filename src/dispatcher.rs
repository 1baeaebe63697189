//! The process-wide default dispatcher.
//!
//! When a chain is materialized without a terminal handler
//! (`chain.then(None)`), the composed handler ends in the default dispatcher
//! instead. It is owned by the application, not by any chain: install it once
//! at startup, before the first chain is materialized.
//!
//! ```rust
//! use obi::{Handler, Request, Response, dispatcher};
//!
//! async fn app(_req: Request) -> Response {
//!     Response::text("app")
//! }
//!
//! dispatcher::set_default_dispatcher(app.into_boxed_handler()).ok();
//! ```
//!
//! If nothing is installed the default answers every request with
//! `404 Not Found`.

use std::sync::{Arc, OnceLock};

use http::StatusCode;
use tracing::{info, warn};

use crate::handler::{BoxedHandler, Handler};
use crate::request::Request;
use crate::response::Response;

static DEFAULT: OnceLock<BoxedHandler> = OnceLock::new();

/// Returns the process-wide default dispatcher.
///
/// Every call hands out the same `Arc`, so `Arc::ptr_eq` holds between any
/// two results.
pub fn default_dispatcher() -> BoxedHandler {
    Arc::clone(DEFAULT.get_or_init(|| not_found.into_boxed_handler()))
}

/// Installs `handler` as the process-wide default dispatcher.
///
/// Succeeds only once, and only before [`default_dispatcher`] was first used.
/// A rejected handler is handed back unchanged.
pub fn set_default_dispatcher(handler: BoxedHandler) -> Result<(), BoxedHandler> {
    match DEFAULT.set(handler) {
        Ok(()) => {
            info!("default dispatcher installed");
            Ok(())
        }
        Err(handler) => {
            warn!("default dispatcher already set, ignoring");
            Err(handler)
        }
    }
}

async fn not_found(_req: Request) -> Response {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .text("404 page not found\n")
}
