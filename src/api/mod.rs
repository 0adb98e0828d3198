//! HTTP/JSON API.
//!
//! Routes are nested under `/api/`. Protected routes run through
//! Audit → Auth → Role gate before reaching a handler.
//!
//! The router is composable: `build_router()` returns a `Router` that
//! can be mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::build_router;
pub use server::{start_server, ApiServer, ServerError, ServerSession};
pub use types::ApiContext;
