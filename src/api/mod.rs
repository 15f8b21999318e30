//! HTTP API.
//!
//! Exposes the portal pages as JSON endpoints. Routes are nested under
//! `/api/` and protected by a middleware stack: Rate Limit → Auth →
//! Audit → Handler.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_server, ApiServer, ServerSession};
pub use types::ApiContext;
