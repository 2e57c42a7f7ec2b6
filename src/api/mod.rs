//! HTTP API for recipe generation, listing, deletion and sharing.
//!
//! Routes are nested under `/api/`. Caller identity arrives in the
//! `X-User-Id` header set by the authentication gateway in front of the
//! service; routes that act on a user's recipes reject requests without it.
//!
//! The router is composable: `api_router()` returns a `Router` that can be
//! mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_api_server_on, ApiServer};
pub use types::ApiContext;
