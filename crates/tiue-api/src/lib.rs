//! # tiue-api
//!
//! REST handlers for the TIUE mobile backend.
//!
//! `/api/auth/*` proxies the university directory; the remaining `/api/*`
//! resources are served from the local PostgreSQL store. Every response uses
//! the `{"success": ..., "data" | "error": ...}` envelope.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod routes;

pub use error::{ApiError, ApiResult};
pub use extractors::AppState;
pub use routes::router;
