//! API Module
//!
//! HTTP handlers and routing for the status API.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /stats` - Pipeline, cache and pool statistics
//! - `POST /stats/reset` - Zero the pipeline counters
//! - `GET /settings`, `POST /settings` - Read or merge the settings snapshot
//! - `GET /tasks/:id`, `DELETE /tasks/:id` - Poll or cancel a background task
//! - `DELETE /cache` - Drop every cached response

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
