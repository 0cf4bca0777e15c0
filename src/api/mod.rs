//! Webhook server for the voice platform.
//!
//! ## Endpoints
//!
//! - `GET|POST /` - SWML document describing the agent
//! - `POST /swaig` - Run a SWAIG function
//! - `POST /post_prompt` - Receive the end-of-call summary
//! - `GET /health` - Health check (no auth)

mod auth;
mod routes;
pub mod types;

pub use auth::is_authorized;
pub use routes::{router, serve, AppState};
