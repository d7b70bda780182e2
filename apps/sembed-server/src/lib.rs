//! # sembed-server
//!
//! Serves `GET /embedParagraph/?text=...`. Requests must carry the shared
//! secret in the `Authorization` header; accepted requests pass through the
//! [`InferenceGate`](sembed_core::InferenceGate) and always answer with the
//! [`EmbeddingOutput`](sembed_core::EmbeddingOutput) shape.

pub mod auth;
pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{Result, ServerError};
pub use routes::router;
pub use server::Server;
pub use state::AppState;
