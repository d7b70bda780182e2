//! # sembed-core
//!
//! The pieces every sembed binary shares: the [`Embedder`] port that hides the
//! model, the [`EmbeddingOutput`] wire shape, and the [`InferenceGate`] that
//! bounds how many inference calls run at once.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use sembed_core::{Embedder, GateOutcome, InferenceGate};
//!
//! # async fn run(embedder: Arc<dyn Embedder>) {
//! let gate = InferenceGate::new(embedder, 4, Duration::from_secs(2));
//!
//! match gate.embed("hello").await {
//!     GateOutcome::Success(vector) => println!("{} dims", vector.len()),
//!     GateOutcome::CapacityExceeded { limit } => println!("busy ({limit} in flight)"),
//!     GateOutcome::InferenceError(e) => println!("failed: {e}"),
//! }
//! # }
//! ```

pub mod embedder;
pub mod error;
pub mod gate;
pub mod output;

pub use embedder::Embedder;
pub use error::{EmbedError, Result};
pub use gate::{
    DEFAULT_ACQUIRE_TIMEOUT, DEFAULT_MAX_CONCURRENT_INFERENCES, GateOutcome, InferenceGate,
};
pub use output::EmbeddingOutput;
