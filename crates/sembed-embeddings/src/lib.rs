//! Embedding providers behind [`sembed_core::Embedder`].
//!
//! The default build ships the FastEmbed (ONNX) provider. Model files are
//! downloaded on first use into the configured cache directory.

use std::sync::Arc;

use sembed_config::ModelConfig;
use sembed_core::{Embedder, Result};

#[cfg(feature = "fastembed")]
mod fastembed_provider;
mod model;

#[cfg(feature = "fastembed")]
pub use fastembed_provider::FastEmbedder;
pub use model::ModelKind;

/// Load the model named in `config`.
///
/// Blocking: reads (and possibly downloads) the model files, so call it from
/// `spawn_blocking` or before the runtime starts.
pub fn create_embedder(config: &ModelConfig) -> Result<Arc<dyn Embedder>> {
    let kind: ModelKind = config.name.parse()?;
    load(kind, config)
}

#[cfg(feature = "fastembed")]
fn load(kind: ModelKind, config: &ModelConfig) -> Result<Arc<dyn Embedder>> {
    Ok(Arc::new(FastEmbedder::new(kind, config)?))
}

#[cfg(not(feature = "fastembed"))]
fn load(kind: ModelKind, _config: &ModelConfig) -> Result<Arc<dyn Embedder>> {
    Err(sembed_core::EmbedError::Model(format!(
        "no embedding provider compiled in for {kind}"
    )))
}
