use std::sync::Arc;

use async_trait::async_trait;
use fastembed::{InitOptions, TextEmbedding};
use sembed_config::ModelConfig;
use sembed_core::{EmbedError, Embedder, Result};

use crate::model::ModelKind;

/// FastEmbed (ONNX runtime) model, loaded once and shared by every request.
pub struct FastEmbedder {
    model: Arc<TextEmbedding>,
    kind: ModelKind,
}

impl FastEmbedder {
    pub fn new(kind: ModelKind, config: &ModelConfig) -> Result<Self> {
        let mut options = InitOptions::new(kind.to_fastembed())
            .with_show_download_progress(config.show_download_progress);
        if let Some(dir) = &config.cache_dir {
            options = options.with_cache_dir(dir.clone());
        }

        tracing::info!(model = %kind, "Loading model...");
        let model = TextEmbedding::try_new(options).map_err(|e| EmbedError::Model(e.to_string()))?;
        tracing::info!(model = %kind, dimension = kind.dimension(), "Model loaded!");

        Ok(Self {
            model: Arc::new(model),
            kind,
        })
    }

    fn embed_blocking(model: &TextEmbedding, text: &str) -> Result<Vec<f32>> {
        model
            .embed(vec![text], None)
            .map_err(|e| EmbedError::Model(e.to_string()))?
            .into_iter()
            .next()
            .ok_or(EmbedError::EmptyOutput)
    }
}

#[async_trait]
impl Embedder for FastEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(EmbedError::EmptyInput);
        }

        // ONNX inference is CPU-bound; keep it off the async workers.
        let model = Arc::clone(&self.model);
        let text = text.to_owned();
        tokio::task::spawn_blocking(move || Self::embed_blocking(&model, &text))
            .await
            .map_err(|e| EmbedError::TaskFailed(e.to_string()))?
    }

    fn dimension(&self) -> usize {
        self.kind.dimension()
    }

    fn model_name(&self) -> &str {
        self.kind.as_str()
    }
}
