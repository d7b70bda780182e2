use async_trait::async_trait;

use crate::error::Result;

/// A loaded embedding model.
///
/// Implementations are shared read-only across requests, so `embed` takes
/// `&self` and must be safe to call from several tasks at once.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
    fn dimension(&self) -> usize;
    fn model_name(&self) -> &str;
}
