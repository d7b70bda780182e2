//! Response body of the embedding endpoint.

use serde::{Deserialize, Serialize};

/// `{"vector": [...] | null, "errorMessage": "..." | null}`
///
/// Both keys are always written, the absent one as `null`. The constructors
/// only build states where exactly one of the two is set; a value decoded from
/// the wire may still carry neither, which [`EmbeddingOutput::into_vector`]
/// reports as an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingOutput {
    pub vector: Option<Vec<f32>>,
    pub error_message: Option<String>,
}

impl EmbeddingOutput {
    pub const fn success(vector: Vec<f32>) -> Self {
        Self {
            vector: Some(vector),
            error_message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            vector: None,
            error_message: Some(message.into()),
        }
    }

    pub const fn is_success(&self) -> bool {
        self.vector.is_some() && self.error_message.is_none()
    }

    /// An error message wins over a vector if a peer sends both.
    pub fn into_vector(self) -> Result<Vec<f32>, String> {
        match (self.vector, self.error_message) {
            (_, Some(message)) => Err(message),
            (Some(vector), None) => Ok(vector),
            (None, None) => Err("response carried neither a vector nor an error message".into()),
        }
    }
}
