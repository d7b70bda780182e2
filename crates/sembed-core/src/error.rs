use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("Input text is empty")]
    EmptyInput,

    #[error("Model returned no embedding for the input")]
    EmptyOutput,

    #[error("Unknown embedding model: {0}")]
    UnknownModel(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Inference task failed: {0}")]
    TaskFailed(String),
}

impl EmbedError {
    /// Short category shown to callers when diagnostics are not exposed.
    pub const fn category(&self) -> &'static str {
        match self {
            Self::EmptyInput | Self::EmptyOutput => "Invalid input for inference",
            Self::UnknownModel(_) | Self::Model(_) | Self::TaskFailed(_) => {
                "Error running inference"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, EmbedError>;
