//! Client for `GET /embedParagraph/`.
//!
//! [`EmbeddingClient::embed_output`] returns the service's response shape as
//! is; [`EmbeddingClient::embed`] turns it into a `Result`, separating a busy
//! service from other failures so callers can decide whether to retry.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use sembed_config::Config;
use sembed_core::EmbeddingOutput;
use thiserror::Error;

const CAPACITY_PREFIX: &str = "Reached maximum concurrent model inferences limit";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Credentials rejected by the embedding service")]
    Forbidden,

    #[error("Embedding service is busy: {0}")]
    Busy(String),

    #[error("Embedding service error: {0}")]
    Service(String),

    #[error("Invalid response from embedding service: {0}")]
    InvalidResponse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ClientError {
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Forbidden => 2,
            Self::Busy(_) => 3,
            Self::Service(_) => 4,
            Self::InvalidResponse(_) | Self::Http(_) => 10,
        }
    }

    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy(_))
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl EmbeddingClient {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/embedParagraph/", base_url.trim_end_matches('/')),
            api_key,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.client.base_url, config.api_key().map(String::from))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn embed_output(&self, text: &str) -> Result<EmbeddingOutput> {
        let mut request = self.http.get(&self.endpoint).query(&[("text", text)]);
        if let Some(key) = &self.api_key {
            request = request.header(AUTHORIZATION, key);
        }

        let response = request.send().await?;
        match response.status() {
            StatusCode::OK => response
                .json::<EmbeddingOutput>()
                .await
                .map_err(|e| ClientError::InvalidResponse(e.to_string())),
            StatusCode::FORBIDDEN => Err(ClientError::Forbidden),
            status => {
                tracing::debug!(%status, "Unexpected status from embedding service");
                Err(ClientError::InvalidResponse(status.to_string()))
            }
        }
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_output(text)
            .await?
            .into_vector()
            .map_err(|message| {
                if message.starts_with(CAPACITY_PREFIX) {
                    ClientError::Busy(message)
                } else {
                    ClientError::Service(message)
                }
            })
    }
}
