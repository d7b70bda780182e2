use std::net::SocketAddr;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error(transparent)]
    Config(#[from] sembed_config::ConfigError),

    #[error(transparent)]
    Embed(#[from] sembed_core::EmbedError),
}

pub type Result<T> = std::result::Result<T, ServerError>;
