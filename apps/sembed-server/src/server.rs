use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::error::{Result, ServerError};
use crate::routes::router;
use crate::state::AppState;

pub struct Server {
    addr: SocketAddr,
    state: AppState,
    shutdown_tx: watch::Sender<bool>,
}

impl Server {
    pub fn new(addr: SocketAddr, state: AppState) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            addr,
            state,
            shutdown_tx,
        }
    }

    pub async fn bind(&self) -> Result<TcpListener> {
        TcpListener::bind(self.addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: self.addr,
                source,
            })
    }

    pub async fn run(&self) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until [`Server::shutdown`] is called.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let local = listener.local_addr().map_err(ServerError::Serve)?;
        tracing::info!(
            model = self.state.gate.model_name(),
            dimension = self.state.gate.dimension(),
            max_concurrent_inferences = self.state.gate.capacity(),
            "Ready to accept connections on http://{local}"
        );

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        axum::serve(listener, router(self.state.clone()).into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.wait_for(|stop| *stop).await;
                tracing::info!("Shutdown signal received");
            })
            .await
            .map_err(ServerError::Serve)
    }

    /// Stops a running (or future) `serve` call after in-flight requests finish.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }
}
