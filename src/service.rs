//! Deployable service: serves the router until a shutdown signal, then closes
//! the store.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use shuttle_runtime::CustomError;
use tokio::net::TcpListener;
use tracing::info;

use crate::store::Store;

pub struct RankingsService {
    pub router: Router,
    pub store: Arc<dyn Store>,
}

impl RankingsService {
    /// Serve on `listener` until `shutdown` resolves and in-flight requests
    /// drain. The store is closed afterwards, also when serving failed.
    pub async fn serve_until<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let res = axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await;
        self.store.close().await;
        info!("restaurant rankings stopped");
        res
    }
}

#[shuttle_runtime::async_trait]
impl shuttle_runtime::Service for RankingsService {
    async fn bind(self, addr: SocketAddr) -> Result<(), shuttle_runtime::Error> {
        let listener = TcpListener::bind(addr).await.map_err(CustomError::new)?;
        self.serve_until(listener, shutdown_signal())
            .await
            .map_err(CustomError::new)?;
        Ok(())
    }
}

/// Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
