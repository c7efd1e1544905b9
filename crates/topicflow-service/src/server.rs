//! HTTP server with graceful shutdown.

use std::future::Future;
use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::info;

use crate::api::{build_router, AppState};

/// Bind `addr` and serve until `shutdown` resolves.
pub async fn run_server_with_shutdown<F>(
    addr: SocketAddr,
    state: AppState,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    serve_listener(listener, state, shutdown).await
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve_listener<F>(
    listener: TcpListener,
    state: AppState,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let local = listener.local_addr()?;
    info!("HTTP server ready on {}", local);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("HTTP server shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::time::timeout;
    use topicflow_extract::{ExtractorConfig, NoOpCompletionClient, TopicExtractor};
    use topicflow_storage::{Storage, TopicStore};
    use topicflow_types::FlowSettings;

    use crate::orchestrator::FlowOrchestrator;
    use crate::source::InMemoryMessageSource;

    #[tokio::test]
    async fn test_server_starts_and_shuts_down() {
        let temp_dir = TempDir::new().unwrap();
        let storage = Arc::new(Storage::open(temp_dir.path()).unwrap());
        let orchestrator = Arc::new(FlowOrchestrator::new(
            Arc::new(TopicStore::new(storage)),
            Arc::new(InMemoryMessageSource::new()),
            TopicExtractor::new(Arc::new(NoOpCompletionClient), ExtractorConfig::default()),
            FlowSettings::default(),
        ));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let server_handle = tokio::spawn(async move {
            serve_listener(listener, AppState::new(orchestrator), async {
                rx.await.ok();
            })
            .await
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(()).unwrap();

        let result = timeout(Duration::from_secs(5), server_handle).await;
        assert!(result.is_ok(), "server did not shut down in time");
    }
}
