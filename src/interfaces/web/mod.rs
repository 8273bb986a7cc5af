mod handlers;
mod router;

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::core::lifecycle::LifecycleComponent;
use crate::core::records::RecordService;

use router::build_api_router;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) service: Arc<RecordService>,
    pub(crate) max_upload_bytes: usize,
}

pub struct ApiServerConfig {
    pub service: Arc<RecordService>,
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

pub struct ApiServer {
    service: Arc<RecordService>,
    host: String,
    port: u16,
    max_upload_bytes: usize,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ApiServer {
    pub fn new(config: ApiServerConfig) -> Self {
        Self {
            service: config.service,
            host: config.host,
            port: config.port,
            max_upload_bytes: config.max_upload_bytes,
            shutdown_tx: None,
            handle: None,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[async_trait]
impl LifecycleComponent for ApiServer {
    async fn on_init(&mut self) -> Result<()> {
        info!("API Server Interface initializing...");
        Ok(())
    }

    async fn on_start(&mut self) -> Result<()> {
        let addr = self.address();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("binding {addr}"))?;

        let app = build_api_router(AppState {
            service: self.service.clone(),
            max_upload_bytes: self.max_upload_bytes,
        });
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        info!("API Server running at http://{addr}");
        self.handle = Some(tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = served {
                error!("API Server crashed: {}", e);
            }
        }));
        self.shutdown_tx = Some(shutdown_tx);
        Ok(())
    }

    async fn on_shutdown(&mut self) -> Result<()> {
        info!("API Server Interface shutting down...");
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.await.context("API Server task panicked")?;
        }
        Ok(())
    }
}
