use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::AppConfig;
use crate::core::lifecycle::LifecycleManager;
use crate::core::records::RecordService;
use crate::core::store::SqliteRecordStore;
use crate::core::terminal;
use crate::interfaces::web::{ApiServer, ApiServerConfig};

/// Build the store and API server, run until Ctrl+C, then shut down.
pub async fn run_server(config: AppConfig) -> Result<()> {
    let db_path = config.db_path();
    let store = SqliteRecordStore::new(
        &db_path,
        config.database.name.clone(),
        config.database.collection.clone(),
    )?;
    let service = Arc::new(RecordService::new(Arc::new(store)));

    let server = ApiServer::new(ApiServerConfig {
        service,
        host: config.server.host.clone(),
        port: config.server.port,
        max_upload_bytes: config.max_upload_bytes(),
    });
    let address = server.address();

    let mut lifecycle = LifecycleManager::new();
    lifecycle.attach(Arc::new(Mutex::new(server)));
    lifecycle.start().await?;

    terminal::print_banner();
    terminal::print_link("API", &format!("http://{address}"));
    terminal::print_status("Store", &db_path.display().to_string());
    terminal::print_status("Collection", &config.database.collection);
    println!();

    info!("Server is ready. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    lifecycle.shutdown().await?;
    Ok(())
}
