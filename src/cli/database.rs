use anyhow::Result;

use crate::config::AppConfig;
use crate::core::records::{ConnectionState, Record, RecordService};
use crate::core::store::SqliteRecordStore;
use crate::core::terminal::{print_error, print_info, print_status, print_success, print_warn};

fn open_store(config: &AppConfig) -> Result<SqliteRecordStore> {
    Ok(SqliteRecordStore::new(
        config.db_path(),
        config.database.name.clone(),
        config.database.collection.clone(),
    )?)
}

/// Create the collection and its indexes; optionally reset it or seed one record.
pub async fn init_db(config: &AppConfig, drop_existing: bool, with_sample: bool) -> Result<()> {
    let store = open_store(config)?;
    if drop_existing {
        print_warn(&format!(
            "Dropping collection '{}' before initializing.",
            store.collection()
        ));
    }
    store.initialize(drop_existing).await?;
    print_success(&format!(
        "Collection '{}' ready at {}",
        store.collection(),
        store.path().display()
    ));

    if with_sample {
        let record = Record::sample();
        store.insert_one(&record).await?;
        print_info("Inserted a sample record.");
        print_status("Record ID", &record.id.to_hex());
        print_status("Task ID", &record.task_id);
    }
    Ok(())
}

/// Run the connection probe. Returns whether the store answered.
pub async fn ping(config: &AppConfig) -> Result<bool> {
    let service = RecordService::new(std::sync::Arc::new(open_store(config)?));
    let status = service.check_connection().await;
    match status.status {
        ConnectionState::Connected => {
            print_success(&status.message);
            if let Some(db) = &status.database {
                print_status("Database", db);
            }
            print_status("Path", &config.db_path().display().to_string());
            Ok(true)
        }
        ConnectionState::Error => {
            print_error(&format!("Database connection failed: {}", status.message));
            Ok(false)
        }
    }
}
