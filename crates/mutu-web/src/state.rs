use std::sync::Arc;

use mutu_core::{LocalFileStore, ServiceContext, Services, Storage};

use crate::config::ServerConfig;

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
}

impl AppState {
    pub async fn open(config: &ServerConfig) -> anyhow::Result<Self> {
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let storage = Storage::open(&config.db_path.to_string_lossy()).await?;
        Ok(Self::with_storage(storage, LocalFileStore::new(&config.upload_dir)))
    }

    pub fn with_storage(storage: Storage, files: LocalFileStore) -> Self {
        let ctx = ServiceContext::new(storage);
        Self {
            services: Services::new(&ctx, Arc::new(files)),
        }
    }
}
