use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::ServiceContext;
use crate::files::FileStore;
use crate::models::{Document, UploadedFile};
use crate::storage;
use crate::{ActorId, Error, Result};

/// Evidence files attached to submissions. Bytes live in the file store,
/// metadata in the database.
#[derive(Clone)]
pub struct DocumentService {
    ctx: ServiceContext,
    files: Arc<dyn FileStore>,
}

impl DocumentService {
    pub fn new(ctx: ServiceContext, files: Arc<dyn FileStore>) -> Self {
        Self { ctx, files }
    }

    /// Stores the blob, then records it. A failed insert removes the blob
    /// again.
    pub async fn upload(
        &self,
        submission_id: Uuid,
        file: UploadedFile,
        actor: ActorId,
    ) -> Result<Document> {
        if file.bytes.is_empty() {
            return Err(Error::validation("file", "uploaded file is empty"));
        }
        {
            let mut conn = self.ctx.storage.acquire().await?;
            storage::submission::get(&mut conn, submission_id).await?;
        }

        let id = Uuid::new_v4();
        let key = format!("submissions/{submission_id}/{id}-{}", file.safe_name());
        let size = i64::try_from(file.bytes.len()).map_err(|_| {
            Error::validation("file", "uploaded file is too large")
        })?;
        self.files.store(&key, &file.bytes).await?;

        let document = Document {
            id,
            submission_id,
            original_name: file.original_name,
            mime_type: file.mime_type,
            size,
            path: key,
            uploaded_by: Some(actor),
            created_at: Utc::now(),
        };
        if let Err(e) = self.record(&document).await {
            if let Err(cleanup) = self.files.delete(&document.path).await {
                warn!(path = %document.path, error = %cleanup, "Failed to remove orphaned upload");
            }
            return Err(e);
        }

        info!(
            id = %document.id,
            %submission_id,
            name = %document.original_name,
            size = document.size,
            "Document uploaded"
        );
        Ok(document)
    }

    pub async fn get(&self, id: Uuid) -> Result<Document> {
        let mut conn = self.ctx.storage.acquire().await?;
        storage::document::get(&mut conn, id).await
    }

    pub async fn list(&self, submission_id: Uuid) -> Result<Vec<Document>> {
        let mut conn = self.ctx.storage.acquire().await?;
        storage::submission::get(&mut conn, submission_id).await?;
        storage::document::list_for_submission(&mut conn, submission_id).await
    }

    pub async fn download(&self, id: Uuid) -> Result<(Document, Vec<u8>)> {
        let document = self.get(id).await?;
        let bytes = self.files.read(&document.path).await?;
        Ok((document, bytes))
    }

    /// Removes the record first. A blob that cannot be removed afterwards is
    /// only logged.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let mut tx = self.ctx.storage.begin().await?;
        let document = storage::document::get(&mut tx, id).await?;
        storage::document::delete(&mut tx, id).await?;
        tx.commit().await?;

        if let Err(e) = self.files.delete(&document.path).await {
            warn!(%id, path = %document.path, error = %e, "Failed to remove document file");
        }
        info!(%id, name = %document.original_name, "Document deleted");
        Ok(())
    }

    async fn record(&self, document: &Document) -> Result<()> {
        let mut tx = self.ctx.storage.begin().await?;
        storage::document::insert(&mut tx, document).await?;
        tx.commit().await?;
        Ok(())
    }
}
