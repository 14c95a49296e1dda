mod common;

use std::sync::{Arc, Mutex};

use common::harness;
use mutu_core::models::UploadedFile;
use mutu_core::storage;
use mutu_core::{
    DocumentService, ErrorKind, FileStore, LocalFileStore, Result, ServiceContext, Storage,
};
use uuid::Uuid;

fn pdf(name: &str) -> UploadedFile {
    UploadedFile {
        original_name: name.to_string(),
        mime_type: Some("application/pdf".to_string()),
        bytes: b"%PDF-1.7 evidence".to_vec(),
    }
}

#[tokio::test]
async fn test_upload_download_delete() {
    let h = harness().await;
    let period = h.period().await;
    let criterion = h.criterion("7.1", None).await;
    let submission = h.submission(&period, &criterion, None).await;

    let document = h
        .services
        .documents
        .upload(submission.id, pdf("../SK Rektor.pdf"), h.actor)
        .await
        .unwrap();
    assert_eq!(document.size, 17);
    assert!(document.path.starts_with(&format!("submissions/{}/", submission.id)));
    assert!(!document.path.contains(".."));
    assert!(h.files.exists(&document.path).await.unwrap());

    let (meta, bytes) = h.services.documents.download(document.id).await.unwrap();
    assert_eq!(meta.original_name, "../SK Rektor.pdf");
    assert_eq!(bytes, b"%PDF-1.7 evidence");

    let listed = h.services.documents.list(submission.id).await.unwrap();
    assert_eq!(listed.len(), 1);

    h.services.documents.delete(document.id).await.unwrap();
    assert!(!h.files.exists(&document.path).await.unwrap());
    let err = h.services.documents.get(document.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_upload_to_missing_submission_stores_nothing() {
    let h = harness().await;
    let err = h
        .services
        .documents
        .upload(Uuid::new_v4(), pdf("bukti.pdf"), h.actor)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(!h.files.exists("submissions").await.unwrap());
}

/// Removes the submission while the blob is being written, so the metadata
/// insert that follows fails on its foreign key.
struct RacingStore {
    inner: LocalFileStore,
    storage: Storage,
    submission_id: Uuid,
    deleted: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl FileStore for RacingStore {
    async fn store(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.inner.store(key, bytes).await?;
        let mut conn = self.storage.acquire().await?;
        storage::submission::delete(&mut conn, self.submission_id).await
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        self.inner.read(key).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.deleted.lock().unwrap().push(key.to_string());
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.inner.exists(key).await
    }
}

#[tokio::test]
async fn test_failed_insert_removes_blob() {
    let h = harness().await;
    let period = h.period().await;
    let criterion = h.criterion("7.2", None).await;
    let submission = h.submission(&period, &criterion, None).await;

    let store = Arc::new(RacingStore {
        inner: LocalFileStore::new(h.files.root()),
        storage: h.storage.clone(),
        submission_id: submission.id,
        deleted: Mutex::new(Vec::new()),
    });
    let documents = DocumentService::new(ServiceContext::new(h.storage.clone()), store.clone());

    assert!(documents
        .upload(submission.id, pdf("bukti.pdf"), h.actor)
        .await
        .is_err());

    let deleted = store.deleted.lock().unwrap().clone();
    assert_eq!(deleted.len(), 1);
    assert!(!store.exists(&deleted[0]).await.unwrap());
}
