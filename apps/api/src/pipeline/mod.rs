//! Upload Pipeline — the two-phase, persisted state machine behind the CV
//! chat page. Phase 1 registers an uploaded PDF; phase 2 runs
//! Text Repair → Markdown Structurer → Section Extractor → Prompt Generator,
//! persists the results, and handles failure and forced reprocess.
//!
//! All collaborators (record store, blob store, text extractor, advisory
//! lock) are injected at construction; the composition root owns their
//! lifecycle.

pub mod handlers;
pub mod lock;
pub mod prompts;
pub mod repair;
pub mod sections;
pub mod store;
pub mod structure;

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extract::TextExtractor;
use crate::models::upload::{UploadRecord, UploadStatus};
use crate::storage::BlobStore;

use lock::ProcessLock;
use prompts::{generate_prompts, PromptRules};
use repair::repair;
use sections::extract_sections;
use store::UploadStore;
use structure::{structure, StructureLexicon};

pub const ACCEPTED_MIME: &str = "application/pdf";
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
const SUMMARY_CHARS: usize = 500;

/// Result of a successful processing run.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    /// First 500 characters of the markdown, for display.
    pub summary: String,
    /// Full structured markdown.
    pub extracted_text: String,
    pub prompts: Vec<String>,
}

pub struct Pipeline {
    store: Arc<dyn UploadStore>,
    blobs: Arc<dyn BlobStore>,
    extractor: Arc<dyn TextExtractor>,
    lock: Arc<dyn ProcessLock>,
    lexicon: StructureLexicon,
    prompt_rules: PromptRules,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn UploadStore>,
        blobs: Arc<dyn BlobStore>,
        extractor: Arc<dyn TextExtractor>,
        lock: Arc<dyn ProcessLock>,
    ) -> Self {
        Self {
            store,
            blobs,
            extractor,
            lock,
            lexicon: StructureLexicon::default(),
            prompt_rules: PromptRules::default(),
        }
    }

    pub fn store(&self) -> &dyn UploadStore {
        self.store.as_ref()
    }

    /// Phase 1: validates and registers an uploaded file, storing the bytes
    /// under a transient blob key.
    pub async fn register_upload(
        &self,
        owner_id: Uuid,
        bytes: Bytes,
        filename: &str,
        mime_type: &str,
    ) -> Result<UploadRecord, AppError> {
        if bytes.is_empty() {
            return Err(AppError::Validation("No file was supplied".to_string()));
        }
        if mime_type != ACCEPTED_MIME {
            return Err(AppError::Validation(format!(
                "Unsupported file type '{mime_type}'; only {ACCEPTED_MIME} is accepted"
            )));
        }
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(AppError::Validation(format!(
                "File exceeds the {} MiB upload limit",
                MAX_UPLOAD_BYTES / (1024 * 1024)
            )));
        }

        let key = format!("uploads/{owner_id}/{}.pdf", Uuid::new_v4());
        self.blobs.store(&key, bytes, ACCEPTED_MIME).await?;

        match self.store.insert(owner_id, &key, filename).await {
            Ok(record) => {
                info!("Registered upload {} for owner {owner_id}", record.id);
                Ok(record)
            }
            Err(e) => {
                // The record never existed; discard the transient bytes.
                if let Err(cleanup) = self.blobs.delete(&key).await {
                    warn!("Could not discard transient blob {key}: {cleanup}");
                }
                Err(e)
            }
        }
    }

    /// Phase 2: runs the text pipeline for a registered upload.
    ///
    /// Holds the per-record advisory lock for the whole attempt so two
    /// concurrent calls cannot both pass the status check.
    pub async fn process_upload(
        &self,
        id: Uuid,
        owner_id: Uuid,
        force: bool,
    ) -> Result<ProcessOutcome, AppError> {
        if !self.lock.try_acquire(id).await? {
            return Err(AppError::Conflict(
                "This upload is already being processed".to_string(),
            ));
        }
        let result = self.process_locked(id, owner_id, force).await;
        self.lock.release(id).await;
        result
    }

    async fn process_locked(
        &self,
        id: Uuid,
        owner_id: Uuid,
        force: bool,
    ) -> Result<ProcessOutcome, AppError> {
        let record = self
            .store
            .get(id, owner_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Upload {id} not found")))?;

        if record.status != UploadStatus::Uploaded {
            if !force {
                return Err(AppError::InvalidState(
                    "Upload has already been processed; pass force=true to reprocess".to_string(),
                ));
            }
            // Reset is only allowed while the transient bytes still exist,
            // otherwise reprocessing is guaranteed to fail after the reset.
            let available = match record.raw_file_ref.as_deref() {
                Some(key) => self.blobs.read(key).await?.is_some(),
                None => false,
            };
            if !available {
                return Err(AppError::InvalidState(
                    "The original file is no longer available; upload the CV again".to_string(),
                ));
            }
            self.store.reset_for_reprocess(id).await?;
            info!("Upload {id} reset for forced reprocess");
        }

        match self.run_stages(&record).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                let message = e.to_string();
                if let Err(persist) = self.store.mark_error(id, &message, Utc::now()).await {
                    tracing::error!("Could not persist error state for upload {id}: {persist}");
                }
                Err(e)
            }
        }
    }

    /// Steps 3–8 of a processing attempt: resolve bytes, extract, transform,
    /// persist, release. Purely in memory between resolve and persist.
    async fn run_stages(&self, record: &UploadRecord) -> Result<ProcessOutcome, AppError> {
        let key = record
            .raw_file_ref
            .clone()
            .ok_or_else(|| AppError::NotFound("Uploaded file reference is missing".to_string()))?;
        let bytes = self
            .blobs
            .read(&key)
            .await?
            .ok_or_else(|| AppError::NotFound("Uploaded file is no longer available".to_string()))?;

        // pdf-extract is CPU-bound; keep it off the async workers.
        let extractor = Arc::clone(&self.extractor);
        let raw = tokio::task::spawn_blocking(move || extractor.extract(&bytes))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("extraction task failed: {e}")))??;

        let repaired = repair(&raw);
        let markdown = structure(&repaired, &self.lexicon);
        let flags = extract_sections(&markdown);
        let prompt_list = generate_prompts(&markdown, &flags, &self.prompt_rules);
        let summary = summarize(&markdown);

        // Commit first, then best-effort delete: an orphaned blob is
        // recoverable, a processed record without its source is not.
        self.store
            .mark_processed(record.id, &markdown, &prompt_list, Utc::now())
            .await?;
        if let Err(e) = self.blobs.delete(&key).await {
            warn!("Could not delete transient blob {key} after processing: {e}");
        }

        info!(
            "Processed upload {} ({} prompts, {} chars of markdown)",
            record.id,
            prompt_list.len(),
            markdown.len()
        );

        Ok(ProcessOutcome {
            summary,
            extracted_text: markdown,
            prompts: prompt_list,
        })
    }
}

/// First `SUMMARY_CHARS` characters of the markdown with a truncation marker,
/// split on a character boundary.
pub fn summarize(markdown: &str) -> String {
    if markdown.chars().count() <= SUMMARY_CHARS {
        return markdown.to_string();
    }
    let mut summary: String = markdown.chars().take(SUMMARY_CHARS).collect();
    summary.push_str("...");
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sqlx::types::Json;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    const SYNTHETIC_EXTRACTION: &str = "J o h n   D o e\nEXPERIENCE\nSenior Engineer  2019 - 2023\nAcme Inc\n- Built things\nEDUCATION\nBS Computer Science";

    #[derive(Default)]
    struct MemoryUploadStore {
        records: Mutex<HashMap<Uuid, UploadRecord>>,
    }

    impl MemoryUploadStore {
        async fn snapshot(&self, id: Uuid) -> UploadRecord {
            self.records.lock().await.get(&id).cloned().expect("record exists")
        }
    }

    #[async_trait]
    impl UploadStore for MemoryUploadStore {
        async fn insert(
            &self,
            owner_id: Uuid,
            raw_file_ref: &str,
            filename: &str,
        ) -> Result<UploadRecord, AppError> {
            let record = UploadRecord {
                id: Uuid::new_v4(),
                owner_id,
                filename: filename.to_string(),
                status: UploadStatus::Uploaded,
                raw_file_ref: Some(raw_file_ref.to_string()),
                extracted_text: None,
                prompts: None,
                error_message: None,
                processed_at: None,
                created_at: Utc::now(),
            };
            self.records.lock().await.insert(record.id, record.clone());
            Ok(record)
        }

        async fn get(&self, id: Uuid, owner_id: Uuid) -> Result<Option<UploadRecord>, AppError> {
            Ok(self
                .records
                .lock()
                .await
                .get(&id)
                .filter(|r| r.owner_id == owner_id)
                .cloned())
        }

        async fn reset_for_reprocess(&self, id: Uuid) -> Result<(), AppError> {
            let mut records = self.records.lock().await;
            let record = records.get_mut(&id).expect("record exists");
            record.status = UploadStatus::Uploaded;
            record.extracted_text = None;
            record.prompts = None;
            record.error_message = None;
            record.processed_at = None;
            Ok(())
        }

        async fn mark_processed(
            &self,
            id: Uuid,
            extracted_text: &str,
            prompts: &[String],
            at: chrono::DateTime<Utc>,
        ) -> Result<(), AppError> {
            let mut records = self.records.lock().await;
            let record = records.get_mut(&id).expect("record exists");
            record.status = UploadStatus::Processed;
            record.extracted_text = Some(extracted_text.to_string());
            record.prompts = Some(Json(prompts.to_vec()));
            record.error_message = None;
            record.processed_at = Some(at);
            record.raw_file_ref = None;
            Ok(())
        }

        async fn mark_error(
            &self,
            id: Uuid,
            message: &str,
            at: chrono::DateTime<Utc>,
        ) -> Result<(), AppError> {
            let mut records = self.records.lock().await;
            let record = records.get_mut(&id).expect("record exists");
            record.status = UploadStatus::Error;
            record.error_message = Some(message.to_string());
            record.processed_at = Some(at);
            Ok(())
        }

        async fn latest_processed_for_owner(
            &self,
            owner_id: Uuid,
        ) -> Result<Option<UploadRecord>, AppError> {
            Ok(self
                .records
                .lock()
                .await
                .values()
                .filter(|r| r.owner_id == owner_id && r.status == UploadStatus::Processed)
                .max_by_key(|r| r.processed_at)
                .cloned())
        }
    }

    #[derive(Default)]
    struct MemoryBlobStore {
        blobs: Mutex<HashMap<String, Bytes>>,
    }

    #[async_trait]
    impl BlobStore for MemoryBlobStore {
        async fn store(&self, key: &str, bytes: Bytes, _content_type: &str) -> Result<(), AppError> {
            self.blobs.lock().await.insert(key.to_string(), bytes);
            Ok(())
        }

        async fn read(&self, key: &str) -> Result<Option<Bytes>, AppError> {
            Ok(self.blobs.lock().await.get(key).cloned())
        }

        async fn delete(&self, key: &str) -> Result<(), AppError> {
            self.blobs.lock().await.remove(key);
            Ok(())
        }
    }

    /// Extractor stub: yields fixed text, or fails the first `fail_first`
    /// calls with an extraction error.
    struct StubExtractor {
        text: &'static str,
        fail_first: std::sync::atomic::AtomicU32,
    }

    impl StubExtractor {
        fn ok(text: &'static str) -> Self {
            Self { text, fail_first: 0.into() }
        }

        fn failing(times: u32) -> Self {
            Self { text: SYNTHETIC_EXTRACTION, fail_first: times.into() }
        }
    }

    impl TextExtractor for StubExtractor {
        fn extract(&self, _bytes: &[u8]) -> Result<String, AppError> {
            use std::sync::atomic::Ordering;
            let remaining = self.fail_first.load(Ordering::SeqCst);
            if remaining > 0 {
                self.fail_first.store(remaining - 1, Ordering::SeqCst);
                return Err(AppError::Extraction("no usable text".to_string()));
            }
            Ok(self.text.to_string())
        }
    }

    struct Harness {
        pipeline: Pipeline,
        store: Arc<MemoryUploadStore>,
        blobs: Arc<MemoryBlobStore>,
        lock: Arc<lock::LocalProcessLock>,
    }

    fn harness(extractor: StubExtractor) -> Harness {
        let store = Arc::new(MemoryUploadStore::default());
        let blobs = Arc::new(MemoryBlobStore::default());
        let lock = Arc::new(lock::LocalProcessLock::default());
        let pipeline = Pipeline::new(
            store.clone(),
            blobs.clone(),
            Arc::new(extractor),
            lock.clone(),
        );
        Harness { pipeline, store, blobs, lock }
    }

    async fn register(h: &Harness, owner: Uuid) -> UploadRecord {
        h.pipeline
            .register_upload(owner, Bytes::from_static(b"%PDF-1.4 fake"), "cv.pdf", ACCEPTED_MIME)
            .await
            .expect("register succeeds")
    }

    #[tokio::test]
    async fn test_register_rejects_missing_file_and_bad_mime() {
        let h = harness(StubExtractor::ok(SYNTHETIC_EXTRACTION));
        let owner = Uuid::new_v4();

        let empty = h
            .pipeline
            .register_upload(owner, Bytes::new(), "cv.pdf", ACCEPTED_MIME)
            .await;
        assert!(matches!(empty, Err(AppError::Validation(_))));

        let wrong_mime = h
            .pipeline
            .register_upload(owner, Bytes::from_static(b"gif"), "cv.gif", "image/gif")
            .await;
        assert!(matches!(wrong_mime, Err(AppError::Validation(_))));

        // Nothing was persisted to the transient store.
        assert!(h.blobs.blobs.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_register_creates_uploaded_record_with_transient_ref() {
        let h = harness(StubExtractor::ok(SYNTHETIC_EXTRACTION));
        let record = register(&h, Uuid::new_v4()).await;

        assert_eq!(record.status, UploadStatus::Uploaded);
        let key = record.raw_file_ref.expect("transient ref present");
        assert!(h.blobs.read(&key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_end_to_end_processing() {
        let h = harness(StubExtractor::ok(SYNTHETIC_EXTRACTION));
        let owner = Uuid::new_v4();
        let record = register(&h, owner).await;
        let key = record.raw_file_ref.clone().unwrap();

        let outcome = h
            .pipeline
            .process_upload(record.id, owner, false)
            .await
            .expect("processing succeeds");

        let md = &outcome.extracted_text;
        assert!(md.contains("## EXPERIENCE"), "markdown:\n{md}");
        assert!(md.contains("## EDUCATION"), "markdown:\n{md}");
        assert!(md.contains("### Senior Engineer 2019 - 2023"), "markdown:\n{md}");
        assert!(md.contains("**Acme Inc**"), "markdown:\n{md}");
        assert!(md.contains("- Built things"), "markdown:\n{md}");

        for expected in [
            "Summarize my CV in 3-4 sentences",
            "What is my work experience?",
            "What is my educational background?",
        ] {
            assert!(outcome.prompts.iter().any(|p| p == expected), "missing {expected}");
        }
        assert_eq!(outcome.summary, outcome.extracted_text, "short markdown is not truncated");

        let stored = h.store.snapshot(record.id).await;
        assert_eq!(stored.status, UploadStatus::Processed);
        assert_eq!(stored.extracted_text.as_deref(), Some(md.as_str()));
        assert!(stored.processed_at.is_some());
        // Transient bytes were released after the status commit.
        assert!(h.blobs.read(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reprocess_without_force_fails_and_leaves_record_unchanged() {
        let h = harness(StubExtractor::ok(SYNTHETIC_EXTRACTION));
        let owner = Uuid::new_v4();
        let record = register(&h, owner).await;
        h.pipeline.process_upload(record.id, owner, false).await.unwrap();

        let before = h.store.snapshot(record.id).await;
        let again = h.pipeline.process_upload(record.id, owner, false).await;
        assert!(matches!(again, Err(AppError::InvalidState(_))));

        let after = h.store.snapshot(record.id).await;
        assert_eq!(after.status, before.status);
        assert_eq!(after.extracted_text, before.extracted_text);
        assert_eq!(after.processed_at, before.processed_at);
    }

    #[tokio::test]
    async fn test_ownership_isolation() {
        let h = harness(StubExtractor::ok(SYNTHETIC_EXTRACTION));
        let owner_a = Uuid::new_v4();
        let owner_b = Uuid::new_v4();
        let record = register(&h, owner_a).await;

        let result = h.pipeline.process_upload(record.id, owner_b, false).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(h.store.snapshot(record.id).await.status, UploadStatus::Uploaded);
    }

    #[tokio::test]
    async fn test_extraction_failure_persists_error_state_and_keeps_bytes() {
        let h = harness(StubExtractor::failing(1));
        let owner = Uuid::new_v4();
        let record = register(&h, owner).await;
        let key = record.raw_file_ref.clone().unwrap();

        let result = h.pipeline.process_upload(record.id, owner, false).await;
        assert!(matches!(result, Err(AppError::Extraction(_))));

        let stored = h.store.snapshot(record.id).await;
        assert_eq!(stored.status, UploadStatus::Error);
        assert!(stored.error_message.as_deref().unwrap_or("").contains("no usable text"));
        assert!(stored.processed_at.is_some());
        // Bytes survive the failure so a forced reprocess can retry.
        assert!(h.blobs.read(&key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_forced_reprocess_recovers_from_error() {
        let h = harness(StubExtractor::failing(1));
        let owner = Uuid::new_v4();
        let record = register(&h, owner).await;

        assert!(h.pipeline.process_upload(record.id, owner, false).await.is_err());
        assert_eq!(h.store.snapshot(record.id).await.status, UploadStatus::Error);

        // Without force the errored record stays put.
        let denied = h.pipeline.process_upload(record.id, owner, false).await;
        assert!(matches!(denied, Err(AppError::InvalidState(_))));

        let outcome = h
            .pipeline
            .process_upload(record.id, owner, true)
            .await
            .expect("forced reprocess succeeds");
        assert!(!outcome.prompts.is_empty());
        assert_eq!(h.store.snapshot(record.id).await.status, UploadStatus::Processed);
    }

    #[tokio::test]
    async fn test_forced_reprocess_blocked_when_bytes_are_gone() {
        let h = harness(StubExtractor::ok(SYNTHETIC_EXTRACTION));
        let owner = Uuid::new_v4();
        let record = register(&h, owner).await;
        h.pipeline.process_upload(record.id, owner, false).await.unwrap();

        // Success consumed the transient bytes; a reset would only fail later.
        let result = h.pipeline.process_upload(record.id, owner, true).await;
        assert!(matches!(result, Err(AppError::InvalidState(_))));
        assert_eq!(h.store.snapshot(record.id).await.status, UploadStatus::Processed);
    }

    #[tokio::test]
    async fn test_missing_bytes_surface_as_processing_error() {
        let h = harness(StubExtractor::ok(SYNTHETIC_EXTRACTION));
        let owner = Uuid::new_v4();
        let record = register(&h, owner).await;
        let key = record.raw_file_ref.clone().unwrap();
        h.blobs.delete(&key).await.unwrap();

        let result = h.pipeline.process_upload(record.id, owner, false).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let stored = h.store.snapshot(record.id).await;
        assert_eq!(stored.status, UploadStatus::Error);
        assert!(stored.error_message.is_some());
    }

    #[tokio::test]
    async fn test_concurrent_processing_is_rejected_by_lock() {
        let h = harness(StubExtractor::ok(SYNTHETIC_EXTRACTION));
        let owner = Uuid::new_v4();
        let record = register(&h, owner).await;

        // Simulate another in-flight attempt holding the lock.
        assert!(h.lock.try_acquire(record.id).await.unwrap());
        let result = h.pipeline.process_upload(record.id, owner, false).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(h.store.snapshot(record.id).await.status, UploadStatus::Uploaded);

        // Released lock lets processing through again.
        h.lock.release(record.id).await;
        assert!(h.pipeline.process_upload(record.id, owner, false).await.is_ok());
    }

    #[test]
    fn test_summary_truncates_on_char_boundary() {
        let short = "## EXPERIENCE\nshort";
        assert_eq!(summarize(short), short);

        let long = "é".repeat(SUMMARY_CHARS + 100);
        let summary = summarize(&long);
        assert!(summary.ends_with("..."));
        assert_eq!(summary.chars().count(), SUMMARY_CHARS + 3);
    }
}
