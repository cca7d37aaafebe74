//! Upload zone
//!
//! Mediates between a drop/file-picker surface and a caller-owned list of
//! [`UploadedFileRecord`]s for one document category:
//! 1. Filters the batch by accept patterns and size limit
//! 2. Admits the batch all-or-nothing against the category's count limit
//! 3. Extracts text from every admitted file concurrently (bounded)
//! 4. Proposes the full replacement list to the listener once every
//!    extraction has settled
//!
//! The zone never holds the authoritative list. Callers pass the current
//! list in and receive the proposed replacement through
//! [`FilesChangedListener`].

use chrono::Utc;
use devassist_common::{metrics, AppConfig, AppError};
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::accept::{check_file, file_extension, AcceptPatterns};
use crate::errors::{ExtractionError, FileRejection, ZoneError};
use crate::extract::TextExtractor;
use crate::record::{
    extraction_placeholder, DocumentCategory, IncomingFile, PendingRecord, UploadedFileRecord,
};

/// Receives the replacement record list proposed by a zone
pub trait FilesChangedListener: Send + Sync {
    fn files_changed(&self, records: Vec<UploadedFileRecord>, category: DocumentCategory);
}

impl<F> FilesChangedListener for F
where
    F: Fn(Vec<UploadedFileRecord>, DocumentCategory) + Send + Sync,
{
    fn files_changed(&self, records: Vec<UploadedFileRecord>, category: DocumentCategory) {
        self(records, category)
    }
}

/// Zone lifecycle: `Idle -> Uploading -> Idle`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneStatus {
    Idle,
    Uploading,
}

/// Configuration for one upload zone
#[derive(Debug, Clone, Validate)]
pub struct ZoneConfig {
    /// Accept patterns (`.pdf`, `application/pdf`, `image/*`); empty accepts all
    pub accept: Vec<String>,
    /// Maximum records in the category
    pub max_files: Option<usize>,
    /// Per-file size limit in bytes
    pub max_file_size: Option<u64>,
    #[validate(range(min = 1))]
    pub max_concurrent_extractions: usize,
    pub extraction_timeout: Option<Duration>,
    #[validate(length(min = 1))]
    pub storage_prefix: String,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            accept: Vec::new(),
            max_files: None,
            max_file_size: None,
            max_concurrent_extractions: devassist_common::DEFAULT_MAX_CONCURRENT_EXTRACTIONS,
            extraction_timeout: None,
            storage_prefix: devassist_common::DEFAULT_STORAGE_PREFIX.to_string(),
        }
    }
}

impl ZoneConfig {
    /// Zone settings for a category from the application configuration
    pub fn for_category(config: &AppConfig, category: DocumentCategory) -> Self {
        Self {
            accept: config.upload.accept.clone(),
            max_files: category.limit(&config.upload.limits),
            max_file_size: config.upload.max_file_size_bytes,
            max_concurrent_extractions: config.upload.max_concurrent_extractions,
            extraction_timeout: config.extraction_timeout(),
            storage_prefix: config.upload.storage_prefix.clone(),
        }
    }

    pub fn with_max_files(mut self, max_files: Option<usize>) -> Self {
        self.max_files = max_files;
        self
    }

    pub fn with_accept<S: AsRef<str>>(mut self, accept: &[S]) -> Self {
        self.accept = accept.iter().map(|s| s.as_ref().to_string()).collect();
        self
    }
}

/// Summary of an admitted batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    /// Ids of the records added, in input order
    pub added: Vec<String>,
    /// Names of files whose text could not be extracted
    pub failed_extractions: Vec<String>,
    /// Files dropped by the accept or size filters
    pub rejected: Vec<FileRejection>,
}

/// Per-file extraction result, collected before any listener call
enum ExtractionOutcome {
    Extracted(String),
    Failed(ExtractionError),
}

/// Resets the zone to `Idle` however the batch ends, including when the
/// batch future is dropped mid-extraction.
struct UploadingGuard<'a> {
    status: &'a watch::Sender<ZoneStatus>,
}

impl Drop for UploadingGuard<'_> {
    fn drop(&mut self) {
        self.status.send_replace(ZoneStatus::Idle);
    }
}

/// Upload zone for one document category
pub struct UploadZone {
    category: DocumentCategory,
    config: ZoneConfig,
    accept: AcceptPatterns,
    extractor: Arc<dyn TextExtractor>,
    listener: Arc<dyn FilesChangedListener>,
    status: watch::Sender<ZoneStatus>,
    banner: Mutex<Option<ZoneError>>,
}

impl UploadZone {
    pub fn new(
        category: DocumentCategory,
        config: ZoneConfig,
        extractor: Arc<dyn TextExtractor>,
        listener: Arc<dyn FilesChangedListener>,
    ) -> Result<Self, AppError> {
        config.validate().map_err(|e| AppError::Validation {
            message: e.to_string(),
            field: None,
        })?;

        let (status, _) = watch::channel(ZoneStatus::Idle);
        Ok(Self {
            category,
            accept: AcceptPatterns::new(&config.accept),
            config,
            extractor,
            listener,
            status,
            banner: Mutex::new(None),
        })
    }

    pub fn category(&self) -> DocumentCategory {
        self.category
    }

    pub fn config(&self) -> &ZoneConfig {
        &self.config
    }

    pub fn status(&self) -> ZoneStatus {
        *self.status.borrow()
    }

    /// Status feed for a loading indicator
    pub fn subscribe(&self) -> watch::Receiver<ZoneStatus> {
        self.status.subscribe()
    }

    /// Current error banner, if any
    pub fn error(&self) -> Option<ZoneError> {
        self.banner.lock().clone()
    }

    pub fn dismiss_error(&self) {
        self.banner.lock().take();
    }

    /// Slots left before the count limit, given the caller's current count
    pub fn remaining_slots(&self, current_count: usize) -> Option<usize> {
        self.config
            .max_files
            .map(|max| max.saturating_sub(current_count))
    }

    fn set_error(&self, error: ZoneError) {
        *self.banner.lock() = Some(error);
    }

    /// Admit a batch of files.
    ///
    /// On success the listener has been called exactly once with
    /// `current ++ new_records`. On error the listener is not called and no
    /// extraction has run.
    #[instrument(skip(self, current, files), fields(category = %self.category, batch = files.len()))]
    pub async fn accept_files(
        &self,
        current: &[UploadedFileRecord],
        files: Vec<IncomingFile>,
    ) -> Result<BatchReport, ZoneError> {
        let claimed = self.status.send_if_modified(|status| {
            if *status == ZoneStatus::Idle {
                *status = ZoneStatus::Uploading;
                true
            } else {
                false
            }
        });
        if !claimed {
            debug!("Batch refused, upload in progress");
            metrics::record_batch(self.category.as_str(), ZoneError::Busy.outcome_label(), files.len());
            return Err(ZoneError::Busy);
        }
        // Early returns below drop the guard and release the claim
        let _guard = UploadingGuard { status: &self.status };
        self.dismiss_error();

        let mut admitted = Vec::with_capacity(files.len());
        let mut rejected = Vec::new();
        for file in files {
            match check_file(&file, &self.accept, self.config.max_file_size) {
                Ok(()) => admitted.push(file),
                Err(rejection) => {
                    debug!(file = %rejection.file_name, reason = ?rejection.reason, "File rejected");
                    rejected.push(rejection);
                }
            }
        }

        if admitted.is_empty() {
            if rejected.is_empty() {
                return Ok(BatchReport::default());
            }
            let count = rejected.len();
            let error = ZoneError::FilesRejected { rejections: rejected };
            warn!(error = %error, "Every file in the batch was rejected");
            metrics::record_batch(self.category.as_str(), error.outcome_label(), count);
            self.set_error(error.clone());
            return Err(error);
        }

        if let Some(max) = self.config.max_files {
            if current.len() + admitted.len() > max {
                let error = ZoneError::CountLimitExceeded {
                    max,
                    current: current.len(),
                    attempted: admitted.len(),
                };
                warn!(max, current = current.len(), attempted = admitted.len(), "Batch exceeds file limit");
                metrics::record_batch(self.category.as_str(), error.outcome_label(), admitted.len());
                self.set_error(error.clone());
                return Err(error);
            }
        }

        let pending: Vec<PendingRecord> = admitted.iter().map(|file| self.prepare(file)).collect();

        let tasks: Vec<_> = admitted.iter().map(|file| self.extract_one(file)).collect();
        let outcomes: Vec<ExtractionOutcome> = stream::iter(tasks)
            .buffered(self.config.max_concurrent_extractions)
            .collect()
            .await;

        let mut report = BatchReport::default();
        let mut records = current.to_vec();
        for (pending, outcome) in pending.into_iter().zip(outcomes) {
            let record = match outcome {
                ExtractionOutcome::Extracted(text) => pending.complete(text, false),
                ExtractionOutcome::Failed(_) => {
                    let placeholder = extraction_placeholder(&pending.original_name);
                    report.failed_extractions.push(pending.original_name.clone());
                    pending.complete(placeholder, true)
                }
            };
            report.added.push(record.id().to_string());
            records.push(record);
        }

        info!(
            added = report.added.len(),
            failed = report.failed_extractions.len(),
            rejected = rejected.len(),
            total = records.len(),
            "Batch accepted"
        );
        metrics::record_batch(self.category.as_str(), "accepted", report.added.len());

        self.listener.files_changed(records, self.category);

        if !rejected.is_empty() {
            self.set_error(ZoneError::FilesRejected {
                rejections: rejected.clone(),
            });
        }
        report.rejected = rejected;

        Ok(report)
    }

    /// Remove a record by id and propose the reduced list.
    ///
    /// Returns whether a record with that id was present. The listener is
    /// called either way.
    #[instrument(skip(self, current), fields(category = %self.category))]
    pub fn remove_file(&self, current: &[UploadedFileRecord], id: &str) -> bool {
        self.dismiss_error();

        let remaining: Vec<UploadedFileRecord> = current
            .iter()
            .filter(|record| record.id() != id)
            .cloned()
            .collect();
        let removed = remaining.len() != current.len();

        if removed {
            info!(remaining = remaining.len(), "File removed");
        } else {
            debug!("No record with that id");
        }

        self.listener.files_changed(remaining, self.category);
        removed
    }

    /// Accept-time metadata: extension, id, storage path
    fn prepare(&self, file: &IncomingFile) -> PendingRecord {
        let id = Uuid::new_v4().to_string();
        let extension = file_extension(file.name());
        let storage_path = format!(
            "{}/{}/{}{}",
            self.config.storage_prefix.trim_end_matches('/'),
            self.category,
            id,
            extension
        );

        PendingRecord {
            id,
            original_name: file.name().to_string(),
            storage_path,
            extension,
            size_bytes: file.size(),
            category: self.category,
            uploaded_at: Utc::now(),
        }
    }

    async fn extract_one(&self, file: &IncomingFile) -> ExtractionOutcome {
        let start = Instant::now();

        let result = match self.config.extraction_timeout {
            Some(limit) => tokio::time::timeout(limit, self.extractor.extract_text(file))
                .await
                .unwrap_or_else(|_| {
                    Err(ExtractionError::Timeout {
                        name: file.name().to_string(),
                        timeout_ms: limit.as_millis() as u64,
                    })
                }),
            None => self.extractor.extract_text(file).await,
        };

        let elapsed = start.elapsed().as_secs_f64();
        metrics::record_extraction(elapsed, self.extractor.name(), result.is_ok());

        match result {
            Ok(text) => {
                debug!(file = file.name(), chars = text.chars().count(), "Text extracted");
                ExtractionOutcome::Extracted(text)
            }
            Err(e) => {
                warn!(file = file.name(), error = %e, code = ?e.code(), "Text extraction failed");
                ExtractionOutcome::Failed(e)
            }
        }
    }
}
