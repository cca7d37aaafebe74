//! Upload session
//!
//! Owns the canonical record list for every category. Zones propose whole
//! replacement lists through [`FilesChangedListener`]; the session swaps
//! them in atomically.

use devassist_common::{metrics, AppError};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, error};

use crate::record::{DocumentCategory, UploadedFileRecord};
use crate::zone::FilesChangedListener;

/// Serializable view of a session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub categories: BTreeMap<DocumentCategory, Vec<UploadedFileRecord>>,
    pub total_files: usize,
    pub total_size_bytes: u64,
    pub failed_extractions: usize,
}

/// Record lists per category for one comparison session
#[derive(Debug, Default)]
pub struct UploadSession {
    files: RwLock<HashMap<DocumentCategory, Vec<UploadedFileRecord>>>,
}

impl UploadSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a category's list wholesale.
    ///
    /// Lists with duplicate ids are refused and the previous list is kept.
    pub fn replace(
        &self,
        category: DocumentCategory,
        records: Vec<UploadedFileRecord>,
    ) -> Result<(), AppError> {
        let mut seen = HashSet::with_capacity(records.len());
        if let Some(dup) = records.iter().find(|r| !seen.insert(r.id())) {
            return Err(AppError::Validation {
                message: format!("duplicate record id {} in {} list", dup.id(), category),
                field: Some("id".to_string()),
            });
        }

        let count = records.len();
        self.files.write().insert(category, records);

        metrics::record_session_size(category.as_str(), count);
        debug!(category = %category, files = count, "Session list replaced");
        Ok(())
    }

    /// Records of one category, in upload order
    pub fn files(&self, category: DocumentCategory) -> Vec<UploadedFileRecord> {
        self.files.read().get(&category).cloned().unwrap_or_default()
    }

    pub fn count(&self, category: DocumentCategory) -> usize {
        self.files.read().get(&category).map_or(0, Vec::len)
    }

    /// Every record, grouped by category in declaration order
    pub fn all_files(&self) -> Vec<UploadedFileRecord> {
        let files = self.files.read();
        DocumentCategory::ALL
            .iter()
            .filter_map(|c| files.get(c))
            .flatten()
            .cloned()
            .collect()
    }

    pub fn total_size(&self) -> u64 {
        self.files
            .read()
            .values()
            .flatten()
            .map(UploadedFileRecord::size_bytes)
            .sum()
    }

    /// Records holding the extraction failure placeholder
    pub fn failed_extractions(&self) -> Vec<UploadedFileRecord> {
        self.all_files()
            .into_iter()
            .filter(UploadedFileRecord::extraction_failed)
            .collect()
    }

    /// Discard every record
    pub fn clear(&self) {
        self.files.write().clear();
        for category in DocumentCategory::ALL {
            metrics::record_session_size(category.as_str(), 0);
        }
        debug!("Session cleared");
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let files = self.files.read();
        let categories: BTreeMap<DocumentCategory, Vec<UploadedFileRecord>> = DocumentCategory::ALL
            .iter()
            .map(|c| (*c, files.get(c).cloned().unwrap_or_default()))
            .collect();

        let all = categories.values().flatten();
        SessionSnapshot {
            total_files: all.clone().count(),
            total_size_bytes: all.clone().map(UploadedFileRecord::size_bytes).sum(),
            failed_extractions: all.filter(|r| r.extraction_failed()).count(),
            categories,
        }
    }
}

impl FilesChangedListener for UploadSession {
    fn files_changed(&self, records: Vec<UploadedFileRecord>, category: DocumentCategory) {
        if let Err(e) = self.replace(category, records) {
            error!(category = %category, error = %e, "Rejected replacement list");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::MockExtractor;
    use crate::record::IncomingFile;
    use crate::zone::{UploadZone, ZoneConfig};
    use std::sync::Arc;

    fn zone(session: &Arc<UploadSession>, category: DocumentCategory, extractor: MockExtractor) -> UploadZone {
        UploadZone::new(category, ZoneConfig::default(), Arc::new(extractor), session.clone()).unwrap()
    }

    fn file(name: &str, size: usize) -> IncomingFile {
        IncomingFile::new(name, vec![b'x'; size])
    }

    #[tokio::test]
    async fn test_session_tracks_zones() {
        let session = Arc::new(UploadSession::new());
        let spec_zone = zone(&session, DocumentCategory::Specification, MockExtractor::new());
        let offer_zone = zone(
            &session,
            DocumentCategory::Proposal,
            MockExtractor::new().failing("b.pdf"),
        );

        spec_zone
            .accept_files(&session.files(DocumentCategory::Specification), vec![file("tz.pdf", 10)])
            .await
            .unwrap();
        offer_zone
            .accept_files(
                &session.files(DocumentCategory::Proposal),
                vec![file("a.pdf", 5), file("b.pdf", 7)],
            )
            .await
            .unwrap();

        assert_eq!(session.count(DocumentCategory::Specification), 1);
        assert_eq!(session.count(DocumentCategory::Proposal), 2);
        assert_eq!(session.count(DocumentCategory::Supplementary), 0);
        assert_eq!(session.total_size(), 22);

        let names: Vec<String> = session
            .all_files()
            .iter()
            .map(|r| r.original_name().to_string())
            .collect();
        assert_eq!(names, vec!["tz.pdf", "a.pdf", "b.pdf"]);

        let failed = session.failed_extractions();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].original_name(), "b.pdf");

        let target = session.files(DocumentCategory::Proposal)[0].id().to_string();
        assert!(offer_zone.remove_file(&session.files(DocumentCategory::Proposal), &target));
        assert_eq!(session.count(DocumentCategory::Proposal), 1);
    }

    #[test]
    fn test_duplicate_ids_refused() {
        let session = Arc::new(UploadSession::new());
        let zone = zone(&session, DocumentCategory::Supplementary, MockExtractor::new());
        tokio_test::block_on(zone.accept_files(&[], vec![file("a.txt", 1)])).unwrap();

        let mut records = session.files(DocumentCategory::Supplementary);
        records.push(records[0].clone());

        let err = session
            .replace(DocumentCategory::Supplementary, records)
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
        assert_eq!(session.count(DocumentCategory::Supplementary), 1);
    }

    #[test]
    fn test_snapshot_lists_every_category() {
        let session = Arc::new(UploadSession::new());
        let zone = zone(&session, DocumentCategory::Proposal, MockExtractor::new());
        tokio_test::block_on(zone.accept_files(&[], vec![file("offer.md", 4)])).unwrap();

        let snapshot = session.snapshot();
        assert_eq!(snapshot.total_files, 1);
        assert_eq!(snapshot.total_size_bytes, 4);
        assert_eq!(snapshot.failed_extractions, 0);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["totalFiles"], 1);
        assert_eq!(json["categories"]["specification"], serde_json::json!([]));
        assert_eq!(json["categories"]["proposal"][0]["originalName"], "offer.md");
    }

    #[test]
    fn test_clear() {
        let session = Arc::new(UploadSession::new());
        let zone = zone(&session, DocumentCategory::Proposal, MockExtractor::new());
        tokio_test::block_on(zone.accept_files(&[], vec![file("a.csv", 2)])).unwrap();

        session.clear();
        assert!(session.all_files().is_empty());
        assert_eq!(session.total_size(), 0);
    }
}
