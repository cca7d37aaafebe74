//! Uploaded file records and the files that produce them

use chrono::{DateTime, Utc};
use devassist_common::config::CategoryLimits;
use devassist_common::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// Prefix of the text stored for files whose extraction failed
pub const EXTRACTION_FAILURE_PREFIX: &str = "Ошибка извлечения текста из файла";

/// Placeholder text for a file whose extraction failed
pub fn extraction_placeholder(file_name: &str) -> String {
    format!("{}: {}", EXTRACTION_FAILURE_PREFIX, file_name)
}

/// Role of an uploaded document in a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentCategory {
    Specification,
    Proposal,
    Supplementary,
}

impl DocumentCategory {
    pub const ALL: [DocumentCategory; 3] = [
        DocumentCategory::Specification,
        DocumentCategory::Proposal,
        DocumentCategory::Supplementary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentCategory::Specification => "specification",
            DocumentCategory::Proposal => "proposal",
            DocumentCategory::Supplementary => "supplementary",
        }
    }

    /// Human-readable title shown next to the zone
    pub fn title(&self) -> &'static str {
        match self {
            DocumentCategory::Specification => "Техническое задание",
            DocumentCategory::Proposal => "Коммерческие предложения",
            DocumentCategory::Supplementary => "Дополнительные документы",
        }
    }

    /// Configured maximum number of files for this category
    pub fn limit(&self, limits: &CategoryLimits) -> Option<usize> {
        match self {
            DocumentCategory::Specification => limits.specification,
            DocumentCategory::Proposal => limits.proposal,
            DocumentCategory::Supplementary => limits.supplementary,
        }
    }
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentCategory {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "specification" | "spec" => Ok(DocumentCategory::Specification),
            "proposal" | "proposals" => Ok(DocumentCategory::Proposal),
            "supplementary" | "additional" => Ok(DocumentCategory::Supplementary),
            other => Err(AppError::Validation {
                message: format!("unknown document category '{}'", other),
                field: Some("category".to_string()),
            }),
        }
    }
}

/// A file offered to an upload zone: name, declared MIME type and bytes.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    name: String,
    mime_type: Option<String>,
    data: Arc<[u8]>,
}

impl IncomingFile {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            mime_type: None,
            data: Arc::from(data.into()),
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Read a file from disk. The MIME type is left undeclared.
    pub async fn from_path(path: &Path) -> Result<Self, AppError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| AppError::Validation {
                message: format!("{} has no file name", path.display()),
                field: Some("path".to_string()),
            })?;

        let data = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AppError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => AppError::Io(e),
        })?;

        Ok(Self::new(name, data))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Cheap handle on the bytes, for moving into blocking tasks
    pub fn shared_data(&self) -> Arc<[u8]> {
        Arc::clone(&self.data)
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// A file admitted by an upload zone. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFileRecord {
    id: String,
    original_name: String,
    storage_path: String,
    extension: String,
    size_bytes: u64,
    category: DocumentCategory,
    extracted_text: String,
    extraction_failed: bool,
    uploaded_at: DateTime<Utc>,
}

/// Accept-time metadata, fixed before extraction starts
#[derive(Debug, Clone)]
pub(crate) struct PendingRecord {
    pub id: String,
    pub original_name: String,
    pub storage_path: String,
    pub extension: String,
    pub size_bytes: u64,
    pub category: DocumentCategory,
    pub uploaded_at: DateTime<Utc>,
}

impl PendingRecord {
    pub(crate) fn complete(self, extracted_text: String, extraction_failed: bool) -> UploadedFileRecord {
        UploadedFileRecord {
            id: self.id,
            original_name: self.original_name,
            storage_path: self.storage_path,
            extension: self.extension,
            size_bytes: self.size_bytes,
            category: self.category,
            extracted_text,
            extraction_failed,
            uploaded_at: self.uploaded_at,
        }
    }
}

impl UploadedFileRecord {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn storage_path(&self) -> &str {
        &self.storage_path
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn category(&self) -> DocumentCategory {
        self.category
    }

    pub fn extracted_text(&self) -> &str {
        &self.extracted_text
    }

    /// True when `extracted_text` holds the failure placeholder
    pub fn extraction_failed(&self) -> bool {
        self.extraction_failed
    }

    pub fn uploaded_at(&self) -> DateTime<Utc> {
        self.uploaded_at
    }
}
