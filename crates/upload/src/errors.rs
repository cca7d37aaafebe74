//! Upload pipeline error types

use devassist_common::errors::ErrorReport;
use devassist_common::ErrorCode;
use serde::Serialize;
use thiserror::Error;

/// Why a single file was turned away before admission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectionReason {
    FileTypeNotAccepted,
    FileTooLarge { size: u64, limit: u64 },
}

/// A file dropped from a batch by the accept or size filters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRejection {
    pub file_name: String,
    pub reason: RejectionReason,
}

impl FileRejection {
    /// Localized, user-facing description
    pub fn user_message(&self) -> String {
        match &self.reason {
            RejectionReason::FileTypeNotAccepted => {
                format!("{}: неподдерживаемый тип файла", self.file_name)
            }
            RejectionReason::FileTooLarge { size, limit } => format!(
                "{}: файл слишком большой ({} байт, максимум {} байт)",
                self.file_name, size, limit
            ),
        }
    }
}

/// Zone-level errors. These populate the zone's error banner and are never
/// fatal to the zone itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ZoneError {
    #[error("Batch of {attempted} file(s) exceeds the limit of {max} ({current} already uploaded)")]
    CountLimitExceeded {
        max: usize,
        current: usize,
        attempted: usize,
    },

    #[error("{} file(s) rejected by accept or size filters", rejections.len())]
    FilesRejected { rejections: Vec<FileRejection> },

    #[error("An upload batch is already in progress")]
    Busy,
}

impl ZoneError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ZoneError::CountLimitExceeded { .. } => ErrorCode::CountLimitExceeded,
            ZoneError::FilesRejected { .. } => ErrorCode::FileRejected,
            ZoneError::Busy => ErrorCode::UploadInProgress,
        }
    }

    /// Localized banner text
    pub fn user_message(&self) -> String {
        match self {
            ZoneError::CountLimitExceeded { max, .. } => {
                format!("Превышено максимальное количество файлов: {}", max)
            }
            ZoneError::FilesRejected { rejections } => {
                let lines: Vec<String> = rejections.iter().map(FileRejection::user_message).collect();
                format!("Некоторые файлы не были добавлены:\n{}", lines.join("\n"))
            }
            ZoneError::Busy => "Дождитесь завершения текущей загрузки".to_string(),
        }
    }

    /// Structured report carrying the banner text and, for rejections,
    /// the per-file reasons
    pub fn report(&self) -> ErrorReport {
        let report = ErrorReport::new(self.code(), self.user_message());
        match self {
            ZoneError::CountLimitExceeded {
                max,
                current,
                attempted,
            } => report.with_details(serde_json::json!({
                "max": max,
                "current": current,
                "attempted": attempted,
            })),
            ZoneError::FilesRejected { rejections } => {
                report.with_details(serde_json::json!({ "rejections": rejections }))
            }
            ZoneError::Busy => report,
        }
    }

    /// Metrics label for batches ending in this error
    pub fn outcome_label(&self) -> &'static str {
        match self {
            ZoneError::CountLimitExceeded { .. } => "count_limit",
            ZoneError::FilesRejected { .. } => "rejected",
            ZoneError::Busy => "busy",
        }
    }
}

/// Failures of a single text extraction. Always caught by the zone and
/// converted to the placeholder text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Unsupported file format for {name}: '{extension}'")]
    UnsupportedFormat { name: String, extension: String },

    #[error("Failed to decode {name}: {message}")]
    Decode { name: String, message: String },

    #[error("PDF parse error for {name}: {message}")]
    PdfParse { name: String, message: String },

    #[error("No text content extracted from {name}")]
    EmptyContent { name: String },

    #[error("Extraction of {name} timed out after {timeout_ms}ms")]
    Timeout { name: String, timeout_ms: u64 },

    #[error("Extraction task for {name} failed: {message}")]
    Task { name: String, message: String },
}

impl ExtractionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ExtractionError::UnsupportedFormat { .. } => ErrorCode::UnsupportedFormat,
            ExtractionError::Timeout { .. } => ErrorCode::ExtractionTimeout,
            _ => ErrorCode::ExtractionFailed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_limit_message() {
        let err = ZoneError::CountLimitExceeded {
            max: 2,
            current: 1,
            attempted: 2,
        };
        assert_eq!(err.user_message(), "Превышено максимальное количество файлов: 2");
        assert_eq!(err.code(), ErrorCode::CountLimitExceeded);
        assert_eq!(err.outcome_label(), "count_limit");

        let report = err.report();
        assert_eq!(report.numeric_code, 2001);
        assert_eq!(report.details.unwrap()["attempted"], 2);
    }

    #[test]
    fn test_rejection_messages_listed() {
        let err = ZoneError::FilesRejected {
            rejections: vec![
                FileRejection {
                    file_name: "photo.png".into(),
                    reason: RejectionReason::FileTypeNotAccepted,
                },
                FileRejection {
                    file_name: "huge.pdf".into(),
                    reason: RejectionReason::FileTooLarge { size: 20, limit: 10 },
                },
            ],
        };
        let message = err.user_message();
        assert!(message.contains("photo.png: неподдерживаемый тип файла"));
        assert!(message.contains("huge.pdf: файл слишком большой (20 байт, максимум 10 байт)"));
        assert_eq!(err.to_string(), "2 file(s) rejected by accept or size filters");

        let details = err.report().details.unwrap();
        assert_eq!(details["rejections"][1]["fileName"], "huge.pdf");
        assert_eq!(details["rejections"][1]["reason"]["kind"], "file_too_large");
    }

    #[test]
    fn test_extraction_error_codes() {
        let err = ExtractionError::Timeout {
            name: "a.pdf".into(),
            timeout_ms: 500,
        };
        assert_eq!(err.code(), ErrorCode::ExtractionTimeout);

        let err = ExtractionError::Decode {
            name: "a.txt".into(),
            message: "invalid utf-8".into(),
        };
        assert_eq!(err.code(), ErrorCode::ExtractionFailed);
    }
}
