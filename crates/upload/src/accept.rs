//! Accept filters: extension and MIME pattern matching, size limits

use std::path::Path;

use crate::errors::{FileRejection, RejectionReason};
use crate::record::IncomingFile;

/// Lower-cased suffix of a file name including the leading dot.
/// Names without a suffix (or dotfiles like `.env`) yield an empty string.
pub fn file_extension(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}

/// Guess MIME type from filename extension.
pub fn guess_mime_type(name: &str) -> &'static str {
    match file_extension(name).as_str() {
        ".txt" => "text/plain",
        ".md" | ".markdown" => "text/markdown",
        ".csv" => "text/csv",
        ".json" => "application/json",
        ".xml" => "application/xml",
        ".html" | ".htm" => "text/html",
        ".pdf" => "application/pdf",
        ".doc" => "application/msword",
        ".docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ".xls" => "application/vnd.ms-excel",
        ".xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ".rtf" => "application/rtf",
        ".png" => "image/png",
        ".jpg" | ".jpeg" => "image/jpeg",
        ".gif" => "image/gif",
        ".webp" => "image/webp",
        ".zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AcceptPattern {
    /// `.pdf`
    Extension(String),
    /// `application/pdf`
    Mime(String),
    /// `image/*`
    MimeFamily(String),
}

impl AcceptPattern {
    fn parse(raw: &str) -> Option<Self> {
        let pattern = raw.trim().to_lowercase();
        if pattern.is_empty() {
            return None;
        }
        if pattern.starts_with('.') {
            return Some(AcceptPattern::Extension(pattern));
        }
        match pattern.split_once('/') {
            Some((family, "*")) => Some(AcceptPattern::MimeFamily(family.to_string())),
            Some(_) => Some(AcceptPattern::Mime(pattern)),
            // Bare extension without the dot
            None => Some(AcceptPattern::Extension(format!(".{}", pattern))),
        }
    }

    fn matches(&self, extension: &str, mime: &str) -> bool {
        match self {
            AcceptPattern::Extension(ext) => ext == extension,
            AcceptPattern::Mime(m) => m == mime,
            AcceptPattern::MimeFamily(family) => mime
                .split_once('/')
                .map(|(f, _)| f == family)
                .unwrap_or(false),
        }
    }
}

/// The set of acceptable file types for a zone. An empty set accepts
/// every file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcceptPatterns {
    patterns: Vec<AcceptPattern>,
}

impl AcceptPatterns {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        Self {
            patterns: patterns
                .iter()
                .filter_map(|p| AcceptPattern::parse(p.as_ref()))
                .collect(),
        }
    }

    /// Accept every file
    pub fn any() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether a file matches at least one pattern. The declared MIME type
    /// is used when present, otherwise one is guessed from the name.
    pub fn accepts(&self, file: &IncomingFile) -> bool {
        if self.patterns.is_empty() {
            return true;
        }
        let extension = file_extension(file.name());
        let mime = file
            .mime_type()
            .map(|m| m.trim().to_lowercase())
            .unwrap_or_else(|| guess_mime_type(file.name()).to_string());

        self.patterns.iter().any(|p| p.matches(&extension, &mime))
    }
}

/// Check one file against the accept patterns and the size limit.
pub fn check_file(
    file: &IncomingFile,
    accept: &AcceptPatterns,
    max_file_size: Option<u64>,
) -> Result<(), FileRejection> {
    if !accept.accepts(file) {
        return Err(FileRejection {
            file_name: file.name().to_string(),
            reason: RejectionReason::FileTypeNotAccepted,
        });
    }
    if let Some(limit) = max_file_size {
        if file.size() > limit {
            return Err(FileRejection {
                file_name: file.name().to_string(),
                reason: RejectionReason::FileTooLarge {
                    size: file.size(),
                    limit,
                },
            });
        }
    }
    Ok(())
}
