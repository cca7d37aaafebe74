//! Text extraction abstraction
//!
//! Provides a unified interface for turning uploaded file bytes into plain
//! text:
//! - `DocumentProcessor` for plain-text formats and PDF
//! - `MockExtractor` with scripted per-file outcomes for tests and dry runs

use async_trait::async_trait;
use devassist_common::config::ExtractionConfig;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::accept::file_extension;
use crate::errors::ExtractionError;
use crate::pdf::extract_text_from_pdf;
use crate::record::IncomingFile;

/// Trait for text extraction
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract plain text from a file
    async fn extract_text(&self, file: &IncomingFile) -> Result<String, ExtractionError>;

    /// Name used in logs and metrics
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    PlainText,
    Pdf,
    Unsupported,
}

fn detect_kind(name: &str, mime_type: Option<&str>) -> DocumentKind {
    match file_extension(name).as_str() {
        ".txt" | ".md" | ".markdown" | ".csv" | ".tsv" | ".json" | ".xml" | ".html" | ".htm"
        | ".log" | ".yaml" | ".yml" => return DocumentKind::PlainText,
        ".pdf" => return DocumentKind::Pdf,
        _ => {}
    }

    match mime_type.map(|m| m.trim().to_lowercase()) {
        Some(m) if m == "application/pdf" => DocumentKind::Pdf,
        Some(m) if m.starts_with("text/") || m == "application/json" || m == "application/xml" => {
            DocumentKind::PlainText
        }
        _ => DocumentKind::Unsupported,
    }
}

/// Production extractor for plain-text formats and PDF.
///
/// Parsing runs on the blocking thread pool so that a large PDF does not
/// stall sibling extractions.
#[derive(Debug, Clone)]
pub struct DocumentProcessor {
    max_text_chars: usize,
}

impl DocumentProcessor {
    pub fn new(max_text_chars: usize) -> Self {
        Self { max_text_chars }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(config.max_text_chars)
    }

    /// Synchronous extraction core
    pub fn extract_sync(
        &self,
        name: &str,
        mime_type: Option<&str>,
        data: &[u8],
    ) -> Result<String, ExtractionError> {
        let text = match detect_kind(name, mime_type) {
            DocumentKind::PlainText => decode_plain_text(name, data)?,
            DocumentKind::Pdf => extract_text_from_pdf(name, data)?,
            DocumentKind::Unsupported => {
                return Err(ExtractionError::UnsupportedFormat {
                    name: name.to_string(),
                    extension: file_extension(name),
                })
            }
        };

        if text.trim().is_empty() {
            return Err(ExtractionError::EmptyContent {
                name: name.to_string(),
            });
        }

        Ok(truncate_chars(text, self.max_text_chars))
    }
}

impl Default for DocumentProcessor {
    fn default() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }
}

#[async_trait]
impl TextExtractor for DocumentProcessor {
    async fn extract_text(&self, file: &IncomingFile) -> Result<String, ExtractionError> {
        let processor = self.clone();
        let name = file.name().to_string();
        let mime_type = file.mime_type().map(str::to_string);
        let data = file.shared_data();

        tokio::task::spawn_blocking(move || processor.extract_sync(&name, mime_type.as_deref(), &data))
            .await
            .map_err(|e| ExtractionError::Task {
                name: file.name().to_string(),
                message: e.to_string(),
            })?
    }

    fn name(&self) -> &str {
        "document-processor"
    }
}

/// Strict UTF-8 decode with BOM and line-ending normalisation
fn decode_plain_text(name: &str, data: &[u8]) -> Result<String, ExtractionError> {
    let body = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
    let text = std::str::from_utf8(body).map_err(|e| ExtractionError::Decode {
        name: name.to_string(),
        message: e.to_string(),
    })?;
    Ok(text.replace("\r\n", "\n"))
}

/// Truncate to at most `max_chars` characters on a char boundary
fn truncate_chars(text: String, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text,
    }
}

/// Scripted outcome for one file name
#[derive(Debug, Clone)]
pub enum MockOutcome {
    Text(String),
    Fail(ExtractionError),
}

/// Mock extractor for testing.
///
/// Unscripted files succeed with `"Text of <name>"`. Tracks call count and
/// peak concurrency so callers can assert on fan-out behavior.
#[derive(Debug, Default)]
pub struct MockExtractor {
    outcomes: HashMap<String, MockOutcome>,
    delays: HashMap<String, Duration>,
    default_delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    order: Mutex<Vec<String>>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, name: &str, text: &str) -> Self {
        self.outcomes
            .insert(name.to_string(), MockOutcome::Text(text.to_string()));
        self
    }

    pub fn failing(mut self, name: &str) -> Self {
        self.outcomes.insert(
            name.to_string(),
            MockOutcome::Fail(ExtractionError::Decode {
                name: name.to_string(),
                message: "scripted failure".to_string(),
            }),
        );
        self
    }

    pub fn with_delay(mut self, name: &str, delay: Duration) -> Self {
        self.delays.insert(name.to_string(), delay);
        self
    }

    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of extractions observed running at once
    pub fn peak_concurrency(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// File names in the order their extraction started
    pub fn start_order(&self) -> Vec<String> {
        self.order.lock().clone()
    }
}

#[async_trait]
impl TextExtractor for MockExtractor {
    async fn extract_text(&self, file: &IncomingFile) -> Result<String, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.order.lock().push(file.name().to_string());
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);

        let delay = self
            .delays
            .get(file.name())
            .copied()
            .unwrap_or(self.default_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.outcomes.get(file.name()) {
            Some(MockOutcome::Text(text)) => Ok(text.clone()),
            Some(MockOutcome::Fail(err)) => Err(err.clone()),
            None => Ok(format!("Text of {}", file.name())),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Create an extractor by name
pub fn create_extractor(kind: &str, config: &ExtractionConfig) -> Arc<dyn TextExtractor> {
    match kind {
        "document" => Arc::new(DocumentProcessor::from_config(config)),
        "mock" => Arc::new(MockExtractor::new()),
        _ => {
            tracing::warn!(extractor = kind, "Unknown extractor, using document processor");
            Arc::new(DocumentProcessor::from_config(config))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_plain_text_extraction() {
        let processor = DocumentProcessor::default();
        let file = IncomingFile::new("notes.md", "\u{FEFF}# Title\r\nBody".as_bytes().to_vec());
        let text = processor.extract_text(&file).await.unwrap();
        assert_eq!(text, "# Title\nBody");
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_decode_error() {
        let processor = DocumentProcessor::default();
        let file = IncomingFile::new("broken.txt", vec![0xffu8, 0xfe, 0x00, 0xc3]);
        let err = processor.extract_text(&file).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_unsupported_format() {
        let processor = DocumentProcessor::default();
        let file = IncomingFile::new("contract.docx", vec![0x50u8, 0x4b, 0x03, 0x04]);
        let err = processor.extract_text(&file).await.unwrap_err();
        assert_eq!(
            err,
            ExtractionError::UnsupportedFormat {
                name: "contract.docx".into(),
                extension: ".docx".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_declared_mime_type_used_without_extension() {
        let processor = DocumentProcessor::default();
        let file = IncomingFile::new("clipboard", b"pasted".to_vec()).with_mime_type("text/plain");
        assert_eq!(processor.extract_text(&file).await.unwrap(), "pasted");
    }

    #[test]
    fn test_empty_content_rejected() {
        let processor = DocumentProcessor::default();
        let err = processor.extract_sync("blank.txt", None, b"  \n\t ").unwrap_err();
        assert!(matches!(err, ExtractionError::EmptyContent { .. }));
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let processor = DocumentProcessor::new(3);
        let text = processor.extract_sync("ru.txt", None, "Смета".as_bytes()).unwrap();
        assert_eq!(text, "Сме");
    }

    #[tokio::test]
    async fn test_mock_extractor_scripts() {
        let mock = MockExtractor::new()
            .with_text("a.txt", "alpha")
            .failing("b.txt");

        assert_eq!(mock.extract_text(&IncomingFile::new("a.txt", b"".to_vec())).await.unwrap(), "alpha");
        assert!(mock.extract_text(&IncomingFile::new("b.txt", b"".to_vec())).await.is_err());
        assert_eq!(
            mock.extract_text(&IncomingFile::new("c.txt", b"".to_vec())).await.unwrap(),
            "Text of c.txt"
        );
        assert_eq!(mock.calls(), 3);
        assert_eq!(mock.start_order(), vec!["a.txt", "b.txt", "c.txt"]);
    }

    #[test]
    fn test_default_accept_list_is_extractable() {
        let config = devassist_common::AppConfig::default();
        for pattern in &config.upload.accept {
            let name = format!("file{}", pattern);
            assert_ne!(detect_kind(&name, None), DocumentKind::Unsupported, "{}", pattern);
        }
    }

    #[test]
    fn test_create_extractor() {
        let config = ExtractionConfig::default();
        assert_eq!(create_extractor("mock", &config).name(), "mock");
        assert_eq!(create_extractor("document", &config).name(), "document-processor");
        assert_eq!(create_extractor("unknown", &config).name(), "document-processor");
    }
}
