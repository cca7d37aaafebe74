//! DevAssist Upload Pipeline
//!
//! Admits user-supplied documents into per-category lists:
//! - Accept-pattern and size filtering
//! - All-or-nothing count limits per category
//! - Bounded concurrent text extraction (plain text, PDF)
//! - Session state holding the canonical record lists

pub mod accept;
pub mod errors;
pub mod extract;
pub mod pdf;
pub mod record;
pub mod session;
pub mod zone;

pub use errors::{ExtractionError, FileRejection, RejectionReason, ZoneError};
pub use extract::{create_extractor, DocumentProcessor, MockExtractor, TextExtractor};
pub use record::{DocumentCategory, IncomingFile, UploadedFileRecord};
pub use session::{SessionSnapshot, UploadSession};
pub use zone::{BatchReport, FilesChangedListener, UploadZone, ZoneConfig, ZoneStatus};
