//! Uploaded documents, such as expense reports.

use thiserror::Error;

use crate::conversation::Session;

/// Failure to read a document.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IngestError {
    /// The bytes could not be parsed or decoded.
    #[error("document is unreadable: {0}")]
    Unreadable(String),
}

/// Turns raw document bytes into plain text.
///
/// Implementations are pure functions over the bytes. Parts of a document
/// that yield no text contribute nothing; any parsing failure maps to
/// [`IngestError::Unreadable`] instead of a panic.
pub trait DocumentExtractor: Send + Sync {
    /// Extracts the whitespace-trimmed text of the document.
    fn extract(&self, bytes: &[u8]) -> Result<String, IngestError>;
}

/// What happened to an uploaded document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The text was added to the session.
    Added,
    /// A document with the same identity is already known. Nothing was
    /// extracted.
    AlreadyPresent,
    /// The document was readable but contained no text.
    Empty,
    /// The document could not be read.
    Failed(IngestError),
}

/// Extracts a document and stores its text in the session.
///
/// Known identities are skipped before extraction, so re-uploading the
/// same file is a no-op. Failures leave the session untouched.
pub fn ingest_document<E: DocumentExtractor + ?Sized>(
    session: &mut Session,
    extractor: &E,
    identity: &str,
    bytes: &[u8],
) -> IngestOutcome {
    if session.has_document(identity) {
        debug!("document {identity:?} is already ingested");
        return IngestOutcome::AlreadyPresent;
    }

    let text = match extractor.extract(bytes) {
        Ok(text) => text,
        Err(err) => {
            warn!("failed to ingest {identity:?}: {err}");
            return IngestOutcome::Failed(err);
        }
    };
    if text.is_empty() {
        warn!("document {identity:?} has no extractable text");
        return IngestOutcome::Empty;
    }

    info!("ingested {identity:?} ({} chars)", text.chars().count());
    session.put_document(identity, text);
    IngestOutcome::Added
}
