//! Error types for the regrules library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`RulesError`]: **Fatal**: the run cannot proceed at all (input PDF
//!   missing or unreadable, provider not configured, output not writable).
//!   Returned as `Err(RulesError)` from the top-level `extract_*` functions.
//!
//! * [`CallError`]: **Non-fatal**: one language-model call failed or its
//!   body was not a JSON object. The rule extractor retries it and finally
//!   absorbs it into a fallback fragment, so it never surfaces as a run-level
//!   error. It is kept typed so callers and tests can tell a timeout from a
//!   rejected key from a malformed answer.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the regrules library.
#[derive(Debug, Error)]
pub enum RulesError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is neither a file path nor an HTTP(S) URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF structure is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Text extraction failed for one page.
    #[error("Text extraction failed for page {page}: {detail}")]
    TextExtractionFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install libpdfium system-wide, or point --pdfium-lib / REGRULES_PDFIUM_LIB\n\
at an existing copy (e.g. from https://github.com/bblanchon/pdfium-binaries).\n"
    )]
    PdfiumBindingFailed(String),

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider cannot be used (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output JSON file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A rules file given to the report command could not be read or parsed.
    #[error("Rules file '{path}' is unusable: {detail}")]
    RulesFileInvalid { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RulesError {
    /// True for failures that happen while locating or opening the input
    /// document, before any language-model work has started.
    pub fn is_document_open(&self) -> bool {
        matches!(
            self,
            RulesError::FileNotFound { .. }
                | RulesError::PermissionDenied { .. }
                | RulesError::InvalidInput { .. }
                | RulesError::DownloadFailed { .. }
                | RulesError::DownloadTimeout { .. }
                | RulesError::NotAPdf { .. }
                | RulesError::CorruptPdf { .. }
                | RulesError::PasswordRequired { .. }
                | RulesError::WrongPassword { .. }
                | RulesError::TextExtractionFailed { .. }
                | RulesError::PdfiumBindingFailed(_)
        )
    }
}

/// A failed language-model call.
///
/// Every variant is retried the same way by
/// [`crate::pipeline::extract::RuleExtractor`]; the distinction exists for
/// logging and for tests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// The HTTP request did not finish within the client timeout.
    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The service rejected the credentials (401/403).
    #[error("authentication rejected (HTTP {status})")]
    Auth { status: u16 },

    /// The service answered 429.
    #[error("rate limited by the API (HTTP 429)")]
    RateLimited,

    /// Any other non-success HTTP status.
    #[error("API returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    /// Connection-level failure (DNS, TLS, reset, …).
    #[error("transport error: {0}")]
    Transport(String),

    /// The call succeeded but the model produced no text.
    #[error("model returned an empty response")]
    EmptyResponse,

    /// The model's text is not a JSON object.
    #[error("response is not a JSON object: {0}")]
    MalformedJson(String),

    /// Error reported by an edgequake-llm provider, or an unexpected
    /// response envelope.
    #[error("provider error: {0}")]
    Provider(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_write_failed_display() {
        let e = RulesError::OutputWriteFailed {
            path: PathBuf::from("/ro/rules.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        };
        let msg = e.to_string();
        assert!(msg.contains("/ro/rules.json"), "got: {msg}");
        assert!(msg.contains("read-only"), "got: {msg}");
        assert!(!e.is_document_open());
    }

    #[test]
    fn open_failures_are_classified() {
        assert!(RulesError::FileNotFound {
            path: PathBuf::from("x.pdf")
        }
        .is_document_open());
        assert!(RulesError::PdfiumBindingFailed("no lib".into()).is_document_open());
        assert!(!RulesError::InvalidConfig("bad".into()).is_document_open());
    }

    #[test]
    fn auth_error_display() {
        let e = CallError::Auth { status: 401 };
        assert!(e.to_string().contains("401"));
    }

    #[test]
    fn timeout_display() {
        let e = CallError::Timeout { secs: 60 };
        assert!(e.to_string().contains("60s"));
    }

    #[test]
    fn call_errors_compare_by_category() {
        assert_ne!(
            CallError::MalformedJson("x".into()),
            CallError::Timeout { secs: 1 }
        );
        assert_eq!(CallError::RateLimited, CallError::RateLimited);
    }
}
