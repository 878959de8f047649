//! Document reading: PDF → per-page plain text.
//!
//! The PDF engine sits behind [`PdfTextBackend`] so the rest of the
//! pipeline never sees it. [`PdfiumBackend`] is the production backend;
//! pdfium is not async-safe, so [`read_pages`] runs the backend inside
//! `spawn_blocking`.

use crate::config::PageSelection;
use crate::error::RulesError;
use pdfium_render::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Raw text of one PDF page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based physical page number.
    pub page_number: u32,
    pub text: String,
}

impl Page {
    pub fn new(page_number: u32, text: impl Into<String>) -> Self {
        Self {
            page_number,
            text: text.into(),
        }
    }
}

/// Extracts per-page text from a PDF file.
pub trait PdfTextBackend: Send + Sync {
    /// Return the selected pages in physical order.
    fn extract_pages(
        &self,
        path: &Path,
        password: Option<&str>,
        selection: &PageSelection,
    ) -> Result<Vec<Page>, RulesError>;
}

/// Text extraction through pdfium.
#[derive(Debug, Clone, Default)]
pub struct PdfiumBackend {
    lib_path: Option<PathBuf>,
}

impl PdfiumBackend {
    /// Bind to the library at `lib_path`, or to the system library when `None`.
    pub fn new(lib_path: Option<PathBuf>) -> Self {
        Self { lib_path }
    }

    fn bind(&self) -> Result<Pdfium, RulesError> {
        let bindings = match self.lib_path {
            Some(ref path) => Pdfium::bind_to_library(path).map_err(|e| {
                RulesError::PdfiumBindingFailed(format!("{}: {}", path.display(), e))
            })?,
            None => Pdfium::bind_to_system_library()
                .map_err(|e| RulesError::PdfiumBindingFailed(e.to_string()))?,
        };
        Ok(Pdfium::new(bindings))
    }
}

impl PdfTextBackend for PdfiumBackend {
    fn extract_pages(
        &self,
        path: &Path,
        password: Option<&str>,
        selection: &PageSelection,
    ) -> Result<Vec<Page>, RulesError> {
        let pdfium = self.bind()?;

        let document = pdfium.load_pdf_from_file(path, password).map_err(|e| {
            let err_str = format!("{:?}", e);
            if err_str.contains("Password") || err_str.contains("password") {
                if password.is_some() {
                    RulesError::WrongPassword {
                        path: path.to_path_buf(),
                    }
                } else {
                    RulesError::PasswordRequired {
                        path: path.to_path_buf(),
                    }
                }
            } else {
                RulesError::CorruptPdf {
                    path: path.to_path_buf(),
                    detail: err_str,
                }
            }
        })?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        info!("PDF loaded: {} pages", total_pages);

        let indices = selection.to_indices(total_pages);
        if indices.len() < total_pages {
            debug!("Page selection keeps {} of {} pages", indices.len(), total_pages);
        }

        let mut result = Vec::with_capacity(indices.len());
        for idx in indices {
            let page = pages
                .get(idx as u16)
                .map_err(|e| RulesError::TextExtractionFailed {
                    page: idx + 1,
                    detail: format!("{:?}", e),
                })?;

            let text = page
                .text()
                .map_err(|e| RulesError::TextExtractionFailed {
                    page: idx + 1,
                    detail: format!("{:?}", e),
                })?
                .all();

            if text.trim().is_empty() {
                warn!("Page {} has no extractable text (scanned image?)", idx + 1);
            }

            result.push(Page::new(idx as u32 + 1, normalize_line_endings(&text)));
        }

        Ok(result)
    }
}

/// Run `backend` off the async executor and return the selected pages.
pub async fn read_pages(
    backend: Arc<dyn PdfTextBackend>,
    path: &Path,
    password: Option<&str>,
    selection: &PageSelection,
) -> Result<Vec<Page>, RulesError> {
    let path = path.to_path_buf();
    let password = password.map(str::to_string);
    let selection = selection.clone();

    tokio::task::spawn_blocking(move || {
        backend.extract_pages(&path, password.as_deref(), &selection)
    })
    .await
    .map_err(|e| RulesError::Internal(format!("Text extraction task panicked: {}", e)))?
}

/// Convert `\r\n` and lone `\r` line endings to `\n`.
///
/// pdfium separates lines with `\r\n`; paragraph splitting looks for `\n\n`.
pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedBackend(Vec<Page>);

    impl PdfTextBackend for FixedBackend {
        fn extract_pages(
            &self,
            _path: &Path,
            _password: Option<&str>,
            selection: &PageSelection,
        ) -> Result<Vec<Page>, RulesError> {
            Ok(selection
                .to_indices(self.0.len())
                .into_iter()
                .map(|i| self.0[i].clone())
                .collect())
        }
    }

    #[test]
    fn line_endings_are_normalised() {
        assert_eq!(normalize_line_endings("a\r\n\r\nb\rc"), "a\n\nb\nc");
        assert_eq!(normalize_line_endings("plain"), "plain");
    }

    #[tokio::test]
    async fn read_pages_runs_backend_with_selection() {
        let backend: Arc<dyn PdfTextBackend> = Arc::new(FixedBackend(vec![
            Page::new(1, "one"),
            Page::new(2, "two"),
            Page::new(3, "three"),
        ]));
        let pages = read_pages(backend, Path::new("x.pdf"), None, &PageSelection::Range(2, 3))
            .await
            .unwrap();
        assert_eq!(pages, vec![Page::new(2, "two"), Page::new(3, "three")]);
    }

    #[test]
    fn missing_library_path_fails_to_bind() {
        let backend = PdfiumBackend::new(Some(PathBuf::from("/nonexistent/libpdfium.so")));
        let err = backend
            .extract_pages(Path::new("x.pdf"), None, &PageSelection::All)
            .unwrap_err();
        assert!(matches!(err, RulesError::PdfiumBindingFailed(_)));
        assert!(err.is_document_open());
    }
}
