//! Input resolution: turn a user-supplied path or URL into a local PDF file.
//!
//! URLs are downloaded into a `TempDir` that lives as long as the
//! [`ResolvedInput`]. Both paths check the `%PDF` magic bytes so a wrong
//! file fails here with [`RulesError::NotAPdf`] instead of deep inside the
//! PDF engine.

use crate::error::RulesError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// The resolved input: either a local path or a downloaded temp file.
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; the PDF sits in a temp directory removed on drop.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedInput {
    /// Path to the PDF regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
        }
    }

    /// Base filename recorded as `source_file` in the output.
    pub fn source_file_name(&self) -> String {
        self.path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path().display().to_string())
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a local PDF file.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, RulesError> {
    if input.trim().is_empty() {
        return Err(RulesError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(Path::new(input))
    }
}

fn resolve_local(path: &Path) -> Result<ResolvedInput, RulesError> {
    let path = path.to_path_buf();
    if !path.exists() {
        return Err(RulesError::FileNotFound { path });
    }

    let mut file = match std::fs::File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(RulesError::PermissionDenied { path });
        }
        Err(_) => return Err(RulesError::FileNotFound { path }),
    };

    let mut head = Vec::with_capacity(PDF_MAGIC.len());
    file.by_ref()
        .take(PDF_MAGIC.len() as u64)
        .read_to_end(&mut head)
        .map_err(|_| RulesError::FileNotFound { path: path.clone() })?;
    check_magic(&head, &path)?;

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

/// Fail with [`RulesError::NotAPdf`] unless `head` starts with `%PDF`.
fn check_magic(head: &[u8], path: &Path) -> Result<(), RulesError> {
    if head.starts_with(PDF_MAGIC) {
        return Ok(());
    }
    let mut magic = [0u8; 4];
    let n = head.len().min(4);
    magic[..n].copy_from_slice(&head[..n]);
    Err(RulesError::NotAPdf {
        path: path.to_path_buf(),
        magic,
    })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, RulesError> {
    info!("Downloading PDF from: {}", url);

    let parsed = reqwest::Url::parse(url).map_err(|_| RulesError::InvalidInput {
        input: url.to_string(),
    })?;

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| RulesError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(parsed.clone()).send().await.map_err(|e| {
        if e.is_timeout() {
            RulesError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            RulesError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(RulesError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| RulesError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let temp_dir = TempDir::new().map_err(|e| RulesError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(filename_from_url(&parsed));
    check_magic(&bytes, &file_path)?;

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| RulesError::Internal(format!("Failed to write temp file: {e}")))?;

    info!("Downloaded {} bytes to: {}", bytes.len(), file_path.display());
    Ok(ResolvedInput::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

/// Last path segment when it looks like a filename, else `downloaded.pdf`.
fn filename_from_url(url: &reqwest::Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|last| !last.is_empty() && last.contains('.'))
        .map(str::to_string)
        .unwrap_or_else(|| "downloaded.pdf".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
    }

    #[test]
    fn filename_comes_from_last_segment() {
        let url = reqwest::Url::parse("https://gov.example/files/18-07-2022_4.2A.pdf").unwrap();
        assert_eq!(filename_from_url(&url), "18-07-2022_4.2A.pdf");
        let url = reqwest::Url::parse("https://gov.example/download").unwrap();
        assert_eq!(filename_from_url(&url), "downloaded.pdf");
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let err = resolve_input("/definitely/not/here.pdf", 5).await.err().unwrap();
        assert!(matches!(err, RulesError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn short_or_foreign_files_are_rejected() {
        let dir = tempfile::tempdir().unwrap();

        let short = dir.path().join("short.pdf");
        std::fs::write(&short, b"%P").unwrap();
        let err = resolve_input(short.to_str().unwrap(), 5).await.err().unwrap();
        assert!(matches!(err, RulesError::NotAPdf { magic, .. } if &magic == b"%P\0\0"));

        let text = dir.path().join("notes.pdf");
        std::fs::write(&text, b"hello world").unwrap();
        let err = resolve_input(text.to_str().unwrap(), 5).await.err().unwrap();
        assert!(matches!(err, RulesError::NotAPdf { magic, .. } if &magic == b"hell"));
    }

    #[tokio::test]
    async fn local_pdf_resolves_with_base_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("18-07-2022_4.2A.pdf");
        std::fs::write(&path, b"%PDF-1.7\n").unwrap();

        let resolved = resolve_input(path.to_str().unwrap(), 5).await.unwrap();
        assert_eq!(resolved.path(), path.as_path());
        assert_eq!(resolved.source_file_name(), "18-07-2022_4.2A.pdf");
    }
}
