//! Output writing.

use crate::error::RulesError;
use crate::output::RulesDocument;
use std::path::Path;
use tracing::debug;

/// Write `document` to `path` as pretty JSON, replacing any existing file.
///
/// Parent directories are created as needed. The JSON goes to a sibling
/// `.json.tmp` file first and is renamed into place, so readers never see a
/// partial file.
pub async fn write_document(document: &RulesDocument, path: &Path) -> Result<(), RulesError> {
    let json = document.to_json_pretty()?;
    let write_err = |source| RulesError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    debug!("Wrote {} rules to {}", document.rules_found.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(n: usize) -> RulesDocument {
        RulesDocument {
            source_file: "regs.pdf".into(),
            rules_found: (0..n)
                .map(|i| crate::output::Rule {
                    id: format!("1_{i}"),
                    title: "כללי".into(),
                    category: "כללי".into(),
                    page: 1,
                    obligation: format!("חובה {i}"),
                    conditions: Default::default(),
                    priority: 1,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("nested").join("rules.json");
        write_document(&doc(1), &path).await.unwrap();

        let loaded = RulesDocument::load(&path).unwrap();
        assert_eq!(loaded, doc(1));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, "old contents that are longer than the new ones ...").unwrap();

        write_document(&doc(0), &path).await.unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with('{'));
        assert!(raw.contains("\"rules_found\": []"));
    }

    #[tokio::test]
    async fn unwritable_destination_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        // A regular file cannot be used as a directory.
        let path = blocker.join("rules.json");

        let err = write_document(&doc(1), &path).await.unwrap_err();
        assert!(matches!(err, RulesError::OutputWriteFailed { .. }));
    }
}
