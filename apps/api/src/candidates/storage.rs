//! Uploaded files under the storage root.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};
use uuid::Uuid;

/// Keeps ASCII alphanumerics, `.`, `-` and `_`; everything else becomes `_`.
/// Leading dots are dropped so a name can never address a parent directory.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "resume".to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn candidate_dir(root: &Path, candidate_id: Uuid) -> PathBuf {
    root.join("resumes").join(candidate_id.to_string())
}

/// Writes the upload to `<root>/resumes/<candidate>/<uuid>-<name>`.
pub async fn save_upload(
    root: &Path,
    candidate_id: Uuid,
    file_name: &str,
    data: &[u8],
) -> Result<PathBuf> {
    let dir = candidate_dir(root, candidate_id);
    tokio::fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let path = dir.join(format!("{}-{}", Uuid::new_v4(), sanitize_file_name(file_name)));
    tokio::fs::write(&path, data)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    debug!("Stored {} bytes at {}", data.len(), path.display());
    Ok(path)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    Missing,
    Failed,
}

/// Deletes a stored file. Never fails: a missing file or an I/O error is
/// logged and reported through the outcome.
pub async fn remove_file(path: &Path) -> RemoveOutcome {
    match tokio::fs::remove_file(path).await {
        Ok(()) => RemoveOutcome::Removed,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("Evicted file already gone: {}", path.display());
            RemoveOutcome::Missing
        }
        Err(e) => {
            warn!("Failed to delete {}: {e}", path.display());
            RemoveOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("Jane Doe CV.pdf"), "Jane_Doe_CV.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("..\\evil.docx"), "evil.docx");
        assert_eq!(sanitize_file_name("résumé.txt"), "r_sum_.txt");
        assert_eq!(sanitize_file_name("..."), "resume");
        assert_eq!(sanitize_file_name(""), "resume");
    }

    #[tokio::test]
    async fn test_save_and_remove() {
        let root = tempfile::tempdir().unwrap();
        let candidate = Uuid::new_v4();
        let path = save_upload(root.path(), candidate, "cv.txt", b"hello")
            .await
            .unwrap();

        assert!(path.starts_with(candidate_dir(root.path(), candidate)));
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .ends_with("-cv.txt"));
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");

        assert_eq!(remove_file(&path).await, RemoveOutcome::Removed);
        assert_eq!(remove_file(&path).await, RemoveOutcome::Missing);
    }

    #[tokio::test]
    async fn test_same_name_uploads_do_not_collide() {
        let root = tempfile::tempdir().unwrap();
        let candidate = Uuid::new_v4();
        let a = save_upload(root.path(), candidate, "cv.txt", b"a").await.unwrap();
        let b = save_upload(root.path(), candidate, "cv.txt", b"b").await.unwrap();
        assert_ne!(a, b);
        assert_eq!(std::fs::read(&a).unwrap(), b"a");
    }
}
