//! Staging store for uploaded files
//!
//! Uploads are written to a scoped temporary location for the duration of
//! one request and removed on every exit path. Removal is guaranteed by
//! RAII: [`StagedFile`] deletes its path on drop, so the file cannot leak
//! whether the pipeline succeeds, the policy rejects, or the classifier
//! fails.
//!
//! Staging names are `{uuid}_{sanitized_filename}`, so concurrent uploads
//! of identically named files never collide.

use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

/// Writes uploads into a fixed directory, created once at startup
#[derive(Debug, Clone)]
pub struct StagingStore {
    dir: PathBuf,
}

impl StagingStore {
    /// Create the store, creating the upload directory if absent.
    /// Idempotent; called once at process start.
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        fs::create_dir_all(dir.as_ref())?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
        })
    }

    /// Write the payload under a unique sanitized name and hand ownership
    /// of the on-disk file to the returned [`StagedFile`].
    pub fn stage(&self, filename: &str, bytes: &[u8]) -> Result<StagedFile> {
        let name = format!("{}_{}", Uuid::new_v4(), sanitize_filename(filename));
        let path = self.dir.join(name);
        fs::write(&path, bytes)?;
        Ok(StagedFile { path })
    }
}

/// A staged upload, exclusively owned by one request.
///
/// The file is removed when this value drops. An already-absent file is
/// tolerated; any other removal failure is logged, never raised.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove staged file {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Reduce a client-supplied filename to a filesystem-safe name.
///
/// Keeps ASCII alphanumerics, `.`, `_` and `-`; everything else (including
/// path separators) becomes `_`. An empty result maps to `"upload"`.
pub fn sanitize_filename(filename: &str) -> String {
    let name: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let name = name.trim_matches('.').to_string();
    if name.is_empty() {
        "upload".to_string()
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_stage_writes_and_drop_removes() {
        let tmp = TempDir::new().unwrap();
        let store = StagingStore::new(tmp.path()).unwrap();

        let staged = store.stage("photo.jpg", b"not really a jpeg").unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());
        assert_eq!(fs::read(&path).unwrap(), b"not really a jpeg");

        drop(staged);
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_tolerates_already_absent_file() {
        let tmp = TempDir::new().unwrap();
        let store = StagingStore::new(tmp.path()).unwrap();

        let staged = store.stage("clip.wav", b"riff").unwrap();
        fs::remove_file(staged.path()).unwrap();
        // Drop must not panic
        drop(staged);
    }

    #[test]
    fn test_identical_filenames_get_distinct_paths() {
        let tmp = TempDir::new().unwrap();
        let store = StagingStore::new(tmp.path()).unwrap();

        let a = store.stage("same.png", b"a").unwrap();
        let b = store.stage("same.png", b"b").unwrap();
        assert_ne!(a.path(), b.path());
        assert!(a.path().exists());
        assert!(b.path().exists());
    }

    #[test]
    fn test_new_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        StagingStore::new(tmp.path()).unwrap();
        StagingStore::new(tmp.path()).unwrap();
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("photo.jpg"), "photo.jpg");
        assert_eq!(sanitize_filename("my photo (1).png"), "my_photo__1_.png");
        assert!(!sanitize_filename("../../etc/passwd").contains('/'));
        assert!(!sanitize_filename("..\\boot.ini").contains('\\'));
        assert_eq!(sanitize_filename("..."), "upload");
        assert_eq!(sanitize_filename(""), "upload");
    }
}
