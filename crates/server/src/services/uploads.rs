//! Blob uploads for KYC documents and release media.
//!
//! Callers hand over bytes and get back an opaque URL string. The local
//! implementation writes `{root}/{container}/{owner}/{file}` and serves it
//! from `{base_url}/uploads/...`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Container for identity documents and face images.
pub const KYC_CONTAINER: &str = "kyc-verification-requests";

/// Container for release media.
pub const RELEASE_CONTAINER: &str = "release-request";

/// Errors that can occur while storing a blob.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("upload is empty")]
    Empty,

    #[error("invalid path segment: {0}")]
    InvalidName(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stores uploaded bytes and returns a reference URL.
#[async_trait]
pub trait BlobUploader: Send + Sync {
    async fn upload(
        &self,
        container: &str,
        owner: &str,
        bytes: Vec<u8>,
        file_name: &str,
    ) -> Result<String, UploadError>;
}

/// Writes blobs under a local directory.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    base_url: String,
}

impl LocalBlobStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, base_url: &str) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// Directory blobs are written under.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl BlobUploader for LocalBlobStore {
    #[tracing::instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn upload(
        &self,
        container: &str,
        owner: &str,
        bytes: Vec<u8>,
        file_name: &str,
    ) -> Result<String, UploadError> {
        if bytes.is_empty() {
            return Err(UploadError::Empty);
        }
        let container = checked_segment(container)?;
        let owner = checked_segment(owner)?;
        // A random prefix keeps repeated uploads of the same name apart.
        let file = format!("{}-{}", Uuid::new_v4().simple(), sanitize_file_name(file_name));

        let dir = self.root.join(container).join(owner);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&file), bytes).await?;

        tracing::debug!(%container, %owner, %file, "Blob stored");
        Ok(format!("{}/uploads/{container}/{owner}/{file}", self.base_url))
    }
}

fn checked_segment(segment: &str) -> Result<&str, UploadError> {
    let valid = !segment.is_empty()
        && segment != "."
        && segment != ".."
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(segment)
    } else {
        Err(UploadError::InvalidName(segment.to_owned()))
    }
}

/// Keep the final path component and replace anything outside `[A-Za-z0-9._-]`.
fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim_start_matches('.');
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "upload".to_owned()
    } else {
        cleaned
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("passport.png"), "passport.png");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\docs\\my id.jpg"), "my_id.jpg");
        assert_eq!(sanitize_file_name(".."), "upload");
        assert_eq!(sanitize_file_name(""), "upload");
    }

    #[test]
    fn test_checked_segment() {
        assert!(checked_segment("alice").is_ok());
        assert!(checked_segment("..").is_err());
        assert!(checked_segment("a/b").is_err());
        assert!(checked_segment("").is_err());
    }

    #[tokio::test]
    async fn test_local_upload_writes_file_and_returns_url() {
        let root = std::env::temp_dir().join(format!("mintgate-upload-{}", Uuid::new_v4()));
        let store = LocalBlobStore::new(&root, "https://mintgate.test/");

        let url = store
            .upload(KYC_CONTAINER, "alice", b"image-bytes".to_vec(), "face.png")
            .await
            .unwrap();

        let prefix = "https://mintgate.test/uploads/kyc-verification-requests/alice/";
        assert!(url.starts_with(prefix));
        assert!(url.ends_with("-face.png"));

        let file = url.trim_start_matches(prefix);
        let stored = tokio::fs::read(root.join(KYC_CONTAINER).join("alice").join(file))
            .await
            .unwrap();
        assert_eq!(stored, b"image-bytes");

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_upload_rejected() {
        let store = LocalBlobStore::new(std::env::temp_dir(), "http://localhost:3000");
        let result = store.upload(RELEASE_CONTAINER, "bob", Vec::new(), "a.mp3").await;
        assert!(matches!(result, Err(UploadError::Empty)));
    }
}
