//! Temporary storage of multipart uploads.
//!
//! Each uploaded file is streamed to a uniquely named file in the upload
//! directory and owned by a [`TempUpload`]. The file is removed when the
//! guard is dropped, on every exit path of the handler holding it.

use axum::extract::multipart::{Field, Multipart, MultipartError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Invalid multipart payload: {0}")]
    Multipart(#[from] MultipartError),

    #[error("No file uploaded in field '{0}'")]
    MissingFile(String),

    #[error("Unexpected file in field '{0}'")]
    UnexpectedFile(String),

    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

/// An uploaded file on disk, deleted when dropped.
#[derive(Debug)]
pub struct TempUpload {
    path: PathBuf,
    content_type: Option<String>,
    file_name: Option<String>,
    size: u64,
}

impl TempUpload {
    /// Stream a multipart file field into a new file under `dir`.
    pub async fn persist(dir: &Path, mut field: Field<'_>) -> Result<Self, UploadError> {
        let content_type = field.content_type().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);

        let path = dir.join(Uuid::new_v4().simple().to_string());
        let mut file = tokio::fs::File::create(&path).await?;

        // From here on the guard owns the path, so a failed write still cleans up.
        let mut upload = TempUpload {
            path,
            content_type,
            file_name,
            size: 0,
        };

        while let Some(chunk) = field.chunk().await? {
            file.write_all(&chunk).await?;
            upload.size += chunk.len() as u64;
        }
        file.flush().await?;

        tracing::debug!(
            path = %upload.path.display(),
            file_name = upload.file_name.as_deref().unwrap_or(""),
            size = upload.size,
            "Stored temporary upload"
        );

        Ok(upload)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Content type declared by the client, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

// Removal is a single unlink on the local upload directory and runs inline, so
// the file is gone before the handler's response is written. Handing it to a
// blocking pool would let the response race the cleanup.
impl Drop for TempUpload {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "Removed temporary upload");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to remove temporary upload"
                );
            }
        }
    }
}

/// Text fields plus at most one file from a multipart request.
#[derive(Debug, Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    file: Option<TempUpload>,
}

impl UploadForm {
    /// Read every field of `multipart`. The file in `file_field` is stored in
    /// `dir`; a file in any other field is rejected.
    pub async fn read(
        mut multipart: Multipart,
        dir: &Path,
        file_field: &str,
    ) -> Result<Self, UploadError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            if field.file_name().is_none() {
                let value = field.text().await?;
                form.fields.insert(name, value);
                continue;
            }

            if name != file_field || form.file.is_some() {
                return Err(UploadError::UnexpectedFile(name));
            }

            form.file = Some(TempUpload::persist(dir, field).await?);
        }

        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Take ownership of the uploaded file.
    pub fn take_file(&mut self, field: &str) -> Result<TempUpload, UploadError> {
        self.file
            .take()
            .ok_or_else(|| UploadError::MissingFile(field.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("relay-upload-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn dropping_guard_removes_file() {
        let dir = scratch_dir();
        let path = dir.join("upload");
        std::fs::write(&path, b"0123456789").unwrap();

        let upload = TempUpload {
            path: path.clone(),
            content_type: Some("image/png".to_string()),
            file_name: Some("tiny.png".to_string()),
            size: 10,
        };
        assert!(path.exists());

        drop(upload);

        assert!(!path.exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn dropping_guard_inside_runtime_removes_file_immediately() {
        let dir = scratch_dir();
        let path = dir.join("upload");
        tokio::fs::write(&path, b"abc").await.unwrap();

        drop(TempUpload {
            path: path.clone(),
            content_type: None,
            file_name: None,
            size: 3,
        });

        // No yield between drop and check.
        assert!(!path.exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn dropping_guard_tolerates_missing_file() {
        let dir = scratch_dir();
        let upload = TempUpload {
            path: dir.join("never-written"),
            content_type: None,
            file_name: None,
            size: 0,
        };

        drop(upload);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_file_names_field() {
        let mut form = UploadForm::default();

        let err = form.take_file("document").unwrap_err();

        assert_eq!(err.to_string(), "No file uploaded in field 'document'");
    }
}
