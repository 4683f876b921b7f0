//! Transient on-disk copies of uploads.

use super::{mime_for_extension, MediaUpload};
use crate::error::Result;
use crate::session::CritiqueMode;
use std::io::Write;
use std::path::Path;
use tempfile::TempPath;
use tracing::{debug, warn};

/// An upload written to a temporary file.
///
/// The file is deleted when the value is dropped, so it never outlives the
/// request that staged it.
#[derive(Debug)]
pub struct StagedMedia {
    path: TempPath,
    mime_type: String,
    display_name: String,
}

impl StagedMedia {
    /// Validate the upload for the mode and write it under `temp_dir`.
    pub fn stage(upload: &MediaUpload, mode: CritiqueMode, temp_dir: &Path) -> Result<Self> {
        let extension = upload.validate(mode)?;
        std::fs::create_dir_all(temp_dir)?;

        let mut file = tempfile::Builder::new()
            .prefix("critic-")
            .suffix(&format!(".{}", extension))
            .tempfile_in(temp_dir)?;
        file.write_all(&upload.bytes)?;
        file.flush()?;

        let path = file.into_temp_path();
        debug!("Staged {} bytes at {}", upload.bytes.len(), path.display());

        Ok(Self {
            path,
            mime_type: mime_for_extension(&extension),
            display_name: upload.file_name.clone(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Read the staged content back.
    pub async fn read(&self) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(&self.path).await?)
    }

    /// Remove the file now, logging instead of failing if removal errors.
    pub fn close(self) {
        let staged_path = self.path.display().to_string();
        if let Err(e) = self.path.close() {
            warn!("Failed to remove staged file {}: {}", staged_path, e);
        } else {
            debug!("Removed staged file {}", staged_path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stage_writes_and_close_removes() {
        let dir = tempfile::tempdir().unwrap();
        let upload = MediaUpload::new("sunset.JPG", b"jpeg-bytes".to_vec());

        let staged = StagedMedia::stage(&upload, CritiqueMode::Image, dir.path()).unwrap();
        let path = staged.path().to_path_buf();

        assert!(path.exists());
        assert_eq!(path.extension().unwrap(), "jpg");
        assert_eq!(staged.mime_type(), "image/jpeg");
        assert_eq!(staged.read().await.unwrap(), b"jpeg-bytes");

        staged.close();
        assert!(!path.exists());
    }

    #[test]
    fn test_stage_creates_missing_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("critic").join("staging");
        let upload = MediaUpload::new("frame.png", b"png".to_vec());

        let staged = StagedMedia::stage(&upload, CritiqueMode::Image, &nested).unwrap();
        assert!(staged.path().starts_with(&nested));
        staged.close();
        assert_eq!(std::fs::read_dir(&nested).unwrap().count(), 0);
    }

    #[test]
    fn test_drop_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let upload = MediaUpload::new("clip.mov", vec![0u8; 64]);

        let path = {
            let staged = StagedMedia::stage(&upload, CritiqueMode::Video, dir.path()).unwrap();
            staged.path().to_path_buf()
        };

        assert!(!path.exists());
    }

    #[test]
    fn test_invalid_upload_is_not_staged() {
        let dir = tempfile::tempdir().unwrap();
        let upload = MediaUpload::new("notes.txt", b"hello".to_vec());

        assert!(StagedMedia::stage(&upload, CritiqueMode::Image, dir.path()).is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
