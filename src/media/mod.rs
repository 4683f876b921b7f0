//! Uploaded media handling.
//!
//! Validates an upload against the selected critique mode and stages it to a
//! transient local file that is removed once the request is done.

mod staging;

pub use staging::StagedMedia;

use crate::error::{CriticError, Result};
use crate::session::CritiqueMode;
use std::path::Path;

/// A single file received from the user.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    /// Original file name as sent by the client.
    pub file_name: String,
    /// File content.
    pub bytes: Vec<u8>,
}

impl MediaUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Read an upload from a local path.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        Ok(Self { file_name, bytes })
    }

    /// Lowercased file extension, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
    }

    /// Check the upload against the mode and return its extension.
    pub fn validate(&self, mode: CritiqueMode) -> Result<String> {
        if self.bytes.is_empty() {
            return Err(CriticError::UnsupportedMedia(format!(
                "{} is empty",
                self.file_name
            )));
        }

        match self.extension() {
            Some(ext) if mode.accepts(&ext) => Ok(ext),
            Some(ext) => Err(CriticError::UnsupportedMedia(format!(
                "'.{}' files are not supported for {}; expected one of: {}",
                ext,
                mode.label(),
                mode.extensions().join(", ")
            ))),
            None => Err(CriticError::UnsupportedMedia(format!(
                "{} has no file extension; expected one of: {}",
                self.file_name,
                mode.extensions().join(", ")
            ))),
        }
    }
}

/// MIME type for a media file extension.
pub fn mime_for_extension(extension: &str) -> String {
    match extension.to_lowercase().as_str() {
        // mime_guess reports video/x-msvideo; Gemini lists avi as video/avi
        "avi" => "video/avi".to_string(),
        ext => mime_guess::from_ext(ext)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_mode_extensions() {
        for ext in CritiqueMode::Image.extensions() {
            let upload = MediaUpload::new(format!("photo.{}", ext.to_uppercase()), vec![1, 2, 3]);
            assert_eq!(upload.validate(CritiqueMode::Image).unwrap(), *ext);
        }
        for ext in CritiqueMode::Video.extensions() {
            let upload = MediaUpload::new(format!("clip.{}", ext), vec![1, 2, 3]);
            assert_eq!(upload.validate(CritiqueMode::Video).unwrap(), *ext);
        }
    }

    #[test]
    fn test_validate_rejects_wrong_mode() {
        let upload = MediaUpload::new("clip.mp4", vec![1]);
        assert!(matches!(
            upload.validate(CritiqueMode::Image),
            Err(CriticError::UnsupportedMedia(_))
        ));
    }

    #[test]
    fn test_validate_rejects_empty_and_extensionless() {
        assert!(MediaUpload::new("photo.png", vec![]).validate(CritiqueMode::Image).is_err());
        assert!(MediaUpload::new("photo", vec![1]).validate(CritiqueMode::Image).is_err());
    }

    #[test]
    fn test_mime_for_extension() {
        assert_eq!(mime_for_extension("jpg"), "image/jpeg");
        assert_eq!(mime_for_extension("png"), "image/png");
        assert_eq!(mime_for_extension("mp4"), "video/mp4");
        assert_eq!(mime_for_extension("mov"), "video/quicktime");
        assert_eq!(mime_for_extension("AVI"), "video/avi");
    }
}
