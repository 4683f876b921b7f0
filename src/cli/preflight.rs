//! Pre-flight checks before a critique.
//!
//! Catches problems that would otherwise surface only after the file has been
//! staged or uploaded.

use crate::error::{CriticError, Result};
use crate::session::{Credential, CritiqueMode};
use std::path::Path;

/// Resolve the credential from the flag or `GOOGLE_API_KEY`.
pub fn credential(api_key: Option<&str>) -> Result<Credential> {
    Credential::from_option(api_key)
}

/// Check that `file` exists and pick the critique mode.
///
/// An explicit `mode` wins; otherwise the extension decides.
pub fn resolve_mode(file: &Path, mode: Option<&str>) -> Result<CritiqueMode> {
    if !file.is_file() {
        return Err(CriticError::UnsupportedMedia(format!(
            "{} does not exist or is not a file",
            file.display()
        )));
    }

    if let Some(mode) = mode {
        return mode.parse().map_err(CriticError::Config);
    }

    let extension = file
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default();

    CritiqueMode::from_extension(&extension).ok_or_else(|| {
        CriticError::UnsupportedMedia(format!(
            "cannot tell whether {} is an image or a video; supported: {}, {}",
            file.display(),
            CritiqueMode::Image.extensions().join(", "),
            CritiqueMode::Video.extensions().join(", ")
        ))
    })
}
