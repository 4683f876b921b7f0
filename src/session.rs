//! Per-session configuration: the API credential and the critique mode.

use crate::error::{CriticError, Result};
use serde::{Deserialize, Serialize};

/// API credential used to talk to Gemini.
///
/// The value is never printed by `Debug` so it can sit in traced structs.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential(String);

impl Credential {
    /// Validate a user-supplied credential. Blank input is rejected.
    pub fn new(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CriticError::MissingCredential);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Read a credential from an optional value (flag, env, form field).
    pub fn from_option(raw: Option<&str>) -> Result<Self> {
        Self::new(raw.unwrap_or_default())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Masked form for display, e.g. `AIza...9xQk`.
    pub fn masked(&self) -> String {
        mask(&self.0)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Credential").field(&"***").finish()
    }
}

pub(crate) fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Which kind of media the user wants critiqued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CritiqueMode {
    #[default]
    Image,
    Video,
}

impl CritiqueMode {
    /// Extensions accepted for this mode (lowercase, without dot).
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            CritiqueMode::Image => &["jpg", "jpeg", "png"],
            CritiqueMode::Video => &["mp4", "mov", "avi"],
        }
    }

    /// Label shown in the UI.
    pub fn label(&self) -> &'static str {
        match self {
            CritiqueMode::Image => "Image Critique",
            CritiqueMode::Video => "Video Critique",
        }
    }

    /// Noun used in user-facing messages.
    pub fn noun(&self) -> &'static str {
        match self {
            CritiqueMode::Image => "image",
            CritiqueMode::Video => "video",
        }
    }

    /// Whether a file extension is allowed for this mode.
    pub fn accepts(&self, extension: &str) -> bool {
        let ext = extension.trim_start_matches('.').to_lowercase();
        self.extensions().contains(&ext.as_str())
    }

    /// Pick the mode implied by a file extension.
    pub fn from_extension(extension: &str) -> Option<Self> {
        [CritiqueMode::Image, CritiqueMode::Video]
            .into_iter()
            .find(|mode| mode.accepts(extension))
    }
}

impl std::str::FromStr for CritiqueMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "image" | "image critique" => Ok(CritiqueMode::Image),
            "video" | "video critique" => Ok(CritiqueMode::Video),
            _ => Err(format!("Unknown critique mode: {}", s)),
        }
    }
}

impl std::fmt::Display for CritiqueMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CritiqueMode::Image => write!(f, "image"),
            CritiqueMode::Video => write!(f, "video"),
        }
    }
}
