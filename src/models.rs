//! Data models and structures
//!
//! Defines model candidates and their preference lists, listing inputs, and
//! the marketing assets produced by the pipeline.

use crate::ai::gemini::{Content, GenerateContentRequest, GenerationConfig, InlineData, Part};
use crate::{Error, Result};
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Bundled default preference lists.
pub const DEFAULT_PREFERENCES: &str = include_str!("../data/preferences.json");

/// One remote model that can be attempted in a fallback sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCandidate {
    /// Bare model ID (for example `gemini-2.5-flash`).
    pub id: String,
    #[serde(default)]
    pub label: String,
}

impl ModelCandidate {
    /// Build a candidate, stripping any `models/` prefix from the ID.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        let id = id.into();
        let id = id.strip_prefix("models/").unwrap_or(&id).to_string();
        let label = label.into();
        let label = if label.is_empty() { id.clone() } else { label };
        Self { id, label }
    }
}

impl fmt::Display for ModelCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.label == self.id {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{} ({})", self.label, self.id)
        }
    }
}

/// Ordered candidates; the first entry is tried first. IDs may repeat.
pub type PreferenceList = Vec<ModelCandidate>;

/// Which preference list a task draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskCategory {
    Text,
    Vision,
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskCategory::Text => write!(f, "text"),
            TaskCategory::Vision => write!(f, "vision"),
        }
    }
}

/// Named preference lists plus optional status policy overrides, as loaded
/// from a preferences file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    pub text: PreferenceList,
    pub vision: PreferenceList,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skippable_statuses: Option<Vec<u16>>,
}

impl Preferences {
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: Preferences = serde_json::from_str(json)?;
        // Re-run the constructor so `models/` prefixes and empty labels are normalized.
        let normalize = |list: PreferenceList| -> PreferenceList {
            list.into_iter()
                .map(|c| ModelCandidate::new(c.id, c.label))
                .collect()
        };
        let prefs = Self {
            text: normalize(raw.text),
            vision: normalize(raw.vision),
            skippable_statuses: raw.skippable_statuses,
        };
        if prefs.text.is_empty() || prefs.vision.is_empty() {
            return Err(Error::Config(
                "Preference lists must contain at least one candidate".to_string(),
            ));
        }
        Ok(prefs)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn bundled() -> Result<Self> {
        Self::from_json(DEFAULT_PREFERENCES)
    }

    pub fn for_category(&self, category: TaskCategory) -> &[ModelCandidate] {
        match category {
            TaskCategory::Text => &self.text,
            TaskCategory::Vision => &self.vision,
        }
    }
}

/// Raw material for a listing: article or URL text, or a flyer image.
#[derive(Debug, Clone)]
pub enum ListingInput {
    Text(String),
    Image {
        bytes: Vec<u8>,
        mime_type: Option<String>,
    },
}

impl ListingInput {
    pub fn category(&self) -> TaskCategory {
        match self {
            ListingInput::Text(_) => TaskCategory::Text,
            ListingInput::Image { .. } => TaskCategory::Vision,
        }
    }
}

/// Prompt parts for one generation call, independent of which model serves it.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub parts: Vec<Part>,
    pub expect_json: bool,
}

impl GenerationRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            parts: vec![Part::Text {
                text: prompt.into(),
            }],
            expect_json: false,
        }
    }

    /// Append an inline image, sniffing the MIME type when none is given.
    pub fn with_image(mut self, bytes: &[u8], mime_type: Option<&str>) -> Self {
        let mime_type = mime_type
            .or_else(|| sniff_image_type(bytes))
            .unwrap_or_else(|| {
                tracing::warn!("Could not tell the image format, sending it as image/png");
                "image/png"
            });
        self.parts.push(Part::InlineData {
            inline_data: InlineData {
                mime_type: mime_type.to_string(),
                data: base64::engine::general_purpose::STANDARD.encode(bytes),
            },
        });
        self
    }

    /// Ask the provider for an `application/json` response.
    pub fn expecting_json(mut self) -> Self {
        self.expect_json = true;
        self
    }

    pub fn to_wire(&self) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: None,
                parts: self.parts.clone(),
            }],
            generation_config: self.expect_json.then(|| GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
            }),
        }
    }
}

/// Flyers and listing photos arrive as JPEG, PNG, GIF or WebP.
fn sniff_image_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"\xFF\xD8\xFF") {
        Some("image/jpeg")
    } else if bytes.starts_with(b"\x89PNG") {
        Some("image/png")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

/// Step one output: what the listing is about.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub visual: String,
    #[serde(default)]
    pub narration: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoScript {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub hook: String,
    #[serde(default)]
    pub scenes: Vec<Scene>,
    #[serde(default)]
    pub call_to_action: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialPost {
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
}

/// A parsed step result tagged with the model that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generated<T> {
    pub model: ModelCandidate,
    pub value: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketingAssets {
    pub request_id: uuid::Uuid,
    pub generated_at: DateTime<Utc>,
    pub analysis: Generated<Analysis>,
    pub script: Generated<VideoScript>,
    pub social_post: Generated<SocialPost>,
}
