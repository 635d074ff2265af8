use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError};

/// Nullable text columns read as empty strings.
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Transcript / UI language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    En,
    Ru,
}

impl Language {
    /// Unknown or missing codes fall back to English.
    pub fn from_code(code: Option<&str>) -> Self {
        match code {
            Some("ru") => Language::Ru,
            _ => Language::En,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ru => "ru",
        }
    }
}

/// Narration track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Voice {
    #[default]
    Male,
    Female,
}

impl Voice {
    pub fn from_code(code: Option<&str>) -> Self {
        match code {
            Some("female") => Voice::Female,
            _ => Voice::Male,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Voice::Male => "male",
            Voice::Female => "female",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    pub id: String,
    pub slug: String,
    pub title_en: String,
    pub title_ru: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description_en: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description_ru: String,
    pub order_index: i32,
}

impl Chapter {
    pub fn title(&self, language: Language) -> &str {
        match language {
            Language::En => &self.title_en,
            Language::Ru => &self.title_ru,
        }
    }

    pub fn description(&self, language: Language) -> &str {
        match language {
            Language::En => &self.description_en,
            Language::Ru => &self.description_ru,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessCase {
    pub id: String,
    pub chapter_id: String,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description_en: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description_ru: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub transcript_en: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub transcript_ru: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub audio_url_male: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub audio_url_female: String,
    pub order_index: i32,
}

impl BusinessCase {
    pub fn description(&self, language: Language) -> &str {
        match language {
            Language::En => &self.description_en,
            Language::Ru => &self.description_ru,
        }
    }

    pub fn transcript(&self, language: Language) -> &str {
        match language {
            Language::En => &self.transcript_en,
            Language::Ru => &self.transcript_ru,
        }
    }

    /// Falls back to the other voice when the chosen track is missing.
    pub fn audio_url(&self, voice: Voice) -> Option<&str> {
        let (preferred, fallback) = match voice {
            Voice::Male => (&self.audio_url_male, &self.audio_url_female),
            Voice::Female => (&self.audio_url_female, &self.audio_url_male),
        };
        [preferred, fallback]
            .into_iter()
            .map(String::as_str)
            .find(|url| !url.is_empty())
    }
}

fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    let valid = !slug.is_empty()
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
    if valid {
        return Ok(());
    }
    let mut error = ValidationError::new("slug");
    error.message = Some("Slug may only contain lowercase letters, digits and dashes".into());
    Err(error)
}

/// Admin form for creating or editing a chapter.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ChapterInput {
    #[validate(length(min = 1, message = "English title is required"))]
    pub title_en: String,
    #[validate(length(min = 1, message = "Russian title is required"))]
    pub title_ru: String,
    #[validate(custom(function = "validate_slug"))]
    pub slug: String,
    #[serde(default)]
    pub description_en: String,
    #[serde(default)]
    pub description_ru: String,
    #[serde(default)]
    pub order_index: i32,
}

/// Admin form for creating or editing a business case.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BusinessCaseInput {
    #[validate(length(min = 1, message = "Chapter is required"))]
    pub chapter_id: String,
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[serde(default)]
    pub description_en: String,
    #[serde(default)]
    pub description_ru: String,
    #[serde(default)]
    pub transcript_en: String,
    #[serde(default)]
    pub transcript_ru: String,
    #[serde(default)]
    pub audio_url_male: String,
    #[serde(default)]
    pub audio_url_female: String,
    #[serde(default)]
    pub order_index: i32,
}
