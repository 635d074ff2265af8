use askama::Template;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use portal_core::AppError;
use serde::Deserialize;

use crate::handlers::app::{other_language, NotFoundTemplate};
use crate::models::{Language, Voice};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ChapterQuery {
    pub lang: Option<String>,
    pub voice: Option<String>,
}

pub struct CaseView {
    pub title: String,
    pub description: String,
    pub transcript: String,
    pub audio_url: Option<String>,
}

#[derive(Template)]
#[template(path = "chapter.html")]
pub struct ChapterTemplate {
    pub slug: String,
    pub lang: &'static str,
    pub other_lang: &'static str,
    pub voice: &'static str,
    pub other_voice: &'static str,
    pub title: String,
    pub description: String,
    pub cases: Vec<CaseView>,
}

/// One chapter with its cases, transcripts and audio for the chosen voice.
pub async fn chapter_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<ChapterQuery>,
) -> Result<Response, AppError> {
    let language = Language::from_code(query.lang.as_deref());
    let voice = Voice::from_code(query.voice.as_deref());

    let Some(chapter) = state.content.find_chapter(&slug).await? else {
        tracing::debug!(slug = %slug, "Unknown chapter");
        return Ok((
            StatusCode::NOT_FOUND,
            NotFoundTemplate {
                path: format!("/chapter/{}", slug),
            },
        )
            .into_response());
    };

    let cases = state
        .content
        .list_cases(Some(chapter.id.as_str()))
        .await?
        .iter()
        .map(|case| CaseView {
            title: case.title.clone(),
            description: case.description(language).to_string(),
            transcript: case.transcript(language).to_string(),
            audio_url: case.audio_url(voice).map(str::to_string),
        })
        .collect();

    let other_voice = match voice {
        Voice::Male => Voice::Female,
        Voice::Female => Voice::Male,
    };

    Ok(ChapterTemplate {
        slug: chapter.slug.clone(),
        lang: language.code(),
        other_lang: other_language(language).code(),
        voice: voice.code(),
        other_voice: other_voice.code(),
        title: chapter.title(language).to_string(),
        description: chapter.description(language).to_string(),
        cases,
    }
    .into_response())
}
