use askama::Template;
use axum::{
    extract::{Query, State},
    http::{StatusCode, Uri},
    response::IntoResponse,
    Extension,
};
use portal_core::AppError;
use serde::Deserialize;
use std::collections::HashMap;

use crate::gate::Caller;
use crate::models::Language;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct LanguageQuery {
    pub lang: Option<String>,
}

pub struct ChapterCard {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub case_count: usize,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub lang: &'static str,
    pub other_lang: &'static str,
    pub chapters: Vec<ChapterCard>,
    pub signed_in_as: Option<String>,
}

#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub path: String,
}

pub(crate) fn other_language(language: Language) -> Language {
    match language {
        Language::En => Language::Ru,
        Language::Ru => Language::En,
    }
}

/// Chapter list, in the requested language.
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<LanguageQuery>,
    caller: Option<Extension<Caller>>,
) -> Result<IndexTemplate, AppError> {
    let language = Language::from_code(query.lang.as_deref());

    let chapters = state.content.list_chapters().await?;
    let cases = state.content.list_cases(None).await?;

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for case in &cases {
        *counts.entry(case.chapter_id.as_str()).or_default() += 1;
    }

    let chapters = chapters
        .iter()
        .map(|chapter| ChapterCard {
            slug: chapter.slug.clone(),
            title: chapter.title(language).to_string(),
            description: chapter.description(language).to_string(),
            case_count: counts.get(chapter.id.as_str()).copied().unwrap_or(0),
        })
        .collect();

    let signed_in_as = caller
        .as_ref()
        .and_then(|Extension(caller)| caller.identity())
        .map(|identity| identity.email.clone());

    Ok(IndexTemplate {
        lang: language.code(),
        other_lang: other_language(language).code(),
        chapters,
        signed_in_as,
    })
}

pub async fn health_check() -> &'static str {
    "OK"
}

pub async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        NotFoundTemplate {
            path: uri.path().to_string(),
        },
    )
}
