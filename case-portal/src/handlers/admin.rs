//! Admin panel. Every handler takes an [`AdminCaller`], so each one is
//! guarded by the access gate even if the request-level gate is bypassed.

use askama::Template;
use axum::{
    extract::{Path, State},
    response::Redirect,
    Form,
};
use portal_core::AppError;
use validator::Validate;

use crate::gate::path::PROTECTED_PREFIX;
use crate::models::{AdminCaller, BusinessCase, BusinessCaseInput, Chapter, ChapterInput};
use crate::AppState;

pub struct UserRow {
    pub email: String,
    pub name: String,
    pub role: String,
    pub joined: String,
}

#[derive(Template)]
#[template(path = "admin.html")]
pub struct AdminTemplate {
    pub admin_email: String,
    pub chapters: Vec<Chapter>,
    pub cases: Vec<BusinessCase>,
    pub users: Vec<UserRow>,
}

pub async fn admin_dashboard(
    State(state): State<AppState>,
    admin: AdminCaller,
) -> Result<AdminTemplate, AppError> {
    let chapters = state.content.list_chapters().await?;
    let cases = state.content.list_cases(None).await?;
    let users = state
        .content
        .list_profiles(admin.access_token())
        .await?
        .iter()
        .map(|profile| UserRow {
            email: profile.email.clone(),
            name: profile.display_name().to_string(),
            role: profile.role.to_string(),
            joined: profile.joined(),
        })
        .collect();

    Ok(AdminTemplate {
        admin_email: admin.identity().email.clone(),
        chapters,
        cases,
        users,
    })
}

pub async fn create_chapter(
    State(state): State<AppState>,
    admin: AdminCaller,
    Form(input): Form<ChapterInput>,
) -> Result<Redirect, AppError> {
    input.validate()?;
    let chapter = state
        .content
        .create_chapter(admin.access_token(), &input)
        .await?;

    tracing::info!(
        admin_id = %admin.identity().id,
        chapter_id = %chapter.id,
        slug = %chapter.slug,
        "Chapter created"
    );
    Ok(Redirect::to(PROTECTED_PREFIX))
}

pub async fn update_chapter(
    State(state): State<AppState>,
    admin: AdminCaller,
    Path(id): Path<String>,
    Form(input): Form<ChapterInput>,
) -> Result<Redirect, AppError> {
    input.validate()?;
    state
        .content
        .update_chapter(admin.access_token(), &id, &input)
        .await?;

    tracing::info!(admin_id = %admin.identity().id, chapter_id = %id, "Chapter updated");
    Ok(Redirect::to(PROTECTED_PREFIX))
}

pub async fn delete_chapter(
    State(state): State<AppState>,
    admin: AdminCaller,
    Path(id): Path<String>,
) -> Result<Redirect, AppError> {
    state
        .content
        .delete_chapter(admin.access_token(), &id)
        .await?;

    tracing::info!(admin_id = %admin.identity().id, chapter_id = %id, "Chapter deleted");
    Ok(Redirect::to(PROTECTED_PREFIX))
}

pub async fn create_case(
    State(state): State<AppState>,
    admin: AdminCaller,
    Form(input): Form<BusinessCaseInput>,
) -> Result<Redirect, AppError> {
    input.validate()?;
    let case = state
        .content
        .create_case(admin.access_token(), &input)
        .await?;

    tracing::info!(
        admin_id = %admin.identity().id,
        case_id = %case.id,
        chapter_id = %case.chapter_id,
        "Business case created"
    );
    Ok(Redirect::to(PROTECTED_PREFIX))
}

pub async fn update_case(
    State(state): State<AppState>,
    admin: AdminCaller,
    Path(id): Path<String>,
    Form(input): Form<BusinessCaseInput>,
) -> Result<Redirect, AppError> {
    input.validate()?;
    state
        .content
        .update_case(admin.access_token(), &id, &input)
        .await?;

    tracing::info!(admin_id = %admin.identity().id, case_id = %id, "Business case updated");
    Ok(Redirect::to(PROTECTED_PREFIX))
}

pub async fn delete_case(
    State(state): State<AppState>,
    admin: AdminCaller,
    Path(id): Path<String>,
) -> Result<Redirect, AppError> {
    state
        .content
        .delete_case(admin.access_token(), &id)
        .await?;

    tracing::info!(admin_id = %admin.identity().id, case_id = %id, "Business case deleted");
    Ok(Redirect::to(PROTECTED_PREFIX))
}
