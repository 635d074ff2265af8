use async_trait::async_trait;

use crate::models::{BusinessCase, BusinessCaseInput, Chapter, ChapterInput, Profile};
use crate::services::error::BackendError;

/// Chapters, business cases and profiles held by the hosted database.
///
/// Reads of published content are anonymous. Writes and the profile list run
/// with the admin's own access token so the service's row policies apply.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// All chapters ordered by `order_index`.
    async fn list_chapters(&self) -> Result<Vec<Chapter>, BackendError>;

    async fn find_chapter(&self, slug: &str) -> Result<Option<Chapter>, BackendError>;

    /// Cases ordered by `order_index`, optionally restricted to one chapter.
    async fn list_cases(&self, chapter_id: Option<&str>) -> Result<Vec<BusinessCase>, BackendError>;

    async fn create_chapter(
        &self,
        access_token: &str,
        input: &ChapterInput,
    ) -> Result<Chapter, BackendError>;

    async fn update_chapter(
        &self,
        access_token: &str,
        id: &str,
        input: &ChapterInput,
    ) -> Result<Chapter, BackendError>;

    async fn delete_chapter(&self, access_token: &str, id: &str) -> Result<(), BackendError>;

    async fn create_case(
        &self,
        access_token: &str,
        input: &BusinessCaseInput,
    ) -> Result<BusinessCase, BackendError>;

    async fn update_case(
        &self,
        access_token: &str,
        id: &str,
        input: &BusinessCaseInput,
    ) -> Result<BusinessCase, BackendError>;

    async fn delete_case(&self, access_token: &str, id: &str) -> Result<(), BackendError>;

    /// Newest first.
    async fn list_profiles(&self, access_token: &str) -> Result<Vec<Profile>, BackendError>;
}
