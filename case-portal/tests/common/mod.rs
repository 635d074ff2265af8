//! Shared helpers for case-portal integration tests.
//!
//! [`FakeBackend`] stands in for the hosted auth/database project and
//! implements every backend seam the router uses.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use case_portal::gate::{ProfileLookup, SessionStore};
use case_portal::models::{
    BusinessCase, BusinessCaseInput, CallerIdentity, Chapter, ChapterInput, EstablishedSession,
    Profile, Role,
};
use case_portal::services::auth::AuthUser;
use case_portal::services::metrics::detached_handle;
use case_portal::services::{
    AuthProvider, AuthSession, BackendError, ContentStore, SignUpOutcome, SignUpRequest,
};
use case_portal::session::{SessionCookies, SessionTokens};
use case_portal::startup::build_router;
use case_portal::AppState;
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::util::ServiceExt;

pub const ADMIN_ACCESS: &str = "admin-access";
pub const ADMIN_REFRESH: &str = "admin-refresh";
pub const USER_ACCESS: &str = "user-access";
pub const USER_REFRESH: &str = "user-refresh";
pub const ORPHAN_ACCESS: &str = "orphan-access";
pub const ORPHAN_REFRESH: &str = "orphan-refresh";
pub const PASSWORD: &str = "correct-horse";
/// Verifier the fake auth service expects for every issued code.
pub const CODE_VERIFIER: &str = "test-verifier";

pub fn verifier_cookie() -> String {
    format!("sb-code-verifier={}", CODE_VERIFIER)
}

/// Gate timeout used by the test router.
pub const CALL_TIMEOUT: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy)]
pub enum RoleAnswer {
    Role(Role),
    /// No profile row.
    Missing,
    Fail,
    /// Never answers within the gate timeout.
    Hang,
}

#[derive(Debug, Clone)]
pub struct FakeUser {
    pub id: String,
    pub email: String,
    pub access: String,
    pub refresh: String,
    pub role: RoleAnswer,
}

impl FakeUser {
    fn identity(&self) -> CallerIdentity {
        CallerIdentity {
            id: self.id.clone(),
            email: self.email.clone(),
        }
    }

    fn auth_session(&self) -> AuthSession {
        AuthSession {
            access_token: self.access.clone(),
            refresh_token: self.refresh.clone(),
            user: AuthUser {
                id: self.id.clone(),
                email: Some(self.email.clone()),
            },
        }
    }
}

#[derive(Default)]
pub struct FakeBackend {
    users: Mutex<Vec<FakeUser>>,
    codes: Mutex<HashMap<String, String>>,
    unconfirmed: Mutex<Vec<String>>,
    chapters: Mutex<Vec<Chapter>>,
    cases: Mutex<Vec<BusinessCase>>,
    pub sessions_down: AtomicBool,
    pub confirmation_required: AtomicBool,
    pub session_calls: AtomicUsize,
    pub role_calls: AtomicUsize,
    pub signed_out: Mutex<Vec<String>>,
    pub signups: Mutex<Vec<SignUpRequest>>,
    /// `(operation, access token)` for every content write.
    pub writes: Mutex<Vec<(String, String)>>,
}

impl FakeBackend {
    /// An admin, a regular user and a user without a profile row, plus one
    /// chapter with two cases.
    pub fn seeded() -> Self {
        let backend = Self::default();
        backend.add_user("admin-1", "admin@example.com", ADMIN_ACCESS, ADMIN_REFRESH, RoleAnswer::Role(Role::Admin));
        backend.add_user("user-1", "user@example.com", USER_ACCESS, USER_REFRESH, RoleAnswer::Role(Role::User));
        backend.add_user("orphan-1", "orphan@example.com", ORPHAN_ACCESS, ORPHAN_REFRESH, RoleAnswer::Missing);

        backend.chapters.lock().unwrap().push(Chapter {
            id: "ch-1".into(),
            slug: "globalisation".into(),
            title_en: "Globalisation".into(),
            title_ru: "Глобализация".into(),
            description_en: "Companies going abroad".into(),
            description_ru: "Компании выходят за рубеж".into(),
            order_index: 1,
        });
        let mut cases = backend.cases.lock().unwrap();
        let seed = [("case-1", "TruckLabs", "/audio/trucklabs-male.mp3"), ("case-2", "Sweet Home", "")];
        for (index, (id, title, male)) in seed.into_iter().enumerate() {
            cases.push(BusinessCase {
                id: id.into(),
                chapter_id: "ch-1".into(),
                title: title.into(),
                description_en: format!("{} in English", title),
                description_ru: format!("{} по-русски", title),
                transcript_en: "Transcript".into(),
                transcript_ru: "Расшифровка".into(),
                audio_url_male: male.into(),
                audio_url_female: String::new(),
                order_index: index as i32,
            });
        }
        drop(cases);
        backend
    }

    pub fn add_user(&self, id: &str, email: &str, access: &str, refresh: &str, role: RoleAnswer) {
        self.users.lock().unwrap().push(FakeUser {
            id: id.into(),
            email: email.into(),
            access: access.into(),
            refresh: refresh.into(),
            role,
        });
    }

    pub fn set_role(&self, user_id: &str, role: RoleAnswer) {
        for user in self.users.lock().unwrap().iter_mut() {
            if user.id == user_id {
                user.role = role;
            }
        }
    }

    pub fn add_code(&self, code: &str, user_id: &str) {
        self.codes.lock().unwrap().insert(code.into(), user_id.into());
    }

    pub fn add_unconfirmed(&self, email: &str) {
        self.unconfirmed.lock().unwrap().push(email.into());
    }

    pub fn chapters(&self) -> Vec<Chapter> {
        self.chapters.lock().unwrap().clone()
    }

    pub fn cases(&self) -> Vec<BusinessCase> {
        self.cases.lock().unwrap().clone()
    }

    fn user_by<F: Fn(&FakeUser) -> bool>(&self, predicate: F) -> Option<FakeUser> {
        self.users.lock().unwrap().iter().find(|u| predicate(u)).cloned()
    }

    fn record_write(&self, operation: &str, access_token: &str) {
        self.writes
            .lock()
            .unwrap()
            .push((operation.to_string(), access_token.to_string()));
    }
}

fn rejected(message: &str) -> BackendError {
    BackendError::Status {
        status: StatusCode::BAD_REQUEST,
        message: message.to_string(),
    }
}

#[async_trait]
impl SessionStore for FakeBackend {
    async fn verify(&self, access_token: &str) -> Result<CallerIdentity, BackendError> {
        self.session_calls.fetch_add(1, Ordering::SeqCst);
        if self.sessions_down.load(Ordering::SeqCst) {
            return Err(BackendError::Status {
                status: StatusCode::SERVICE_UNAVAILABLE,
                message: "auth unavailable".into(),
            });
        }
        self.user_by(|u| u.access == access_token)
            .map(|user| user.identity())
            .ok_or_else(|| invalid_token("invalid JWT"))
    }

    /// A known refresh token rotates to the user's access token and a new
    /// refresh token.
    async fn refresh(&self, refresh_token: &str) -> Result<EstablishedSession, BackendError> {
        self.session_calls.fetch_add(1, Ordering::SeqCst);
        let user = self
            .user_by(|u| u.refresh == refresh_token)
            .ok_or_else(|| invalid_token("invalid refresh token"))?;
        let rotated = SessionTokens::new(user.access.clone(), format!("{}-2", user.refresh))
            .ok_or_else(|| rejected("empty token"))?;
        Ok(EstablishedSession::refreshed(user.identity(), rotated))
    }
}

fn invalid_token(message: &str) -> BackendError {
    BackendError::Status {
        status: StatusCode::UNAUTHORIZED,
        message: message.to_string(),
    }
}

#[async_trait]
impl ProfileLookup for FakeBackend {
    async fn role_of(&self, session: &EstablishedSession) -> Result<Option<Role>, BackendError> {
        self.role_calls.fetch_add(1, Ordering::SeqCst);
        let answer = self
            .user_by(|u| u.id == session.identity.id)
            .map(|u| u.role)
            .unwrap_or(RoleAnswer::Missing);

        match answer {
            RoleAnswer::Role(role) => Ok(Some(role)),
            RoleAnswer::Missing => Ok(None),
            RoleAnswer::Fail => Err(BackendError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "profile query failed".into(),
            }),
            RoleAnswer::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(Some(Role::Admin))
            }
        }
    }
}

#[async_trait]
impl AuthProvider for FakeBackend {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError> {
        if self.unconfirmed.lock().unwrap().iter().any(|e| e == email) {
            return Err(rejected("Email not confirmed"));
        }
        match self.user_by(|u| u.email == email) {
            Some(user) if password == PASSWORD => Ok(user.auth_session()),
            _ => Err(rejected("Invalid login credentials")),
        }
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpOutcome, BackendError> {
        self.signups.lock().unwrap().push(request.clone());
        if self.user_by(|u| u.email == request.email).is_some() {
            return Err(rejected("User already registered"));
        }
        if self.confirmation_required.load(Ordering::SeqCst) {
            return Ok(SignUpOutcome::ConfirmationRequired {
                email: request.email.clone(),
            });
        }

        let user = FakeUser {
            id: format!("user-{}", self.users.lock().unwrap().len() + 1),
            email: request.email.clone(),
            access: "signup-access".into(),
            refresh: "signup-refresh".into(),
            role: RoleAnswer::Role(Role::User),
        };
        self.users.lock().unwrap().push(user.clone());
        Ok(SignUpOutcome::SignedIn(user.auth_session()))
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<AuthSession, BackendError> {
        if code_verifier != CODE_VERIFIER {
            return Err(rejected("code challenge does not match previously saved code verifier"));
        }
        let user_id = self.codes.lock().unwrap().get(code).cloned();
        user_id
            .and_then(|id| self.user_by(|u| u.id == id))
            .map(|user| user.auth_session())
            .ok_or_else(|| rejected("invalid flow state, no valid flow state found"))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        self.signed_out.lock().unwrap().push(access_token.to_string());
        Ok(())
    }
}

#[async_trait]
impl ContentStore for FakeBackend {
    async fn list_chapters(&self) -> Result<Vec<Chapter>, BackendError> {
        let mut chapters = self.chapters();
        chapters.sort_by_key(|c| c.order_index);
        Ok(chapters)
    }

    async fn find_chapter(&self, slug: &str) -> Result<Option<Chapter>, BackendError> {
        Ok(self.chapters().into_iter().find(|c| c.slug == slug))
    }

    async fn list_cases(&self, chapter_id: Option<&str>) -> Result<Vec<BusinessCase>, BackendError> {
        let mut cases: Vec<BusinessCase> = self
            .cases()
            .into_iter()
            .filter(|c| chapter_id.map_or(true, |id| c.chapter_id == id))
            .collect();
        cases.sort_by_key(|c| c.order_index);
        Ok(cases)
    }

    async fn create_chapter(&self, access_token: &str, input: &ChapterInput) -> Result<Chapter, BackendError> {
        self.record_write("create_chapter", access_token);
        let mut chapters = self.chapters.lock().unwrap();
        let chapter = Chapter {
            id: format!("ch-{}", chapters.len() + 1),
            slug: input.slug.clone(),
            title_en: input.title_en.clone(),
            title_ru: input.title_ru.clone(),
            description_en: input.description_en.clone(),
            description_ru: input.description_ru.clone(),
            order_index: input.order_index,
        };
        chapters.push(chapter.clone());
        Ok(chapter)
    }

    async fn update_chapter(&self, access_token: &str, id: &str, input: &ChapterInput) -> Result<Chapter, BackendError> {
        self.record_write("update_chapter", access_token);
        let mut chapters = self.chapters.lock().unwrap();
        let chapter = chapters
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(BackendError::NotFound("Chapter"))?;
        chapter.slug = input.slug.clone();
        chapter.title_en = input.title_en.clone();
        chapter.title_ru = input.title_ru.clone();
        chapter.order_index = input.order_index;
        Ok(chapter.clone())
    }

    async fn delete_chapter(&self, access_token: &str, id: &str) -> Result<(), BackendError> {
        self.record_write("delete_chapter", access_token);
        self.chapters.lock().unwrap().retain(|c| c.id != id);
        Ok(())
    }

    async fn create_case(&self, access_token: &str, input: &BusinessCaseInput) -> Result<BusinessCase, BackendError> {
        self.record_write("create_case", access_token);
        let mut cases = self.cases.lock().unwrap();
        let case = BusinessCase {
            id: format!("case-{}", cases.len() + 1),
            chapter_id: input.chapter_id.clone(),
            title: input.title.clone(),
            description_en: input.description_en.clone(),
            description_ru: input.description_ru.clone(),
            transcript_en: input.transcript_en.clone(),
            transcript_ru: input.transcript_ru.clone(),
            audio_url_male: input.audio_url_male.clone(),
            audio_url_female: input.audio_url_female.clone(),
            order_index: input.order_index,
        };
        cases.push(case.clone());
        Ok(case)
    }

    async fn update_case(&self, access_token: &str, id: &str, input: &BusinessCaseInput) -> Result<BusinessCase, BackendError> {
        self.record_write("update_case", access_token);
        let mut cases = self.cases.lock().unwrap();
        let case = cases
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(BackendError::NotFound("Business case"))?;
        case.title = input.title.clone();
        case.chapter_id = input.chapter_id.clone();
        case.order_index = input.order_index;
        Ok(case.clone())
    }

    async fn delete_case(&self, access_token: &str, id: &str) -> Result<(), BackendError> {
        self.record_write("delete_case", access_token);
        self.cases.lock().unwrap().retain(|c| c.id != id);
        Ok(())
    }

    async fn list_profiles(&self, access_token: &str) -> Result<Vec<Profile>, BackendError> {
        self.record_write("list_profiles", access_token);
        let created_at = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .map(|u| Profile {
                id: u.id.clone(),
                email: u.email.clone(),
                full_name: None,
                role: match u.role {
                    RoleAnswer::Role(role) => role,
                    _ => Role::User,
                },
                created_at,
            })
            .collect())
    }
}

pub struct TestApp {
    pub router: Router,
    pub backend: Arc<FakeBackend>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_backend(FakeBackend::seeded())
    }

    pub fn with_backend(backend: FakeBackend) -> Self {
        let backend = Arc::new(backend);
        let state = AppState::with_backend(
            backend.clone(),
            SessionCookies::new(false),
            CALL_TIMEOUT,
            "http://localhost:8080",
            detached_handle(),
        );
        Self {
            router: build_router(state),
            backend,
        }
    }

    pub async fn get(&self, uri: &str, cookies: Option<&str>) -> Response {
        let mut request = Request::builder().uri(uri);
        if let Some(cookies) = cookies {
            request = request.header(header::COOKIE, cookies);
        }
        self.send(request.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&self, uri: &str, form: &str, cookies: Option<&str>) -> Response {
        let mut request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookies) = cookies {
            request = request.header(header::COOKIE, cookies);
        }
        self.send(request.body(Body::from(form.to_string())).unwrap()).await
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

/// `Cookie` header carrying a session pair.
pub fn session_cookie(access: &str, refresh: &str) -> String {
    format!("sb-access-token={}; sb-refresh-token={}", access, refresh)
}

pub fn location(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

pub fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

/// The `Set-Cookie` value for `name`, if the response sets it.
pub fn set_cookie(response: &Response, name: &str) -> Option<String> {
    set_cookies(response)
        .into_iter()
        .find(|c| c.starts_with(&format!("{}=", name)))
}

pub async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
