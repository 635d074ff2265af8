//! HTTP client for the hosted auth/database project.
//!
//! Auth calls go to the GoTrue-compatible API under `/auth/v1`, table calls
//! to the PostgREST-compatible API under `/rest/v1`.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::BackendSettings;
use crate::gate::{ProfileLookup, SessionStore};
use crate::models::{
    BusinessCase, BusinessCaseInput, CallerIdentity, Chapter, ChapterInput, EstablishedSession,
    Profile, Role,
};
use crate::services::auth::{AuthProvider, AuthSession, AuthUser, SignUpOutcome, SignUpRequest};
use crate::services::content::ContentStore;
use crate::services::error::BackendError;
use crate::session::pkce::CHALLENGE_METHOD;

const CHAPTERS: &str = "chapters";
const BUSINESS_CASES: &str = "business_cases";
const USER_PROFILES: &str = "user_profiles";

pub struct BackendClient {
    client: Client,
    settings: BackendSettings,
}

impl BackendClient {
    pub fn new(settings: BackendSettings) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(BackendError::Transport)?;

        Ok(Self { client, settings })
    }

    pub fn base_url(&self) -> &str {
        self.settings.url.trim_end_matches('/')
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.base_url(), path)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url(), table)
    }

    /// Every call carries the project key; `bearer` falls back to it for
    /// anonymous reads.
    fn request(&self, method: Method, url: String, bearer: Option<&str>) -> RequestBuilder {
        let anon_key = self.settings.anon_key.expose_secret();
        self.client
            .request(method, url)
            .header("apikey", anon_key.as_str())
            .bearer_auth(bearer.unwrap_or(anon_key.as_str()))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        });
        tracing::debug!(status = %status, message = %message, "Hosted backend returned an error");
        Err(BackendError::Status { status, message })
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        let response = self.send(request).await?;
        Ok(response.json::<T>().await?)
    }

    async fn fetch_user(&self, access_token: &str) -> Result<AuthUser, BackendError> {
        self.send_json(self.request(Method::GET, self.auth_url("/user"), Some(access_token)))
            .await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, BackendError> {
        self.send_json(
            self.request(Method::POST, self.auth_url("/token"), None)
                .query(&[("grant_type", "refresh_token")])
                .json(&json!({ "refresh_token": refresh_token })),
        )
        .await
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        bearer: Option<&str>,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, BackendError> {
        self.send_json(
            self.request(Method::GET, self.rest_url(table), bearer)
                .query(query),
        )
        .await
    }

    async fn insert<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        bearer: &str,
        body: &B,
    ) -> Result<T, BackendError> {
        let rows: Vec<T> = self
            .send_json(
                self.request(Method::POST, self.rest_url(table), Some(bearer))
                    .header("Prefer", "return=representation")
                    .json(body),
            )
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::Decode(format!("insert into {} returned no row", table)))
    }

    async fn update<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        bearer: &str,
        id: &str,
        body: &B,
        what: &'static str,
    ) -> Result<T, BackendError> {
        let rows: Vec<T> = self
            .send_json(
                self.request(Method::PATCH, self.rest_url(table), Some(bearer))
                    .query(&[("id", format!("eq.{}", id))])
                    .header("Prefer", "return=representation")
                    .json(body),
            )
            .await?;
        rows.into_iter().next().ok_or(BackendError::NotFound(what))
    }

    async fn delete(&self, table: &str, bearer: &str, id: &str) -> Result<(), BackendError> {
        self.send(
            self.request(Method::DELETE, self.rest_url(table), Some(bearer))
                .query(&[("id", format!("eq.{}", id))]),
        )
        .await?;
        Ok(())
    }
}

/// Both auth and table APIs put a human readable reason in one of these.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

#[async_trait]
impl SessionStore for BackendClient {
    async fn verify(&self, access_token: &str) -> Result<CallerIdentity, BackendError> {
        Ok(self.fetch_user(access_token).await?.into())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<EstablishedSession, BackendError> {
        let refreshed = self.refresh_session(refresh_token).await?;
        let tokens = refreshed.tokens()?;
        Ok(EstablishedSession::refreshed(refreshed.user.into(), tokens))
    }
}

#[derive(Deserialize)]
struct RoleRow {
    role: Role,
}

#[async_trait]
impl ProfileLookup for BackendClient {
    async fn role_of(&self, session: &EstablishedSession) -> Result<Option<Role>, BackendError> {
        let rows: Vec<RoleRow> = self
            .select(
                USER_PROFILES,
                Some(&session.tokens.access_token),
                &[
                    ("id", format!("eq.{}", session.identity.id)),
                    ("select", "role".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next().map(|row| row.role))
    }
}

#[async_trait]
impl AuthProvider for BackendClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError> {
        self.send_json(
            self.request(Method::POST, self.auth_url("/token"), None)
                .query(&[("grant_type", "password")])
                .json(&json!({ "email": email, "password": password })),
        )
        .await
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpOutcome, BackendError> {
        let body: Value = self
            .send_json(
                self.request(Method::POST, self.auth_url("/signup"), None)
                    .query(&[("redirect_to", request.email_redirect_to.as_str())])
                    .json(&json!({
                        "email": request.email,
                        "password": request.password,
                        "data": { "full_name": request.full_name },
                        "code_challenge": request.code_challenge,
                        "code_challenge_method": CHALLENGE_METHOD,
                    })),
            )
            .await?;

        // Without email confirmation the response is a full session,
        // otherwise just the pending user.
        if body.get("access_token").is_some() {
            let session: AuthSession =
                serde_json::from_value(body).map_err(|e| BackendError::Decode(e.to_string()))?;
            return Ok(SignUpOutcome::SignedIn(session));
        }

        let email = body
            .get("email")
            .and_then(Value::as_str)
            .unwrap_or(request.email.as_str())
            .to_string();
        Ok(SignUpOutcome::ConfirmationRequired { email })
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<AuthSession, BackendError> {
        self.send_json(
            self.request(Method::POST, self.auth_url("/token"), None)
                .query(&[("grant_type", "pkce")])
                .json(&json!({ "auth_code": code, "code_verifier": code_verifier })),
        )
        .await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        self.send(self.request(Method::POST, self.auth_url("/logout"), Some(access_token)))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ContentStore for BackendClient {
    async fn list_chapters(&self) -> Result<Vec<Chapter>, BackendError> {
        self.select(
            CHAPTERS,
            None,
            &[
                ("select", "*".to_string()),
                ("order", "order_index.asc".to_string()),
            ],
        )
        .await
    }

    async fn find_chapter(&self, slug: &str) -> Result<Option<Chapter>, BackendError> {
        let rows: Vec<Chapter> = self
            .select(
                CHAPTERS,
                None,
                &[
                    ("select", "*".to_string()),
                    ("slug", format!("eq.{}", slug)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn list_cases(&self, chapter_id: Option<&str>) -> Result<Vec<BusinessCase>, BackendError> {
        let mut query = vec![
            ("select", "*".to_string()),
            ("order", "order_index.asc".to_string()),
        ];
        if let Some(chapter_id) = chapter_id {
            query.push(("chapter_id", format!("eq.{}", chapter_id)));
        }
        self.select(BUSINESS_CASES, None, &query).await
    }

    async fn create_chapter(
        &self,
        access_token: &str,
        input: &ChapterInput,
    ) -> Result<Chapter, BackendError> {
        self.insert(CHAPTERS, access_token, &[input]).await
    }

    async fn update_chapter(
        &self,
        access_token: &str,
        id: &str,
        input: &ChapterInput,
    ) -> Result<Chapter, BackendError> {
        self.update(CHAPTERS, access_token, id, input, "Chapter").await
    }

    async fn delete_chapter(&self, access_token: &str, id: &str) -> Result<(), BackendError> {
        self.delete(CHAPTERS, access_token, id).await
    }

    async fn create_case(
        &self,
        access_token: &str,
        input: &BusinessCaseInput,
    ) -> Result<BusinessCase, BackendError> {
        self.insert(BUSINESS_CASES, access_token, &[input]).await
    }

    async fn update_case(
        &self,
        access_token: &str,
        id: &str,
        input: &BusinessCaseInput,
    ) -> Result<BusinessCase, BackendError> {
        self.update(BUSINESS_CASES, access_token, id, input, "Business case")
            .await
    }

    async fn delete_case(&self, access_token: &str, id: &str) -> Result<(), BackendError> {
        self.delete(BUSINESS_CASES, access_token, id).await
    }

    async fn list_profiles(&self, access_token: &str) -> Result<Vec<Profile>, BackendError> {
        self.select(
            USER_PROFILES,
            Some(access_token),
            &[
                ("select", "*".to_string()),
                ("order", "created_at.desc".to_string()),
            ],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_error_messages_from_both_apis() {
        assert_eq!(
            error_message(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#),
            Some("Invalid login credentials".to_string())
        );
        assert_eq!(
            error_message(r#"{"code":"PGRST116","message":"JSON object requested"}"#),
            Some("JSON object requested".to_string())
        );
        assert_eq!(error_message("<html>bad gateway</html>"), None);
    }
}
