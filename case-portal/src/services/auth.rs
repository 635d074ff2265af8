use async_trait::async_trait;
use serde::Deserialize;

use crate::models::{CallerIdentity, EstablishedSession};
use crate::services::error::BackendError;
use crate::session::SessionTokens;

/// User object returned by the auth API.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl From<AuthUser> for CallerIdentity {
    fn from(user: AuthUser) -> Self {
        CallerIdentity {
            id: user.id,
            email: user.email.unwrap_or_default(),
        }
    }
}

/// Session issued by sign-in, sign-up, code exchange or refresh.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub user: AuthUser,
}

impl AuthSession {
    pub fn tokens(&self) -> Result<SessionTokens, BackendError> {
        SessionTokens::new(self.access_token.clone(), self.refresh_token.clone())
            .ok_or_else(|| BackendError::Decode("session without tokens".to_string()))
    }

    pub fn into_established(self) -> Result<EstablishedSession, BackendError> {
        let tokens = self.tokens()?;
        Ok(EstablishedSession::current(self.user.into(), tokens))
    }
}

#[derive(Debug, Clone)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    /// Where the confirmation email sends the user back to.
    pub email_redirect_to: String,
    /// S256 challenge for the code the confirmation link carries.
    pub code_challenge: String,
}

#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    /// The project does not require email confirmation.
    SignedIn(AuthSession),
    ConfirmationRequired { email: String },
}

/// Credential flows delegated to the hosted auth service.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError>;

    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpOutcome, BackendError>;

    /// Exchange the one-time code from an email link for a session, proving
    /// possession of the verifier whose challenge was sent at sign-up.
    async fn exchange_code(&self, code: &str, code_verifier: &str)
        -> Result<AuthSession, BackendError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError>;
}
