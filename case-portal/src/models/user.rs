use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::gate::{login_redirect_target, AccessDecision, Caller};
use crate::session::SessionTokens;
use crate::AppState;

/// Role stored on a profile row. Anything other than `"admin"` is a regular
/// user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        *self == Role::Admin
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        if value == "admin" {
            Role::Admin
        } else {
            Role::User
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row of the `user_profiles` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    pub fn display_name(&self) -> &str {
        match self.full_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => self.email.split('@').next().unwrap_or("User"),
        }
    }

    pub fn joined(&self) -> String {
        self.created_at.format("%Y-%m-%d").to_string()
    }
}

/// Caller resolved from a valid session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CallerIdentity {
    pub id: String,
    #[serde(default)]
    pub email: String,
}

/// Result of presenting a token pair to the session store.
#[derive(Debug, Clone)]
pub struct EstablishedSession {
    pub identity: CallerIdentity,
    /// Token pair valid after the call; differs from the presented pair when
    /// the store refreshed it.
    pub tokens: SessionTokens,
    pub rotated: bool,
}

impl EstablishedSession {
    pub fn current(identity: CallerIdentity, tokens: SessionTokens) -> Self {
        Self {
            identity,
            tokens,
            rotated: false,
        }
    }

    pub fn refreshed(identity: CallerIdentity, tokens: SessionTokens) -> Self {
        Self {
            identity,
            tokens,
            rotated: true,
        }
    }
}

/// Page guard for admin-only handlers.
///
/// Reuses the verdict of the request gate when it already ran for this
/// request; otherwise evaluates the gate itself with the same contract.
#[derive(Debug, Clone)]
pub struct AdminCaller {
    pub session: EstablishedSession,
}

impl AdminCaller {
    pub fn identity(&self) -> &CallerIdentity {
        &self.session.identity
    }

    pub fn access_token(&self) -> &str {
        &self.session.tokens.access_token
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminCaller {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(admin) = parts.extensions.get::<AdminCaller>() {
            return Ok(admin.clone());
        }

        let jar = CookieJar::from_headers(&parts.headers);
        let tokens = state.cookies.read(&jar);
        let path = parts.uri.path().to_owned();

        let outcome = state.gate.evaluate_protected(tokens.as_ref(), &path).await;
        match (outcome.decision, outcome.caller) {
            (AccessDecision::Allow, Caller::Authenticated(session)) => Ok(AdminCaller { session }),
            (decision, _) => Err(decision
                .redirect()
                .unwrap_or_else(|| Redirect::to(&login_redirect_target(&path)))
                .into_response()),
        }
    }
}
