//! Access gate.
//!
//! One decision function shared by every place that needs to know whether a
//! caller may enter the admin area: the request-intercepting middleware, the
//! admin page guard and the auth callback. It never fails: every error from
//! the session store or the profile lookup resolves to a redirect.

pub mod path;

use async_trait::async_trait;
use axum::response::Redirect;
use metrics::counter;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{CallerIdentity, EstablishedSession, Role};
use crate::services::error::BackendError;
use crate::session::SessionTokens;

pub use path::{
    is_gated, is_protected, is_public_auth_route, login_redirect_target, safe_return_target,
    CALLBACK_PATH, HOME_PATH, LOGIN_PATH, SIGNUP_PATH,
};

/// Validates a token pair, and trades a stale one for a fresh pair.
///
/// The gate calls [`SessionStore::refresh`] only after `verify` rejected the
/// access token, and gives each call its own timeout.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Identity behind a still valid access token.
    async fn verify(&self, access_token: &str) -> Result<CallerIdentity, BackendError>;

    /// New token pair for a refresh token. Single use upstream.
    async fn refresh(&self, refresh_token: &str) -> Result<EstablishedSession, BackendError>;
}

/// Maps an authenticated caller to the role on their profile row.
#[async_trait]
pub trait ProfileLookup: Send + Sync {
    /// `Ok(None)` when the caller has no profile row.
    async fn role_of(&self, session: &EstablishedSession) -> Result<Option<Role>, BackendError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    RedirectToLogin { return_to: String },
    RedirectToHome,
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow)
    }

    pub fn label(&self) -> &'static str {
        match self {
            AccessDecision::Allow => "allow",
            AccessDecision::RedirectToLogin { .. } => "redirect_login",
            AccessDecision::RedirectToHome => "redirect_home",
        }
    }

    /// Redirect target, `None` for [`AccessDecision::Allow`].
    pub fn location(&self) -> Option<String> {
        match self {
            AccessDecision::Allow => None,
            AccessDecision::RedirectToLogin { return_to } => Some(login_redirect_target(return_to)),
            AccessDecision::RedirectToHome => Some(HOME_PATH.to_string()),
        }
    }

    /// 303 redirect for denied requests, `None` for [`AccessDecision::Allow`].
    /// The follow-up is always a GET, so a denied form post lands on a page.
    pub fn redirect(&self) -> Option<Redirect> {
        self.location().map(|location| Redirect::to(&location))
    }
}

/// Who is calling, as far as the session store could tell.
#[derive(Debug, Clone)]
pub enum Caller {
    Anonymous,
    Authenticated(EstablishedSession),
}

impl Caller {
    pub fn identity(&self) -> Option<&CallerIdentity> {
        match self {
            Caller::Anonymous => None,
            Caller::Authenticated(session) => Some(&session.identity),
        }
    }

    /// New token pair when the session store refreshed the session.
    pub fn rotated_tokens(&self) -> Option<&SessionTokens> {
        match self {
            Caller::Authenticated(session) if session.rotated => Some(&session.tokens),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GateOutcome {
    pub decision: AccessDecision,
    pub caller: Caller,
}

pub struct AccessGate {
    sessions: Arc<dyn SessionStore>,
    profiles: Arc<dyn ProfileLookup>,
    call_timeout: Duration,
}

impl AccessGate {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        profiles: Arc<dyn ProfileLookup>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            sessions,
            profiles,
            call_timeout,
        }
    }

    /// Full decision for a request to `path`.
    pub async fn evaluate(&self, tokens: Option<&SessionTokens>, path: &str) -> GateOutcome {
        let caller = self.resolve_caller(tokens).await;
        let decision = self.decide(&caller, path).await;
        GateOutcome { decision, caller }
    }

    /// Decision for a call site that always requires the admin role,
    /// whatever its path. `return_to` is where login should send the caller
    /// back to.
    pub async fn evaluate_protected(
        &self,
        tokens: Option<&SessionTokens>,
        return_to: &str,
    ) -> GateOutcome {
        let caller = self.resolve_caller(tokens).await;
        let decision = self.authorize(&caller, return_to).await;
        record(&decision, return_to);
        GateOutcome { decision, caller }
    }

    /// Anonymous unless both tokens are present and accepted in time.
    pub async fn resolve_caller(&self, tokens: Option<&SessionTokens>) -> Caller {
        let Some(tokens) = tokens else {
            return Caller::Anonymous;
        };

        match bounded(self.call_timeout, self.sessions.verify(&tokens.access_token)).await {
            Ok(identity) => {
                return Caller::Authenticated(EstablishedSession::current(identity, tokens.clone()))
            }
            Err(err) if err.is_rejection() => {
                tracing::debug!(error = %err, "Access token rejected, refreshing session");
            }
            Err(err) => {
                tracing::info!(error = %err, "Session store unavailable, continuing as anonymous");
                return Caller::Anonymous;
            }
        }

        // Own timeout, independent of how long verify took.
        match bounded(self.call_timeout, self.sessions.refresh(&tokens.refresh_token)).await {
            Ok(session) => Caller::Authenticated(session),
            Err(err) => {
                tracing::info!(error = %err, "Session not refreshed, continuing as anonymous");
                Caller::Anonymous
            }
        }
    }

    /// Decide for an already resolved caller. Used by flows that have just
    /// obtained a session and need not present it to the store again.
    pub async fn decide(&self, caller: &Caller, path: &str) -> AccessDecision {
        let decision = if is_protected(path) {
            self.authorize(caller, path).await
        } else {
            AccessDecision::Allow
        };
        record(&decision, path);
        decision
    }

    async fn authorize(&self, caller: &Caller, return_to: &str) -> AccessDecision {
        let session = match caller {
            Caller::Anonymous => {
                return AccessDecision::RedirectToLogin {
                    return_to: return_to.to_string(),
                }
            }
            Caller::Authenticated(session) => session,
        };

        match bounded(self.call_timeout, self.profiles.role_of(session)).await {
            Ok(Some(role)) if role.is_admin() => AccessDecision::Allow,
            Ok(Some(role)) => {
                tracing::info!(
                    user_id = %session.identity.id,
                    role = %role,
                    "Non-admin caller denied"
                );
                AccessDecision::RedirectToHome
            }
            Ok(None) => {
                tracing::warn!(user_id = %session.identity.id, "Caller has no profile row");
                AccessDecision::RedirectToHome
            }
            Err(err) => {
                tracing::warn!(
                    user_id = %session.identity.id,
                    error = %err,
                    "Profile lookup failed, denying"
                );
                AccessDecision::RedirectToHome
            }
        }
    }
}

async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, BackendError>
where
    F: Future<Output = Result<T, BackendError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| BackendError::Timeout)?
}

fn record(decision: &AccessDecision, path: &str) {
    counter!("gate_decisions_total", "decision" => decision.label()).increment(1);
    tracing::debug!(decision = decision.label(), path = %path, "Access gate decision");
}
