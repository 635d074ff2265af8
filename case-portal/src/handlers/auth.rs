use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::gate::{
    path::PROTECTED_PREFIX, safe_return_target, Caller, CALLBACK_PATH, HOME_PATH, LOGIN_PATH,
};
use crate::services::{AuthSession, BackendError, SignUpOutcome, SignUpRequest};
use crate::session::pkce::PkcePair;
use crate::AppState;

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub email: String,
    pub redirect: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "signup.html")]
pub struct SignupTemplate {
    pub email: String,
    pub full_name: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "signup_pending.html")]
pub struct SignupPendingTemplate {
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub redirect: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginForm {
    #[validate(contains(pattern = "@", message = "Please enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
    #[serde(default)]
    pub redirect: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignupForm {
    #[validate(contains(pattern = "@", message = "Please enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters."))]
    pub password: String,
    #[validate(custom(function = "validate_not_blank"))]
    pub full_name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub next: Option<String>,
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if !value.trim().is_empty() {
        return Ok(());
    }
    let mut error = ValidationError::new("blank");
    error.message = Some("Full name is required.".into());
    Err(error)
}

fn first_message(errors: &ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errors| errors.iter())
        .find_map(|error| error.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Please check the form and try again.".to_string())
}

/// Message shown on the login form for a failed sign-in.
fn login_error_message(err: &BackendError) -> String {
    match err.upstream_message() {
        Some(message) if message.contains("Email not confirmed") => {
            "Please verify your email address before signing in.".to_string()
        }
        Some(message) if message.to_lowercase().contains("invalid") => {
            "Invalid credentials. Please check your email and password.".to_string()
        }
        Some(message) => message.to_string(),
        None => "Sign-in is temporarily unavailable. Please try again.".to_string(),
    }
}

fn signup_error_message(err: &BackendError) -> String {
    match err.upstream_message() {
        Some(message) if message.contains("invalid") => {
            "Invalid email format. Please check your email address.".to_string()
        }
        Some(message) => message.to_string(),
        None => "Sign-up is temporarily unavailable. Please try again.".to_string(),
    }
}

pub async fn login_page(Query(query): Query<LoginQuery>) -> impl IntoResponse {
    LoginTemplate {
        email: String::new(),
        redirect: query.redirect.unwrap_or_default(),
        error: None,
    }
}

/// Password sign-in. On success the session cookies are set and the caller
/// is sent to the requested page if the gate lets them in, otherwise to the
/// admin panel for admins and home for everyone else.
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let redirect = form.redirect.clone().unwrap_or_default();
    let rejected = |error: String| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            LoginTemplate {
                email: form.email.clone(),
                redirect: redirect.clone(),
                error: Some(error),
            },
        )
            .into_response()
    };

    if let Err(errors) = form.validate() {
        return rejected(first_message(&errors));
    }

    let session = match state
        .auth
        .sign_in(&form.email, &form.password)
        .await
        .and_then(AuthSession::into_established)
    {
        Ok(session) => session,
        Err(err) => {
            tracing::info!(error = %err, "Sign-in failed");
            return rejected(login_error_message(&err));
        }
    };

    let tokens = session.tokens.clone();
    let user_id = session.identity.id.clone();
    let caller = Caller::Authenticated(session);

    // A caller denied a protected return target is denied the admin panel
    // too, so one decision covers both choices.
    let candidate = form
        .redirect
        .as_deref()
        .and_then(safe_return_target)
        .unwrap_or(PROTECTED_PREFIX);
    let target = if state.gate.decide(&caller, candidate).await.is_allowed() {
        candidate
    } else {
        HOME_PATH
    };

    tracing::info!(user_id = %user_id, target = %target, "User signed in");
    (state.cookies.persist(jar, &tokens), Redirect::to(target)).into_response()
}

pub async fn signup_page() -> impl IntoResponse {
    SignupTemplate {
        email: String::new(),
        full_name: String::new(),
        error: None,
    }
}

pub async fn signup_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<SignupForm>,
) -> Response {
    let rejected = |error: String| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            SignupTemplate {
                email: form.email.clone(),
                full_name: form.full_name.clone(),
                error: Some(error),
            },
        )
            .into_response()
    };

    if let Err(errors) = form.validate() {
        return rejected(first_message(&errors));
    }

    let pkce = PkcePair::generate();
    let request = SignUpRequest {
        email: form.email.clone(),
        password: form.password.clone(),
        full_name: form.full_name.trim().to_string(),
        email_redirect_to: format!("{}{}", state.public_url, CALLBACK_PATH),
        code_challenge: pkce.challenge.clone(),
    };

    match state.auth.sign_up(&request).await {
        Ok(SignUpOutcome::SignedIn(session)) => match session.tokens() {
            Ok(tokens) => {
                tracing::info!(user_id = %session.user.id, "User signed up and signed in");
                (state.cookies.persist(jar, &tokens), Redirect::to(HOME_PATH)).into_response()
            }
            Err(err) => {
                tracing::error!(error = %err, "Sign-up returned an unusable session");
                rejected(signup_error_message(&err))
            }
        },
        Ok(SignUpOutcome::ConfirmationRequired { email }) => {
            tracing::info!("User signed up, email confirmation pending");
            (
                state.cookies.persist_verifier(jar, &pkce.verifier),
                SignupPendingTemplate { email },
            )
                .into_response()
        }
        Err(err) => {
            tracing::info!(error = %err, "Sign-up failed");
            rejected(signup_error_message(&err))
        }
    }
}

/// Landing point for email confirmation links.
pub async fn callback_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let Some(code) = query.code.filter(|code| !code.is_empty()) else {
        return Redirect::temporary(LOGIN_PATH).into_response();
    };
    let Some(verifier) = state.cookies.read_verifier(&jar) else {
        tracing::warn!("Auth callback without a code verifier");
        return Redirect::temporary(LOGIN_PATH).into_response();
    };
    let jar = state.cookies.clear_verifier(jar);

    let session = match state
        .auth
        .exchange_code(&code, &verifier)
        .await
        .and_then(AuthSession::into_established)
    {
        Ok(session) => session,
        Err(err) => {
            tracing::warn!(error = %err, "Auth code exchange failed");
            return (jar, Redirect::temporary(LOGIN_PATH)).into_response();
        }
    };

    let tokens = session.tokens.clone();
    let caller = Caller::Authenticated(session);
    let next = query
        .next
        .as_deref()
        .and_then(safe_return_target)
        .unwrap_or(HOME_PATH);

    let target = state
        .gate
        .decide(&caller, next)
        .await
        .location()
        .unwrap_or_else(|| next.to_string());

    (state.cookies.persist(jar, &tokens), Redirect::temporary(&target)).into_response()
}

/// Sign out remotely if possible, then drop both cookies regardless.
pub async fn logout_handler(State(state): State<AppState>, jar: CookieJar) -> Response {
    if let Some(tokens) = state.cookies.read(&jar) {
        match state.auth.sign_out(&tokens.access_token).await {
            Ok(()) => tracing::info!("Session revoked"),
            Err(e) => tracing::warn!("Failed to revoke session during logout: {}", e),
        }
    }

    (state.cookies.clear(jar), Redirect::to(HOME_PATH)).into_response()
}
