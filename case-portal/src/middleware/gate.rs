use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::gate::{is_gated, is_protected, Caller};
use crate::models::AdminCaller;
use crate::session::ACCESS_TOKEN_COOKIE;
use crate::AppState;

/// Request-intercepting gate.
///
/// Runs the access gate for every gated path, answers denied requests with a
/// redirect, and otherwise passes the request through with the resolved
/// [`Caller`] (and, on protected paths, the verified [`AdminCaller`]) in its
/// extensions. A token pair refreshed by the session store is written back
/// as cookies.
pub async fn access_gate_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    if !is_gated(&path) {
        return next.run(request).await;
    }

    let tokens = state.cookies.read(&jar);
    let outcome = state.gate.evaluate(tokens.as_ref(), &path).await;
    let rotated = outcome.caller.rotated_tokens().cloned();

    let response = match outcome.decision.redirect() {
        Some(redirect) => {
            tracing::info!(
                path = %path,
                decision = outcome.decision.label(),
                "Access gate redirect"
            );
            redirect.into_response()
        }
        None => {
            if let Caller::Authenticated(session) = &outcome.caller {
                if is_protected(&path) {
                    request.extensions_mut().insert(AdminCaller {
                        session: session.clone(),
                    });
                }
            }
            request.extensions_mut().insert(outcome.caller);
            next.run(request).await
        }
    };

    match rotated {
        // A handler that wrote the session cookies itself (login, logout) wins.
        Some(tokens) if !sets_session_cookie(&response) => {
            (state.cookies.persist(jar, &tokens), response).into_response()
        }
        _ => response,
    }
}

fn sets_session_cookie(response: &Response) -> bool {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.starts_with(ACCESS_TOKEN_COOKIE))
}
