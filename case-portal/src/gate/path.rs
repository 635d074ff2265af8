//! Route classification and redirect targets used by the access gate.

pub const PROTECTED_PREFIX: &str = "/admin";
pub const LOGIN_PATH: &str = "/auth/login";
pub const SIGNUP_PATH: &str = "/auth/signup";
pub const CALLBACK_PATH: &str = "/auth/callback";
pub const HOME_PATH: &str = "/";

/// Query parameter carrying the page to return to after login.
pub const RETURN_PARAM: &str = "redirect";

const STATIC_EXTENSIONS: &[&str] = &[
    ".svg", ".png", ".jpg", ".jpeg", ".gif", ".webp", ".mp3", ".ico",
];

/// Login, signup and callback are reachable in every session state.
pub fn is_public_auth_route(path: &str) -> bool {
    [LOGIN_PATH, SIGNUP_PATH, CALLBACK_PATH].contains(&path)
}

/// Paths that require the admin role.
///
/// Plain prefix match, so `/admin`, `/admin/users` and `/administrator` are
/// all protected.
pub fn is_protected(path: &str) -> bool {
    !is_public_auth_route(path) && path.starts_with(PROTECTED_PREFIX)
}

/// Whether the request gate runs for this path at all. Liveness, metrics
/// and static media skip it; protected paths never do.
pub fn is_gated(path: &str) -> bool {
    if is_protected(path) {
        return true;
    }
    if matches!(path, "/health" | "/metrics" | "/favicon.ico") {
        return false;
    }
    let lower = path.to_ascii_lowercase();
    !STATIC_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// `/auth/login?redirect=<path>`.
pub fn login_redirect_target(return_to: &str) -> String {
    format!("{}?{}={}", LOGIN_PATH, RETURN_PARAM, encode_query_value(return_to))
}

/// Accept only same-origin absolute paths as post-login destinations.
pub fn safe_return_target(candidate: &str) -> Option<&str> {
    let ok = candidate.starts_with('/')
        && !candidate.starts_with("//")
        && !candidate.contains('\\')
        && !candidate.chars().any(char::is_control);
    ok.then_some(candidate)
}

/// Percent-encode a query value segment by segment, leaving `/` readable.
fn encode_query_value(value: &str) -> String {
    value
        .split('/')
        .map(|segment| urlencoding::encode(segment))
        .collect::<Vec<_>>()
        .join("/")
}
