use axum::{extract::Request, http::header, middleware::Next, response::Response};

/// Baseline headers for server-rendered pages.
///
/// Audio files are served from the hosted storage bucket, so `media-src`
/// allows any https origin; everything else is same-origin only.
pub async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        header::HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        header::REFERRER_POLICY,
        header::HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        header::X_FRAME_OPTIONS,
        header::HeaderValue::from_static("DENY"),
    );
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        header::HeaderValue::from_static(
            "default-src 'self'; \
             style-src 'self' 'unsafe-inline'; \
             img-src 'self' data:; \
             media-src 'self' https:; \
             form-action 'self'; \
             frame-ancestors 'none'",
        ),
    );

    response
}
