use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::error::ApiError;
use crate::state::AppState;

/// Middleware requiring `Authorization: Bearer <token>` on every route.
/// The event and reconcile endpoints mutate DNS records, so nothing is
/// served anonymously.
pub async fn require_bearer_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    match bearer_token(header) {
        Some(token) if token == state.auth_token.as_str() => Ok(next.run(request).await),
        _ => Err(ApiError::unauthorized("missing or invalid bearer token")),
    }
}

/// Extract the token from a `Bearer` authorization header value. The scheme
/// comparison is case-insensitive per RFC 7235; the token itself is not.
fn bearer_token(header: &str) -> Option<&str> {
    let mut parts = header.splitn(2, ' ');
    match (parts.next(), parts.next()) {
        (Some(scheme), Some(token)) if scheme.eq_ignore_ascii_case("bearer") => {
            let token = token.trim();
            (!token.is_empty()).then_some(token)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::bearer_token;

    #[test]
    fn extracts_the_token_after_the_scheme() {
        assert_eq!(bearer_token("Bearer abc123"), Some("abc123"));
        assert_eq!(bearer_token("bearer abc123"), Some("abc123"));
    }

    #[test]
    fn rejects_other_schemes_and_malformed_headers() {
        assert_eq!(bearer_token("Basic abc123"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc123"), None);
        assert_eq!(bearer_token(""), None);
    }
}
