use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use subtle::ConstantTimeEq;

use crate::http::AppError;
use crate::AppState;

/// Requires `Authorization: Bearer <key>` with a configured API key on every
/// path outside the public list. Public paths match exactly and
/// case-sensitively. With no keys configured only public paths are reachable.
pub async fn api_key_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if is_public_path(&state.public_paths, request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match provided {
        None => return Err(AppError::forbidden("missing API key")),
        Some(key) if !is_known_api_key(&state.api_keys, key) => {
            tracing::warn!(path = %request.uri().path(), "rejected request with unknown API key");
            return Err(AppError::forbidden("invalid API key"));
        }
        Some(_) => {}
    }

    Ok(next.run(request).await)
}

pub fn is_public_path(public_paths: &[String], path: &str) -> bool {
    public_paths.iter().any(|public| public == path)
}

pub fn is_known_api_key(api_keys: &[String], provided: &str) -> bool {
    if provided.is_empty() {
        return false;
    }
    // Checks every key so timing does not depend on which one matched.
    api_keys.iter().fold(false, |found, key| {
        let matches: bool = key.as_bytes().ct_eq(provided.as_bytes()).into();
        found | matches
    })
}
