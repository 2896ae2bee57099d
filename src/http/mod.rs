use axum::{middleware, Router};

use crate::AppState;

mod auth;
mod error;
mod extract;
mod handlers;
mod routes;
pub mod validation;

pub use auth::{is_known_api_key, is_public_path};
pub use error::AppError;
pub use extract::JsonBody;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::system())
        .merge(routes::generic())
        .merge(routes::demo())
        .merge(routes::otp())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::api_key_middleware,
        ))
        .with_state(state)
}
