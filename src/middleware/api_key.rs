// src/middleware/api_key.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderValue},
    middleware::Next,
    response::Response,
};

use crate::{common::error::AppError, config::AppState, models::api_key::ApiKeyContext};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Autenticação máquina-a-máquina. Respostas bem-sucedidas levam os
/// cabeçalhos de limite da chave.
pub async fn api_key_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let raw_key = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .ok_or(AppError::InvalidKey)?
        .to_owned();

    let context = app_state.api_key_service.authenticate(&raw_key).await?;
    let (limit, remaining) = (context.rate_limit, context.remaining);

    request.extensions_mut().insert(context);
    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert("x-ratelimit-limit", HeaderValue::from(limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(remaining));

    Ok(response)
}

pub struct ApiKeyAuth(pub ApiKeyContext);

impl<S> FromRequestParts<S> for ApiKeyAuth
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ApiKeyContext>()
            .cloned()
            .map(ApiKeyAuth)
            .ok_or(AppError::InvalidKey)
    }
}
