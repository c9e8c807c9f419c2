// src/handlers/api_keys.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::rbac::{RequireClientAdmin, RequireInternal},
    models::api_key::{CreateApiKeyPayload, CreatedApiKey},
};

// POST /api/api-keys
#[utoipa::path(
    post,
    path = "/api/api-keys",
    tag = "Integrations",
    request_body = CreateApiKeyPayload,
    responses(
        (status = 201, description = "Chave emitida (o valor só é exibido nesta resposta)", body = CreatedApiKey),
        (status = 400, description = "Escopo desconhecido ou dados inválidos"),
        (status = 403, description = "Apenas usuários internos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_api_key(
    State(app_state): State<AppState>,
    RequireInternal(principal): RequireInternal,
    Json(payload): Json<CreateApiKeyPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let created = app_state.api_key_service.create(&principal, &payload).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

// POST /api/clients/me/api-keys
#[utoipa::path(
    post,
    path = "/api/clients/me/api-keys",
    tag = "Integrations",
    request_body = CreateApiKeyPayload,
    responses(
        (status = 201, description = "Chave emitida para a integração do cliente", body = CreatedApiKey),
        (status = 403, description = "Apenas o administrador do cliente")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_client_api_key(
    State(app_state): State<AppState>,
    RequireClientAdmin(principal): RequireClientAdmin,
    Json(payload): Json<CreateApiKeyPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let created = app_state.api_key_service.create(&principal, &payload).await?;

    Ok((StatusCode::CREATED, Json(created)))
}
