// src/handlers/ideas.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::idea::{ChangeVisibilityPayload, CreateIdeaPayload, Idea, IdeaPermissions, UpdateIdeaPayload},
};

// POST /api/ideas
#[utoipa::path(
    post,
    path = "/api/ideas",
    tag = "Ideas",
    request_body = CreateIdeaPayload,
    responses(
        (status = 201, description = "Ideia criada", body = Idea),
        (status = 400, description = "Visibilidade e time inconsistentes")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_idea(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Json(payload): Json<CreateIdeaPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let idea = app_state.idea_service.create(&principal, &payload).await?;

    Ok((StatusCode::CREATED, Json(idea)))
}

// GET /api/ideas
#[utoipa::path(
    get,
    path = "/api/ideas",
    tag = "Ideas",
    responses(
        (status = 200, description = "Ideias visíveis para o usuário", body = Vec<Idea>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_ideas(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
) -> Result<Json<Vec<Idea>>, AppError> {
    let ideas = app_state.idea_service.list(&principal).await?;
    Ok(Json(ideas))
}

// GET /api/ideas/{id}
#[utoipa::path(
    get,
    path = "/api/ideas/{id}",
    tag = "Ideas",
    responses(
        (status = 200, description = "Ideia", body = Idea),
        (status = 404, description = "Ideia não encontrada")
    ),
    params(("id" = i64, Path, description = "ID da Ideia")),
    security(("api_jwt" = []))
)]
pub async fn get_idea(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<Idea>, AppError> {
    let idea = app_state.idea_service.get(&principal, id).await?;
    Ok(Json(idea))
}

// PATCH /api/ideas/{id}
#[utoipa::path(
    patch,
    path = "/api/ideas/{id}",
    tag = "Ideas",
    request_body = UpdateIdeaPayload,
    responses(
        (status = 200, description = "Ideia atualizada", body = Idea),
        (status = 403, description = "Sem permissão de edição")
    ),
    params(("id" = i64, Path, description = "ID da Ideia")),
    security(("api_jwt" = []))
)]
pub async fn update_idea(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateIdeaPayload>,
) -> Result<Json<Idea>, AppError> {
    payload.validate()?;

    let idea = app_state.idea_service.update(&principal, id, &payload).await?;
    Ok(Json(idea))
}

// DELETE /api/ideas/{id}
#[utoipa::path(
    delete,
    path = "/api/ideas/{id}",
    tag = "Ideas",
    responses(
        (status = 204, description = "Ideia excluída"),
        (status = 403, description = "Sem permissão de exclusão")
    ),
    params(("id" = i64, Path, description = "ID da Ideia")),
    security(("api_jwt" = []))
)]
pub async fn delete_idea(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    app_state.idea_service.delete(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// PUT /api/ideas/{id}/visibility
#[utoipa::path(
    put,
    path = "/api/ideas/{id}/visibility",
    tag = "Ideas",
    request_body = ChangeVisibilityPayload,
    responses(
        (status = 200, description = "Visibilidade alterada", body = Idea),
        (status = 403, description = "Sem permissão para esta mudança")
    ),
    params(("id" = i64, Path, description = "ID da Ideia")),
    security(("api_jwt" = []))
)]
pub async fn change_visibility(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(payload): Json<ChangeVisibilityPayload>,
) -> Result<Json<Idea>, AppError> {
    let idea = app_state.idea_service.change_visibility(&principal, id, &payload).await?;
    Ok(Json(idea))
}

// GET /api/ideas/{id}/permissions
#[utoipa::path(
    get,
    path = "/api/ideas/{id}/permissions",
    tag = "Ideas",
    responses(
        (status = 200, description = "Decisões de acesso do usuário atual", body = IdeaPermissions)
    ),
    params(("id" = i64, Path, description = "ID da Ideia")),
    security(("api_jwt" = []))
)]
pub async fn get_permissions(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<IdeaPermissions>, AppError> {
    let permissions = app_state.idea_service.permissions(&principal, id).await?;
    Ok(Json(permissions))
}
