// src/handlers/work_items.rs

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
    middleware::{
        auth::AuthenticatedUser,
        rbac::{RequireRole, WorkItemCurators},
    },
    models::work_item::{
        AllowedTransitions, ClosePayload, CreateAmendmentPayload, CreateWorkItemPayload,
        RequirementAmendment, TransitionPayload, WorkItem,
    },
};

// =============================================================================
//  1. CRIAÇÃO E LEITURA
// =============================================================================

// POST /api/work-items
#[utoipa::path(
    post,
    path = "/api/work-items",
    tag = "Work Items",
    request_body = CreateWorkItemPayload,
    responses(
        (status = 201, description = "Item criado com a chave de issue", body = WorkItem),
        (status = 403, description = "Tipo não permitido para usuários externos"),
        (status = 404, description = "Produto ou item pai não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_work_item(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Json(payload): Json<CreateWorkItemPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let item = app_state.work_item_service.create(&principal, &payload).await?;

    Ok((StatusCode::CREATED, Json(item)))
}

// GET /api/work-items/{id}
#[utoipa::path(
    get,
    path = "/api/work-items/{id}",
    tag = "Work Items",
    responses(
        (status = 200, description = "Item", body = WorkItem),
        (status = 404, description = "Item não encontrado")
    ),
    params(("id" = i64, Path, description = "ID do Item")),
    security(("api_jwt" = []))
)]
pub async fn get_work_item(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<WorkItem>, AppError> {
    let item = app_state.work_item_service.get(&principal, id).await?;
    Ok(Json(item))
}

// DELETE /api/work-items/{id}
#[utoipa::path(
    delete,
    path = "/api/work-items/{id}",
    tag = "Work Items",
    responses(
        (status = 204, description = "Item excluído"),
        (status = 403, description = "Papel sem permissão")
    ),
    params(("id" = i64, Path, description = "ID do Item")),
    security(("api_jwt" = []))
)]
pub async fn delete_work_item(
    State(app_state): State<AppState>,
    RequireRole(principal, _): RequireRole<WorkItemCurators>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    app_state.work_item_service.delete(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  2. CICLO DE VIDA
// =============================================================================

// GET /api/work-items/{id}/transitions
#[utoipa::path(
    get,
    path = "/api/work-items/{id}/transitions",
    tag = "Work Items",
    responses(
        (status = 200, description = "Próximos status válidos", body = AllowedTransitions)
    ),
    params(("id" = i64, Path, description = "ID do Item")),
    security(("api_jwt" = []))
)]
pub async fn get_transitions(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<AllowedTransitions>, AppError> {
    let allowed = app_state.work_item_service.allowed_transitions(&principal, id).await?;
    Ok(Json(allowed))
}

// POST /api/work-items/{id}/transition
#[utoipa::path(
    post,
    path = "/api/work-items/{id}/transition",
    tag = "Work Items",
    request_body = TransitionPayload,
    responses(
        (status = 200, description = "Transição aplicada", body = WorkItem),
        (status = 409, description = "Transição inválida (corpo traz os status permitidos)"),
        (status = 422, description = "Resolução obrigatória")
    ),
    params(("id" = i64, Path, description = "ID do Item")),
    security(("api_jwt" = []))
)]
pub async fn transition_work_item(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(payload): Json<TransitionPayload>,
) -> Result<Json<WorkItem>, AppError> {
    let item = app_state.work_item_service.transition(&principal, id, &payload).await?;
    Ok(Json(item))
}

// POST /api/work-items/{id}/close
#[utoipa::path(
    post,
    path = "/api/work-items/{id}/close",
    tag = "Work Items",
    request_body = ClosePayload,
    responses(
        (status = 200, description = "Item encerrado", body = WorkItem),
        (status = 422, description = "Resolução obrigatória")
    ),
    params(("id" = i64, Path, description = "ID do Item")),
    security(("api_jwt" = []))
)]
pub async fn close_work_item(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(payload): Json<ClosePayload>,
) -> Result<Json<WorkItem>, AppError> {
    let item = app_state.work_item_service.close(&principal, id, &payload).await?;
    Ok(Json(item))
}

// =============================================================================
//  3. EMENDAS DE REQUISITO
// =============================================================================

// POST /api/requirements/{id}/amendments
#[utoipa::path(
    post,
    path = "/api/requirements/{id}/amendments",
    tag = "Work Items",
    request_body = CreateAmendmentPayload,
    responses(
        (status = 201, description = "Emenda criada com o próximo número", body = RequirementAmendment),
        (status = 404, description = "Requisito não encontrado")
    ),
    params(("id" = i64, Path, description = "ID do Requisito")),
    security(("api_jwt" = []))
)]
pub async fn create_amendment(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(payload): Json<CreateAmendmentPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let amendment = app_state.work_item_service
        .create_amendment(&principal, id, &payload)
        .await?;

    Ok((StatusCode::CREATED, Json(amendment)))
}
