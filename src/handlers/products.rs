// src/handlers/products.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::rbac::RequireInternal,
    models::product::{AllocatedKey, IssueType, ProductSequence},
};

// POST /api/products/{product_id}/sequences/{issue_type}
#[utoipa::path(
    post,
    path = "/api/products/{product_id}/sequences/{issue_type}",
    tag = "Products",
    responses(
        (status = 201, description = "Chave alocada", body = AllocatedKey),
        (status = 404, description = "Produto não encontrado"),
        (status = 422, description = "Produto sem código")
    ),
    params(
        ("product_id" = i64, Path, description = "ID do Produto"),
        ("issue_type" = String, Path, description = "Letra (E, F, T, B, S, R, K, N) ou nome do tipo")
    ),
    security(("api_jwt" = []))
)]
pub async fn allocate_key(
    State(app_state): State<AppState>,
    RequireInternal(principal): RequireInternal,
    Path((product_id, issue_type)): Path<(i64, String)>,
) -> Result<impl IntoResponse, AppError> {
    let issue_type: IssueType = issue_type
        .parse()
        .map_err(|_| AppError::InvalidInput(format!("Tipo de issue desconhecido: '{}'.", issue_type)))?;

    let key = app_state.sequence_service
        .allocate_for_tenant(principal.tenant_id, product_id, issue_type)
        .await?;

    Ok((StatusCode::CREATED, Json(AllocatedKey { key })))
}

// GET /api/products/{product_id}/sequences
#[utoipa::path(
    get,
    path = "/api/products/{product_id}/sequences",
    tag = "Products",
    responses(
        (status = 200, description = "Contadores do produto", body = Vec<ProductSequence>)
    ),
    params(
        ("product_id" = i64, Path, description = "ID do Produto")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_sequences(
    State(app_state): State<AppState>,
    RequireInternal(principal): RequireInternal,
    Path(product_id): Path<i64>,
) -> Result<Json<Vec<ProductSequence>>, AppError> {
    let product = app_state.sequence_service
        .product_in_tenant(principal.tenant_id, product_id)
        .await?;

    let sequences = app_state.product_repo.list_sequences(product.id).await?;
    Ok(Json(sequences))
}
