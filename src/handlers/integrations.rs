// src/handlers/integrations.rs

use axum::Json;

use crate::{
    common::error::AppError,
    middleware::api_key::ApiKeyAuth,
    models::api_key::{ApiKeyContext, SCOPE_INTEGRATIONS_READ},
};

// GET /api/integrations/whoami
#[utoipa::path(
    get,
    path = "/api/integrations/whoami",
    tag = "Integrations",
    responses(
        (status = 200, description = "Contexto da chave de API", body = ApiKeyContext),
        (status = 401, description = "Chave inválida ou expirada"),
        (status = 403, description = "Chave sem o escopo integrations:read"),
        (status = 429, description = "Limite de requisições excedido")
    ),
    security(("api_key" = []))
)]
pub async fn whoami(ApiKeyAuth(context): ApiKeyAuth) -> Result<Json<ApiKeyContext>, AppError> {
    if !context.has_scope(SCOPE_INTEGRATIONS_READ) {
        tracing::warn!(api_key_id = context.api_key_id, "Chave sem escopo para a rota");
        return Err(AppError::Forbidden);
    }
    Ok(Json(context))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(scopes: &[&str]) -> ApiKeyContext {
        ApiKeyContext {
            api_key_id: 1,
            user_id: 2,
            tenant_id: 3,
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            rate_limit: 60,
            remaining: 59,
        }
    }

    #[tokio::test]
    async fn whoami_requires_the_read_scope() {
        let denied = whoami(ApiKeyAuth(context(&[]))).await;
        assert!(matches!(denied, Err(AppError::Forbidden)));

        let Json(ctx) = whoami(ApiKeyAuth(context(&["integrations:read"]))).await.unwrap();
        assert_eq!(ctx.api_key_id, 1);

        assert!(whoami(ApiKeyAuth(context(&["*"]))).await.is_ok());
    }
}
