// src/common/error.rs

use axum::{
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// Nosso tipo de erro único para todo o núcleo, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    // Token ausente, inválido, expirado ou usuário desativado
    #[error("Não autenticado")]
    Unauthenticated,

    #[error("Acesso negado")]
    Forbidden,

    #[error("{0} não encontrado")]
    NotFound(&'static str),

    #[error("Transição inválida de '{from}' para '{to}' em {entity}")]
    IllegalTransition {
        entity: &'static str,
        from: String,
        to: String,
        allowed: Vec<String>,
    },

    #[error("Código de resolução obrigatório para encerrar {0}")]
    MissingResolution(&'static str),

    #[error("Chave de API inválida")]
    InvalidKey,

    #[error("Chave de API expirada")]
    KeyExpired,

    #[error("Limite de requisições excedido")]
    RateLimited {
        limit: u32,
        retry_after_secs: u64,
        reset_at: i64,
    },

    #[error("Produto não encontrado")]
    ProductNotFound,

    #[error("Produto sem código definido")]
    ProductMissingCode,

    #[error("Conflito: {0}")]
    Conflict(String),

    // Qualquer falha do banco vira "store indisponível" para o chamador.
    #[error("Banco de dados indisponível")]
    StoreUnavailable(#[source] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::NotFound("Registro"),
            other => AppError::StoreUnavailable(other),
        }
    }
}

impl AppError {
    /// Código estável exposto no corpo da resposta.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::Unauthenticated => "UNAUTHENTICATED",
            AppError::Forbidden => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::IllegalTransition { .. } => "ILLEGAL_TRANSITION",
            AppError::MissingResolution(_) => "MISSING_RESOLUTION",
            AppError::InvalidKey => "INVALID_KEY",
            AppError::KeyExpired => "KEY_EXPIRED",
            AppError::RateLimited { .. } => "RATE_LIMITED",
            AppError::ProductNotFound => "PRODUCT_NOT_FOUND",
            AppError::ProductMissingCode => "PRODUCT_MISSING_CODE",
            AppError::Conflict(_) => "CONFLICT",
            AppError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            AppError::InternalServerError(_) | AppError::BcryptError(_) | AppError::JwtError(_) => {
                "INTERNAL_ERROR"
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials
            | AppError::Unauthenticated
            | AppError::InvalidKey
            | AppError::KeyExpired => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) | AppError::ProductNotFound => StatusCode::NOT_FOUND,
            AppError::IllegalTransition { .. } | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::MissingResolution(_) | AppError::ProductMissingCode => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InternalServerError(_) | AppError::BcryptError(_) | AppError::JwtError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let body = match &self {
            // Retornar todos os detalhes da validação.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                json!({
                    "error": code,
                    "message": "Um ou mais campos são inválidos.",
                    "details": details,
                })
            }
            // O chamador recebe o conjunto de próximos estados válidos.
            AppError::IllegalTransition { entity, from, to, allowed } => json!({
                "error": code,
                "message": self.to_string(),
                "entity": entity,
                "from": from,
                "to": to,
                "allowed": allowed,
            }),
            AppError::StoreUnavailable(e) => {
                tracing::error!("🔥 Falha no banco de dados: {}", e);
                json!({ "error": code, "message": "Serviço temporariamente indisponível." })
            }
            AppError::InternalServerError(_) | AppError::BcryptError(_) | AppError::JwtError(_) => {
                tracing::error!("Erro Interno do Servidor: {}", self);
                json!({ "error": code, "message": "Ocorreu um erro inesperado." })
            }
            other => json!({ "error": code, "message": other.to_string() }),
        };

        let mut response = (status, Json(body)).into_response();

        if let AppError::RateLimited { limit, retry_after_secs, reset_at } = self {
            let headers = response.headers_mut();
            insert_header(headers, "x-ratelimit-limit", limit.to_string());
            insert_header(headers, "x-ratelimit-remaining", "0".to_string());
            insert_header(headers, "x-ratelimit-reset", reset_at.to_string());
            insert_header(headers, "retry-after", retry_after_secs.to_string());
        }

        response
    }
}

fn insert_header(headers: &mut HeaderMap, name: &'static str, value: String) {
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn pool_timeout_maps_to_store_unavailable() {
        let err: AppError = sqlx::Error::PoolTimedOut.into();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.code(), "STORE_UNAVAILABLE");
    }

    #[test]
    fn rate_limited_response_carries_headers() {
        let response = AppError::RateLimited {
            limit: 5,
            retry_after_secs: 42,
            reset_at: 1_700_000_000,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let headers = response.headers();
        assert_eq!(headers["x-ratelimit-limit"], "5");
        assert_eq!(headers["x-ratelimit-remaining"], "0");
        assert_eq!(headers["x-ratelimit-reset"], "1700000000");
        assert_eq!(headers["retry-after"], "42");
    }

    #[test]
    fn illegal_transition_is_conflict() {
        let err = AppError::IllegalTransition {
            entity: "requirement",
            from: "implemented".into(),
            to: "draft".into(),
            allowed: vec![],
        };
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }
}
