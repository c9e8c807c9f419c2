// src/models/api_key.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Escopos reconhecidos; `*` libera todos.
pub const SCOPE_ALL: &str = "*";
pub const SCOPE_INTEGRATIONS_READ: &str = "integrations:read";
pub const KNOWN_SCOPES: &[&str] = &[SCOPE_ALL, SCOPE_INTEGRATIONS_READ];

// O que sai do banco. A chave em si nunca é armazenada, apenas o hash.
#[derive(Debug, Clone, FromRow)]
pub struct ApiKey {
    pub id: i64,
    pub user_id: i64,
    pub tenant_id: i64,
    pub name: String,
    pub key_hash: String,
    // Ex: "tk_3f9a1c0b", apenas para identificação humana
    pub key_prefix: String,
    pub scopes: Vec<String>,
    pub rate_limit: i32,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Contexto do chamador autenticado por chave de API.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyContext {
    pub api_key_id: i64,
    pub user_id: i64,
    pub tenant_id: i64,
    pub scopes: Vec<String>,
    pub rate_limit: u32,
    /// Requisições restantes na janela atual
    pub remaining: u32,
}

impl ApiKeyContext {
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope || s == SCOPE_ALL)
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateApiKeyPayload {
    #[validate(length(min = 1, max = 100, message = "O nome é obrigatório."))]
    #[schema(example = "Integração ERP")]
    pub name: String,
    /// Padrão: `integrations:read`
    pub scopes: Option<Vec<String>>,
    /// Requisições por minuto (padrão 60)
    #[validate(range(min = 1, max = 10000, message = "Limite deve estar entre 1 e 10000."))]
    pub rate_limit: Option<i32>,
    #[validate(range(min = 1, max = 3650, message = "Validade deve estar entre 1 e 3650 dias."))]
    pub expires_in_days: Option<i64>,
}

/// Resposta da emissão. `key` só aparece aqui: depois disso apenas o hash existe.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatedApiKey {
    pub id: i64,
    pub name: String,
    #[schema(example = "tk_3f9a1c0b...")]
    pub key: String,
    pub key_prefix: String,
    pub scopes: Vec<String>,
    pub rate_limit: i32,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_scope_matches_everything() {
        let ctx = ApiKeyContext {
            api_key_id: 1,
            user_id: 2,
            tenant_id: 3,
            scopes: vec!["*".into()],
            rate_limit: 5,
            remaining: 4,
        };
        assert!(ctx.has_scope("work_items:read"));

        let narrow = ApiKeyContext { scopes: vec!["ideas:read".into()], ..ctx };
        assert!(narrow.has_scope("ideas:read"));
        assert!(!narrow.has_scope("ideas:write"));
    }
}
