// src/db/api_key_repo.rs

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{common::error::AppError, models::api_key::ApiKey};

/// Registro de uma chave recém-gerada (só hash e prefixo).
#[derive(Debug)]
pub struct NewApiKey<'a> {
    pub user_id: i64,
    pub tenant_id: i64,
    pub name: &'a str,
    pub key_hash: &'a str,
    pub key_prefix: &'a str,
    pub scopes: &'a [String],
    pub rate_limit: i32,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct ApiKeyRepository {
    pool: PgPool,
}

impl ApiKeyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, key: NewApiKey<'_>) -> Result<ApiKey, AppError> {
        let created = sqlx::query_as::<_, ApiKey>(
            r#"
            INSERT INTO api_keys (user_id, tenant_id, name, key_hash, key_prefix, scopes, rate_limit, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, user_id, tenant_id, name, key_hash, key_prefix, scopes, rate_limit,
                      is_active, expires_at, last_used_at, created_at
            "#,
        )
            .bind(key.user_id)
            .bind(key.tenant_id)
            .bind(key.name)
            .bind(key.key_hash)
            .bind(key.key_prefix)
            .bind(key.scopes)
            .bind(key.rate_limit)
            .bind(key.expires_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| crate::common::db_utils::unique_violation_as_conflict(e, "Chave de API duplicada."))?;

        Ok(created)
    }

    pub async fn find_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, AppError> {
        let key = sqlx::query_as::<_, ApiKey>(
            r#"
            SELECT id, user_id, tenant_id, name, key_hash, key_prefix, scopes, rate_limit,
                   is_active, expires_at, last_used_at, created_at
            FROM api_keys
            WHERE key_hash = $1
            "#,
        )
            .bind(key_hash)
            .fetch_optional(&self.pool)
            .await?;

        Ok(key)
    }

    pub async fn touch_last_used(&self, api_key_id: i64) -> Result<(), AppError> {
        sqlx::query("UPDATE api_keys SET last_used_at = NOW() WHERE id = $1")
            .bind(api_key_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
