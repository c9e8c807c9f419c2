// src/db/tenancy_repo.rs

use sqlx::PgPool;

use crate::common::error::AppError;
use crate::models::tenancy::{Client, Tenant};

#[derive(Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_tenant(&self, tenant_id: i64) -> Result<Option<Tenant>, AppError> {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT id, name, plan, is_active, is_platform_operator, created_at, updated_at
            FROM tenants
            WHERE id = $1
            "#,
        )
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(tenant)
    }

    /// Busca o cliente garantindo que ele pertence ao tenant.
    pub async fn find_client(&self, tenant_id: i64, client_id: i64) -> Result<Option<Client>, AppError> {
        let client = sqlx::query_as::<_, Client>(
            r#"
            SELECT id, tenant_id, name, tier, is_active, gatekeeper, client_type, created_at, updated_at
            FROM clients
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
            .bind(client_id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(client)
    }
}
