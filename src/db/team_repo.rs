// src/db/team_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    models::team::{Team, TeamRole},
    services::visibility::MembershipLookup,
};

#[derive(Clone)]
pub struct TeamRepository {
    pool: PgPool,
}

impl TeamRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_in_tenant(&self, tenant_id: i64, team_id: i64) -> Result<Option<Team>, AppError> {
        let team = sqlx::query_as::<_, Team>(
            "SELECT id, tenant_id, product_id, name, created_at FROM teams WHERE id = $1 AND tenant_id = $2",
        )
            .bind(team_id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(team)
    }

    /// Ids dos times de que o usuário participa (para listagens).
    pub async fn team_ids_for_user(&self, user_id: i64) -> Result<Vec<i64>, AppError> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT team_id FROM team_members WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(ids)
    }
}

#[async_trait]
impl MembershipLookup for TeamRepository {
    async fn team_role(&self, team_id: i64, user_id: i64) -> Result<Option<TeamRole>, AppError> {
        let role = sqlx::query_scalar::<_, TeamRole>(
            "SELECT role FROM team_members WHERE team_id = $1 AND user_id = $2",
        )
            .bind(team_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(role)
    }
}
