// src/db/idea_repo.rs

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    models::idea::{Idea, IdeaStatus, Visibility},
};

const IDEA_COLUMNS: &str = "id, tenant_id, created_by, title, description, visibility, team_id, status, published_at, created_at, updated_at";

#[derive(Clone)]
pub struct IdeaRepository {
    pool: PgPool,
}

impl IdeaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        tenant_id: i64,
        created_by: i64,
        title: &str,
        description: Option<&str>,
        visibility: Visibility,
        team_id: Option<i64>,
        published_at: Option<DateTime<Utc>>,
    ) -> Result<Idea, AppError> {
        let idea = sqlx::query_as::<_, Idea>(&format!(
            r#"
            INSERT INTO ideas (tenant_id, created_by, title, description, visibility, team_id, status, published_at)
            VALUES ($1, $2, $3, $4, $5, $6, 'inbox', $7)
            RETURNING {IDEA_COLUMNS}
            "#
        ))
            .bind(tenant_id)
            .bind(created_by)
            .bind(title)
            .bind(description)
            .bind(visibility)
            .bind(team_id)
            .bind(published_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(idea)
    }

    /// Busca sem filtro de tenant: a decisão de acesso fica com o motor de visibilidade.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Idea>, AppError> {
        let idea = sqlx::query_as::<_, Idea>(&format!("SELECT {IDEA_COLUMNS} FROM ideas WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(idea)
    }

    /// Candidatas à listagem: públicas, do próprio usuário ou dos seus times.
    /// O filtro fino continua sendo o motor de visibilidade.
    pub async fn list_candidates(
        &self,
        tenant_id: i64,
        user_id: i64,
        team_ids: &[i64],
        everything: bool,
    ) -> Result<Vec<Idea>, AppError> {
        let ideas = sqlx::query_as::<_, Idea>(&format!(
            r#"
            SELECT {IDEA_COLUMNS}
            FROM ideas
            WHERE tenant_id = $1
              AND ($4 OR visibility = 'public' OR created_by = $2 OR team_id = ANY($3))
            ORDER BY created_at DESC
            "#
        ))
            .bind(tenant_id)
            .bind(user_id)
            .bind(team_ids)
            .bind(everything)
            .fetch_all(&self.pool)
            .await?;

        Ok(ideas)
    }

    pub async fn update_content(
        &self,
        id: i64,
        title: Option<&str>,
        description: Option<&str>,
        status: Option<IdeaStatus>,
    ) -> Result<Idea, AppError> {
        let idea = sqlx::query_as::<_, Idea>(&format!(
            r#"
            UPDATE ideas
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                status = COALESCE($4, status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {IDEA_COLUMNS}
            "#
        ))
            .bind(id)
            .bind(title)
            .bind(description)
            .bind(status)
            .fetch_one(&self.pool)
            .await?;

        Ok(idea)
    }

    pub async fn update_visibility(
        &self,
        id: i64,
        visibility: Visibility,
        team_id: Option<i64>,
        published_at: Option<DateTime<Utc>>,
    ) -> Result<Idea, AppError> {
        let idea = sqlx::query_as::<_, Idea>(&format!(
            r#"
            UPDATE ideas
            SET visibility = $2, team_id = $3, published_at = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING {IDEA_COLUMNS}
            "#
        ))
            .bind(id)
            .bind(visibility)
            .bind(team_id)
            .bind(published_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(idea)
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        sqlx::query("DELETE FROM ideas WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
