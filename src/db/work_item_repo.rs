// src/db/work_item_repo.rs

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::error::AppError,
    models::work_item::{
        Priority, RequirementAmendment, TicketType, WorkItem, WorkItemKind,
    },
    services::{work_item_service::WorkItemStore, workflow::StatusChange},
};

const WORK_ITEM_COLUMNS: &str = r#"
    id, tenant_id, product_id, parent_id, client_id, kind, ticket_type, issue_key,
    title, description, status, priority, resolution, resolution_note,
    brainstorm_started_at, solidified_at, implementation_started_at, completed_at, closed_at,
    metadata, created_by, created_at, updated_at
"#;

/// Dados para inserir um novo item (chave e status já resolvidos pelo serviço).
#[derive(Debug)]
pub struct NewWorkItem<'a> {
    pub tenant_id: i64,
    pub product_id: i64,
    pub parent_id: Option<i64>,
    pub client_id: Option<i64>,
    pub kind: WorkItemKind,
    pub ticket_type: Option<TicketType>,
    pub issue_key: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub status: &'a str,
    pub priority: Priority,
    pub metadata: Option<&'a Value>,
    pub created_by: i64,
}

#[derive(Clone)]
pub struct WorkItemRepository {
    pool: PgPool,
}

impl WorkItemRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert<'e, E>(&self, executor: E, item: NewWorkItem<'_>) -> Result<WorkItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let created = sqlx::query_as::<_, WorkItem>(&format!(
            r#"
            INSERT INTO work_items (
                tenant_id, product_id, parent_id, client_id, kind, ticket_type, issue_key,
                title, description, status, priority, metadata, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {WORK_ITEM_COLUMNS}
            "#
        ))
            .bind(item.tenant_id)
            .bind(item.product_id)
            .bind(item.parent_id)
            .bind(item.client_id)
            .bind(item.kind)
            .bind(item.ticket_type)
            .bind(item.issue_key)
            .bind(item.title)
            .bind(item.description)
            .bind(item.status)
            .bind(item.priority)
            .bind(item.metadata)
            .bind(item.created_by)
            .fetch_one(executor)
            .await
            .map_err(|e| crate::common::db_utils::unique_violation_as_conflict(e, "Chave de issue já utilizada."))?;

        Ok(created)
    }

    /// Busca sempre com escopo de tenant; itens excluídos não aparecem.
    pub async fn find_in_tenant<'e, E>(
        &self,
        executor: E,
        tenant_id: i64,
        id: i64,
    ) -> Result<Option<WorkItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, WorkItem>(&format!(
            "SELECT {WORK_ITEM_COLUMNS} FROM work_items WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL"
        ))
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(executor)
            .await?;

        Ok(item)
    }

    /// Grava o novo status e os campos derivados numa única escrita.
    /// Só aplica se o status ainda for o que foi validado (`expected_status`);
    /// devolve `None` quando outra escrita chegou antes.
    pub async fn apply_status_change<'e, E>(
        &self,
        executor: E,
        tenant_id: i64,
        id: i64,
        expected_status: &str,
        change: &StatusChange,
    ) -> Result<Option<WorkItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let m = &change.derived.milestones;
        let updated = sqlx::query_as::<_, WorkItem>(&format!(
            r#"
            UPDATE work_items
            SET status = $4,
                resolution = COALESCE($5, resolution),
                resolution_note = COALESCE($6, resolution_note),
                brainstorm_started_at = $7,
                solidified_at = $8,
                implementation_started_at = $9,
                completed_at = $10,
                closed_at = $11,
                updated_at = NOW()
            WHERE id = $1 AND tenant_id = $2 AND status = $3 AND deleted_at IS NULL
            RETURNING {WORK_ITEM_COLUMNS}
            "#
        ))
            .bind(id)
            .bind(tenant_id)
            .bind(expected_status)
            .bind(change.next_status)
            .bind(change.derived.resolution)
            .bind(change.derived.resolution_note.as_deref())
            .bind(m.brainstorm_started_at)
            .bind(m.solidified_at)
            .bind(m.implementation_started_at)
            .bind(m.completed_at)
            .bind(m.closed_at)
            .fetch_optional(executor)
            .await?;

        Ok(updated)
    }

    pub async fn soft_delete(&self, tenant_id: i64, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE work_items SET deleted_at = NOW() WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL",
        )
            .bind(id)
            .bind(tenant_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  EMENDAS DE REQUISITO
    // =========================================================================

    /// Contador por requisito, incrementado atomicamente (mesma disciplina das chaves).
    pub async fn next_amendment_number<'e, E>(
        &self,
        executor: E,
        tenant_id: i64,
        requirement_id: i64,
    ) -> Result<Option<i32>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let number = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE work_items
            SET next_amendment_number = next_amendment_number + 1
            WHERE id = $1 AND tenant_id = $2 AND kind = 'requirement' AND deleted_at IS NULL
            RETURNING next_amendment_number - 1
            "#,
        )
            .bind(requirement_id)
            .bind(tenant_id)
            .fetch_optional(executor)
            .await?;

        Ok(number)
    }

    pub async fn insert_amendment<'e, E>(
        &self,
        executor: E,
        requirement_id: i64,
        amendment_number: i32,
        title: &str,
        description: Option<&str>,
        created_by: i64,
    ) -> Result<RequirementAmendment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let amendment = sqlx::query_as::<_, RequirementAmendment>(
            r#"
            INSERT INTO requirement_amendments (requirement_id, amendment_number, title, description, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, requirement_id, amendment_number, title, description, created_by, created_at
            "#,
        )
            .bind(requirement_id)
            .bind(amendment_number)
            .bind(title)
            .bind(description)
            .bind(created_by)
            .fetch_one(executor)
            .await
            .map_err(|e| crate::common::db_utils::unique_violation_as_conflict(e, "Número de emenda duplicado."))?;

        Ok(amendment)
    }

    /// Cliente ativo pertencente ao tenant.
    pub async fn client_is_active(&self, tenant_id: i64, client_id: i64) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM clients WHERE id = $1 AND tenant_id = $2 AND is_active)",
        )
            .bind(client_id)
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }
}

#[async_trait]
impl WorkItemStore for WorkItemRepository {
    async fn insert_item(&self, item: NewWorkItem<'_>) -> Result<WorkItem, AppError> {
        self.insert(&self.pool, item).await
    }

    async fn find_item(&self, tenant_id: i64, id: i64) -> Result<Option<WorkItem>, AppError> {
        self.find_in_tenant(&self.pool, tenant_id, id).await
    }

    async fn compare_and_set_status(
        &self,
        tenant_id: i64,
        id: i64,
        expected_status: &str,
        change: &StatusChange,
    ) -> Result<Option<WorkItem>, AppError> {
        self.apply_status_change(&self.pool, tenant_id, id, expected_status, change).await
    }

    async fn append_amendment(
        &self,
        tenant_id: i64,
        requirement_id: i64,
        title: &str,
        description: Option<&str>,
        created_by: i64,
    ) -> Result<Option<RequirementAmendment>, AppError> {
        let mut tx = self.pool.begin().await?;

        // Contador por requisito: incremento atômico na mesma transação do insert
        let Some(number) = self.next_amendment_number(&mut *tx, tenant_id, requirement_id).await? else {
            return Ok(None);
        };
        let amendment = self
            .insert_amendment(&mut *tx, requirement_id, number, title, description, created_by)
            .await?;

        tx.commit().await?;
        Ok(Some(amendment))
    }

    async fn soft_delete_item(&self, tenant_id: i64, id: i64) -> Result<bool, AppError> {
        self.soft_delete(tenant_id, id).await
    }

    async fn client_in_tenant(&self, tenant_id: i64, client_id: i64) -> Result<bool, AppError> {
        self.client_is_active(tenant_id, client_id).await
    }
}
