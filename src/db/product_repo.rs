// src/db/product_repo.rs

use async_trait::async_trait;
use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::error::AppError,
    models::product::{IssueType, Product, ProductSequence},
    services::sequence_service::SequenceStore,
};

#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, product_id: i64) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>(
            "SELECT id, tenant_id, name, code, created_at FROM products WHERE id = $1",
        )
            .bind(product_id)
            .fetch_optional(executor)
            .await?;

        Ok(product)
    }

    /// Incremento atômico do contador (produto, tipo).
    /// O upsert trava a linha: alocações concorrentes são serializadas pelo banco.
    /// A primeira chamada cria a linha com next_num = 2 e devolve 1.
    pub async fn increment_sequence<'e, E>(
        &self,
        executor: E,
        product_id: i64,
        issue_type: IssueType,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let allocated = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO product_sequences (product_id, issue_type, next_num)
            VALUES ($1, $2, 2)
            ON CONFLICT (product_id, issue_type)
            DO UPDATE SET next_num = product_sequences.next_num + 1, updated_at = NOW()
            RETURNING next_num - 1
            "#,
        )
            .bind(product_id)
            .bind(issue_type.letter().to_string())
            .fetch_one(executor)
            .await?;

        Ok(allocated)
    }

    pub async fn list_sequences(&self, product_id: i64) -> Result<Vec<ProductSequence>, AppError> {
        let sequences = sqlx::query_as::<_, ProductSequence>(
            r#"
            SELECT product_id, issue_type, next_num, updated_at
            FROM product_sequences
            WHERE product_id = $1
            ORDER BY issue_type
            "#,
        )
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(sequences)
    }
}

#[async_trait]
impl SequenceStore for ProductRepository {
    async fn find_product(&self, product_id: i64) -> Result<Option<Product>, AppError> {
        self.find_by_id(&self.pool, product_id).await
    }

    async fn next_number(&self, product_id: i64, issue_type: IssueType) -> Result<i64, AppError> {
        self.increment_sequence(&self.pool, product_id, issue_type).await
    }
}
