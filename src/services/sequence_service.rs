// src/services/sequence_service.rs

use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    common::{db_utils::zero_pad, error::AppError},
    models::product::{IssueType, Product},
};

/// Persistência do alocador. `next_number` precisa ser um incremento atômico
/// (uma única instrução ou transação), nunca ler-e-depois-gravar.
#[async_trait]
pub trait SequenceStore: Send + Sync {
    async fn find_product(&self, product_id: i64) -> Result<Option<Product>, AppError>;

    /// Devolve o valor anterior ao incremento; a primeira chamada do par devolve 1.
    async fn next_number(&self, product_id: i64, issue_type: IssueType) -> Result<i64, AppError>;
}

/// Formato canônico da chave: `{CODE}-{LETRA}{NNN}` (ex: "HRM-T001").
pub fn format_issue_key(code: &str, issue_type: IssueType, number: i64) -> String {
    format!("{}-{}{}", code, issue_type.letter(), zero_pad(number))
}

#[derive(Clone)]
pub struct SequenceService {
    store: Arc<dyn SequenceStore>,
}

impl SequenceService {
    pub fn new(store: Arc<dyn SequenceStore>) -> Self {
        Self { store }
    }

    /// Produto do tenant; um produto de outro tenant conta como inexistente.
    pub async fn product_in_tenant(&self, tenant_id: i64, product_id: i64) -> Result<Product, AppError> {
        self.store
            .find_product(product_id)
            .await?
            .filter(|p| p.tenant_id == tenant_id)
            .ok_or(AppError::ProductNotFound)
    }

    /// `allocate(productId, issueType) -> key`
    pub async fn allocate(&self, product_id: i64, issue_type: IssueType) -> Result<String, AppError> {
        let product = self
            .store
            .find_product(product_id)
            .await?
            .ok_or(AppError::ProductNotFound)?;
        self.mint(&product, issue_type).await
    }

    /// Igual a `allocate`, mas restrito aos produtos do tenant.
    pub async fn allocate_for_tenant(
        &self,
        tenant_id: i64,
        product_id: i64,
        issue_type: IssueType,
    ) -> Result<String, AppError> {
        let product = self.product_in_tenant(tenant_id, product_id).await?;
        self.mint(&product, issue_type).await
    }

    async fn mint(&self, product: &Product, issue_type: IssueType) -> Result<String, AppError> {
        // O produto precisa ter um código definido
        let code = product
            .code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or(AppError::ProductMissingCode)?;

        // Incremento atômico
        let number = self.store.next_number(product.id, issue_type).await?;
        let key = format_issue_key(code, issue_type, number);

        tracing::info!(product_id = product.id, issue_type = %issue_type, key = %key, "🔑 Chave de issue alocada");
        Ok(key)
    }
}
