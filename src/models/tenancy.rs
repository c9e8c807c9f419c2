// src/models/tenancy.rs

use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use utoipa::ToSchema;

// ---
// 1. Tenant (O operador SaaS)
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: i64,
    pub name: String,
    pub plan: String,
    pub is_active: bool,
    // Substitui o antigo "tenant_id == 1" mágico
    pub is_platform_operator: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---
// 2. Client (Organização cliente, ou o cliente "owner" interno)
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "client_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ClientType {
    Owner,
    Partner,
    Customer,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: i64,
    pub tenant_id: i64,
    pub name: String,
    pub tier: Option<String>,
    pub is_active: bool,
    // Revisão interna extra antes de chegar ao desenvolvimento
    pub gatekeeper: bool,
    pub client_type: ClientType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fonte única da verdade para "usuário interno": sem cliente, ou cliente do tipo owner.
pub fn is_internal_client(client: Option<&Client>) -> bool {
    match client {
        None => true,
        Some(c) => c.client_type == ClientType::Owner,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(client_type: ClientType) -> Client {
        Client {
            id: 4,
            tenant_id: 1,
            name: "Acme".into(),
            tier: None,
            is_active: true,
            gatekeeper: false,
            client_type,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn internal_follows_client_type() {
        assert!(is_internal_client(None));
        assert!(is_internal_client(Some(&client(ClientType::Owner))));
        assert!(!is_internal_client(Some(&client(ClientType::Customer))));
        assert!(!is_internal_client(Some(&client(ClientType::Partner))));
    }
}
