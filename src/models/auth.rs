// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

// ---
// 1. Papéis (enumeração fixa)
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    CompanyAdmin,
    Admin,
    Developer,
    Support,
    Integrator,
    ProductManager,
    Viewer,
}

impl Role {
    /// Papel com sobreposição administrativa sobre todo conteúdo do tenant.
    pub fn is_administrative(self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::CompanyAdmin => "company_admin",
            Role::Admin => "admin",
            Role::Developer => "developer",
            Role::Support => "support",
            Role::Integrator => "integrator",
            Role::ProductManager => "product_manager",
            Role::Viewer => "viewer",
        }
    }
}

// Representa um usuário vindo do banco de dados
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub tenant_id: i64,
    pub client_id: Option<i64>,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub is_active: bool,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    pub password_hash: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Dados para login
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginUserPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    #[schema(example = "ana@tenant.com")]
    pub email: String,
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
}

// Estrutura de dados ("claims") dentro do JWT.
// O formato do payload é um contrato externo: {userId, tenantId, clientId, isInternal, role}.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: i64,
    pub tenant_id: i64,
    pub client_id: Option<i64>,
    // Apenas cache: recalculado a partir do cliente em cada requisição
    pub is_internal: bool,
    pub role: Role,
    pub exp: usize, // Expiration time (quando o token expira)
    pub iat: usize, // Issued At (quando o token foi criado)
}

/// O principal que está agindo, resolvido a partir da credencial e
/// confirmado contra os registros de usuário, cliente e tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub user_id: i64,
    pub tenant_id: i64,
    pub client_id: Option<i64>,
    pub is_internal: bool,
    pub role: Role,
    /// O tenant do principal é o operador da plataforma.
    pub platform_operator: bool,
}

impl Principal {
    /// `requireInternal`
    pub fn require_internal(&self) -> bool {
        self.is_internal
    }

    /// `requireRole`
    pub fn require_role(&self, allowed: &[Role]) -> bool {
        allowed.contains(&self.role)
    }

    /// `requireClientAdmin`: tem cliente e é o administrador desse cliente.
    pub fn require_client_admin(&self) -> bool {
        self.client_id.is_some() && self.role == Role::CompanyAdmin
    }

    /// Sobreposição administrativa: papel admin ou tenant operador da plataforma.
    pub fn has_admin_override(&self) -> bool {
        self.role.is_administrative() || self.platform_operator
    }
}
