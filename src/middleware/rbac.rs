// src/middleware/rbac.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;

use crate::{
    common::error::AppError,
    models::auth::{Principal, Role},
};

/// 1. O trait que define um conjunto de papéis aceitos
pub trait RoleSet: Send + Sync + 'static {
    fn roles() -> &'static [Role];
}

fn principal_from(parts: &Parts) -> Result<&Principal, AppError> {
    parts.extensions.get::<Principal>().ok_or(AppError::Unauthenticated)
}

/// 2. Guardião de papel (`requireRole`)
pub struct RequireRole<T>(pub Principal, pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleSet,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let principal = principal_from(parts)?;

        if !principal.require_role(T::roles()) {
            tracing::warn!(
                user_id = principal.user_id,
                role = principal.role.as_str(),
                "Papel sem permissão para a ação"
            );
            return Err(AppError::Forbidden);
        }

        Ok(RequireRole(principal.clone(), PhantomData))
    }
}

/// 3. Guardião de usuário interno (`requireInternal`)
pub struct RequireInternal(pub Principal);

impl<S> FromRequestParts<S> for RequireInternal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let principal = principal_from(parts)?;

        if !principal.require_internal() {
            tracing::warn!(user_id = principal.user_id, "Ação restrita a usuários internos");
            return Err(AppError::Forbidden);
        }

        Ok(RequireInternal(principal.clone()))
    }
}

/// 4. Guardião de administrador do cliente (`requireClientAdmin`)
pub struct RequireClientAdmin(pub Principal);

impl<S> FromRequestParts<S> for RequireClientAdmin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let principal = principal_from(parts)?;

        if !principal.require_client_admin() {
            tracing::warn!(user_id = principal.user_id, "Ação restrita ao administrador do cliente");
            return Err(AppError::Forbidden);
        }

        Ok(RequireClientAdmin(principal.clone()))
    }
}

// ---
// CONJUNTOS DE PAPÉIS
// ---

/// Quem pode excluir itens de trabalho.
pub struct WorkItemCurators;
impl RoleSet for WorkItemCurators {
    fn roles() -> &'static [Role] {
        &[Role::Admin, Role::ProductManager]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(principal: Option<Principal>) -> Parts {
        let (mut parts, _) = Request::new(()).into_parts();
        if let Some(p) = principal {
            parts.extensions.insert(p);
        }
        parts
    }

    fn principal(role: Role, is_internal: bool) -> Principal {
        Principal {
            user_id: 1,
            tenant_id: 1,
            client_id: (!is_internal).then_some(2),
            is_internal,
            role,
            platform_operator: false,
        }
    }

    #[tokio::test]
    async fn role_guard_accepts_listed_roles() {
        let mut parts = parts_with(Some(principal(Role::ProductManager, true)));
        let guard = RequireRole::<WorkItemCurators>::from_request_parts(&mut parts, &()).await;
        assert!(guard.is_ok());

        let mut parts = parts_with(Some(principal(Role::Developer, true)));
        let guard = RequireRole::<WorkItemCurators>::from_request_parts(&mut parts, &()).await;
        assert!(matches!(guard, Err(AppError::Forbidden)));
    }

    #[tokio::test]
    async fn internal_guard_rejects_client_users() {
        let mut parts = parts_with(Some(principal(Role::User, false)));
        let guard = RequireInternal::from_request_parts(&mut parts, &()).await;
        assert!(matches!(guard, Err(AppError::Forbidden)));

        let mut parts = parts_with(None);
        let guard = RequireInternal::from_request_parts(&mut parts, &()).await;
        assert!(matches!(guard, Err(AppError::Unauthenticated)));
    }

    #[tokio::test]
    async fn client_admin_guard_needs_client_and_role() {
        let mut admin = principal(Role::CompanyAdmin, false);
        let mut parts = parts_with(Some(admin.clone()));
        let guard = RequireClientAdmin::from_request_parts(&mut parts, &()).await;
        assert!(matches!(guard, Ok(RequireClientAdmin(p)) if p.client_id == Some(2)));

        // Mesmo papel sem cliente
        admin.client_id = None;
        admin.is_internal = true;
        let mut parts = parts_with(Some(admin));
        let guard = RequireClientAdmin::from_request_parts(&mut parts, &()).await;
        assert!(matches!(guard, Err(AppError::Forbidden)));

        let mut parts = parts_with(Some(principal(Role::User, false)));
        let guard = RequireClientAdmin::from_request_parts(&mut parts, &()).await;
        assert!(matches!(guard, Err(AppError::Forbidden)));
    }
}
