// src/services/auth.rs

use bcrypt::verify;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    common::error::AppError,
    db::{TenantRepository, UserRepository},
    models::{
        auth::{Claims, Principal, User},
        tenancy::{is_internal_client, Client, Tenant},
    },
};

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    tenant_repo: TenantRepository,
    jwt_secret: String,
    token_ttl: Duration,
}

/// Monta o principal a partir das fontes da verdade (usuário, cliente, tenant).
pub fn build_principal(user: &User, client: Option<&Client>, tenant: &Tenant) -> Principal {
    Principal {
        user_id: user.id,
        tenant_id: user.tenant_id,
        client_id: user.client_id,
        is_internal: is_internal_client(client),
        role: user.role,
        platform_operator: tenant.is_platform_operator,
    }
}

pub fn encode_claims(secret: &str, claims: &Claims) -> Result<String, AppError> {
    Ok(encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_ref()))?)
}

/// Assinatura inválida, token expirado ou malformado viram `Unauthenticated`.
pub fn decode_claims(secret: &str, token: &str) -> Result<Claims, AppError> {
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_ref()), &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!("Token rejeitado: {}", e);
            AppError::Unauthenticated
        })
}

impl AuthService {
    pub fn new(
        user_repo: UserRepository,
        tenant_repo: TenantRepository,
        jwt_secret: String,
        token_ttl: Duration,
    ) -> Self {
        Self { user_repo, tenant_repo, jwt_secret, token_ttl }
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<String, AppError> {
        let user = self.user_repo
            .find_by_email(email)
            .await?
            .filter(|u| u.is_active)
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || {
            verify(&password_clone, &password_hash_clone)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))?
        ?;

        if !is_password_valid {
            tracing::warn!(user_id = user.id, "Tentativa de login com senha inválida");
            return Err(AppError::InvalidCredentials);
        }

        let principal = self.resolve_user(&user).await?;
        self.issue_token(&principal)
    }

    /// Emite a credencial assinada com validade de `token_ttl` (7 dias por padrão).
    pub fn issue_token(&self, principal: &Principal) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + self.token_ttl;

        let claims = Claims {
            user_id: principal.user_id,
            tenant_id: principal.tenant_id,
            client_id: principal.client_id,
            is_internal: principal.is_internal,
            role: principal.role,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        encode_claims(&self.jwt_secret, &claims)
    }

    /// Valida a assinatura e recalcula o principal a partir do banco.
    /// O `isInternal` do token é apenas cache e nunca é usado como fato.
    pub async fn validate_token(&self, token: &str) -> Result<Principal, AppError> {
        let claims = decode_claims(&self.jwt_secret, token)?;

        let user = self.user_repo
            .find_by_id(claims.user_id)
            .await?
            .filter(|u| u.is_active && u.tenant_id == claims.tenant_id)
            .ok_or(AppError::Unauthenticated)?;

        let principal = self.resolve_user(&user).await?;

        if principal.is_internal != claims.is_internal || principal.role != claims.role {
            tracing::info!(
                user_id = principal.user_id,
                "Token com dados desatualizados; usando os valores do banco"
            );
        }

        Ok(principal)
    }

    async fn resolve_user(&self, user: &User) -> Result<Principal, AppError> {
        let tenant = self.tenant_repo
            .find_tenant(user.tenant_id)
            .await?
            .filter(|t| t.is_active)
            .ok_or(AppError::Unauthenticated)?;

        let client = match user.client_id {
            Some(client_id) => Some(
                self.tenant_repo
                    .find_client(user.tenant_id, client_id)
                    .await?
                    .filter(|c| c.is_active)
                    .ok_or(AppError::Unauthenticated)?,
            ),
            None => None,
        };

        Ok(build_principal(user, client.as_ref(), &tenant))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{auth::Role, tenancy::ClientType};

    const SECRET: &str = "segredo-de-teste";

    fn claims(exp_offset: i64) -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            user_id: 42,
            tenant_id: 3,
            client_id: Some(9),
            is_internal: false,
            role: Role::CompanyAdmin,
            exp: (now + exp_offset) as usize,
            iat: now as usize,
        }
    }

    #[test]
    fn token_round_trip_keeps_payload() {
        let token = encode_claims(SECRET, &claims(3600)).unwrap();
        let decoded = decode_claims(SECRET, &token).unwrap();
        assert_eq!(decoded.user_id, 42);
        assert_eq!(decoded.tenant_id, 3);
        assert_eq!(decoded.client_id, Some(9));
        assert_eq!(decoded.role, Role::CompanyAdmin);
    }

    #[test]
    fn wrong_secret_is_unauthenticated() {
        let token = encode_claims(SECRET, &claims(3600)).unwrap();
        assert!(matches!(decode_claims("outro", &token), Err(AppError::Unauthenticated)));
    }

    #[test]
    fn expired_token_is_unauthenticated() {
        // Bem além da tolerância padrão de 60s
        let token = encode_claims(SECRET, &claims(-3600)).unwrap();
        assert!(matches!(decode_claims(SECRET, &token), Err(AppError::Unauthenticated)));
    }

    #[test]
    fn garbage_is_unauthenticated() {
        assert!(matches!(decode_claims(SECRET, "abc.def"), Err(AppError::Unauthenticated)));
        assert!(matches!(decode_claims(SECRET, ""), Err(AppError::Unauthenticated)));
    }

    #[test]
    fn principal_is_internal_follows_client_type() {
        let now = Utc::now();
        let user = User {
            id: 1,
            tenant_id: 3,
            client_id: Some(9),
            email: "bia@cliente.com".into(),
            name: "Bia".into(),
            role: Role::User,
            is_active: true,
            password_hash: String::new(),
            created_at: now,
            updated_at: now,
        };
        let tenant = Tenant {
            id: 3,
            name: "Tenant".into(),
            plan: "pro".into(),
            is_active: true,
            is_platform_operator: false,
            created_at: now,
            updated_at: now,
        };
        let mut client = Client {
            id: 9,
            tenant_id: 3,
            name: "Cliente".into(),
            tier: None,
            is_active: true,
            gatekeeper: false,
            client_type: ClientType::Customer,
            created_at: now,
            updated_at: now,
        };

        assert!(!build_principal(&user, Some(&client), &tenant).is_internal);

        // Cliente passou a ser "owner": o principal acompanha sem reemitir token
        client.client_type = ClientType::Owner;
        assert!(build_principal(&user, Some(&client), &tenant).is_internal);
        assert!(build_principal(&user, None, &tenant).is_internal);
    }
}
