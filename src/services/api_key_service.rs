// src/services/api_key_service.rs

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::{
    common::error::AppError,
    db::{api_key_repo::NewApiKey, ApiKeyRepository},
    models::{
        api_key::{ApiKeyContext, CreateApiKeyPayload, CreatedApiKey, KNOWN_SCOPES, SCOPE_INTEGRATIONS_READ},
        auth::Principal,
    },
    services::rate_limiter::{RateDecision, RateLimitStore},
};

/// Prefixo fixo das chaves de API
pub const API_KEY_PREFIX: &str = "tk_";

/// Bytes aleatórios da chave (64 caracteres hex)
const API_KEY_BYTES: usize = 32;

/// Quantos caracteres guardamos em claro para identificação
const DISPLAY_PREFIX_LEN: usize = 11;

/// Requisições por minuto quando a emissão não informa um limite
const DEFAULT_RATE_LIMIT: i32 = 60;

/// Gera uma chave nova: `tk_` + 64 hex (67 caracteres no total).
pub fn generate_api_key() -> String {
    use rand::RngCore;
    let mut buf = [0u8; API_KEY_BYTES];
    rand::rng().fill_bytes(&mut buf);
    let hex_str: String = buf.iter().map(|b| format!("{:02x}", b)).collect();
    format!("{}{}", API_KEY_PREFIX, hex_str)
}

/// Hash de mão única (BLAKE3) usado para armazenar e buscar a chave.
pub fn hash_api_key(key: &str) -> String {
    blake3::hash(key.as_bytes()).to_hex().to_string()
}

pub fn display_prefix(key: &str) -> &str {
    &key[..DISPLAY_PREFIX_LEN.min(key.len())]
}

pub fn is_well_formed(key: &str) -> bool {
    key.strip_prefix(API_KEY_PREFIX)
        .is_some_and(|hex| hex.len() == API_KEY_BYTES * 2 && hex.bytes().all(|b| b.is_ascii_hexdigit()))
}

/// Chave recém-gerada: o valor em claro só existe até a resposta da emissão.
#[derive(Debug)]
pub struct KeyMaterial {
    pub raw: String,
    pub hash: String,
    pub prefix: String,
}

impl KeyMaterial {
    pub fn generate() -> Self {
        let raw = generate_api_key();
        let hash = hash_api_key(&raw);
        let prefix = display_prefix(&raw).to_string();
        Self { raw, hash, prefix }
    }
}

/// Escopos sem repetição; ausente vira `integrations:read`.
pub fn normalize_scopes(requested: Option<&[String]>) -> Result<Vec<String>, AppError> {
    let Some(requested) = requested else {
        return Ok(vec![SCOPE_INTEGRATIONS_READ.to_string()]);
    };

    let mut scopes: Vec<String> = Vec::with_capacity(requested.len());
    for scope in requested.iter().map(|s| s.trim()) {
        if !KNOWN_SCOPES.contains(&scope) {
            return Err(AppError::InvalidInput(format!("Escopo desconhecido: '{}'.", scope)));
        }
        if !scopes.iter().any(|s| s == scope) {
            scopes.push(scope.to_string());
        }
    }
    if scopes.is_empty() {
        return Err(AppError::InvalidInput("Informe ao menos um escopo.".into()));
    }
    Ok(scopes)
}

pub fn expires_at_after(days: Option<i64>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    days.map(|days| now + Duration::days(days))
}

#[derive(Clone)]
pub struct ApiKeyService {
    repo: ApiKeyRepository,
    limiter: Arc<dyn RateLimitStore>,
}

impl ApiKeyService {
    pub fn new(repo: ApiKeyRepository, limiter: Arc<dyn RateLimitStore>) -> Self {
        Self { repo, limiter }
    }

    /// Emite uma chave para o principal. Só o hash e o prefixo são gravados.
    pub async fn create(
        &self,
        principal: &Principal,
        payload: &CreateApiKeyPayload,
    ) -> Result<CreatedApiKey, AppError> {
        let scopes = normalize_scopes(payload.scopes.as_deref())?;
        let material = KeyMaterial::generate();

        let stored = self.repo
            .insert(NewApiKey {
                user_id: principal.user_id,
                tenant_id: principal.tenant_id,
                name: payload.name.trim(),
                key_hash: &material.hash,
                key_prefix: &material.prefix,
                scopes: &scopes,
                rate_limit: payload.rate_limit.unwrap_or(DEFAULT_RATE_LIMIT),
                expires_at: expires_at_after(payload.expires_in_days, Utc::now()),
            })
            .await?;

        tracing::info!(
            api_key_id = stored.id,
            prefix = %stored.key_prefix,
            user_id = principal.user_id,
            "🔑 Chave de API emitida"
        );

        Ok(CreatedApiKey {
            id: stored.id,
            name: stored.name,
            key: material.raw,
            key_prefix: stored.key_prefix,
            scopes: stored.scopes,
            rate_limit: stored.rate_limit,
            expires_at: stored.expires_at,
            created_at: stored.created_at,
        })
    }

    /// Autentica a chave, aplica o limite de requisições e agenda a
    /// atualização de `last_used_at` sem bloquear o chamador.
    pub async fn authenticate(&self, raw_key: &str) -> Result<ApiKeyContext, AppError> {
        if !is_well_formed(raw_key) {
            return Err(AppError::InvalidKey);
        }

        // 1. Busca pelo hash
        let key = self.repo
            .find_by_hash(&hash_api_key(raw_key))
            .await?
            .filter(|k| k.is_active)
            .ok_or(AppError::InvalidKey)?;

        // 2. Expiração
        if key.expires_at.is_some_and(|at| at <= Utc::now()) {
            tracing::warn!(api_key_id = key.id, prefix = %key.key_prefix, "Chave de API expirada");
            return Err(AppError::KeyExpired);
        }

        // 3. Limite por janela
        let limit = u32::try_from(key.rate_limit).unwrap_or(0);
        let remaining = match self.limiter.hit(key.id, limit).await {
            RateDecision::Allowed { remaining, .. } => remaining,
            RateDecision::Limited { limit, retry_after_secs } => {
                tracing::warn!(api_key_id = key.id, limit, retry_after_secs, "Limite da chave de API excedido");
                return Err(AppError::RateLimited {
                    limit,
                    retry_after_secs,
                    reset_at: Utc::now().timestamp() + retry_after_secs as i64,
                });
            }
        };

        // 4. Contabilidade best-effort: falhas são apenas registradas
        let repo = self.repo.clone();
        let api_key_id = key.id;
        tokio::spawn(async move {
            if let Err(e) = repo.touch_last_used(api_key_id).await {
                tracing::warn!(api_key_id, error = %e, "Falha ao atualizar last_used_at");
            }
        });

        Ok(ApiKeyContext {
            api_key_id: key.id,
            user_id: key.user_id,
            tenant_id: key.tenant_id,
            scopes: key.scopes,
            rate_limit: limit,
            remaining,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_have_the_public_format() {
        let key = generate_api_key();
        assert_eq!(key.len(), 67);
        assert!(key.starts_with("tk_"));
        assert!(is_well_formed(&key));
        assert_ne!(key, generate_api_key());
    }

    #[test]
    fn hash_is_deterministic_and_not_the_key() {
        let key = generate_api_key();
        assert_eq!(hash_api_key(&key), hash_api_key(&key));
        assert_ne!(hash_api_key(&key), key);
        assert_eq!(hash_api_key(&key).len(), 64);
    }

    #[test]
    fn display_prefix_is_short() {
        let key = format!("tk_{}", "ab".repeat(32));
        assert_eq!(display_prefix(&key), "tk_abababab");
        assert_eq!(display_prefix("tk_"), "tk_");
    }

    #[test]
    fn issued_material_matches_the_lookup_hash() {
        let material = KeyMaterial::generate();
        assert!(is_well_formed(&material.raw));
        assert_eq!(material.hash, hash_api_key(&material.raw));
        assert_eq!(material.prefix, display_prefix(&material.raw));
        assert!(material.raw.starts_with(&material.prefix));
        assert_ne!(material.hash, material.raw);
    }

    #[test]
    fn scopes_default_to_integrations_read() {
        assert_eq!(normalize_scopes(None).unwrap(), vec!["integrations:read".to_string()]);

        let requested = vec![" integrations:read".to_string(), "integrations:read".to_string(), "*".to_string()];
        assert_eq!(
            normalize_scopes(Some(requested.as_slice())).unwrap(),
            vec!["integrations:read".to_string(), "*".to_string()]
        );
    }

    #[test]
    fn unknown_or_empty_scopes_are_rejected() {
        let unknown = vec!["admin:write".to_string()];
        let empty: Vec<String> = Vec::new();
        assert!(matches!(normalize_scopes(Some(unknown.as_slice())), Err(AppError::InvalidInput(_))));
        assert!(matches!(normalize_scopes(Some(empty.as_slice())), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn expiry_counts_days_from_issue() {
        let now = Utc::now();
        assert_eq!(expires_at_after(None, now), None);
        assert_eq!(expires_at_after(Some(30), now), Some(now + Duration::days(30)));
    }

    #[test]
    fn malformed_keys_are_rejected_early() {
        assert!(!is_well_formed("tk_123"));
        assert!(!is_well_formed(&format!("xx_{}", "a".repeat(64))));
        assert!(!is_well_formed(&format!("tk_{}", "g".repeat(64))));
        assert!(is_well_formed(&format!("tk_{}", "A1".repeat(32))));
    }
}
