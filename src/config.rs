// src/config.rs

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, sync::Arc, time::Duration};

use crate::{
    db::{
        ApiKeyRepository, IdeaRepository, ProductRepository, TeamRepository, TenantRepository,
        UserRepository, WorkItemRepository,
    },
    services::{
        api_key_service::ApiKeyService,
        auth::AuthService,
        idea_service::IdeaService,
        rate_limiter::InMemoryRateLimitStore,
        sequence_service::SequenceService,
        visibility::VisibilityEngine,
        work_item_service::WorkItemService,
    },
};

/// Configuração lida do ambiente (e do `.env`, se existir).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub token_ttl: chrono::Duration,
    pub rate_limit_window: Duration,
}

fn var_or<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} possui um valor inválido: '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        Ok(Self {
            database_url,
            jwt_secret,
            server_addr: var_or("SERVER_ADDR", "0.0.0.0:3000".to_string())?,
            db_max_connections: var_or("DB_MAX_CONNECTIONS", 5)?,
            db_acquire_timeout: Duration::from_secs(var_or("DB_ACQUIRE_TIMEOUT_SECS", 3)?),
            token_ttl: chrono::Duration::days(var_or("TOKEN_TTL_DAYS", 7)?),
            rate_limit_window: Duration::from_secs(var_or("RATE_LIMIT_WINDOW_SECS", 60)?),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub product_repo: ProductRepository,
    pub auth_service: AuthService,
    pub api_key_service: ApiKeyService,
    pub sequence_service: SequenceService,
    pub work_item_service: WorkItemService,
    pub idea_service: IdeaService,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(config.db_acquire_timeout)
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Ok(Self::with_pool(db_pool, config))
    }

    // --- Monta o gráfico de dependências ---
    fn with_pool(db_pool: PgPool, config: &Config) -> Self {
        let user_repo = UserRepository::new(db_pool.clone());
        let tenant_repo = TenantRepository::new(db_pool.clone());
        let product_repo = ProductRepository::new(db_pool.clone());
        let work_item_repo = WorkItemRepository::new(db_pool.clone());
        let idea_repo = IdeaRepository::new(db_pool.clone());
        let team_repo = TeamRepository::new(db_pool.clone());
        let api_key_repo = ApiKeyRepository::new(db_pool.clone());

        let auth_service = AuthService::new(
            user_repo,
            tenant_repo,
            config.jwt_secret.clone(),
            config.token_ttl,
        );
        let api_key_service = ApiKeyService::new(
            api_key_repo,
            Arc::new(InMemoryRateLimitStore::new(config.rate_limit_window)),
        );
        let sequence_service = SequenceService::new(Arc::new(product_repo.clone()));
        let work_item_service = WorkItemService::new(Arc::new(work_item_repo), sequence_service.clone());
        let engine = VisibilityEngine::new(Arc::new(team_repo.clone()));
        let idea_service = IdeaService::new(idea_repo, team_repo, engine);

        Self {
            db_pool,
            product_repo,
            auth_service,
            api_key_service,
            sequence_service,
            work_item_service,
            idea_service,
        }
    }
}
