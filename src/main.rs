// src/main.rs

use anyhow::Context;
use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppState, Config};
use crate::docs::ApiDoc;
use crate::middleware::{api_key::api_key_guard, auth::auth_guard};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logger: RUST_LOG controla o nível (padrão "info")
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let config = Config::from_env()?;
    let app_state = AppState::new(&config).await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .context("Falha ao rodar as migrações do banco de dados.")?;

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Define as rotas de autenticação (públicas)
    let auth_routes = Router::new()
        .route("/login", post(handlers::auth::login));

    // Rotas protegidas pelo token de usuário
    let user_routes = Router::new()
        .route("/me", get(handlers::auth::get_me));

    let product_routes = Router::new()
        .route("/{product_id}/sequences", get(handlers::products::list_sequences))
        .route("/{product_id}/sequences/{issue_type}", post(handlers::products::allocate_key));

    let work_item_routes = Router::new()
        .route("/", post(handlers::work_items::create_work_item))
        .route("/{id}"
               ,get(handlers::work_items::get_work_item)
               .delete(handlers::work_items::delete_work_item)
        )
        .route("/{id}/transitions", get(handlers::work_items::get_transitions))
        .route("/{id}/transition", post(handlers::work_items::transition_work_item))
        .route("/{id}/close", post(handlers::work_items::close_work_item));

    let requirement_routes = Router::new()
        .route("/{id}/amendments", post(handlers::work_items::create_amendment));

    let idea_routes = Router::new()
        .route("/"
               ,post(handlers::ideas::create_idea)
               .get(handlers::ideas::list_ideas)
        )
        .route("/{id}"
               ,get(handlers::ideas::get_idea)
               .patch(handlers::ideas::update_idea)
               .delete(handlers::ideas::delete_idea)
        )
        .route("/{id}/visibility", put(handlers::ideas::change_visibility))
        .route("/{id}/permissions", get(handlers::ideas::get_permissions));

    let api_key_routes = Router::new()
        .route("/", post(handlers::api_keys::create_api_key));

    let client_routes = Router::new()
        .route("/me/api-keys", post(handlers::api_keys::create_client_api_key));

    let protected_routes = Router::new()
        .nest("/users", user_routes)
        .nest("/api-keys", api_key_routes)
        .nest("/clients", client_routes)
        .nest("/products", product_routes)
        .nest("/work-items", work_item_routes)
        .nest("/requirements", requirement_routes)
        .nest("/ideas", idea_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Acesso máquina-a-máquina (chave de API + limite por janela)
    let integration_routes = Router::new()
        .route("/whoami", get(handlers::integrations::whoami))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            api_key_guard,
        ));

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .nest("/api/integrations", integration_routes)
        .nest("/api", protected_routes)
        .with_state(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // Inicia o servidor
    let listener = TcpListener::bind(&config.server_addr)
        .await
        .with_context(|| format!("Falha ao iniciar o listener TCP em {}", config.server_addr))?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("Erro no servidor Axum")?;
    Ok(())
}
