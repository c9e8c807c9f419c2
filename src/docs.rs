// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::login,

        // --- Users ---
        handlers::auth::get_me,

        // --- Products ---
        handlers::products::allocate_key,
        handlers::products::list_sequences,

        // --- Work Items ---
        handlers::work_items::create_work_item,
        handlers::work_items::get_work_item,
        handlers::work_items::delete_work_item,
        handlers::work_items::get_transitions,
        handlers::work_items::transition_work_item,
        handlers::work_items::close_work_item,
        handlers::work_items::create_amendment,

        // --- Ideas ---
        handlers::ideas::create_idea,
        handlers::ideas::list_ideas,
        handlers::ideas::get_idea,
        handlers::ideas::update_idea,
        handlers::ideas::delete_idea,
        handlers::ideas::change_visibility,
        handlers::ideas::get_permissions,

        // --- Integrations ---
        handlers::api_keys::create_api_key,
        handlers::api_keys::create_client_api_key,
        handlers::integrations::whoami,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::Role,
            models::auth::Principal,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,

            // --- Products ---
            models::product::Product,
            models::product::ProductSequence,
            models::product::IssueType,
            models::product::AllocatedKey,

            // --- Work Items ---
            models::work_item::WorkItemKind,
            models::work_item::TicketType,
            models::work_item::Priority,
            models::work_item::Resolution,
            models::work_item::Milestones,
            models::work_item::WorkItem,
            models::work_item::RequirementAmendment,
            models::work_item::CreateWorkItemPayload,
            models::work_item::TransitionPayload,
            models::work_item::ClosePayload,
            models::work_item::CreateAmendmentPayload,
            models::work_item::AllowedTransitions,

            // --- Ideas ---
            models::idea::Visibility,
            models::idea::IdeaStatus,
            models::idea::Idea,
            models::idea::CreateIdeaPayload,
            models::idea::UpdateIdeaPayload,
            models::idea::ChangeVisibilityPayload,
            models::idea::IdeaPermissions,

            // --- Integrations ---
            models::api_key::ApiKeyContext,
            models::api_key::CreateApiKeyPayload,
            models::api_key::CreatedApiKey,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação"),
        (name = "Users", description = "Dados do Usuário"),
        (name = "Products", description = "Produtos e Chaves de Issue"),
        (name = "Work Items", description = "Itens de Trabalho e Ciclo de Vida"),
        (name = "Ideas", description = "Ideias e Visibilidade"),
        (name = "Integrations", description = "Acesso por Chave de API")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
        components.add_security_scheme(
            "api_key",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-API-Key"))),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_core_routes() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/api/work-items/{id}/transition"));
        assert!(paths.contains_key("/api/products/{product_id}/sequences/{issue_type}"));
        assert!(paths.contains_key("/api/ideas/{id}/visibility"));
        assert!(paths.contains_key("/api/integrations/whoami"));
        assert!(paths.contains_key("/api/api-keys"));
        assert!(paths.contains_key("/api/clients/me/api-keys"));
    }
}
