// src/models/idea.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

// --- Enums ---

/// Nível de visibilidade. A ordem das variantes é a ordem de exposição.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "visibility", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Private,
    Team,
    Public,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "idea_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IdeaStatus {
    Inbox,
    UnderReview,
    Planned,
    Rejected,
    Archived,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Idea {
    pub id: i64,
    #[schema(ignore)]
    pub tenant_id: i64,
    pub created_by: i64,
    pub title: String,
    pub description: Option<String>,
    pub visibility: Visibility,
    // Obrigatório quando visibility = team, nulo quando private
    pub team_id: Option<i64>,
    pub status: IdeaStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Valida o par (visibilidade, time).
pub fn visibility_team_consistent(visibility: Visibility, team_id: Option<i64>) -> bool {
    match visibility {
        Visibility::Team => team_id.is_some(),
        Visibility::Private => team_id.is_none(),
        Visibility::Public => true,
    }
}

// --- Payloads ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateIdeaPayload {
    #[validate(length(min = 1, max = 300, message = "O título é obrigatório."))]
    #[schema(example = "Modo escuro no portal")]
    pub title: String,
    pub description: Option<String>,
    pub visibility: Option<Visibility>,
    pub team_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIdeaPayload {
    #[validate(length(min = 1, max = 300, message = "O título não pode ser vazio."))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<IdeaStatus>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangeVisibilityPayload {
    pub visibility: Visibility,
    pub team_id: Option<i64>,
}

/// Resultado das quatro decisões para um principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IdeaPermissions {
    pub can_view: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_change_visibility: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_order_is_exposure_order() {
        assert!(Visibility::Private < Visibility::Team);
        assert!(Visibility::Team < Visibility::Public);
    }

    #[test]
    fn team_reference_rules() {
        assert!(visibility_team_consistent(Visibility::Team, Some(5)));
        assert!(!visibility_team_consistent(Visibility::Team, None));
        assert!(visibility_team_consistent(Visibility::Private, None));
        assert!(!visibility_team_consistent(Visibility::Private, Some(5)));
        assert!(visibility_team_consistent(Visibility::Public, None));
    }
}
