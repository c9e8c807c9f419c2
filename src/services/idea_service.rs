// src/services/idea_service.rs

use chrono::Utc;

use crate::{
    common::error::AppError,
    db::{IdeaRepository, TeamRepository},
    models::{
        auth::Principal,
        idea::{
            visibility_team_consistent, ChangeVisibilityPayload, CreateIdeaPayload, Idea,
            IdeaPermissions, UpdateIdeaPayload, Visibility,
        },
        team::TeamRole,
    },
    services::visibility::{self, VisibilityEngine},
};

/// Time resultante de uma mudança de visibilidade.
/// `private` nunca referencia time; `public` preserva o time anterior se nenhum for informado.
pub fn resolve_team(target: Visibility, requested: Option<i64>, current: Option<i64>) -> Option<i64> {
    match target {
        Visibility::Private => None,
        Visibility::Team | Visibility::Public => requested.or(current),
    }
}

/// Só o criador ou quem tem override aponta outro time; quem apenas escala
/// (o líder do time) mantém o time atual.
pub fn requested_team(idea: &Idea, principal: &Principal, requested: Option<i64>) -> Option<i64> {
    requested.filter(|_| visibility::can_edit(idea, principal))
}

#[derive(Clone)]
pub struct IdeaService {
    repo: IdeaRepository,
    team_repo: TeamRepository,
    engine: VisibilityEngine,
}

impl IdeaService {
    pub fn new(repo: IdeaRepository, team_repo: TeamRepository, engine: VisibilityEngine) -> Self {
        Self { repo, team_repo, engine }
    }

    async fn ensure_team_in_tenant(&self, tenant_id: i64, team_id: Option<i64>) -> Result<(), AppError> {
        if let Some(team_id) = team_id {
            self.team_repo
                .find_in_tenant(tenant_id, team_id)
                .await?
                .ok_or(AppError::NotFound("Time"))?;
        }
        Ok(())
    }

    pub async fn create(&self, principal: &Principal, payload: &CreateIdeaPayload) -> Result<Idea, AppError> {
        let visibility = payload.visibility.unwrap_or(Visibility::Private);
        if !visibility_team_consistent(visibility, payload.team_id) {
            return Err(AppError::InvalidInput(
                "Visibilidade 'team' exige um time; 'private' não aceita time.".into(),
            ));
        }
        self.ensure_team_in_tenant(principal.tenant_id, payload.team_id).await?;

        // Criada já compartilhada: conta como publicação
        let published_at = (visibility != Visibility::Private).then(Utc::now);

        let idea = self.repo
            .create(
                principal.tenant_id,
                principal.user_id,
                payload.title.trim(),
                payload.description.as_deref(),
                visibility,
                payload.team_id,
                published_at,
            )
            .await?;

        tracing::info!(id = idea.id, visibility = ?idea.visibility, "💡 Ideia criada");
        Ok(idea)
    }

    /// Ideias invisíveis para o principal respondem NotFound.
    pub async fn get(&self, principal: &Principal, id: i64) -> Result<Idea, AppError> {
        let idea = self.repo.find_by_id(id).await?.ok_or(AppError::NotFound("Ideia"))?;
        if !self.engine.can_view(&idea, principal).await? {
            return Err(AppError::NotFound("Ideia"));
        }
        Ok(idea)
    }

    pub async fn list(&self, principal: &Principal) -> Result<Vec<Idea>, AppError> {
        let team_ids = self.team_repo.team_ids_for_user(principal.user_id).await?;
        let candidates = self.repo
            .list_candidates(
                principal.tenant_id,
                principal.user_id,
                &team_ids,
                principal.has_admin_override(),
            )
            .await?;

        // Pertencimento já conhecido: nenhuma consulta extra por ideia
        Ok(candidates
            .into_iter()
            .filter(|idea| {
                let membership = idea
                    .team_id
                    .filter(|team_id| team_ids.contains(team_id))
                    .map(|_| TeamRole::Member);
                visibility::can_view_with(idea, principal, membership)
            })
            .collect())
    }

    pub async fn update(
        &self,
        principal: &Principal,
        id: i64,
        payload: &UpdateIdeaPayload,
    ) -> Result<Idea, AppError> {
        let idea = self.get(principal, id).await?;
        if !visibility::can_edit(&idea, principal) {
            return Err(AppError::Forbidden);
        }

        self.repo
            .update_content(
                idea.id,
                payload.title.as_deref().map(str::trim),
                payload.description.as_deref(),
                payload.status,
            )
            .await
    }

    pub async fn delete(&self, principal: &Principal, id: i64) -> Result<(), AppError> {
        let idea = self.get(principal, id).await?;
        if !visibility::can_delete(&idea, principal) {
            return Err(AppError::Forbidden);
        }
        self.repo.delete(idea.id).await?;
        tracing::info!(id, "🗑️ Ideia excluída");
        Ok(())
    }

    pub async fn change_visibility(
        &self,
        principal: &Principal,
        id: i64,
        payload: &ChangeVisibilityPayload,
    ) -> Result<Idea, AppError> {
        let idea = self.get(principal, id).await?;

        if !self.engine.can_set_visibility(&idea, principal, payload.visibility).await? {
            return Err(AppError::Forbidden);
        }

        let requested = requested_team(&idea, principal, payload.team_id);
        let team_id = resolve_team(payload.visibility, requested, idea.team_id);
        if !visibility_team_consistent(payload.visibility, team_id) {
            return Err(AppError::InvalidInput("Visibilidade 'team' exige um time.".into()));
        }
        self.ensure_team_in_tenant(idea.tenant_id, team_id).await?;

        let published_at =
            visibility::published_at_after(idea.visibility, payload.visibility, idea.published_at, Utc::now());

        let updated = self.repo
            .update_visibility(idea.id, payload.visibility, team_id, published_at)
            .await?;

        tracing::info!(
            id,
            from = ?idea.visibility,
            to = ?updated.visibility,
            user_id = principal.user_id,
            "🔓 Visibilidade alterada"
        );
        Ok(updated)
    }

    pub async fn permissions(&self, principal: &Principal, id: i64) -> Result<IdeaPermissions, AppError> {
        let idea = self.repo.find_by_id(id).await?.ok_or(AppError::NotFound("Ideia"))?;
        let permissions = self.engine.permissions(&idea, principal).await?;
        if !permissions.can_view {
            return Err(AppError::NotFound("Ideia"));
        }
        Ok(permissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{auth::Role, idea::IdeaStatus};

    fn principal(user_id: i64, role: Role) -> Principal {
        Principal {
            user_id,
            tenant_id: 10,
            client_id: None,
            is_internal: true,
            role,
            platform_operator: false,
        }
    }

    fn team_idea(created_by: i64, team_id: i64) -> Idea {
        Idea {
            id: 1,
            tenant_id: 10,
            created_by,
            title: "Exportar CSV".into(),
            description: None,
            visibility: Visibility::Team,
            team_id: Some(team_id),
            status: IdeaStatus::Inbox,
            published_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn escalating_lead_keeps_the_current_team() {
        let idea = team_idea(1, 5);
        let lead = principal(3, Role::Developer);

        let requested = requested_team(&idea, &lead, Some(9));
        assert_eq!(requested, None);
        assert_eq!(resolve_team(Visibility::Public, requested, idea.team_id), Some(5));
    }

    #[test]
    fn creator_and_admin_may_point_to_another_team() {
        let idea = team_idea(1, 5);
        assert_eq!(requested_team(&idea, &principal(1, Role::Developer), Some(9)), Some(9));
        assert_eq!(requested_team(&idea, &principal(4, Role::Admin), Some(9)), Some(9));
    }

    #[test]
    fn private_never_keeps_a_team() {
        assert_eq!(resolve_team(Visibility::Private, Some(3), Some(4)), None);
    }

    #[test]
    fn team_and_public_fall_back_to_current_team() {
        assert_eq!(resolve_team(Visibility::Team, None, Some(4)), Some(4));
        assert_eq!(resolve_team(Visibility::Team, Some(3), Some(4)), Some(3));
        assert_eq!(resolve_team(Visibility::Public, None, Some(4)), Some(4));
        assert_eq!(resolve_team(Visibility::Public, None, None), None);
    }
}
