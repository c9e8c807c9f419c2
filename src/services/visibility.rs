// src/services/visibility.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::{
    common::error::AppError,
    models::{
        auth::Principal,
        idea::{Idea, IdeaPermissions, Visibility},
        team::TeamRole,
    },
};

/// Consulta (somente leitura) de pertencimento a times.
#[async_trait]
pub trait MembershipLookup: Send + Sync {
    async fn team_role(&self, team_id: i64, user_id: i64) -> Result<Option<TeamRole>, AppError>;
}

/// Conteúdo compartilhável sujeito aos níveis de visibilidade.
pub trait Shareable {
    fn tenant_id(&self) -> i64;
    fn creator_id(&self) -> i64;
    fn visibility(&self) -> Visibility;
    fn team_id(&self) -> Option<i64>;
}

impl Shareable for Idea {
    fn tenant_id(&self) -> i64 {
        self.tenant_id
    }
    fn creator_id(&self) -> i64 {
        self.created_by
    }
    fn visibility(&self) -> Visibility {
        self.visibility
    }
    fn team_id(&self) -> Option<i64> {
        self.team_id
    }
}

// =============================================================================
//  REGRAS PURAS (na ordem de precedência)
// =============================================================================

/// 1. Sobreposição administrativa. O tenant operador vale para todos os tenants;
/// o papel admin vale dentro do próprio tenant.
fn overrides<T: Shareable>(item: &T, p: &Principal) -> bool {
    p.platform_operator || (p.role.is_administrative() && p.tenant_id == item.tenant_id())
}

fn is_creator<T: Shareable>(item: &T, p: &Principal) -> bool {
    p.tenant_id == item.tenant_id() && p.user_id == item.creator_id()
}

/// `canView` com o fato de pertencimento já resolvido.
pub fn can_view_with<T: Shareable>(item: &T, p: &Principal, membership: Option<TeamRole>) -> bool {
    if overrides(item, p) {
        return true;
    }
    // 2. Entre tenants diferentes, sempre negado
    if p.tenant_id != item.tenant_id() {
        return false;
    }
    match item.visibility() {
        Visibility::Public => true,
        Visibility::Private => is_creator(item, p),
        Visibility::Team => is_creator(item, p) || membership.is_some(),
    }
}

pub fn can_edit<T: Shareable>(item: &T, p: &Principal) -> bool {
    overrides(item, p) || is_creator(item, p)
}

pub fn can_delete<T: Shareable>(item: &T, p: &Principal) -> bool {
    overrides(item, p) || is_creator(item, p)
}

/// Pode alterar a visibilidade em alguma direção?
pub fn can_change_visibility_with<T: Shareable>(
    item: &T,
    p: &Principal,
    membership: Option<TeamRole>,
) -> bool {
    if overrides(item, p) || is_creator(item, p) {
        return true;
    }
    // Líder do time só pode escalar (team -> public)
    p.tenant_id == item.tenant_id()
        && item.visibility() == Visibility::Team
        && membership == Some(TeamRole::Lead)
}

/// Pode levar o item para `target`? Criador e admin em qualquer direção;
/// líder do time apenas aumentando a exposição.
pub fn can_set_visibility_with<T: Shareable>(
    item: &T,
    p: &Principal,
    membership: Option<TeamRole>,
    target: Visibility,
) -> bool {
    if overrides(item, p) || is_creator(item, p) {
        return true;
    }
    can_change_visibility_with(item, p, membership) && target > item.visibility()
}

/// `publishedAt` é carimbado na primeira promoção para fora de `private`.
pub fn published_at_after(
    current: Visibility,
    target: Visibility,
    published_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match published_at {
        Some(at) => Some(at),
        None if current == Visibility::Private && target != Visibility::Private => Some(now),
        None => None,
    }
}

// =============================================================================
//  MOTOR (consulta pertencimento apenas quando necessário)
// =============================================================================

#[derive(Clone)]
pub struct VisibilityEngine {
    membership: Arc<dyn MembershipLookup>,
}

impl VisibilityEngine {
    pub fn new(membership: Arc<dyn MembershipLookup>) -> Self {
        Self { membership }
    }

    async fn membership_for<T: Shareable>(
        &self,
        item: &T,
        p: &Principal,
    ) -> Result<Option<TeamRole>, AppError> {
        let needs_lookup = item.visibility() == Visibility::Team
            && p.tenant_id == item.tenant_id()
            && !overrides(item, p)
            && !is_creator(item, p);

        match (needs_lookup, item.team_id()) {
            (true, Some(team_id)) => self.membership.team_role(team_id, p.user_id).await,
            _ => Ok(None),
        }
    }

    pub async fn can_view<T: Shareable>(&self, item: &T, p: &Principal) -> Result<bool, AppError> {
        let membership = self.membership_for(item, p).await?;
        Ok(can_view_with(item, p, membership))
    }

    pub async fn can_set_visibility<T: Shareable>(
        &self,
        item: &T,
        p: &Principal,
        target: Visibility,
    ) -> Result<bool, AppError> {
        let membership = self.membership_for(item, p).await?;
        Ok(can_set_visibility_with(item, p, membership, target))
    }

    /// As quatro decisões de uma vez, com no máximo uma consulta.
    pub async fn permissions<T: Shareable>(
        &self,
        item: &T,
        p: &Principal,
    ) -> Result<IdeaPermissions, AppError> {
        let membership = self.membership_for(item, p).await?;
        Ok(IdeaPermissions {
            can_view: can_view_with(item, p, membership),
            can_edit: can_edit(item, p),
            can_delete: can_delete(item, p),
            can_change_visibility: can_change_visibility_with(item, p, membership),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{auth::Role, idea::IdeaStatus};
    use std::{collections::HashMap, sync::Mutex};

    #[derive(Default)]
    struct FakeTeams {
        members: HashMap<(i64, i64), TeamRole>,
        lookups: Mutex<usize>,
    }

    #[async_trait]
    impl MembershipLookup for FakeTeams {
        async fn team_role(&self, team_id: i64, user_id: i64) -> Result<Option<TeamRole>, AppError> {
            *self.lookups.lock().unwrap() += 1;
            Ok(self.members.get(&(team_id, user_id)).copied())
        }
    }

    fn principal(user_id: i64, tenant_id: i64, role: Role) -> Principal {
        Principal {
            user_id,
            tenant_id,
            client_id: None,
            is_internal: true,
            role,
            platform_operator: false,
        }
    }

    fn idea(created_by: i64, tenant_id: i64, visibility: Visibility, team_id: Option<i64>) -> Idea {
        Idea {
            id: 1,
            tenant_id,
            created_by,
            title: "Exportar CSV".into(),
            description: None,
            visibility,
            team_id,
            status: IdeaStatus::Inbox,
            published_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn engine(members: &[((i64, i64), TeamRole)]) -> (VisibilityEngine, Arc<FakeTeams>) {
        let fake = Arc::new(FakeTeams {
            members: members.iter().copied().collect(),
            lookups: Mutex::new(0),
        });
        (VisibilityEngine::new(fake.clone()), fake)
    }

    #[tokio::test]
    async fn visibility_matrix_end_to_end() {
        let a = principal(1, 10, Role::Developer);
        let b = principal(2, 10, Role::Developer);
        let c = principal(3, 10, Role::Support);
        let admin = principal(4, 10, Role::Admin);
        let (engine, _) = engine(&[((5, 3), TeamRole::Member)]);

        let mut item = idea(a.user_id, 10, Visibility::Private, None);

        let pa = engine.permissions(&item, &a).await.unwrap();
        assert!(pa.can_view && pa.can_edit && pa.can_delete);
        assert!(!engine.can_view(&item, &b).await.unwrap());

        // A promove para o time 5
        assert!(engine.can_set_visibility(&item, &a, Visibility::Team).await.unwrap());
        item.published_at = published_at_after(item.visibility, Visibility::Team, None, Utc::now());
        item.visibility = Visibility::Team;
        item.team_id = Some(5);
        assert!(item.published_at.is_some());

        let pc = engine.permissions(&item, &c).await.unwrap();
        assert!(pc.can_view);
        assert!(!pc.can_edit);
        assert!(!pc.can_delete);
        assert!(!engine.can_view(&item, &b).await.unwrap());

        for tier in [Visibility::Private, Visibility::Team, Visibility::Public] {
            item.visibility = tier;
            item.team_id = (tier == Visibility::Team).then_some(5);
            let p = engine.permissions(&item, &admin).await.unwrap();
            assert!(p.can_view && p.can_edit && p.can_delete && p.can_change_visibility);
        }
    }

    #[tokio::test]
    async fn cross_tenant_is_denied_even_for_public() {
        let (engine, _) = engine(&[]);
        let outsider = principal(9, 20, Role::Developer);
        let foreign_admin = principal(8, 20, Role::Admin);

        for tier in [Visibility::Private, Visibility::Team, Visibility::Public] {
            let team = (tier == Visibility::Team).then_some(5);
            // Mesmo id de usuário do criador, mas em outro tenant
            let item = idea(outsider.user_id, 10, tier, team);
            let p = engine.permissions(&item, &outsider).await.unwrap();
            assert_eq!(
                p,
                IdeaPermissions {
                    can_view: false,
                    can_edit: false,
                    can_delete: false,
                    can_change_visibility: false,
                }
            );
            assert!(!engine.can_view(&item, &foreign_admin).await.unwrap());
        }
    }

    #[tokio::test]
    async fn platform_operator_sees_every_tenant() {
        let (engine, _) = engine(&[]);
        let mut operator = principal(7, 1, Role::Support);
        operator.platform_operator = true;

        let item = idea(2, 10, Visibility::Private, None);
        let p = engine.permissions(&item, &operator).await.unwrap();
        assert!(p.can_view && p.can_edit && p.can_delete);
    }

    #[tokio::test]
    async fn public_items_are_read_only_for_non_creators() {
        let (engine, _) = engine(&[]);
        let item = idea(1, 10, Visibility::Public, None);
        let other = principal(2, 10, Role::User);

        let p = engine.permissions(&item, &other).await.unwrap();
        assert!(p.can_view);
        assert!(!p.can_edit && !p.can_delete && !p.can_change_visibility);
    }

    #[tokio::test]
    async fn team_lead_can_only_escalate() {
        let (engine, _) = engine(&[((5, 3), TeamRole::Lead), ((5, 6), TeamRole::Member)]);
        let lead = principal(3, 10, Role::Developer);
        let member = principal(6, 10, Role::Developer);
        let item = idea(1, 10, Visibility::Team, Some(5));

        assert!(engine.can_set_visibility(&item, &lead, Visibility::Public).await.unwrap());
        assert!(!engine.can_set_visibility(&item, &lead, Visibility::Private).await.unwrap());
        assert!(!engine.can_set_visibility(&item, &member, Visibility::Public).await.unwrap());

        let p = engine.permissions(&item, &lead).await.unwrap();
        assert!(p.can_view && p.can_change_visibility);
        assert!(!p.can_edit && !p.can_delete);
    }

    #[tokio::test]
    async fn membership_is_looked_up_only_for_team_items() {
        let (engine, fake) = engine(&[]);
        let viewer = principal(2, 10, Role::User);

        engine.can_view(&idea(1, 10, Visibility::Public, None), &viewer).await.unwrap();
        engine.can_view(&idea(1, 10, Visibility::Private, None), &viewer).await.unwrap();
        assert_eq!(*fake.lookups.lock().unwrap(), 0);

        engine.can_view(&idea(1, 10, Visibility::Team, Some(5)), &viewer).await.unwrap();
        assert_eq!(*fake.lookups.lock().unwrap(), 1);
    }

    #[test]
    fn published_at_is_set_once() {
        let first = Utc::now();
        let later = first + chrono::Duration::days(1);

        let stamped = published_at_after(Visibility::Private, Visibility::Public, None, first);
        assert_eq!(stamped, Some(first));
        assert_eq!(
            published_at_after(Visibility::Private, Visibility::Team, stamped, later),
            Some(first)
        );
        assert_eq!(published_at_after(Visibility::Team, Visibility::Public, None, later), None);
        assert_eq!(published_at_after(Visibility::Private, Visibility::Private, None, later), None);
    }
}
