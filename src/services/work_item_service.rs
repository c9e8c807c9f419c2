// src/services/work_item_service.rs

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::{
    common::error::AppError,
    db::work_item_repo::NewWorkItem,
    models::{
        auth::Principal,
        work_item::{
            AllowedTransitions, ClosePayload, CreateAmendmentPayload, CreateWorkItemPayload,
            Priority, RequirementAmendment, TicketType, TransitionPayload, WorkItem, WorkItemKind,
        },
    },
    services::{
        sequence_service::SequenceService,
        workflow::{self, StatusChange},
    },
};

/// Quantas vezes revalidamos quando outra escrita muda o status no meio do caminho.
const MAX_STATUS_ATTEMPTS: usize = 3;

/// Persistência dos itens. Toda leitura e escrita leva o tenant no filtro.
#[async_trait]
pub trait WorkItemStore: Send + Sync {
    async fn insert_item(&self, item: NewWorkItem<'_>) -> Result<WorkItem, AppError>;

    /// Itens excluídos não aparecem.
    async fn find_item(&self, tenant_id: i64, id: i64) -> Result<Option<WorkItem>, AppError>;

    /// Grava só se o status ainda for `expected_status`; `None` quando outra escrita chegou antes.
    async fn compare_and_set_status(
        &self,
        tenant_id: i64,
        id: i64,
        expected_status: &str,
        change: &StatusChange,
    ) -> Result<Option<WorkItem>, AppError>;

    /// Numera e grava a emenda numa única transação; `None` se o requisito não existe.
    async fn append_amendment(
        &self,
        tenant_id: i64,
        requirement_id: i64,
        title: &str,
        description: Option<&str>,
        created_by: i64,
    ) -> Result<Option<RequirementAmendment>, AppError>;

    async fn soft_delete_item(&self, tenant_id: i64, id: i64) -> Result<bool, AppError>;

    async fn client_in_tenant(&self, tenant_id: i64, client_id: i64) -> Result<bool, AppError>;
}

/// Um principal externo só enxerga tickets do próprio cliente.
pub fn is_visible_to(item: &WorkItem, principal: &Principal) -> bool {
    if item.tenant_id != principal.tenant_id {
        return false;
    }
    if principal.is_internal {
        return true;
    }
    item.kind == WorkItemKind::Ticket
        && item.client_id.is_some()
        && item.client_id == principal.client_id
}

#[derive(Clone)]
pub struct WorkItemService {
    store: Arc<dyn WorkItemStore>,
    sequences: SequenceService,
}

impl WorkItemService {
    pub fn new(store: Arc<dyn WorkItemStore>, sequences: SequenceService) -> Self {
        Self { store, sequences }
    }

    // --- CRIAÇÃO ---

    pub async fn create(
        &self,
        principal: &Principal,
        payload: &CreateWorkItemPayload,
    ) -> Result<WorkItem, AppError> {
        // 1. Externos só abrem tickets
        if payload.kind != WorkItemKind::Ticket && !principal.require_internal() {
            return Err(AppError::Forbidden);
        }
        if payload.kind == WorkItemKind::Ticket && !principal.is_internal && principal.client_id.is_none() {
            return Err(AppError::Forbidden);
        }

        // 2. Produto do mesmo tenant
        let product = self.sequences
            .product_in_tenant(principal.tenant_id, payload.product_id)
            .await?;

        // 3. Hierarquia: Feature pertence a Epic, DevTask a Feature
        let parent_id = self.check_parent(principal, payload, product.id).await?;

        // 4. Cliente do ticket (antes da chave, para não queimar um número)
        let client_id = self.ticket_client(principal, payload).await?;

        // 5. Chave (incremento atômico; o número nunca é reutilizado)
        let issue_type = payload.kind.issue_type(payload.ticket_type);
        let issue_key = self.sequences.allocate(product.id, issue_type).await?;

        let item = self.store
            .insert_item(NewWorkItem {
                tenant_id: principal.tenant_id,
                product_id: product.id,
                parent_id,
                client_id,
                kind: payload.kind,
                ticket_type: (payload.kind == WorkItemKind::Ticket).then_some(
                    payload.ticket_type.unwrap_or(TicketType::Support),
                ),
                issue_key: &issue_key,
                title: payload.title.trim(),
                description: payload.description.as_deref(),
                status: workflow::initial_status(payload.kind),
                priority: payload.priority.unwrap_or(Priority::Medium),
                metadata: payload.metadata.as_ref(),
                created_by: principal.user_id,
            })
            .await?;

        tracing::info!(id = item.id, key = %item.issue_key, kind = item.kind.as_str(), "📌 Item criado");
        Ok(item)
    }

    async fn check_parent(
        &self,
        principal: &Principal,
        payload: &CreateWorkItemPayload,
        product_id: i64,
    ) -> Result<Option<i64>, AppError> {
        let Some(parent_kind) = payload.kind.parent_kind() else {
            return Ok(None);
        };
        let parent_id = payload.parent_id.ok_or_else(|| {
            AppError::InvalidInput(format!(
                "{} exige um item pai do tipo {}.",
                payload.kind.as_str(),
                parent_kind.as_str()
            ))
        })?;

        let parent = self.store
            .find_item(principal.tenant_id, parent_id)
            .await?
            .filter(|p| p.kind == parent_kind && p.product_id == product_id)
            .ok_or(AppError::NotFound("Item pai"))?;

        Ok(Some(parent.id))
    }

    /// Externos sempre abrem para o próprio cliente; internos podem indicar
    /// um cliente ativo do tenant.
    async fn ticket_client(
        &self,
        principal: &Principal,
        payload: &CreateWorkItemPayload,
    ) -> Result<Option<i64>, AppError> {
        if payload.kind != WorkItemKind::Ticket {
            if payload.client_id.is_some() {
                return Err(AppError::InvalidInput("Apenas tickets pertencem a um cliente.".into()));
            }
            return Ok(None);
        }
        if !principal.is_internal {
            return Ok(principal.client_id);
        }
        let Some(client_id) = payload.client_id else {
            return Ok(None);
        };
        if !self.store.client_in_tenant(principal.tenant_id, client_id).await? {
            return Err(AppError::NotFound("Cliente"));
        }
        Ok(Some(client_id))
    }

    // --- LEITURA ---

    /// Itens de outro tenant (ou de outro cliente) respondem NotFound.
    pub async fn get(&self, principal: &Principal, id: i64) -> Result<WorkItem, AppError> {
        self.store
            .find_item(principal.tenant_id, id)
            .await?
            .filter(|item| is_visible_to(item, principal))
            .ok_or(AppError::NotFound("Item"))
    }

    pub async fn allowed_transitions(
        &self,
        principal: &Principal,
        id: i64,
    ) -> Result<AllowedTransitions, AppError> {
        let item = self.get(principal, id).await?;
        let allowed = workflow::allowed_next(item.kind, &item.status)?;
        Ok(AllowedTransitions {
            terminal: allowed.is_empty(),
            allowed: allowed.into_iter().map(str::to_string).collect(),
            current: item.status,
        })
    }

    // --- TRANSIÇÃO ---

    pub async fn transition(
        &self,
        principal: &Principal,
        id: i64,
        payload: &TransitionPayload,
    ) -> Result<WorkItem, AppError> {
        self.change_status(principal, id, |item| {
            workflow::apply(
                item.kind,
                &item.status,
                &payload.status,
                payload.resolution,
                payload.resolution_note.as_deref(),
                &item.milestones(),
                Utc::now(),
            )
        })
        .await
    }

    pub async fn close(
        &self,
        principal: &Principal,
        id: i64,
        payload: &ClosePayload,
    ) -> Result<WorkItem, AppError> {
        self.change_status(principal, id, |item| {
            workflow::apply_close(
                item.kind,
                &item.status,
                payload.resolution,
                payload.resolution_note.as_deref(),
                &item.milestones(),
                Utc::now(),
            )
        })
        .await
    }

    /// Ler, validar e gravar condicionado ao status lido. Se outra escrita
    /// chegar antes, revalidamos contra o status novo.
    async fn change_status<F>(&self, principal: &Principal, id: i64, decide: F) -> Result<WorkItem, AppError>
    where
        F: Fn(&WorkItem) -> Result<StatusChange, AppError>,
    {
        for _ in 0..MAX_STATUS_ATTEMPTS {
            let item = self.get(principal, id).await?;
            if !principal.require_internal() {
                return Err(AppError::Forbidden);
            }

            let change = decide(&item)?;
            let updated = self.store
                .compare_and_set_status(principal.tenant_id, id, &item.status, &change)
                .await?;

            if let Some(updated) = updated {
                tracing::info!(
                    id,
                    key = %updated.issue_key,
                    from = %item.status,
                    to = %updated.status,
                    "🔀 Transição aplicada"
                );
                return Ok(updated);
            }
            tracing::debug!(id, "Status alterado concorrentemente; revalidando");
        }

        Err(AppError::Conflict("O item foi alterado concorrentemente, tente novamente.".into()))
    }

    // --- EMENDAS ---

    pub async fn create_amendment(
        &self,
        principal: &Principal,
        requirement_id: i64,
        payload: &CreateAmendmentPayload,
    ) -> Result<RequirementAmendment, AppError> {
        if !principal.require_internal() {
            // Requisitos não são visíveis para externos
            return Err(AppError::NotFound("Requisito"));
        }

        let amendment = self.store
            .append_amendment(
                principal.tenant_id,
                requirement_id,
                payload.title.trim(),
                payload.description.as_deref(),
                principal.user_id,
            )
            .await?
            .ok_or(AppError::NotFound("Requisito"))?;

        tracing::info!(requirement_id, number = amendment.amendment_number, "📝 Emenda criada");
        Ok(amendment)
    }

    // --- EXCLUSÃO ---

    pub async fn delete(&self, principal: &Principal, id: i64) -> Result<(), AppError> {
        let item = self.get(principal, id).await?;
        if !principal.require_internal() {
            return Err(AppError::Forbidden);
        }
        if !self.store.soft_delete_item(principal.tenant_id, item.id).await? {
            return Err(AppError::NotFound("Item"));
        }
        tracing::info!(id, key = %item.issue_key, "🗑️ Item excluído");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::auth::Role, services::sequence_service::tests::MemorySequences};
    use std::{
        collections::{HashMap, VecDeque},
        sync::{
            atomic::{AtomicUsize, Ordering},
            Mutex,
        },
    };

    /// Store em memória. `concurrent_writes` simula outra escrita gravando
    /// um status logo antes de cada compare-and-set.
    #[derive(Default)]
    struct MemoryWorkItems {
        items: Mutex<HashMap<i64, WorkItem>>,
        amendments: Mutex<HashMap<i64, Vec<RequirementAmendment>>>,
        active_clients: Vec<(i64, i64)>,
        concurrent_writes: Mutex<VecDeque<&'static str>>,
        status_writes: AtomicUsize,
    }

    impl MemoryWorkItems {
        fn seeded(items: Vec<WorkItem>) -> Self {
            let store = Self::default();
            store.items.lock().unwrap().extend(items.into_iter().map(|i| (i.id, i)));
            store
        }

        fn status_of(&self, id: i64) -> String {
            self.items.lock().unwrap()[&id].status.clone()
        }
    }

    #[async_trait]
    impl WorkItemStore for MemoryWorkItems {
        async fn insert_item(&self, new: NewWorkItem<'_>) -> Result<WorkItem, AppError> {
            let mut items = self.items.lock().unwrap();
            let mut created = item(new.kind, new.tenant_id, new.client_id);
            created.id = items.len() as i64 + 1;
            created.product_id = new.product_id;
            created.parent_id = new.parent_id;
            created.ticket_type = new.ticket_type;
            created.issue_key = new.issue_key.to_string();
            created.title = new.title.to_string();
            created.status = new.status.to_string();
            created.priority = new.priority;
            items.insert(created.id, created.clone());
            Ok(created)
        }

        async fn find_item(&self, tenant_id: i64, id: i64) -> Result<Option<WorkItem>, AppError> {
            let items = self.items.lock().unwrap();
            Ok(items.get(&id).filter(|i| i.tenant_id == tenant_id).cloned())
        }

        async fn compare_and_set_status(
            &self,
            tenant_id: i64,
            id: i64,
            expected_status: &str,
            change: &StatusChange,
        ) -> Result<Option<WorkItem>, AppError> {
            self.status_writes.fetch_add(1, Ordering::SeqCst);
            let mut items = self.items.lock().unwrap();
            let Some(item) = items.get_mut(&id).filter(|i| i.tenant_id == tenant_id) else {
                return Ok(None);
            };
            if let Some(status) = self.concurrent_writes.lock().unwrap().pop_front() {
                item.status = status.to_string();
            }
            if item.status != expected_status {
                return Ok(None);
            }
            let m = &change.derived.milestones;
            item.status = change.next_status.to_string();
            item.resolution = change.derived.resolution.or(item.resolution);
            item.brainstorm_started_at = m.brainstorm_started_at;
            item.solidified_at = m.solidified_at;
            item.implementation_started_at = m.implementation_started_at;
            item.completed_at = m.completed_at;
            item.closed_at = m.closed_at;
            Ok(Some(item.clone()))
        }

        async fn append_amendment(
            &self,
            tenant_id: i64,
            requirement_id: i64,
            title: &str,
            description: Option<&str>,
            created_by: i64,
        ) -> Result<Option<RequirementAmendment>, AppError> {
            let is_requirement = self
                .find_item(tenant_id, requirement_id)
                .await?
                .is_some_and(|i| i.kind == WorkItemKind::Requirement);
            if !is_requirement {
                return Ok(None);
            }
            let mut amendments = self.amendments.lock().unwrap();
            let list = amendments.entry(requirement_id).or_default();
            let amendment = RequirementAmendment {
                id: list.len() as i64 + 100,
                requirement_id,
                amendment_number: list.len() as i32 + 1,
                title: title.to_string(),
                description: description.map(str::to_string),
                created_by,
                created_at: Utc::now(),
            };
            list.push(amendment.clone());
            Ok(Some(amendment))
        }

        async fn soft_delete_item(&self, tenant_id: i64, id: i64) -> Result<bool, AppError> {
            let mut items = self.items.lock().unwrap();
            let owned = items.get(&id).is_some_and(|i| i.tenant_id == tenant_id);
            Ok(owned && items.remove(&id).is_some())
        }

        async fn client_in_tenant(&self, tenant_id: i64, client_id: i64) -> Result<bool, AppError> {
            Ok(self.active_clients.contains(&(tenant_id, client_id)))
        }
    }

    fn service(store: Arc<MemoryWorkItems>) -> WorkItemService {
        let sequences = SequenceService::new(Arc::new(MemorySequences::with_product(7, 1, Some("HRM"))));
        WorkItemService::new(store, sequences)
    }

    fn to(status: &str) -> TransitionPayload {
        TransitionPayload { status: status.into(), ..Default::default() }
    }

    fn ticket_payload(client_id: Option<i64>) -> CreateWorkItemPayload {
        CreateWorkItemPayload {
            kind: WorkItemKind::Ticket,
            product_id: 7,
            parent_id: None,
            client_id,
            ticket_type: Some(TicketType::Bug),
            title: "  Erro ao exportar  ".into(),
            description: None,
            priority: None,
            metadata: None,
        }
    }

    fn item(kind: WorkItemKind, tenant_id: i64, client_id: Option<i64>) -> WorkItem {
        let now = Utc::now();
        WorkItem {
            id: 1,
            tenant_id,
            product_id: 7,
            parent_id: None,
            client_id,
            kind,
            ticket_type: (kind == WorkItemKind::Ticket).then_some(TicketType::Bug),
            issue_key: "HRM-B001".into(),
            title: "Erro no login".into(),
            description: None,
            status: "open".into(),
            priority: Priority::High,
            resolution: None,
            resolution_note: None,
            brainstorm_started_at: None,
            solidified_at: None,
            implementation_started_at: None,
            completed_at: None,
            closed_at: None,
            metadata: None,
            created_by: 1,
            created_at: now,
            updated_at: now,
        }
    }

    fn principal(tenant_id: i64, client_id: Option<i64>, is_internal: bool) -> Principal {
        Principal {
            user_id: 5,
            tenant_id,
            client_id,
            is_internal,
            role: Role::User,
            platform_operator: false,
        }
    }

    #[test]
    fn internal_users_see_everything_in_their_tenant() {
        let p = principal(1, None, true);
        assert!(is_visible_to(&item(WorkItemKind::Epic, 1, None), &p));
        assert!(is_visible_to(&item(WorkItemKind::Ticket, 1, Some(4)), &p));
        assert!(!is_visible_to(&item(WorkItemKind::Epic, 2, None), &p));
    }

    #[test]
    fn client_users_see_only_their_tickets() {
        let p = principal(1, Some(4), false);
        assert!(is_visible_to(&item(WorkItemKind::Ticket, 1, Some(4)), &p));
        assert!(!is_visible_to(&item(WorkItemKind::Ticket, 1, Some(8)), &p));
        assert!(!is_visible_to(&item(WorkItemKind::Ticket, 1, None), &p));
        assert!(!is_visible_to(&item(WorkItemKind::Requirement, 1, None), &p));
        assert!(!is_visible_to(&item(WorkItemKind::Ticket, 2, Some(4)), &p));
    }

    #[tokio::test]
    async fn lost_race_is_revalidated_against_the_new_status() {
        let store = Arc::new(MemoryWorkItems::seeded(vec![item(WorkItemKind::Ticket, 1, Some(4))]));
        store.concurrent_writes.lock().unwrap().push_back("closed");
        let service = service(store.clone());

        let err = service
            .transition(&principal(1, None, true), 1, &to("in_progress"))
            .await
            .unwrap_err();

        match err {
            AppError::IllegalTransition { from, to, .. } => {
                assert_eq!(from, "closed");
                assert_eq!(to, "in_progress");
            }
            other => panic!("esperava IllegalTransition, veio {other:?}"),
        }
        assert_eq!(store.status_of(1), "closed");
        assert_eq!(store.status_writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn lost_race_retries_when_the_move_is_still_legal() {
        let store = Arc::new(MemoryWorkItems::seeded(vec![item(WorkItemKind::Ticket, 1, Some(4))]));
        store.concurrent_writes.lock().unwrap().push_back("in_progress");
        let service = service(store.clone());

        let updated = service
            .transition(&principal(1, None, true), 1, &to("resolved"))
            .await
            .unwrap();

        assert_eq!(updated.status, "resolved");
        assert_eq!(store.status_writes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn repeated_lost_races_end_in_conflict() {
        let store = Arc::new(MemoryWorkItems::seeded(vec![item(WorkItemKind::Ticket, 1, Some(4))]));
        store
            .concurrent_writes
            .lock()
            .unwrap()
            .extend(["in_progress", "waiting_on_client", "open"]);
        let service = service(store.clone());

        let err = service
            .transition(&principal(1, None, true), 1, &to("resolved"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(store.status_writes.load(Ordering::SeqCst), MAX_STATUS_ATTEMPTS);
        assert_eq!(store.status_of(1), "open");
    }

    #[tokio::test]
    async fn amendments_are_numbered_per_requirement() {
        let mut other = item(WorkItemKind::Requirement, 1, None);
        other.id = 2;
        let mut epic = item(WorkItemKind::Epic, 1, None);
        epic.id = 3;
        let store = Arc::new(MemoryWorkItems::seeded(vec![
            item(WorkItemKind::Requirement, 1, None),
            other,
            epic,
        ]));
        let service = service(store);
        let internal = principal(1, None, true);
        let payload = CreateAmendmentPayload { title: " Ajuste de escopo ".into(), description: None };

        let mut numbers = Vec::new();
        for _ in 0..3 {
            let amendment = service.create_amendment(&internal, 1, &payload).await.unwrap();
            numbers.push(amendment.amendment_number);
        }
        assert_eq!(numbers, vec![1, 2, 3]);

        let first_of_other = service.create_amendment(&internal, 2, &payload).await.unwrap();
        assert_eq!(first_of_other.amendment_number, 1);
        assert_eq!(first_of_other.title, "Ajuste de escopo");

        assert!(matches!(
            service.create_amendment(&internal, 3, &payload).await,
            Err(AppError::NotFound("Requisito"))
        ));
        assert!(matches!(
            service.create_amendment(&principal(2, None, true), 1, &payload).await,
            Err(AppError::NotFound("Requisito"))
        ));
        assert!(matches!(
            service.create_amendment(&principal(1, Some(4), false), 1, &payload).await,
            Err(AppError::NotFound("Requisito"))
        ));
    }

    #[tokio::test]
    async fn internal_user_files_a_ticket_for_an_active_client() {
        let store = Arc::new(MemoryWorkItems {
            active_clients: vec![(1, 4)],
            ..Default::default()
        });
        let service = service(store);
        let internal = principal(1, None, true);

        // Cliente de outro tenant ou inativo: nenhum número é consumido
        assert!(matches!(
            service.create(&internal, &ticket_payload(Some(9))).await,
            Err(AppError::NotFound("Cliente"))
        ));

        let ticket = service.create(&internal, &ticket_payload(Some(4))).await.unwrap();
        assert_eq!(ticket.client_id, Some(4));
        assert_eq!(ticket.issue_key, "HRM-B001");
        assert_eq!(ticket.title, "Erro ao exportar");

        // Sem cliente: ticket interno
        let own = service.create(&internal, &ticket_payload(None)).await.unwrap();
        assert_eq!(own.client_id, None);
    }

    #[tokio::test]
    async fn client_users_always_file_for_their_own_client() {
        let store = Arc::new(MemoryWorkItems {
            active_clients: vec![(1, 4), (1, 8)],
            ..Default::default()
        });
        let service = service(store);

        let ticket = service
            .create(&principal(1, Some(4), false), &ticket_payload(Some(8)))
            .await
            .unwrap();
        assert_eq!(ticket.client_id, Some(4));
    }

    #[tokio::test]
    async fn only_tickets_accept_a_client() {
        let service = service(Arc::new(MemoryWorkItems::default()));
        let mut payload = ticket_payload(Some(4));
        payload.kind = WorkItemKind::Epic;
        payload.ticket_type = None;

        assert!(matches!(
            service.create(&principal(1, None, true), &payload).await,
            Err(AppError::InvalidInput(_))
        ));
    }
}
