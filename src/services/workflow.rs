// src/services/workflow.rs
//
// Máquina de estados dos itens de trabalho. Cada tipo tem sua própria tabela
// de transições; estados terminais não aceitam mais nenhuma transição.

use chrono::{DateTime, Utc};
use std::fmt::Debug;

use crate::{
    common::error::AppError,
    models::work_item::{Milestones, Resolution, WorkItemKind},
};

/// Marcos que recebem um carimbo de data uma única vez.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Milestone {
    BrainstormStarted,
    Solidified,
    ImplementationStarted,
    Completed,
}

/// Contrato de cada enumeração de status.
pub trait Lifecycle: Copy + Eq + Debug + 'static {
    const ENTITY: &'static str;
    const ALL: &'static [Self];
    const INITIAL: Self;

    fn as_str(self) -> &'static str;

    /// Arestas declaradas a partir deste status.
    fn next(self) -> &'static [Self];

    fn milestone(self) -> Option<Milestone> {
        None
    }

    /// Status alcançado pela ação explícita de "encerrar", se existir.
    fn close_target() -> Option<Self> {
        None
    }

    /// A ação de encerrar é aceita a partir deste status?
    fn can_close_from(self) -> bool {
        Self::close_target().is_some_and(|target| self.next().contains(&target))
    }

    fn is_terminal(self) -> bool {
        self.next().is_empty()
    }

    fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|status| status.as_str() == s)
    }
}

// =============================================================================
//  TABELAS DE TRANSIÇÃO
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequirementStatus {
    Draft,
    Brainstorm,
    Solidified,
    Approved,
    InDevelopment,
    Implemented,
    Cancelled,
}

impl Lifecycle for RequirementStatus {
    const ENTITY: &'static str = "requirement";
    const INITIAL: Self = RequirementStatus::Draft;
    const ALL: &'static [Self] = &[
        RequirementStatus::Draft,
        RequirementStatus::Brainstorm,
        RequirementStatus::Solidified,
        RequirementStatus::Approved,
        RequirementStatus::InDevelopment,
        RequirementStatus::Implemented,
        RequirementStatus::Cancelled,
    ];

    fn as_str(self) -> &'static str {
        match self {
            RequirementStatus::Draft => "draft",
            RequirementStatus::Brainstorm => "brainstorm",
            RequirementStatus::Solidified => "solidified",
            RequirementStatus::Approved => "approved",
            RequirementStatus::InDevelopment => "in_development",
            RequirementStatus::Implemented => "implemented",
            RequirementStatus::Cancelled => "cancelled",
        }
    }

    fn next(self) -> &'static [Self] {
        use RequirementStatus::*;
        match self {
            Draft => &[Brainstorm, Cancelled],
            Brainstorm => &[Draft, Solidified, Cancelled],
            Solidified => &[Brainstorm, Approved, Cancelled],
            Approved => &[InDevelopment, Cancelled],
            InDevelopment => &[Implemented, Cancelled],
            Implemented | Cancelled => &[],
        }
    }

    fn milestone(self) -> Option<Milestone> {
        match self {
            RequirementStatus::Brainstorm => Some(Milestone::BrainstormStarted),
            RequirementStatus::Solidified => Some(Milestone::Solidified),
            RequirementStatus::InDevelopment => Some(Milestone::ImplementationStarted),
            RequirementStatus::Implemented => Some(Milestone::Completed),
            _ => None,
        }
    }

    fn close_target() -> Option<Self> {
        Some(RequirementStatus::Cancelled)
    }
}

/// Status compartilhado por Epic e Feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlanningStatus {
    Backlog,
    Planned,
    InProgress,
    Review,
    Cancelled,
}

impl Lifecycle for PlanningStatus {
    const ENTITY: &'static str = "epic/feature";
    const INITIAL: Self = PlanningStatus::Backlog;
    const ALL: &'static [Self] = &[
        PlanningStatus::Backlog,
        PlanningStatus::Planned,
        PlanningStatus::InProgress,
        PlanningStatus::Review,
        PlanningStatus::Cancelled,
    ];

    fn as_str(self) -> &'static str {
        match self {
            PlanningStatus::Backlog => "backlog",
            PlanningStatus::Planned => "planned",
            PlanningStatus::InProgress => "in_progress",
            PlanningStatus::Review => "review",
            PlanningStatus::Cancelled => "cancelled",
        }
    }

    fn next(self) -> &'static [Self] {
        use PlanningStatus::*;
        match self {
            Backlog => &[Planned],
            Planned => &[Backlog, InProgress],
            InProgress => &[Planned, Review],
            Review => &[InProgress],
            Cancelled => &[],
        }
    }

    fn milestone(self) -> Option<Milestone> {
        match self {
            PlanningStatus::InProgress => Some(Milestone::ImplementationStarted),
            _ => None,
        }
    }

    fn close_target() -> Option<Self> {
        Some(PlanningStatus::Cancelled)
    }

    // "cancelled" fica fora da tabela: só a ação de encerrar chega lá
    fn can_close_from(self) -> bool {
        self != PlanningStatus::Cancelled
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DevTaskStatus {
    Todo,
    InProgress,
    Blocked,
    Review,
    Done,
    Cancelled,
}

impl Lifecycle for DevTaskStatus {
    const ENTITY: &'static str = "dev_task";
    const INITIAL: Self = DevTaskStatus::Todo;
    const ALL: &'static [Self] = &[
        DevTaskStatus::Todo,
        DevTaskStatus::InProgress,
        DevTaskStatus::Blocked,
        DevTaskStatus::Review,
        DevTaskStatus::Done,
        DevTaskStatus::Cancelled,
    ];

    fn as_str(self) -> &'static str {
        match self {
            DevTaskStatus::Todo => "todo",
            DevTaskStatus::InProgress => "in_progress",
            DevTaskStatus::Blocked => "blocked",
            DevTaskStatus::Review => "review",
            DevTaskStatus::Done => "done",
            DevTaskStatus::Cancelled => "cancelled",
        }
    }

    fn next(self) -> &'static [Self] {
        use DevTaskStatus::*;
        match self {
            Todo => &[InProgress, Cancelled],
            InProgress => &[Todo, Blocked, Review, Cancelled],
            Blocked => &[InProgress, Cancelled],
            Review => &[InProgress, Done, Cancelled],
            Done | Cancelled => &[],
        }
    }

    fn milestone(self) -> Option<Milestone> {
        match self {
            DevTaskStatus::InProgress => Some(Milestone::ImplementationStarted),
            DevTaskStatus::Done => Some(Milestone::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TicketStatus {
    Open,
    InProgress,
    WaitingOnClient,
    Resolved,
    Closed,
}

impl Lifecycle for TicketStatus {
    const ENTITY: &'static str = "ticket";
    const INITIAL: Self = TicketStatus::Open;
    const ALL: &'static [Self] = &[
        TicketStatus::Open,
        TicketStatus::InProgress,
        TicketStatus::WaitingOnClient,
        TicketStatus::Resolved,
        TicketStatus::Closed,
    ];

    fn as_str(self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::WaitingOnClient => "waiting_on_client",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
        }
    }

    fn next(self) -> &'static [Self] {
        use TicketStatus::*;
        match self {
            Open => &[InProgress, WaitingOnClient, Resolved, Closed],
            InProgress => &[Open, WaitingOnClient, Resolved],
            WaitingOnClient => &[InProgress, Resolved, Closed],
            Resolved => &[Open, Closed],
            Closed => &[],
        }
    }

    fn milestone(self) -> Option<Milestone> {
        match self {
            TicketStatus::InProgress => Some(Milestone::ImplementationStarted),
            TicketStatus::Resolved => Some(Milestone::Completed),
            _ => None,
        }
    }
}

// =============================================================================
//  TRANSIÇÃO
// =============================================================================

/// Campos derivados que acompanham o novo status na mesma escrita.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedFields {
    pub milestones: Milestones,
    pub resolution: Option<Resolution>,
    pub resolution_note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition<S> {
    pub next_status: S,
    pub derived: DerivedFields,
}

fn illegal<S: Lifecycle>(current: S, requested: &str) -> AppError {
    AppError::IllegalTransition {
        entity: S::ENTITY,
        from: current.as_str().to_string(),
        to: requested.to_string(),
        allowed: current.next().iter().map(|s| s.as_str().to_string()).collect(),
    }
}

fn stamp(slot: &mut Option<DateTime<Utc>>, now: DateTime<Utc>) {
    if slot.is_none() {
        *slot = Some(now);
    }
}

/// Valida `current -> requested` contra a tabela e calcula os campos derivados.
pub fn transition<S: Lifecycle>(
    current: S,
    requested: S,
    resolution: Option<Resolution>,
    resolution_note: Option<&str>,
    existing: &Milestones,
    now: DateTime<Utc>,
) -> Result<Transition<S>, AppError> {
    if !current.next().contains(&requested) {
        return Err(illegal(current, requested.as_str()));
    }

    Ok(enter(requested, resolution, resolution_note, existing, now))
}

/// Campos derivados da entrada em `requested` (já validada).
fn enter<S: Lifecycle>(
    requested: S,
    resolution: Option<Resolution>,
    resolution_note: Option<&str>,
    existing: &Milestones,
    now: DateTime<Utc>,
) -> Transition<S> {
    // Carimbos set-once: reentrar no status nunca sobrescreve
    let mut milestones = existing.clone();
    match requested.milestone() {
        Some(Milestone::BrainstormStarted) => stamp(&mut milestones.brainstorm_started_at, now),
        Some(Milestone::Solidified) => stamp(&mut milestones.solidified_at, now),
        Some(Milestone::ImplementationStarted) => {
            stamp(&mut milestones.implementation_started_at, now)
        }
        Some(Milestone::Completed) => stamp(&mut milestones.completed_at, now),
        None => {}
    }

    let (resolution, resolution_note) = if requested.is_terminal() {
        stamp(&mut milestones.closed_at, now);
        if resolution == Some(Resolution::Completed) {
            stamp(&mut milestones.completed_at, now);
        }
        (resolution, resolution_note.map(str::to_string))
    } else {
        (None, None)
    };

    Transition {
        next_status: requested,
        derived: DerivedFields { milestones, resolution, resolution_note },
    }
}

/// Ação explícita de encerrar: exige resolução e vai para o status de fechamento.
pub fn close<S: Lifecycle>(
    current: S,
    resolution: Option<Resolution>,
    resolution_note: Option<&str>,
    existing: &Milestones,
    now: DateTime<Utc>,
) -> Result<Transition<S>, AppError> {
    let target = S::close_target().ok_or_else(|| illegal(current, "close"))?;
    if !current.can_close_from() {
        return Err(illegal(current, target.as_str()));
    }
    if resolution.is_none() {
        return Err(AppError::MissingResolution(S::ENTITY));
    }
    Ok(enter(target, resolution, resolution_note, existing, now))
}

// =============================================================================
//  DESPACHO POR TIPO (status em texto vindo do banco / da rota)
// =============================================================================

/// Resultado com o status já serializado para gravação.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub next_status: &'static str,
    pub derived: DerivedFields,
}

fn parse_current<S: Lifecycle>(current: &str) -> Result<S, AppError> {
    S::parse(current).ok_or_else(|| {
        anyhow::anyhow!("status '{}' desconhecido para {}", current, S::ENTITY).into()
    })
}

fn apply_as<S: Lifecycle>(
    current: &str,
    requested: &str,
    resolution: Option<Resolution>,
    resolution_note: Option<&str>,
    existing: &Milestones,
    now: DateTime<Utc>,
) -> Result<StatusChange, AppError> {
    let current = parse_current::<S>(current)?;
    let requested = S::parse(requested).ok_or_else(|| illegal(current, requested))?;
    let t = transition(current, requested, resolution, resolution_note, existing, now)?;
    Ok(StatusChange { next_status: t.next_status.as_str(), derived: t.derived })
}

fn close_as<S: Lifecycle>(
    current: &str,
    resolution: Option<Resolution>,
    resolution_note: Option<&str>,
    existing: &Milestones,
    now: DateTime<Utc>,
) -> Result<StatusChange, AppError> {
    let current = parse_current::<S>(current)?;
    let t = close(current, resolution, resolution_note, existing, now)?;
    Ok(StatusChange { next_status: t.next_status.as_str(), derived: t.derived })
}

fn allowed_as<S: Lifecycle>(current: &str) -> Result<Vec<&'static str>, AppError> {
    let current = parse_current::<S>(current)?;
    Ok(current.next().iter().map(|s| s.as_str()).collect())
}

pub fn initial_status(kind: WorkItemKind) -> &'static str {
    match kind {
        WorkItemKind::Requirement => RequirementStatus::INITIAL.as_str(),
        WorkItemKind::Epic | WorkItemKind::Feature => PlanningStatus::INITIAL.as_str(),
        WorkItemKind::DevTask => DevTaskStatus::INITIAL.as_str(),
        WorkItemKind::Ticket => TicketStatus::INITIAL.as_str(),
    }
}

pub fn apply(
    kind: WorkItemKind,
    current: &str,
    requested: &str,
    resolution: Option<Resolution>,
    resolution_note: Option<&str>,
    existing: &Milestones,
    now: DateTime<Utc>,
) -> Result<StatusChange, AppError> {
    match kind {
        WorkItemKind::Requirement => apply_as::<RequirementStatus>(
            current, requested, resolution, resolution_note, existing, now,
        ),
        WorkItemKind::Epic | WorkItemKind::Feature => apply_as::<PlanningStatus>(
            current, requested, resolution, resolution_note, existing, now,
        ),
        WorkItemKind::DevTask => apply_as::<DevTaskStatus>(
            current, requested, resolution, resolution_note, existing, now,
        ),
        WorkItemKind::Ticket => apply_as::<TicketStatus>(
            current, requested, resolution, resolution_note, existing, now,
        ),
    }
}

pub fn apply_close(
    kind: WorkItemKind,
    current: &str,
    resolution: Option<Resolution>,
    resolution_note: Option<&str>,
    existing: &Milestones,
    now: DateTime<Utc>,
) -> Result<StatusChange, AppError> {
    match kind {
        WorkItemKind::Requirement => {
            close_as::<RequirementStatus>(current, resolution, resolution_note, existing, now)
        }
        WorkItemKind::Epic | WorkItemKind::Feature => {
            close_as::<PlanningStatus>(current, resolution, resolution_note, existing, now)
        }
        WorkItemKind::DevTask => {
            close_as::<DevTaskStatus>(current, resolution, resolution_note, existing, now)
        }
        WorkItemKind::Ticket => {
            close_as::<TicketStatus>(current, resolution, resolution_note, existing, now)
        }
    }
}

pub fn allowed_next(kind: WorkItemKind, current: &str) -> Result<Vec<&'static str>, AppError> {
    match kind {
        WorkItemKind::Requirement => allowed_as::<RequirementStatus>(current),
        WorkItemKind::Epic | WorkItemKind::Feature => allowed_as::<PlanningStatus>(current),
        WorkItemKind::DevTask => allowed_as::<DevTaskStatus>(current),
        WorkItemKind::Ticket => allowed_as::<TicketStatus>(current),
    }
}
