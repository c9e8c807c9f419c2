// src/models/work_item.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::models::product::IssueType;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "work_item_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WorkItemKind {
    Requirement,
    Epic,
    Feature,
    DevTask,
    Ticket,
}

impl WorkItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkItemKind::Requirement => "requirement",
            WorkItemKind::Epic => "epic",
            WorkItemKind::Feature => "feature",
            WorkItemKind::DevTask => "dev_task",
            WorkItemKind::Ticket => "ticket",
        }
    }

    /// Tipo de pai exigido na hierarquia (Epic -> Feature -> DevTask).
    pub fn parent_kind(self) -> Option<WorkItemKind> {
        match self {
            WorkItemKind::Feature => Some(WorkItemKind::Epic),
            WorkItemKind::DevTask => Some(WorkItemKind::Feature),
            _ => None,
        }
    }

    /// Letra usada na chave. Tickets dependem do seu próprio tipo.
    pub fn issue_type(self, ticket_type: Option<TicketType>) -> IssueType {
        match self {
            WorkItemKind::Epic => IssueType::Epic,
            WorkItemKind::Feature => IssueType::Feature,
            WorkItemKind::DevTask => IssueType::Task,
            WorkItemKind::Requirement => IssueType::FeatureRequest,
            WorkItemKind::Ticket => ticket_type.unwrap_or(TicketType::Support).issue_type(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "ticket_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketType {
    Bug,
    Support,
    FeatureRequest,
    Spike,
    Note,
}

impl TicketType {
    pub fn issue_type(self) -> IssueType {
        match self {
            TicketType::Bug => IssueType::Bug,
            TicketType::Support => IssueType::Support,
            TicketType::FeatureRequest => IssueType::FeatureRequest,
            TicketType::Spike => IssueType::Spike,
            TicketType::Note => IssueType::Note,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

/// Motivo fixo registrado ao encerrar um item (contrato externo).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "resolution_code", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Completed,
    Duplicate,
    WontDo,
    Moved,
    Invalid,
    Obsolete,
}

// --- Structs de Operação ---

/// Carimbos de data "set-once" mantidos pela máquina de estados.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Milestones {
    pub brainstorm_started_at: Option<DateTime<Utc>>,
    pub solidified_at: Option<DateTime<Utc>>,
    pub implementation_started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkItem {
    pub id: i64,
    #[schema(ignore)]
    pub tenant_id: i64,
    pub product_id: i64,
    pub parent_id: Option<i64>,
    // Apenas tickets pertencem a um cliente
    pub client_id: Option<i64>,
    pub kind: WorkItemKind,
    pub ticket_type: Option<TicketType>,
    #[schema(example = "TSKLTS-E007")]
    pub issue_key: String,
    pub title: String,
    pub description: Option<String>,
    #[schema(example = "draft")]
    pub status: String,
    pub priority: Priority,
    pub resolution: Option<Resolution>,
    pub resolution_note: Option<String>,
    pub brainstorm_started_at: Option<DateTime<Utc>>,
    pub solidified_at: Option<DateTime<Utc>>,
    pub implementation_started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    #[schema(value_type = Object)]
    pub metadata: Option<Value>,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkItem {
    pub fn milestones(&self) -> Milestones {
        Milestones {
            brainstorm_started_at: self.brainstorm_started_at,
            solidified_at: self.solidified_at,
            implementation_started_at: self.implementation_started_at,
            completed_at: self.completed_at,
            closed_at: self.closed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequirementAmendment {
    pub id: i64,
    pub requirement_id: i64,
    #[schema(example = 1)]
    pub amendment_number: i32,
    pub title: String,
    pub description: Option<String>,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
}

// --- Payloads ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkItemPayload {
    pub kind: WorkItemKind,
    pub product_id: i64,
    pub parent_id: Option<i64>,
    // Só para tickets abertos por usuários internos em nome de um cliente
    pub client_id: Option<i64>,
    pub ticket_type: Option<TicketType>,
    #[validate(length(min = 1, max = 300, message = "O título é obrigatório."))]
    #[schema(example = "Exportar relatório em PDF")]
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    #[schema(value_type = Object)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitionPayload {
    #[schema(example = "brainstorm")]
    pub status: String,
    pub resolution: Option<Resolution>,
    pub resolution_note: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClosePayload {
    pub resolution: Option<Resolution>,
    pub resolution_note: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAmendmentPayload {
    #[validate(length(min = 1, max = 300, message = "O título é obrigatório."))]
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AllowedTransitions {
    pub current: String,
    pub allowed: Vec<String>,
    pub terminal: bool,
}
