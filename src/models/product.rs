// src/models/product.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub tenant_id: i64,
    #[schema(example = "Tasklets")]
    pub name: String,
    // Prefixo de toda chave de issue do produto (ex: "TSKLTS")
    #[schema(example = "TSKLTS")]
    pub code: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Uma linha por (produto, tipo de issue). `next_num` nunca diminui.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductSequence {
    pub product_id: i64,
    pub issue_type: String,
    pub next_num: i64,
    pub updated_at: DateTime<Utc>,
}

// ---
// Tipos de issue e suas letras (contrato externo)
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    Epic,
    Feature,
    Task,
    Bug,
    Support,
    FeatureRequest,
    Spike,
    Note,
}

impl IssueType {
    pub const ALL: [IssueType; 8] = [
        IssueType::Epic,
        IssueType::Feature,
        IssueType::Task,
        IssueType::Bug,
        IssueType::Support,
        IssueType::FeatureRequest,
        IssueType::Spike,
        IssueType::Note,
    ];

    pub fn letter(self) -> char {
        match self {
            IssueType::Epic => 'E',
            IssueType::Feature => 'F',
            IssueType::Task => 'T',
            IssueType::Bug => 'B',
            IssueType::Support => 'S',
            IssueType::FeatureRequest => 'R',
            IssueType::Spike => 'K',
            IssueType::Note => 'N',
        }
    }

    pub fn from_letter(letter: char) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.letter() == letter)
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

// Aceita tanto a letra ("T") quanto o nome ("task") na rota
impl FromStr for IssueType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Self::from_letter(c.to_ascii_uppercase()).ok_or(());
        }
        serde_json::from_value(serde_json::Value::String(s.to_ascii_lowercase())).map_err(|_| ())
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AllocatedKey {
    #[schema(example = "TSKLTS-E007")]
    pub key: String,
}
