// src/common/db_utils.rs

use crate::common::error::AppError;

// ---
// Helper: converte violação de chave única em um erro mais amigável
// ---
pub(crate) fn unique_violation_as_conflict(e: sqlx::Error, message: &str) -> AppError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return AppError::Conflict(message.to_string());
        }
    }
    e.into()
}

/// Formata um número com no mínimo três dígitos (7 -> "007", 1234 -> "1234").
pub(crate) fn zero_pad(number: i64) -> String {
    format!("{:03}", number)
}
