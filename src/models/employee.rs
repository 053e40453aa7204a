// src/models/employee.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{common::error::AppError, middleware::i18n::Locale, models::auth::UserRole};

// Cabeçalhos obrigatórios do CSV de importação
pub const REQUIRED_CSV_HEADERS: [&str; 5] = ["full_name", "email", "password", "position", "role"];

// Valor usado pela planilha para "sem grupo"
pub const NO_GROUP: &str = "no-group";

// Uma linha crua do CSV. Tudo opcional: a validação acontece linha a linha.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CsvEmployeeRow {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
}

// Funcionário pronto para ser criado (senha ainda em texto puro)
#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeDraft {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub position: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub group_id: Option<Uuid>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}

// O que de fato vai para o banco
#[derive(Debug, Clone)]
pub struct NewEmployee {
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub position: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub group_id: Option<Uuid>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}

/// Motivos pelos quais uma linha do CSV é recusada.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportRowIssue {
    MissingFields,
    PasswordTooShort,
    UnknownRole(String),
    InvalidGroupId(String),
    InvalidDate(String),
    Malformed(String),
}

// Falha de uma linha (guarda o erro original para traduzir depois)
#[derive(Debug)]
pub struct RowFailure {
    pub line: usize,
    pub email: Option<String>,
    pub error: AppError,
}

// Resultado acumulado da fila de importação
#[derive(Debug, Default)]
pub struct ImportReport {
    pub total: usize,
    pub succeeded: usize,
    pub failures: Vec<RowFailure>,
}

impl ImportReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn into_summary(self, locale: &Locale) -> ImportSummary {
        let failed = self.failed();
        ImportSummary {
            total: self.total,
            succeeded: self.succeeded,
            failed,
            failures: self
                .failures
                .into_iter()
                .map(|f| ImportFailure {
                    line: f.line,
                    email: f.email,
                    reason: f.error.localized_message(locale),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<ImportFailure>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportFailure {
    /// Linha da planilha (o cabeçalho é a linha 1).
    pub line: usize,
    pub email: Option<String>,
    pub reason: String,
}
