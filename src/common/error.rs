use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::{middleware::i18n::Locale, models::employee::ImportRowIssue};

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Intervalo de datas inválido: {0}")]
    InvalidDateRange(String),

    #[error("Seletor de grupo inválido: {0}")]
    InvalidGroupSelector(String),

    #[error("CSV sem os cabeçalhos obrigatórios: {0}")]
    MissingCsvHeaders(String),

    #[error("Erro ao ler o CSV: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Linha de importação inválida: {0:?}")]
    InvalidImportRow(ImportRowIssue),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Sessão ao vivo não encontrada")]
    LiveSessionNotFound,

    #[error("Papel sem permissão; exigido um de: {0}")]
    Forbidden(String),

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

// O erro que de fato vai para o cliente
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::InvalidDateRange(_)
            | AppError::InvalidGroupSelector(_)
            | AppError::MissingCsvHeaders(_)
            | AppError::CsvError(_)
            | AppError::InvalidImportRow(_) => StatusCode::BAD_REQUEST,
            AppError::EmailAlreadyExists => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::UserNotFound | AppError::LiveSessionNotFound => StatusCode::NOT_FOUND,
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Mensagem para o usuário final, no idioma do `Locale`.
    pub fn localized_message(&self, locale: &Locale) -> String {
        match self {
            AppError::ValidationError(_) => locale.pick(
                "One or more fields are invalid.",
                "Satu atau lebih isian tidak valid.",
            ),
            AppError::InvalidDateRange(_) => locale.pick(
                "Invalid date range.",
                "Rentang tanggal tidak valid.",
            ),
            AppError::InvalidGroupSelector(raw) => locale.pick(
                &format!("Unknown group '{}'.", raw),
                &format!("Grup '{}' tidak dikenal.", raw),
            ),
            AppError::MissingCsvHeaders(headers) => locale.pick(
                &format!("The CSV file is missing required headers: {}.", headers),
                &format!("File CSV tidak memiliki header wajib: {}.", headers),
            ),
            AppError::CsvError(_) => locale.pick(
                "Failed to read the CSV file.",
                "Gagal membaca file CSV.",
            ),
            AppError::InvalidImportRow(issue) => issue_message(issue, locale),
            AppError::EmailAlreadyExists => locale.pick(
                "This e-mail is already in use.",
                "Email ini sudah digunakan.",
            ),
            AppError::InvalidCredentials => locale.pick(
                "Invalid e-mail or password.",
                "Email atau Password salah. Mohon periksa kembali.",
            ),
            AppError::InvalidToken => locale.pick(
                "Invalid or missing authentication token.",
                "Token autentikasi tidak valid atau tidak ada.",
            ),
            AppError::UserNotFound => locale.pick(
                "Account not found.",
                "Akun tidak ditemukan. Silakan hubungi Superadmin.",
            ),
            AppError::LiveSessionNotFound => locale.pick(
                "The live dashboard session has ended or does not exist.",
                "Sesi dashboard langsung sudah berakhir atau tidak ada.",
            ),
            AppError::Forbidden(roles) => locale.pick(
                &format!("This action requires one of the roles: {}.", roles),
                &format!("Aksi ini membutuhkan salah satu peran: {}.", roles),
            ),
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => locale.pick(
                "An unexpected error occurred.",
                "Terjadi kesalahan yang tidak terduga.",
            ),
        }
    }

    pub fn to_api_error(self, locale: &Locale) -> ApiError {
        let status = self.status();

        // O `tracing` loga a mensagem detalhada que `thiserror` nos deu.
        if status.is_server_error() {
            tracing::error!("Erro Interno do Servidor: {} ({:?})", self, self);
        }

        let details = match &self {
            AppError::ValidationError(errors) => {
                let mut details = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), json!(messages));
                }
                Some(Value::Object(details))
            }
            AppError::InvalidDateRange(reason) => Some(json!({ "reason": reason })),
            _ => None,
        };

        ApiError {
            status,
            error: self.localized_message(locale),
            details,
        }
    }
}

fn issue_message(issue: &ImportRowIssue, locale: &Locale) -> String {
    match issue {
        ImportRowIssue::MissingFields => locale.pick(
            "Required fields (full_name, email, password, position, role) are incomplete.",
            "Field wajib (full_name, email, password, position, role) tidak lengkap.",
        ),
        ImportRowIssue::PasswordTooShort => locale.pick(
            "Password must be at least 8 characters.",
            "Password minimal 8 karakter.",
        ),
        ImportRowIssue::UnknownRole(role) => locale.pick(
            &format!("Unknown role '{}'; use superadmin, leader, admin, staff or viewer.", role),
            &format!("Peran '{}' tidak dikenal; gunakan superadmin, leader, admin, staff, atau viewer.", role),
        ),
        ImportRowIssue::InvalidGroupId(raw) => locale.pick(
            &format!("Invalid group_id '{}'.", raw),
            &format!("group_id '{}' tidak valid.", raw),
        ),
        ImportRowIssue::InvalidDate(raw) => locale.pick(
            &format!("Invalid date_of_birth '{}' (expected YYYY-MM-DD).", raw),
            &format!("date_of_birth '{}' tidak valid (format YYYY-MM-DD).", raw),
        ),
        ImportRowIssue::Malformed(reason) => locale.pick(
            &format!("Malformed row: {}.", reason),
            &format!("Baris rusak: {}.", reason),
        ),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        err.to_api_error(&Locale::default())
    }
}

// Usado pelos middlewares, que não têm o `Locale` em mãos
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
