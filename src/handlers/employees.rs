// src/handlers/employees.rs

use axum::{body::Bytes, extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{ManageEmployees, RequireRole},
    },
    models::employee::ImportSummary,
};

// POST /api/employees/import
#[utoipa::path(
    post,
    path = "/api/employees/import",
    tag = "Employees",
    request_body(
        content = String,
        content_type = "text/csv",
        description = "Cabeçalho: full_name,email,password,position,role[,phone,group_id,address,date_of_birth]"
    ),
    responses(
        (status = 200, description = "Resumo da importação (linhas com falha listadas)", body = ImportSummary),
        (status = 400, description = "CSV sem os cabeçalhos obrigatórios"),
        (status = 401, description = "Não autorizado"),
        (status = 403, description = "Papel sem permissão")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn import_employees(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    _gate: RequireRole<ManageEmployees>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(user_id = %user.id, bytes = body.len(), "Importação de funcionários iniciada");

    let report = app_state
        .employee_service
        .import_csv(&body)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(report.into_summary(&locale))))
}
