// src/handlers/settings.rs

use axum::{extract::State, Json};

use crate::{config::AppState, models::settings::ThemeSettings};

// GET /api/settings/theme
#[utoipa::path(
    get,
    path = "/api/settings/theme",
    tag = "Settings",
    responses(
        (status = 200, description = "Tema da interface (fixo em light)", body = ThemeSettings)
    )
)]
pub async fn get_theme(State(app_state): State<AppState>) -> Json<ThemeSettings> {
    Json(ThemeSettings { theme: app_state.theme })
}
