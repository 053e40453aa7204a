// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::login,

        // --- Users ---
        handlers::auth::get_me,

        // --- Dashboard ---
        handlers::dashboard::get_stats,
        handlers::dashboard::live,
        handlers::dashboard::change_live_filter,
        handlers::dashboard::get_sales_trend,
        handlers::dashboard::get_top_groups,
        handlers::dashboard::get_accounts,
        handlers::dashboard::get_ranking,

        // --- Employees ---
        handlers::employees::import_employees,

        // --- Settings ---
        handlers::settings::get_theme,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::UserRole,
            models::auth::User,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,

            // --- DASHBOARD ---
            models::dashboard::PeriodWindow,
            models::dashboard::MetricSnapshot,
            models::dashboard::TrendResult,
            models::dashboard::DashboardTrends,
            models::dashboard::DerivedRatios,
            models::dashboard::DashboardStats,
            models::dashboard::DailyTrendPoint,
            models::dashboard::GroupSales,
            models::dashboard::PlatformCount,
            models::dashboard::EmployeePerformance,
            models::dashboard::EmployeeRanking,

            // --- Employees ---
            models::employee::ImportSummary,
            models::employee::ImportFailure,

            // --- Settings ---
            models::settings::Theme,
            models::settings::ThemeSettings,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação"),
        (name = "Users", description = "Dados do Usuário e Perfil"),
        (name = "Dashboard", description = "Indicadores do período comparados ao período anterior"),
        (name = "Employees", description = "Importação de Funcionários"),
        (name = "Settings", description = "Configurações da Interface")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
