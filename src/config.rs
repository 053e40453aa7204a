// src/config.rs

use std::{env, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{anyhow, Context};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{DashboardRepository, EmployeeRepository, UserRepository},
    models::settings::Theme,
    services::{
        auth::AuthService, dashboard_monitor::LiveSessions,
        dashboard_service::DashboardService, employee_service::EmployeeService,
    },
};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
// Mesmo intervalo da atualização automática do painel (5 minutos)
const DEFAULT_REFRESH_SECS: u64 = 300;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Configuração lida do ambiente (`.env` já carregado pelo main).
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: SocketAddr,
    pub refresh_interval: Duration,
    pub max_connections: u32,
    pub bcrypt_cost: u32,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = lookup("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .context("BIND_ADDR inválido")?;

        let refresh_secs = match lookup("DASHBOARD_REFRESH_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .context("DASHBOARD_REFRESH_SECS deve ser um número de segundos")?,
            None => DEFAULT_REFRESH_SECS,
        };
        if refresh_secs == 0 {
            return Err(anyhow!("DASHBOARD_REFRESH_SECS deve ser maior que zero"));
        }

        let max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(raw) => raw.parse::<u32>().context("DB_MAX_CONNECTIONS inválido")?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let bcrypt_cost = match lookup("BCRYPT_COST") {
            Some(raw) => raw.parse::<u32>().context("BCRYPT_COST inválido")?,
            None => bcrypt::DEFAULT_COST,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr,
            refresh_interval: Duration::from_secs(refresh_secs),
            max_connections,
            bcrypt_cost,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub auth_service: AuthService,
    pub dashboard_service: DashboardService,
    pub employee_service: EmployeeService,
    pub live_sessions: LiveSessions,
    pub theme: Theme,
    pub refresh_interval: Duration,
}

impl AppState {
    pub async fn new(settings: &Settings) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&settings.database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let user_repo = UserRepository::new(db_pool.clone());
        let auth_service = AuthService::new(user_repo, settings.jwt_secret.clone());

        let dashboard_repo = DashboardRepository::new(db_pool.clone());
        let dashboard_service = DashboardService::new(Arc::new(dashboard_repo));

        let employee_repo = EmployeeRepository::new(db_pool.clone());
        let employee_service = EmployeeService::new(Arc::new(employee_repo), settings.bcrypt_cost);

        Ok(Self {
            db_pool,
            auth_service,
            dashboard_service,
            employee_service,
            live_sessions: LiveSessions::default(),
            theme: Theme::default(),
            refresh_interval: settings.refresh_interval,
        })
    }
}
