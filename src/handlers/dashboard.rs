// src/handlers/dashboard.rs

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use chrono::Local;
use futures::{future, stream, Stream, StreamExt};
use tokio::sync::watch;
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::dashboard::{
        DailyTrendPoint, DashboardFilter, DashboardQuery, DashboardState, DashboardStats,
        EmployeeRanking, GroupSales, PlatformCount,
    },
    services::dashboard_monitor::{DashboardMonitor, LiveSessionGuard, RefreshTimer},
};

// Sem datas na query, o período é o mês corrente
fn resolve_filter(query: DashboardQuery, locale: &Locale) -> Result<DashboardFilter, ApiError> {
    query
        .into_filter(Local::now().date_naive())
        .map_err(|e| e.to_api_error(locale))
}

// GET /api/dashboard/stats
#[utoipa::path(
    get,
    path = "/api/dashboard/stats",
    tag = "Dashboard",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Métricas do período atual comparadas ao período anterior", body = DashboardStats),
        (status = 400, description = "Filtro inválido"),
        (status = 401, description = "Não autorizado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_stats(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<DashboardQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = resolve_filter(query, &locale)?;

    let stats = app_state
        .dashboard_service
        .compute_stats(&filter)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(stats)))
}

// O stream é dono do timer e da sessão: quando o cliente desconecta, os dois acabam juntos
struct LiveFeed {
    _timer: RefreshTimer,
    _session: LiveSessionGuard,
    _monitor: Arc<DashboardMonitor>,
    updates: watch::Receiver<DashboardState>,
}

fn state_event(state: &DashboardState) -> Event {
    Event::default()
        .event("dashboard")
        .json_data(state)
        .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()))
}

// GET /api/dashboard/live
#[utoipa::path(
    get,
    path = "/api/dashboard/live",
    tag = "Dashboard",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Stream SSE: primeiro um evento `session` com o id da sessão, depois eventos `dashboard` com o estado (loading/ready/failed), atualizado periodicamente", content_type = "text/event-stream", body = String),
        (status = 400, description = "Filtro inválido"),
        (status = 401, description = "Não autorizado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn live(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<DashboardQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let filter = resolve_filter(query, &locale)?;

    let monitor = DashboardMonitor::new(app_state.dashboard_service.clone(), filter, locale);
    let updates = monitor.subscribe();
    let session = app_state.live_sessions.register(user.id, &monitor);
    let timer = monitor.start(app_state.refresh_interval);

    tracing::debug!(session = %session.id(), group = %filter.group, "Dashboard ao vivo conectado");

    let opened = Event::default().event("session").data(session.id().to_string());
    let feed = LiveFeed {
        _timer: timer,
        _session: session,
        _monitor: monitor,
        updates,
    };

    let updates = stream::unfold(feed, |mut feed| async move {
        feed.updates.changed().await.ok()?;
        let event = state_event(&feed.updates.borrow_and_update());
        Some((Ok::<_, Infallible>(event), feed))
    });
    let events = stream::once(future::ready(Ok::<_, Infallible>(opened))).chain(updates);

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

// PUT /api/dashboard/live/{session_id}
#[utoipa::path(
    put,
    path = "/api/dashboard/live/{session_id}",
    tag = "Dashboard",
    params(
        ("session_id" = Uuid, Path, description = "Id recebido no evento `session` do stream"),
        DashboardQuery
    ),
    responses(
        (status = 202, description = "Filtro trocado; o stream publica loading e depois o novo estado"),
        (status = 400, description = "Filtro inválido"),
        (status = 401, description = "Não autorizado"),
        (status = 404, description = "Sessão encerrada ou de outro usuário")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn change_live_filter(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(session_id): Path<Uuid>,
    Query(query): Query<DashboardQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = resolve_filter(query, &locale)?;

    app_state
        .live_sessions
        .change_filter(session_id, user.id, filter)
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(StatusCode::ACCEPTED)
}

// GET /api/dashboard/sales-trend
#[utoipa::path(
    get,
    path = "/api/dashboard/sales-trend",
    tag = "Dashboard",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Omzet e comissão paga por dia do período", body = Vec<DailyTrendPoint>),
        (status = 400, description = "Filtro inválido")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_sales_trend(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<DashboardQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = resolve_filter(query, &locale)?;

    let points = app_state
        .dashboard_service
        .sales_trend(&filter)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(points)))
}

// GET /api/dashboard/top-groups
#[utoipa::path(
    get,
    path = "/api/dashboard/top-groups",
    tag = "Dashboard",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Os 5 grupos com maior omzet", body = Vec<GroupSales>)
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_top_groups(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<DashboardQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = resolve_filter(query, &locale)?;

    let groups = app_state
        .dashboard_service
        .top_groups(&filter)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(groups)))
}

// GET /api/dashboard/accounts
#[utoipa::path(
    get,
    path = "/api/dashboard/accounts",
    tag = "Dashboard",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Contas por plataforma (Shopee e TikTok) do grupo", body = Vec<PlatformCount>),
        (status = 400, description = "Filtro inválido")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_accounts(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<DashboardQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = resolve_filter(query, &locale)?;

    let platforms = app_state
        .dashboard_service
        .account_platforms(filter.group)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(platforms)))
}

// GET /api/dashboard/ranking
#[utoipa::path(
    get,
    path = "/api/dashboard/ranking",
    tag = "Dashboard",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Ranking de KPI dos funcionários; para staff, só a equipe staff e a própria linha em `myKpi`", body = EmployeeRanking)
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_ranking(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<DashboardQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = resolve_filter(query, &locale)?;

    let ranking = app_state
        .dashboard_service
        .employee_ranking(&filter, &user)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(ranking)))
}
