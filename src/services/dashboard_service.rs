// src/services/dashboard_service.rs

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::{
    common::error::AppError,
    db::MetricsSource,
    models::{
        auth::{User, UserRole},
        dashboard::{
            CountableEntity, DailyTrendPoint, DashboardFilter, DashboardStats, EmployeeRanking,
            GroupSelector, GroupSales, PeriodWindow, PlatformCount, RankingScope,
        },
    },
    services::metrics::{self, EntityCounts, PeriodTotals},
};

// Quantos grupos aparecem no gráfico de barras
const TOP_GROUPS_LIMIT: usize = 5;

// O ranking busca metas a partir de 30 dias antes do início do período
const RANKING_LOOKBACK_DAYS: i64 = 30;

#[derive(Clone)]
pub struct DashboardService {
    source: Arc<dyn MetricsSource>,
}

impl DashboardService {
    pub fn new(source: Arc<dyn MetricsSource>) -> Self {
        Self { source }
    }

    /// Um ciclo completo: período anterior, leituras em paralelo, somas e tendências.
    /// Qualquer falha de leitura aborta o ciclo inteiro.
    pub async fn compute_stats(&self, filter: &DashboardFilter) -> Result<DashboardStats, AppError> {
        let current_window = filter.window;
        let previous_window = metrics::derive_previous_period(&current_window)?;
        let group = filter.group;
        let source = self.source.as_ref();

        let (
            current_sales,
            current_commissions,
            current_expenses,
            previous_sales,
            previous_commissions,
            previous_expenses,
            employees,
            groups,
            active_accounts,
        ) = tokio::try_join!(
            source.sales_reports(current_window, group),
            source.commission_records(current_window, group),
            source.expense_records(current_window, group),
            source.sales_reports(previous_window, group),
            source.commission_records(previous_window, group),
            source.expense_records(previous_window, group),
            // Contagens sem filtro de período/grupo (mantido assim de propósito)
            source.count(CountableEntity::Employees),
            source.count(CountableEntity::Groups),
            source.count(CountableEntity::ActiveAccounts),
        )
            .inspect_err(|e| {
                tracing::error!(
                    group = %group,
                    start = %current_window.start(),
                    end = %current_window.end(),
                    "Falha ao buscar dados do dashboard: {}",
                    e
                )
            })?;

        let current = PeriodTotals::aggregate(&current_sales, &current_commissions, &current_expenses);
        let previous = PeriodTotals::aggregate(&previous_sales, &previous_commissions, &previous_expenses);
        let counts = EntityCounts { employees, groups, active_accounts };

        tracing::debug!(
            group = %group,
            current_rows = current_sales.len() + current_commissions.len() + current_expenses.len(),
            previous_rows = previous_sales.len() + previous_commissions.len() + previous_expenses.len(),
            "Ciclo do dashboard agregado"
        );

        Ok(metrics::build_stats(filter, previous_window, current, previous, counts, Utc::now()))
    }

    // Gráfico de linha: omzet e comissão paga por dia
    pub async fn sales_trend(&self, filter: &DashboardFilter) -> Result<Vec<DailyTrendPoint>, AppError> {
        let (sales, commissions) = tokio::try_join!(
            self.source.sales_reports(filter.window, filter.group),
            self.source.commission_records(filter.window, filter.group),
        )?;

        Ok(metrics::daily_trend(&filter.window, &sales, &commissions))
    }

    // Os grupos com maior omzet no período
    pub async fn top_groups(&self, filter: &DashboardFilter) -> Result<Vec<GroupSales>, AppError> {
        let sales = self.source.sales_reports(filter.window, filter.group).await?;
        Ok(metrics::top_groups(&sales, TOP_GROUPS_LIMIT))
    }

    // Gráfico de contas por plataforma; só o grupo do filtro importa
    pub async fn account_platforms(&self, group: GroupSelector) -> Result<Vec<PlatformCount>, AppError> {
        let accounts = self.source.accounts(group).await?;
        Ok(metrics::platform_breakdown(&accounts))
    }

    /// Ranking de KPI visto por `viewer`. Quem é `staff` só se compara com a
    /// equipe `staff` e recebe também a própria linha em `my_kpi`.
    pub async fn employee_ranking(
        &self,
        filter: &DashboardFilter,
        viewer: &User,
    ) -> Result<EmployeeRanking, AppError> {
        let lookback_start = filter
            .window
            .start()
            .checked_sub_signed(Duration::days(RANKING_LOOKBACK_DAYS))
            .unwrap_or(filter.window.start());
        let target_window = PeriodWindow::new(lookback_start, filter.window.end())?;

        // O omzet dos relatórios não é filtrado por grupo: o cruzamento é por funcionário
        let scope = RankingScope::for_viewer(viewer.role, filter.group);
        let (targets, sales) = tokio::try_join!(
            self.source.kpi_targets(target_window.start(), target_window.end(), scope),
            self.source.sales_reports(filter.window, GroupSelector::All),
        )?;

        let own_employee = match viewer.role {
            UserRole::Staff => targets
                .iter()
                .find(|t| t.user_id == viewer.id)
                .map(|t| t.employee_id),
            _ => None,
        };

        let report_sales = metrics::sales_by_employee(&sales);
        let ranking = metrics::rank_employees(targets, &report_sales);
        let my_kpi = own_employee
            .and_then(|id| ranking.iter().find(|entry| entry.employee_id == id))
            .cloned();

        Ok(EmployeeRanking { ranking, my_kpi })
    }
}
