// src/db/dashboard_repo.rs

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    models::{
        auth::UserRole,
        dashboard::{
            AccountRecord, CommissionRecord, CountableEntity, ExpenseRecord, GroupSelector,
            KpiTargetRow, PeriodWindow, RankingScope, SalesReport,
        },
    },
};

/// Fonte de leitura do dashboard. Intervalos de datas são inclusivos e
/// `GroupSelector::All` não aplica filtro de grupo.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn sales_reports(
        &self,
        window: PeriodWindow,
        group: GroupSelector,
    ) -> Result<Vec<SalesReport>, AppError>;

    async fn commission_records(
        &self,
        window: PeriodWindow,
        group: GroupSelector,
    ) -> Result<Vec<CommissionRecord>, AppError>;

    async fn expense_records(
        &self,
        window: PeriodWindow,
        group: GroupSelector,
    ) -> Result<Vec<ExpenseRecord>, AppError>;

    /// Contagens sem filtro de período nem de grupo.
    async fn count(&self, entity: CountableEntity) -> Result<i64, AppError>;

    /// Contas de loja do grupo, sem filtro de período.
    async fn accounts(&self, group: GroupSelector) -> Result<Vec<AccountRecord>, AppError>;

    /// Metas com `target_month` entre `from` e `to`, mais recentes primeiro.
    async fn kpi_targets(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        scope: RankingScope,
    ) -> Result<Vec<KpiTargetRow>, AppError>;
}

#[derive(Clone)]
pub struct DashboardRepository {
    pool: PgPool,
}

impl DashboardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetricsSource for DashboardRepository {
    // 1. Relatórios diários (grupo via dispositivo)
    async fn sales_reports(
        &self,
        window: PeriodWindow,
        group: GroupSelector,
    ) -> Result<Vec<SalesReport>, AppError> {
        let rows = sqlx::query_as::<_, SalesReport>(
            r#"
            SELECT
                dr.report_date,
                dr.employee_id,
                g.name AS group_name,
                dr.total_sales
            FROM daily_reports dr
            LEFT JOIN devices d ON d.id = dr.device_id
            LEFT JOIN groups g ON g.id = d.group_id
            WHERE dr.report_date BETWEEN $1 AND $2
              AND ($3::uuid IS NULL OR d.group_id = $3)
            "#,
        )
            .bind(window.start())
            .bind(window.end())
            .bind(group.id())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    // 2. Comissões (grupo via conta)
    async fn commission_records(
        &self,
        window: PeriodWindow,
        group: GroupSelector,
    ) -> Result<Vec<CommissionRecord>, AppError> {
        let rows = sqlx::query_as::<_, CommissionRecord>(
            r#"
            SELECT
                c.payment_date,
                c.gross_commission,
                c.net_commission,
                c.paid_commission
            FROM commissions c
            LEFT JOIN accounts a ON a.id = c.account_id
            WHERE c.payment_date BETWEEN $1 AND $2
              AND ($3::uuid IS NULL OR a.group_id = $3)
            "#,
        )
            .bind(window.start())
            .bind(window.end())
            .bind(group.id())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    // 3. Despesas (cashflow do tipo 'expense')
    async fn expense_records(
        &self,
        window: PeriodWindow,
        group: GroupSelector,
    ) -> Result<Vec<ExpenseRecord>, AppError> {
        let rows = sqlx::query_as::<_, ExpenseRecord>(
            r#"
            SELECT amount
            FROM cashflow
            WHERE type = 'expense'
              AND transaction_date BETWEEN $1 AND $2
              AND ($3::uuid IS NULL OR group_id = $3)
            "#,
        )
            .bind(window.start())
            .bind(window.end())
            .bind(group.id())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    // 4. Contagens simples
    async fn count(&self, entity: CountableEntity) -> Result<i64, AppError> {
        let sql = match entity {
            CountableEntity::Employees => "SELECT COUNT(*) FROM employees",
            CountableEntity::Groups => "SELECT COUNT(*) FROM groups",
            CountableEntity::ActiveAccounts => {
                "SELECT COUNT(*) FROM accounts WHERE account_status = 'active'"
            }
        };

        let total = sqlx::query_scalar::<_, i64>(sql)
            .fetch_one(&self.pool)
            .await?;

        Ok(total)
    }

    // 5. Contas por plataforma
    async fn accounts(&self, group: GroupSelector) -> Result<Vec<AccountRecord>, AppError> {
        let rows = sqlx::query_as::<_, AccountRecord>(
            r#"
            SELECT platform
            FROM accounts
            WHERE ($1::uuid IS NULL OR group_id = $1)
            "#,
        )
            .bind(group.id())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    // 6. Metas de KPI (mais recentes primeiro)
    async fn kpi_targets(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        scope: RankingScope,
    ) -> Result<Vec<KpiTargetRow>, AppError> {
        // Visão de staff: só metas de staff, de qualquer grupo
        let (group, role) = match scope {
            RankingScope::Group(group) => (group.id(), None),
            RankingScope::StaffOnly => (None, Some(UserRole::Staff)),
        };

        let rows = sqlx::query_as::<_, KpiTargetRow>(
            r#"
            SELECT
                k.employee_id,
                e.user_id,
                u.role AS employee_role,
                e.full_name AS employee_name,
                g.name AS group_name,
                k.target_month,
                k.sales_target,
                k.commission_target,
                k.attendance_target,
                k.actual_sales,
                k.actual_commission,
                k.actual_attendance
            FROM kpi_targets k
            JOIN employees e ON e.id = k.employee_id
            JOIN users u ON u.id = e.user_id
            LEFT JOIN groups g ON g.id = e.group_id
            WHERE k.target_month BETWEEN $1 AND $2
              AND ($3::uuid IS NULL OR e.group_id = $3)
              AND ($4::user_role IS NULL OR u.role = $4)
            ORDER BY k.target_month DESC
            "#,
        )
            .bind(from)
            .bind(to)
            .bind(group)
            .bind(role)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }
}
