// src/models/dashboard.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{common::error::AppError, models::auth::UserRole};

// Maior período aceito numa consulta (um ano bissexto inteiro)
pub const MAX_WINDOW_DAYS: i64 = 366;

// =========================================================================
//  LINHAS LIDAS DO BANCO (somente leitura)
// =========================================================================

// Relatório diário de vendas; o nome do grupo vem do dispositivo dono do relatório
#[derive(Debug, Clone, FromRow)]
pub struct SalesReport {
    pub report_date: NaiveDate,
    pub employee_id: Option<Uuid>,
    pub group_name: Option<String>,
    pub total_sales: Option<Decimal>,
}

// Comissão; o filtro de grupo passa pela conta (loja) que gerou a comissão
#[derive(Debug, Clone, FromRow)]
pub struct CommissionRecord {
    pub payment_date: NaiveDate,
    pub gross_commission: Option<Decimal>,
    pub net_commission: Option<Decimal>,
    pub paid_commission: Option<Decimal>,
}

// Saída de caixa (cashflow com type = 'expense')
#[derive(Debug, Clone, FromRow)]
pub struct ExpenseRecord {
    pub amount: Option<Decimal>,
}

// Conta de loja; só a plataforma interessa ao gráfico
#[derive(Debug, Clone, FromRow)]
pub struct AccountRecord {
    pub platform: String,
}

// Meta mensal de KPI de um funcionário
#[derive(Debug, Clone, FromRow)]
pub struct KpiTargetRow {
    pub employee_id: Uuid,
    pub user_id: Uuid,
    pub employee_role: UserRole,
    pub employee_name: Option<String>,
    pub group_name: Option<String>,
    pub target_month: NaiveDate,
    pub sales_target: Option<Decimal>,
    pub commission_target: Option<Decimal>,
    pub attendance_target: Option<i32>,
    pub actual_sales: Option<Decimal>,
    pub actual_commission: Option<Decimal>,
    pub actual_attendance: Option<i32>,
}

// Entidades contadas sem filtro de período nem de grupo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CountableEntity {
    Employees,
    Groups,
    ActiveAccounts,
}

// =========================================================================
//  FILTROS
// =========================================================================

/// Seletor de grupo: o sentinela `all` não aplica predicado nenhum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupSelector {
    #[default]
    All,
    Group(Uuid),
}

impl GroupSelector {
    pub fn id(&self) -> Option<Uuid> {
        match self {
            GroupSelector::All => None,
            GroupSelector::Group(id) => Some(*id),
        }
    }

    #[cfg(test)]
    pub fn matches(&self, group_id: Option<Uuid>) -> bool {
        match self {
            GroupSelector::All => true,
            GroupSelector::Group(id) => group_id == Some(*id),
        }
    }
}

impl FromStr for GroupSelector {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("all") {
            return Ok(GroupSelector::All);
        }
        Uuid::parse_str(value)
            .map(GroupSelector::Group)
            .map_err(|_| AppError::InvalidGroupSelector(value.to_string()))
    }
}

impl fmt::Display for GroupSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupSelector::All => f.write_str("all"),
            GroupSelector::Group(id) => write!(f, "{}", id),
        }
    }
}

impl Serialize for GroupSelector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Intervalo fechado de datas. Invariante: `end >= start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PeriodWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl PeriodWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, AppError> {
        if end < start {
            return Err(AppError::InvalidDateRange(format!(
                "{} é posterior a {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// O mês calendário inteiro que contém `date`.
    pub fn month_containing(date: NaiveDate) -> Result<Self, AppError> {
        let start = date.with_day(1).ok_or_else(|| AppError::InvalidDateRange(date.to_string()))?;
        let end = start
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .ok_or_else(|| AppError::InvalidDateRange(date.to_string()))?;
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Número de dias do intervalo, contando as duas pontas.
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    #[cfg(test)]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }
}

/// Quais metas entram no ranking: as do grupo filtrado, ou só as da equipe
/// `staff` (visão de quem tem esse papel, independente do grupo).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingScope {
    Group(GroupSelector),
    StaffOnly,
}

impl RankingScope {
    pub fn for_viewer(role: UserRole, group: GroupSelector) -> Self {
        match role {
            UserRole::Staff => RankingScope::StaffOnly,
            _ => RankingScope::Group(group),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardFilter {
    pub window: PeriodWindow,
    pub group: GroupSelector,
}

// Query string comum a todas as rotas do dashboard
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct DashboardQuery {
    /// Início do período (inclusive). Sem datas, usa o mês corrente.
    #[param(value_type = Option<String>, format = Date, example = "2025-11-01")]
    pub start_date: Option<NaiveDate>,
    /// Fim do período (inclusive).
    #[param(value_type = Option<String>, format = Date, example = "2025-11-30")]
    pub end_date: Option<NaiveDate>,
    /// `all` ou o UUID de um grupo.
    #[param(example = "all")]
    pub group_id: Option<String>,
}

impl DashboardQuery {
    pub fn into_filter(self, today: NaiveDate) -> Result<DashboardFilter, AppError> {
        let window = match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => PeriodWindow::new(start, end)?,
            (None, None) => PeriodWindow::month_containing(today)?,
            _ => {
                return Err(AppError::InvalidDateRange(
                    "startDate e endDate devem ser informados juntos".to_string(),
                ));
            }
        };
        if window.len_days() > MAX_WINDOW_DAYS {
            return Err(AppError::InvalidDateRange(format!(
                "o período tem {} dias; o máximo é {}",
                window.len_days(),
                MAX_WINDOW_DAYS
            )));
        }

        let group = match self.group_id.as_deref() {
            Some(raw) => raw.parse()?,
            None => GroupSelector::All,
        };

        Ok(DashboardFilter { window, group })
    }
}

// =========================================================================
//  RESULTADOS DERIVADOS (transitórios)
// =========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetricSnapshot {
    #[schema(value_type = f64)]
    pub gross_revenue: Decimal,
    #[schema(value_type = f64)]
    pub gross_commission: Decimal,
    #[schema(value_type = f64)]
    pub net_commission: Decimal,
    #[schema(value_type = f64)]
    pub paid_commission: Decimal,
    #[schema(value_type = f64)]
    pub total_expenses: Decimal,
    pub total_employees: i64,
    pub total_groups: i64,
    pub active_accounts: i64,
    /// Alias da variação percentual da comissão líquida.
    #[schema(value_type = f64)]
    pub monthly_growth: Decimal,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrendResult {
    #[schema(value_type = f64)]
    pub current: Decimal,
    #[schema(value_type = f64)]
    pub previous: Decimal,
    #[schema(value_type = f64)]
    pub percentage: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardTrends {
    pub gross_revenue: TrendResult,
    pub gross_commission: TrendResult,
    pub net_commission: TrendResult,
    pub paid_commission: TrendResult,
    pub expenses: TrendResult,
}

// Indicadores de apresentação (divisão por zero vira 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DerivedRatios {
    #[schema(value_type = f64)]
    pub profit_margin: Decimal,
    #[schema(value_type = f64)]
    pub conversion_rate: Decimal,
    #[schema(value_type = f64)]
    pub commission_paid_ratio: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub current_period: PeriodWindow,
    pub previous_period: PeriodWindow,
    #[schema(value_type = String, example = "all")]
    pub group: GroupSelector,
    pub metrics: MetricSnapshot,
    pub trends: DashboardTrends,
    pub ratios: DerivedRatios,
}

// Gráfico de linha (um ponto por dia do período)
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailyTrendPoint {
    #[schema(value_type = String, format = Date)]
    pub date: NaiveDate,
    #[schema(value_type = f64)]
    pub sales: Decimal,
    #[schema(value_type = f64)]
    pub commission: Decimal,
}

// Ranking de grupos por omzet
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupSales {
    pub name: String,
    #[schema(value_type = f64)]
    pub sales: Decimal,
}

// Contas por plataforma (gráfico de pizza)
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlatformCount {
    pub name: String,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeePerformance {
    pub employee_id: Uuid,
    pub name: String,
    pub group: String,
    pub role: UserRole,
    #[schema(value_type = f64)]
    pub sales: Decimal,
    #[schema(value_type = f64)]
    pub commission: Decimal,
    #[schema(value_type = f64)]
    pub kpi: Decimal,
    #[schema(value_type = String, format = Date)]
    pub target_month: NaiveDate,
    #[schema(value_type = f64)]
    pub sales_target: Decimal,
    #[schema(value_type = f64)]
    pub commission_target: Decimal,
    pub attendance_target: i32,
    pub actual_attendance: i32,
}

/// Ranking visto por um usuário. `my_kpi` só vem preenchido para `staff`
/// que tenha meta no período.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRanking {
    pub ranking: Vec<EmployeePerformance>,
    pub my_kpi: Option<EmployeePerformance>,
}

// =========================================================================
//  ESTADO DO DASHBOARD AO VIVO
// =========================================================================

/// Idle -> Loading -> {Ready | Failed}. `stale` guarda o último resultado bom.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum DashboardState {
    Idle,
    #[serde(rename_all = "camelCase")]
    Loading {
        generation: u64,
        stale: Option<Box<DashboardStats>>,
    },
    #[serde(rename_all = "camelCase")]
    Ready {
        generation: u64,
        stats: Box<DashboardStats>,
    },
    #[serde(rename_all = "camelCase")]
    Failed {
        generation: u64,
        error: String,
        stale: Option<Box<DashboardStats>>,
    },
}

impl DashboardState {
    pub fn last_good(&self) -> Option<Box<DashboardStats>> {
        match self {
            DashboardState::Idle => None,
            DashboardState::Ready { stats, .. } => Some(stats.clone()),
            DashboardState::Loading { stale, .. } | DashboardState::Failed { stale, .. } => {
                stale.clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn window_rejects_end_before_start() {
        let err = PeriodWindow::new(date(2025, 3, 10), date(2025, 3, 9)).unwrap_err();
        assert!(matches!(err, AppError::InvalidDateRange(_)));
    }

    #[test]
    fn single_day_window_is_valid() {
        let window = PeriodWindow::new(date(2025, 3, 10), date(2025, 3, 10)).unwrap();
        assert_eq!(window.len_days(), 1);
        assert_eq!(window.days().collect::<Vec<_>>(), vec![date(2025, 3, 10)]);
    }

    #[test]
    fn month_containing_handles_december_and_leap_years() {
        let december = PeriodWindow::month_containing(date(2024, 12, 15)).unwrap();
        assert_eq!(december.start(), date(2024, 12, 1));
        assert_eq!(december.end(), date(2024, 12, 31));

        let february = PeriodWindow::month_containing(date(2024, 2, 3)).unwrap();
        assert_eq!(february.end(), date(2024, 2, 29));
    }

    #[test]
    fn group_selector_parses_sentinel_and_uuid() {
        assert_eq!("all".parse::<GroupSelector>().unwrap(), GroupSelector::All);
        assert_eq!("ALL".parse::<GroupSelector>().unwrap(), GroupSelector::All);
        assert_eq!("".parse::<GroupSelector>().unwrap(), GroupSelector::All);

        let id = Uuid::new_v4();
        assert_eq!(id.to_string().parse::<GroupSelector>().unwrap(), GroupSelector::Group(id));

        let err = "grupo-a".parse::<GroupSelector>().unwrap_err();
        assert!(matches!(err, AppError::InvalidGroupSelector(_)));
    }

    #[test]
    fn group_selector_matching() {
        let id = Uuid::new_v4();
        assert!(GroupSelector::All.matches(None));
        assert!(GroupSelector::Group(id).matches(Some(id)));
        assert!(!GroupSelector::Group(id).matches(None));
        assert!(!GroupSelector::Group(id).matches(Some(Uuid::new_v4())));
    }

    #[test]
    fn query_defaults_to_current_month_and_all_groups() {
        let filter = DashboardQuery::default().into_filter(date(2025, 11, 18)).unwrap();
        assert_eq!(filter.window.start(), date(2025, 11, 1));
        assert_eq!(filter.window.end(), date(2025, 11, 30));
        assert_eq!(filter.group, GroupSelector::All);
    }

    #[test]
    fn query_with_only_one_date_is_rejected() {
        let query = DashboardQuery {
            start_date: Some(date(2025, 11, 1)),
            ..Default::default()
        };
        assert!(matches!(
            query.into_filter(date(2025, 11, 18)),
            Err(AppError::InvalidDateRange(_))
        ));
    }

    #[test]
    fn query_window_longer_than_a_year_is_rejected() {
        let query = DashboardQuery {
            start_date: Some(date(1, 1, 1)),
            end_date: Some(date(9999, 12, 31)),
            ..Default::default()
        };
        assert!(matches!(
            query.into_filter(date(2025, 11, 18)),
            Err(AppError::InvalidDateRange(_))
        ));

        let two_years = DashboardQuery {
            start_date: Some(date(2024, 1, 1)),
            end_date: Some(date(2025, 12, 31)),
            ..Default::default()
        };
        assert!(two_years.into_filter(date(2025, 11, 18)).is_err());
    }

    #[test]
    fn query_window_of_a_leap_year_is_accepted() {
        let query = DashboardQuery {
            start_date: Some(date(2024, 1, 1)),
            end_date: Some(date(2024, 12, 31)),
            ..Default::default()
        };
        let filter = query.into_filter(date(2025, 11, 18)).unwrap();
        assert_eq!(filter.window.len_days(), MAX_WINDOW_DAYS);
    }

    #[test]
    fn staff_viewers_rank_against_staff_only() {
        let group = GroupSelector::Group(Uuid::new_v4());
        assert_eq!(RankingScope::for_viewer(UserRole::Staff, group), RankingScope::StaffOnly);
        assert_eq!(
            RankingScope::for_viewer(UserRole::Leader, group),
            RankingScope::Group(group)
        );
    }

    #[test]
    fn state_serializes_with_status_tag() {
        let json = serde_json::to_value(DashboardState::Loading { generation: 3, stale: None }).unwrap();
        assert_eq!(json["status"], "loading");
        assert_eq!(json["generation"], 3);
        assert_eq!(serde_json::to_value(DashboardState::Idle).unwrap()["status"], "idle");
    }
}
