// src/services/metrics.rs
//
// Cálculos puros do dashboard: período anterior, somatórios, tendências e
// indicadores. Nada aqui acessa o banco.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::dashboard::{
        AccountRecord, CommissionRecord, DailyTrendPoint, DashboardFilter, DashboardStats,
        DashboardTrends, DerivedRatios, EmployeePerformance, ExpenseRecord, GroupSales,
        KpiTargetRow, MetricSnapshot, PeriodWindow, PlatformCount, SalesReport, TrendResult,
    },
};

// Nome usado quando o dispositivo não pertence a nenhum grupo
pub const UNGROUPED_NAME: &str = "Tanpa Grup";

// Plataformas exibidas no gráfico de contas: (valor no banco, rótulo)
const PLATFORMS: [(&str, &str); 2] = [("shopee", "Shopee"), ("tiktok", "TikTok")];

// Pesos do KPI: omzet 50%, comissão 30%, presença 20%
const KPI_SALES_WEIGHT: Decimal = Decimal::from_parts(5, 0, 0, false, 1);
const KPI_COMMISSION_WEIGHT: Decimal = Decimal::from_parts(3, 0, 0, false, 1);
const KPI_ATTENDANCE_WEIGHT: Decimal = Decimal::from_parts(2, 0, 0, false, 1);

/// Janela imediatamente anterior, com a mesma duração e sem sobreposição.
pub fn derive_previous_period(current: &PeriodWindow) -> Result<PeriodWindow, AppError> {
    let span = current.end() - current.start();

    let previous_end = current.start().pred_opt().ok_or_else(|| {
        AppError::InvalidDateRange(format!("não há período anterior a {}", current.start()))
    })?;
    let previous_start = previous_end.checked_sub_signed(span).ok_or_else(|| {
        AppError::InvalidDateRange(format!("período anterior a {} fora do calendário", current.start()))
    })?;

    PeriodWindow::new(previous_start, previous_end)
}

/// Soma um campo numérico; `None` conta como zero.
pub fn sum_by<T>(rows: &[T], field: impl Fn(&T) -> Option<Decimal>) -> Decimal {
    rows.iter().filter_map(field).sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PeriodTotals {
    pub gross_revenue: Decimal,
    pub gross_commission: Decimal,
    pub net_commission: Decimal,
    pub paid_commission: Decimal,
    pub expenses: Decimal,
}

impl PeriodTotals {
    pub fn aggregate(
        sales: &[SalesReport],
        commissions: &[CommissionRecord],
        expenses: &[ExpenseRecord],
    ) -> Self {
        Self {
            gross_revenue: sum_by(sales, |r| r.total_sales),
            gross_commission: sum_by(commissions, |c| c.gross_commission),
            net_commission: sum_by(commissions, |c| c.net_commission),
            paid_commission: sum_by(commissions, |c| c.paid_commission),
            expenses: sum_by(expenses, |e| e.amount),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntityCounts {
    pub employees: i64,
    pub groups: i64,
    pub active_accounts: i64,
}

/// Variação percentual. Partindo de zero: +100 (ou -100 se o atual for negativo).
pub fn trend_percentage(current: Decimal, previous: Decimal) -> Decimal {
    if !previous.is_zero() {
        return (current - previous) / previous * Decimal::ONE_HUNDRED;
    }
    match current.cmp(&Decimal::ZERO) {
        Ordering::Greater => Decimal::ONE_HUNDRED,
        Ordering::Equal => Decimal::ZERO,
        Ordering::Less => -Decimal::ONE_HUNDRED,
    }
}

impl TrendResult {
    pub fn between(current: Decimal, previous: Decimal) -> Self {
        Self {
            current,
            previous,
            percentage: trend_percentage(current, previous),
        }
    }
}

// numerator / denominator * 100, ou 0 quando o denominador não é positivo
fn percent_of(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator > Decimal::ZERO {
        numerator / denominator * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    }
}

pub fn derived_ratios(metrics: &MetricSnapshot) -> DerivedRatios {
    let conversion_rate = if metrics.paid_commission > Decimal::ZERO {
        percent_of(metrics.paid_commission, metrics.gross_commission)
    } else {
        Decimal::ZERO
    };

    DerivedRatios {
        profit_margin: percent_of(
            metrics.net_commission - metrics.total_expenses,
            metrics.net_commission,
        ),
        conversion_rate,
        commission_paid_ratio: percent_of(metrics.paid_commission, metrics.net_commission),
    }
}

/// Monta o resultado completo de um ciclo a partir dos escalares já somados.
pub fn build_stats(
    filter: &DashboardFilter,
    previous_period: PeriodWindow,
    current: PeriodTotals,
    previous: PeriodTotals,
    counts: EntityCounts,
    now: DateTime<Utc>,
) -> DashboardStats {
    let trends = DashboardTrends {
        gross_revenue: TrendResult::between(current.gross_revenue, previous.gross_revenue),
        gross_commission: TrendResult::between(current.gross_commission, previous.gross_commission),
        net_commission: TrendResult::between(current.net_commission, previous.net_commission),
        paid_commission: TrendResult::between(current.paid_commission, previous.paid_commission),
        expenses: TrendResult::between(current.expenses, previous.expenses),
    };

    let metrics = MetricSnapshot {
        gross_revenue: current.gross_revenue,
        gross_commission: current.gross_commission,
        net_commission: current.net_commission,
        paid_commission: current.paid_commission,
        total_expenses: current.expenses,
        total_employees: counts.employees,
        total_groups: counts.groups,
        active_accounts: counts.active_accounts,
        monthly_growth: trends.net_commission.percentage,
        last_updated: now,
    };

    DashboardStats {
        current_period: filter.window,
        previous_period,
        group: filter.group,
        ratios: derived_ratios(&metrics),
        metrics,
        trends,
    }
}

/// KPI ponderado, limitado a 100. Metas não positivas contam como 0%.
pub fn kpi_score(
    sales: Decimal,
    sales_target: Decimal,
    commission: Decimal,
    commission_target: Decimal,
    attendance: i32,
    attendance_target: i32,
) -> Decimal {
    let total = percent_of(sales, sales_target) * KPI_SALES_WEIGHT
        + percent_of(commission, commission_target) * KPI_COMMISSION_WEIGHT
        + percent_of(Decimal::from(attendance), Decimal::from(attendance_target))
            * KPI_ATTENDANCE_WEIGHT;
    total.min(Decimal::ONE_HUNDRED)
}

/// Um ponto por dia do período; dias sem movimento ficam zerados.
pub fn daily_trend(
    window: &PeriodWindow,
    sales: &[SalesReport],
    commissions: &[CommissionRecord],
) -> Vec<DailyTrendPoint> {
    let mut points: BTreeMap<_, _> = window
        .days()
        .map(|day| (day, (Decimal::ZERO, Decimal::ZERO)))
        .collect();

    for report in sales {
        if let Some((day_sales, _)) = points.get_mut(&report.report_date) {
            *day_sales += report.total_sales.unwrap_or_default();
        }
    }
    for commission in commissions {
        if let Some((_, day_commission)) = points.get_mut(&commission.payment_date) {
            *day_commission += commission.paid_commission.unwrap_or_default();
        }
    }

    points
        .into_iter()
        .map(|(date, (sales, commission))| DailyTrendPoint { date, sales, commission })
        .collect()
}

/// Os `limit` grupos com maior omzet.
pub fn top_groups(sales: &[SalesReport], limit: usize) -> Vec<GroupSales> {
    let mut by_group: HashMap<&str, Decimal> = HashMap::new();
    for report in sales {
        let name = report.group_name.as_deref().unwrap_or(UNGROUPED_NAME);
        *by_group.entry(name).or_default() += report.total_sales.unwrap_or_default();
    }

    let mut ranked: Vec<GroupSales> = by_group
        .into_iter()
        .map(|(name, sales)| GroupSales { name: name.to_string(), sales })
        .collect();
    ranked.sort_by(|a, b| b.sales.cmp(&a.sales).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(limit);
    ranked
}

/// Contas por plataforma conhecida; plataformas fora da lista não entram.
pub fn platform_breakdown(accounts: &[AccountRecord]) -> Vec<PlatformCount> {
    PLATFORMS
        .iter()
        .map(|(platform, label)| PlatformCount {
            name: label.to_string(),
            value: accounts
                .iter()
                .filter(|a| a.platform.trim().eq_ignore_ascii_case(platform))
                .count() as i64,
        })
        .collect()
}

pub fn sales_by_employee(sales: &[SalesReport]) -> HashMap<Uuid, Decimal> {
    let mut totals: HashMap<Uuid, Decimal> = HashMap::new();
    for report in sales {
        if let Some(employee_id) = report.employee_id {
            *totals.entry(employee_id).or_default() += report.total_sales.unwrap_or_default();
        }
    }
    totals
}

/// Ranking de KPI: a meta mais recente de cada funcionário, com o omzet dos
/// relatórios diários substituindo o valor da meta quando for positivo.
pub fn rank_employees(
    mut targets: Vec<KpiTargetRow>,
    report_sales: &HashMap<Uuid, Decimal>,
) -> Vec<EmployeePerformance> {
    targets.sort_by(|a, b| b.target_month.cmp(&a.target_month));

    let mut seen = HashSet::new();
    let mut ranking: Vec<EmployeePerformance> = targets
        .into_iter()
        .filter(|row| seen.insert(row.employee_id))
        .map(|row| {
            let from_reports = report_sales.get(&row.employee_id).copied().unwrap_or_default();
            let sales = if from_reports > Decimal::ZERO {
                from_reports
            } else {
                row.actual_sales.unwrap_or_default()
            };
            let commission = row.actual_commission.unwrap_or_default();
            let sales_target = row.sales_target.unwrap_or_default();
            let commission_target = row.commission_target.unwrap_or_default();
            let attendance_target = row.attendance_target.unwrap_or_default();
            let actual_attendance = row.actual_attendance.unwrap_or_default();

            EmployeePerformance {
                employee_id: row.employee_id,
                name: row.employee_name.unwrap_or_else(|| "N/A".to_string()),
                group: row.group_name.unwrap_or_else(|| UNGROUPED_NAME.to_string()),
                role: row.employee_role,
                kpi: kpi_score(
                    sales,
                    sales_target,
                    commission,
                    commission_target,
                    actual_attendance,
                    attendance_target,
                ),
                sales,
                commission,
                target_month: row.target_month,
                sales_target,
                commission_target,
                attendance_target,
                actual_attendance,
            }
        })
        .collect();

    ranking.sort_by(|a, b| b.kpi.cmp(&a.kpi));
    ranking
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{auth::UserRole, dashboard::GroupSelector};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sale(day: NaiveDate, amount: Option<Decimal>) -> SalesReport {
        SalesReport {
            report_date: day,
            employee_id: None,
            group_name: None,
            total_sales: amount,
        }
    }

    fn commission(day: NaiveDate, net: Option<Decimal>, paid: Option<Decimal>) -> CommissionRecord {
        CommissionRecord {
            payment_date: day,
            gross_commission: None,
            net_commission: net,
            paid_commission: paid,
        }
    }

    #[test]
    fn previous_window_is_adjacent_and_equal_length() {
        let cases = [
            (date(2025, 3, 1), date(2025, 3, 31)),
            (date(2025, 3, 10), date(2025, 3, 10)),
            (date(2024, 2, 1), date(2024, 2, 29)),
            (date(2025, 1, 1), date(2025, 12, 31)),
            (date(2025, 1, 3), date(2025, 1, 9)),
        ];

        for (start, end) in cases {
            let current = PeriodWindow::new(start, end).unwrap();
            let previous = derive_previous_period(&current).unwrap();

            assert_eq!(previous.len_days(), current.len_days(), "duração de {:?}", current);
            assert_eq!(previous.end().succ_opt().unwrap(), current.start(), "adjacência de {:?}", current);
        }
    }

    #[test]
    fn previous_of_march_is_late_january_to_february() {
        let current = PeriodWindow::new(date(2025, 3, 1), date(2025, 3, 31)).unwrap();
        let previous = derive_previous_period(&current).unwrap();
        assert_eq!(previous.end(), date(2025, 2, 28));
        assert_eq!(previous.start(), date(2025, 1, 29));
    }

    #[test]
    fn previous_period_underflow_is_rejected() {
        let current = PeriodWindow::new(NaiveDate::MIN, date(2000, 1, 1)).unwrap();
        assert!(matches!(
            derive_previous_period(&current),
            Err(AppError::InvalidDateRange(_))
        ));
    }

    #[test]
    fn trend_policy_from_zero() {
        assert_eq!(trend_percentage(dec!(0), dec!(0)), dec!(0));
        assert_eq!(trend_percentage(dec!(42), dec!(0)), dec!(100));
        assert_eq!(trend_percentage(dec!(0.01), dec!(0)), dec!(100));
        assert_eq!(trend_percentage(dec!(-5), dec!(0)), dec!(-100));
    }

    #[test]
    fn trend_percentage_examples() {
        assert_eq!(trend_percentage(dec!(100), dec!(50)), dec!(100));
        assert_eq!(trend_percentage(dec!(50), dec!(100)), dec!(-50));
        assert_eq!(trend_percentage(dec!(0), dec!(80)), dec!(-100));
    }

    #[test]
    fn empty_sets_aggregate_to_zero() {
        assert_eq!(PeriodTotals::aggregate(&[], &[], &[]), PeriodTotals::default());
    }

    #[test]
    fn null_fields_count_as_zero() {
        let day = date(2025, 5, 1);
        let sales = vec![sale(day, Some(dec!(10))), sale(day, None), sale(day, Some(dec!(5.5)))];
        assert_eq!(sum_by(&sales, |r| r.total_sales), dec!(15.5));
    }

    #[test]
    fn aggregation_ignores_row_order() {
        let day = date(2025, 5, 1);
        let mut sales: Vec<_> = [dec!(100), dec!(200.25), dec!(300), dec!(0.75)]
            .into_iter()
            .map(|v| sale(day, Some(v)))
            .collect();
        let forward = sum_by(&sales, |r| r.total_sales);
        sales.reverse();
        sales.swap(0, 2);
        assert_eq!(sum_by(&sales, |r| r.total_sales), forward);
        assert_eq!(forward, dec!(601));
    }

    #[test]
    fn sales_scenario_gives_fifty_percent() {
        let day = date(2025, 5, 1);
        let current = [dec!(100), dec!(200), dec!(300)].map(|v| sale(day, Some(v)));
        let previous = [sale(day, Some(dec!(400)))];

        let trend = TrendResult::between(
            PeriodTotals::aggregate(&current, &[], &[]).gross_revenue,
            PeriodTotals::aggregate(&previous, &[], &[]).gross_revenue,
        );
        assert_eq!(trend.current, dec!(600));
        assert_eq!(trend.previous, dec!(400));
        assert_eq!(trend.percentage, dec!(50.0));
    }

    #[test]
    fn paid_ratio_is_guarded_when_net_is_zero() {
        let filter = DashboardFilter {
            window: PeriodWindow::new(date(2025, 5, 1), date(2025, 5, 31)).unwrap(),
            group: GroupSelector::All,
        };
        let previous = derive_previous_period(&filter.window).unwrap();
        let current = PeriodTotals {
            paid_commission: dec!(300),
            ..Default::default()
        };

        let stats = build_stats(&filter, previous, current, PeriodTotals::default(), EntityCounts::default(), Utc::now());
        assert_eq!(stats.ratios.commission_paid_ratio, dec!(0));
        assert_eq!(stats.ratios.profit_margin, dec!(0));
        assert_eq!(stats.ratios.conversion_rate, dec!(0));
    }

    #[test]
    fn ratios_and_growth_alias() {
        let filter = DashboardFilter {
            window: PeriodWindow::new(date(2025, 5, 1), date(2025, 5, 31)).unwrap(),
            group: GroupSelector::All,
        };
        let previous_window = derive_previous_period(&filter.window).unwrap();
        let current = PeriodTotals {
            gross_revenue: dec!(5000),
            gross_commission: dec!(1000),
            net_commission: dec!(800),
            paid_commission: dec!(400),
            expenses: dec!(200),
        };
        let previous = PeriodTotals {
            net_commission: dec!(400),
            ..Default::default()
        };
        let counts = EntityCounts { employees: 12, groups: 3, active_accounts: 7 };

        let stats = build_stats(&filter, previous_window, current, previous, counts, Utc::now());

        assert_eq!(stats.ratios.profit_margin, dec!(75));
        assert_eq!(stats.ratios.conversion_rate, dec!(40));
        assert_eq!(stats.ratios.commission_paid_ratio, dec!(50));
        assert_eq!(stats.trends.net_commission.percentage, dec!(100));
        assert_eq!(stats.metrics.monthly_growth, stats.trends.net_commission.percentage);
        assert_eq!(stats.trends.gross_revenue.percentage, dec!(100));
        assert_eq!(stats.metrics.total_employees, 12);
        assert_eq!(stats.metrics.active_accounts, 7);
    }

    #[test]
    fn kpi_score_is_weighted_and_capped() {
        // 100% omzet, 50% comissão, 0 de meta de presença
        assert_eq!(kpi_score(dec!(1000), dec!(1000), dec!(50), dec!(100), 5, 0), dec!(65));
        assert_eq!(kpi_score(dec!(5000), dec!(1000), dec!(500), dec!(100), 40, 20), dec!(100));
        assert_eq!(kpi_score(dec!(1), dec!(0), dec!(1), dec!(0), 1, 0), dec!(0));
    }

    #[test]
    fn daily_trend_is_zero_filled_and_ignores_outside_rows() {
        let window = PeriodWindow::new(date(2025, 5, 1), date(2025, 5, 3)).unwrap();
        let sales = vec![
            sale(date(2025, 5, 1), Some(dec!(10))),
            sale(date(2025, 5, 1), Some(dec!(5))),
            sale(date(2025, 5, 9), Some(dec!(99))),
        ];
        let commissions = vec![commission(date(2025, 5, 3), Some(dec!(8)), Some(dec!(4)))];

        let points = daily_trend(&window, &sales, &commissions);
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].sales, dec!(15));
        assert_eq!(points[1].sales, dec!(0));
        assert_eq!(points[1].commission, dec!(0));
        assert_eq!(points[2].date, date(2025, 5, 3));
        assert_eq!(points[2].commission, dec!(4));
    }

    #[test]
    fn top_groups_ranks_by_sales_and_names_ungrouped() {
        let day = date(2025, 5, 1);
        let mut rows = Vec::new();
        for (name, amount) in [
            (Some("Alpha"), dec!(100)),
            (Some("Beta"), dec!(300)),
            (None, dec!(50)),
            (Some("Alpha"), dec!(250)),
        ] {
            let mut row = sale(day, Some(amount));
            row.group_name = name.map(str::to_string);
            rows.push(row);
        }

        let ranked = top_groups(&rows, 2);
        assert_eq!(
            ranked,
            vec![
                GroupSales { name: "Alpha".into(), sales: dec!(350) },
                GroupSales { name: "Beta".into(), sales: dec!(300) },
            ]
        );
        assert_eq!(top_groups(&rows, 5)[2].name, UNGROUPED_NAME);
    }

    #[test]
    fn ranking_keeps_latest_month_and_prefers_report_sales() {
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let target = |employee_id, month: NaiveDate, actual_sales| KpiTargetRow {
            employee_id,
            user_id: Uuid::new_v4(),
            employee_role: UserRole::Staff,
            employee_name: None,
            group_name: Some("Alpha".into()),
            target_month: month,
            sales_target: Some(dec!(1000)),
            commission_target: Some(dec!(100)),
            attendance_target: Some(20),
            actual_sales: Some(actual_sales),
            actual_commission: Some(dec!(100)),
            actual_attendance: Some(20),
        };

        let targets = vec![
            target(alice, date(2025, 4, 1), dec!(1000)),
            target(alice, date(2025, 5, 1), dec!(0)),
            target(bob, date(2025, 5, 1), dec!(1000)),
        ];
        let mut report_sales = HashMap::new();
        report_sales.insert(alice, dec!(400));

        let ranking = rank_employees(targets, &report_sales);
        assert_eq!(ranking.len(), 2);
        assert_eq!(ranking[0].employee_id, bob);
        assert_eq!(ranking[0].kpi, dec!(100));
        assert_eq!(ranking[1].employee_id, alice);
        assert_eq!(ranking[1].target_month, date(2025, 5, 1));
        assert_eq!(ranking[1].sales, dec!(400));
        // 40% * 0.5 + 100% * 0.3 + 100% * 0.2
        assert_eq!(ranking[1].kpi, dec!(70));
        assert_eq!(ranking[1].name, "N/A");
        assert_eq!(ranking[1].role, UserRole::Staff);
    }

    #[test]
    fn platform_breakdown_counts_shopee_and_tiktok() {
        let accounts: Vec<AccountRecord> = ["shopee", "tiktok", "Shopee", "lazada", "shopee"]
            .into_iter()
            .map(|platform| AccountRecord { platform: platform.to_string() })
            .collect();

        assert_eq!(
            platform_breakdown(&accounts),
            vec![
                PlatformCount { name: "Shopee".into(), value: 3 },
                PlatformCount { name: "TikTok".into(), value: 1 },
            ]
        );
    }

    #[test]
    fn platform_breakdown_keeps_both_slices_when_empty() {
        let breakdown = platform_breakdown(&[]);
        assert_eq!(breakdown.len(), 2);
        assert!(breakdown.iter().all(|p| p.value == 0));
    }
}
