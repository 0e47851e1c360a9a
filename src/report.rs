use rusqlite::Connection;
use serde::Serialize;

use crate::aggregate::{self, Filters};
use crate::error::Result;
use crate::fmt::round2;
use crate::month::MonthKey;
use crate::projects;
use crate::reconcile;

#[derive(Debug, Clone, Serialize)]
pub struct ProjectFigure {
    pub project: String,
    pub saved: f64,
    pub spent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlySavings {
    pub month: String,
    /// Household-wide savings for the month, all accounts, exclusions applied.
    pub total_savings: f64,
    /// Project-attributable spend on checking accounts.
    pub total_spent: f64,
    /// Savings not attributed to any project. Clamped at zero: project
    /// figures can exceed the global total when allocations outrun the
    /// ledger.
    pub free_savings: f64,
    /// Savings-account balance through month end, absent when no account is
    /// classified as savings.
    pub savings_balance: Option<f64>,
    pub projects: Vec<ProjectFigure>,
}

/// One reconciled row per requested month, oldest first. Months without any
/// ledger activity still produce a row of zeros.
pub fn monthly_savings(
    conn: &Connection,
    months: &[MonthKey],
    filters: &Filters,
) -> Result<Vec<MonthlySavings>> {
    let active = projects::list_projects(conn, false)?;

    let mut out = Vec::with_capacity(months.len());
    for &month in months {
        let agg = aggregate::aggregate(conn, month, filters, &active)?;

        let mut figures = Vec::with_capacity(active.len());
        let mut attributed = 0.0;
        for project in &active {
            let r = reconcile::reconcile(conn, project, month, &agg)?;
            attributed += r.saved;
            figures.push(ProjectFigure {
                project: project.name.clone(),
                saved: round2(r.saved),
                spent: round2(r.spent),
            });
        }

        let balance = aggregate::savings_balance_through(conn, month, &filters.sets)?;
        out.push(MonthlySavings {
            month: month.to_string(),
            total_savings: round2(agg.total_savings),
            total_spent: round2(agg.total_spent),
            free_savings: round2((agg.total_savings - attributed).max(0.0)),
            savings_balance: balance.map(round2),
            projects: figures,
        });
    }
    Ok(out)
}
