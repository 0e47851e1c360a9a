use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

use crate::error::{CagnotteError, Result};
use crate::fmt::round2;
use crate::models::{Project, SavingGoal};
use crate::month::MonthKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Completed,
    Ahead,
    Behind,
    OnTrack,
}

impl std::fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GoalStatus::Completed => write!(f, "completed"),
            GoalStatus::Ahead => write!(f, "ahead"),
            GoalStatus::Behind => write!(f, "behind"),
            GoalStatus::OnTrack => write!(f, "on_track"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GoalSuggestion {
    pub project: String,
    pub as_of: String,
    pub suggested_goal: f64,
    pub remaining_months: i64,
    pub remaining_budget: f64,
    pub saved_to_date: f64,
    pub expected_baseline: f64,
    pub performance_gap: f64,
    pub status: GoalStatus,
}

// Gap thresholds, as a share of the suggested goal.
const AHEAD_BEHIND_SHARE: f64 = 0.75;
// Tolerance band around a monthly goal, as a share of the goal.
const PERFORMANCE_BAND: f64 = 0.05;
// Amounts closer than this to each other count as equal.
const CENT: f64 = 0.01;

fn project_months(project: &Project) -> Result<(MonthKey, MonthKey)> {
    let missing = |what: &str| {
        CagnotteError::InsufficientProjectData(project.name.clone(), what.to_string())
    };
    let start = project.start_date.as_deref().ok_or_else(|| missing("missing start date"))?;
    let end = project.end_date.as_deref().ok_or_else(|| missing("missing end date"))?;
    let start = MonthKey::from_date_str(start)?;
    let end = MonthKey::from_date_str(end)?;
    if end < start {
        return Err(missing("end date before start date"));
    }
    Ok((start, end))
}

/// Recommend a monthly amount that spreads the remaining budget over the
/// months left, and classify progress against the straight-line baseline.
pub fn suggest(project: &Project, as_of: MonthKey, saved_to_date: f64) -> Result<GoalSuggestion> {
    let (start, end) = project_months(project)?;
    if project.planned_budget <= 0.0 {
        return Err(CagnotteError::InsufficientProjectData(
            project.name.clone(),
            "planned budget must be positive".to_string(),
        ));
    }

    let total_months = start.months_through(end);
    let current_index = start.months_through(as_of);
    let remaining_months = (total_months - current_index + 1).max(0);

    let mut remaining_budget = (project.planned_budget - saved_to_date).max(0.0);
    if remaining_budget > project.planned_budget {
        remaining_budget = project.planned_budget;
    }

    let suggested_goal = if remaining_budget <= CENT {
        0.0
    } else if remaining_months > 0 {
        (remaining_budget / remaining_months as f64).ceil()
    } else {
        remaining_budget.ceil()
    };

    let expected_baseline = project.planned_budget / total_months as f64 * current_index as f64;
    let performance_gap = saved_to_date - expected_baseline;

    let status = if remaining_budget <= CENT {
        GoalStatus::Completed
    } else if performance_gap > AHEAD_BEHIND_SHARE * suggested_goal {
        GoalStatus::Ahead
    } else if performance_gap < -AHEAD_BEHIND_SHARE * suggested_goal {
        GoalStatus::Behind
    } else {
        GoalStatus::OnTrack
    };

    Ok(GoalSuggestion {
        project: project.name.clone(),
        as_of: as_of.to_string(),
        suggested_goal,
        remaining_months,
        remaining_budget: round2(remaining_budget),
        saved_to_date: round2(saved_to_date),
        expected_baseline: round2(expected_baseline),
        performance_gap: round2(performance_gap),
        status,
    })
}

/// Record a new monthly goal starting with `start_month`.
///
/// The only mutation path for goal history: the currently open goal is
/// end-dated at the last day of the previous month inside the same
/// transaction that inserts the new open-ended row, so ranges never overlap
/// and at most one goal per project stays open.
pub fn accept(
    conn: &mut Connection,
    project: &Project,
    monthly_amount: f64,
    reason: Option<&str>,
    start_month: MonthKey,
) -> Result<()> {
    if !monthly_amount.is_finite() || monthly_amount < 0.0 {
        return Err(CagnotteError::InvalidAmount(monthly_amount.to_string()));
    }
    let tx = conn.transaction()?;
    tx.execute(
        "UPDATE project_saving_goals SET end_date = ?1
         WHERE project_id = ?2 AND end_date IS NULL",
        rusqlite::params![start_month.prev().last_day().to_string(), project.id],
    )?;
    tx.execute(
        "INSERT INTO project_saving_goals (project_id, monthly_amount, start_date, reason)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            project.id,
            monthly_amount,
            start_month.first_day().to_string(),
            reason
        ],
    )?;
    tx.commit()?;
    Ok(())
}

fn row_to_goal(row: &rusqlite::Row<'_>) -> rusqlite::Result<SavingGoal> {
    Ok(SavingGoal {
        id: row.get(0)?,
        project_id: row.get(1)?,
        monthly_amount: row.get(2)?,
        start_date: row.get(3)?,
        end_date: row.get(4)?,
        reason: row.get(5)?,
    })
}

/// The goal in force on a given date, if any.
pub fn goal_active_on(conn: &Connection, project_id: i64, date: &str) -> Result<Option<SavingGoal>> {
    let goal = conn
        .query_row(
            "SELECT id, project_id, monthly_amount, start_date, end_date, reason
             FROM project_saving_goals
             WHERE project_id = ?1 AND start_date <= ?2
               AND (end_date IS NULL OR end_date >= ?2)
             ORDER BY start_date DESC LIMIT 1",
            rusqlite::params![project_id, date],
            |row| row_to_goal(row),
        )
        .optional()?;
    Ok(goal)
}

/// Goal timeline, newest first.
pub fn history(conn: &Connection, project_id: i64) -> Result<Vec<SavingGoal>> {
    let mut stmt = conn.prepare(
        "SELECT id, project_id, monthly_amount, start_date, end_date, reason
         FROM project_saving_goals WHERE project_id = ?1 ORDER BY start_date DESC",
    )?;
    let rows = stmt.query_map([project_id], |row| row_to_goal(row))?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceStatus {
    Over,
    Under,
    OnTrack,
    NoGoal,
}

impl std::fmt::Display for PerformanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PerformanceStatus::Over => write!(f, "over"),
            PerformanceStatus::Under => write!(f, "under"),
            PerformanceStatus::OnTrack => write!(f, "on_track"),
            PerformanceStatus::NoGoal => write!(f, "no_goal"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GoalPerformance {
    pub project: String,
    pub month: String,
    pub goal: f64,
    pub actual: f64,
    pub delta: f64,
    pub status: PerformanceStatus,
}

/// Compare a month's reconciled savings against the goal active on its
/// first day, with a 5% tolerance band.
pub fn monthly_performance(
    conn: &Connection,
    project: &Project,
    month: MonthKey,
    actual: f64,
) -> Result<GoalPerformance> {
    let active = goal_active_on(conn, project.id, &month.first_day().to_string())?;
    let Some(goal) = active else {
        return Ok(GoalPerformance {
            project: project.name.clone(),
            month: month.to_string(),
            goal: 0.0,
            actual: round2(actual),
            delta: round2(actual),
            status: PerformanceStatus::NoGoal,
        });
    };

    let target = goal.monthly_amount;
    let delta = actual - target;
    let band = PERFORMANCE_BAND * target;
    let status = if delta.abs() <= band + CENT {
        PerformanceStatus::OnTrack
    } else if delta > 0.0 {
        PerformanceStatus::Over
    } else {
        PerformanceStatus::Under
    };

    Ok(GoalPerformance {
        project: project.name.clone(),
        month: month.to_string(),
        goal: round2(target),
        actual: round2(actual),
        delta: round2(delta),
        status,
    })
}
