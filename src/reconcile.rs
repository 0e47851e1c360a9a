use regex::Regex;
use rusqlite::{Connection, OptionalExtension};

use crate::aggregate::{self, Filters, MonthAggregate};
use crate::error::{CagnotteError, Result};
use crate::models::Project;
use crate::month::MonthKey;

/// Authoritative per-project figures for one month, after manual overrides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reconciled {
    pub saved: f64,
    pub spent: f64,
}

/// Label written on the manual transaction mirroring an allocation.
/// Deterministic so the mirror can be found and replaced later.
pub fn mirror_label(project_name: &str, month: MonthKey) -> String {
    format!("Virement épargne {project_name} {month}")
}

fn mirror_pattern() -> Regex {
    Regex::new(r"^Virement épargne .+ \d{4}-\d{2}$").expect("valid pattern")
}

fn allocation_amount(conn: &Connection, project_id: i64, month: MonthKey) -> Result<Option<f64>> {
    let amount = conn
        .query_row(
            "SELECT amount FROM project_allocations WHERE project_id = ?1 AND month = ?2",
            rusqlite::params![project_id, month.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(amount)
}

/// User-entered manual savings for the project and month.
///
/// Mirror rows (`generated = 1`) never count: the allocation they mirror is
/// already the authoritative figure. Unassigned rows are attributed to the
/// project when their label follows the allocation-label pattern and names
/// the project, so savings typed in by hand before an allocation row exists
/// are not lost.
fn manual_entries_total(conn: &Connection, project: &Project, month: MonthKey) -> Result<f64> {
    let mut stmt = conn.prepare(
        "SELECT project_id, amount, label FROM manual_transactions
         WHERE generated = 0 AND date LIKE ?1",
    )?;
    let rows: Vec<(Option<i64>, f64, String)> = stmt
        .query_map([month.date_pattern()], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let pattern = mirror_pattern();
    let tag_lower = project.tag().to_lowercase();
    let mut total = 0.0;
    for (project_id, amount, label) in rows {
        let counts = match project_id {
            Some(id) => id == project.id,
            None => pattern.is_match(&label) && label.to_lowercase().contains(&tag_lower),
        };
        if counts {
            total += amount;
        }
    }
    Ok(total)
}

/// Merge ledger-derived figures with the local overrides for one month.
///
/// A nonzero allocation replaces the ledger figure outright: every accepted
/// allocation also writes a mirror transaction representing the override,
/// so summing both would double the amount.
pub fn reconcile(
    conn: &Connection,
    project: &Project,
    month: MonthKey,
    agg: &MonthAggregate,
) -> Result<Reconciled> {
    let ledger_saved = agg.per_project_savings.get(&project.id).copied().unwrap_or(0.0);
    let spent = agg.per_project_spent.get(&project.id).copied().unwrap_or(0.0);

    let saved = match allocation_amount(conn, project.id, month)? {
        Some(amount) if amount.abs() > f64::EPSILON => amount,
        _ => ledger_saved + manual_entries_total(conn, project, month)?,
    };

    Ok(Reconciled { saved, spent })
}

/// Cumulative reconciled savings from the project's first month through
/// `through`, clamped to `[0, planned budget]` (0.01 tolerance) and capped
/// by the savings-account balance so the figure never exceeds what is
/// actually in the bank.
pub fn saved_to_date(
    conn: &Connection,
    project: &Project,
    through: MonthKey,
    filters: &Filters,
) -> Result<f64> {
    let start = project.start_date.as_deref().ok_or_else(|| {
        CagnotteError::InsufficientProjectData(project.name.clone(), "missing start date".to_string())
    })?;
    let start_month = MonthKey::from_date_str(start)?;

    let mut cumulative = 0.0;
    let mut m = start_month;
    let projects = std::slice::from_ref(project);
    while m <= through {
        let agg = aggregate::aggregate(conn, m, filters, projects)?;
        cumulative += reconcile(conn, project, m, &agg)?.saved;
        m = m.next();
    }

    if let Some(balance) = aggregate::savings_balance_through(conn, through, &filters.sets)? {
        cumulative = cumulative.min(balance.max(0.0));
    }
    if cumulative - project.planned_budget > 0.01 {
        cumulative = project.planned_budget;
    }
    Ok(cumulative.max(0.0))
}

fn delete_mirror(conn: &Connection, project_id: i64, month: MonthKey) -> Result<()> {
    conn.execute(
        "DELETE FROM manual_transactions
         WHERE project_id = ?1 AND generated = 1 AND date LIKE ?2",
        rusqlite::params![project_id, month.date_pattern()],
    )?;
    Ok(())
}

// The write shared by the single and batch entry points. Runs inside an
// open transaction; callers own commit/rollback.
fn apply_allocation(
    conn: &Connection,
    project: &Project,
    month: MonthKey,
    amount: f64,
) -> Result<()> {
    if !amount.is_finite() {
        return Err(CagnotteError::InvalidAmount(amount.to_string()));
    }
    if amount.abs() < 0.005 {
        conn.execute(
            "DELETE FROM project_allocations WHERE project_id = ?1 AND month = ?2",
            rusqlite::params![project.id, month.to_string()],
        )?;
        delete_mirror(conn, project.id, month)?;
        return Ok(());
    }

    conn.execute(
        "INSERT INTO project_allocations (project_id, month, amount) VALUES (?1, ?2, ?3)
         ON CONFLICT(project_id, month)
         DO UPDATE SET amount = excluded.amount, updated_at = datetime('now')",
        rusqlite::params![project.id, month.to_string(), amount],
    )?;
    delete_mirror(conn, project.id, month)?;
    conn.execute(
        "INSERT INTO manual_transactions (project_id, date, amount, label, category, generated)
         VALUES (?1, ?2, ?3, ?4, 'épargne', 1)",
        rusqlite::params![
            project.id,
            month.last_day().to_string(),
            amount,
            mirror_label(&project.name, month)
        ],
    )?;
    Ok(())
}

/// Upsert the allocation for (project, month). Amount zero deletes the row.
/// The allocation row and its mirror transaction commit together or not at
/// all.
pub fn set_allocation(
    conn: &mut Connection,
    project: &Project,
    month: MonthKey,
    amount: f64,
) -> Result<()> {
    let tx = conn.transaction()?;
    apply_allocation(&tx, project, month, amount)?;
    tx.commit()?;
    Ok(())
}

/// Write several allocations atomically; any failure rolls the batch back.
pub fn set_allocations(
    conn: &mut Connection,
    entries: &[(Project, MonthKey, f64)],
) -> Result<()> {
    let tx = conn.transaction()?;
    for (project, month, amount) in entries {
        apply_allocation(&tx, project, *month, *amount)?;
    }
    tx.commit()?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct ManualRow {
    pub id: i64,
    pub project: Option<String>,
    pub date: String,
    pub amount: f64,
    pub label: String,
    pub generated: bool,
}

/// Record a user-entered savings transaction. These rows join the ledger
/// figure during reconciliation; an allocation for the same month replaces
/// them along with the rest of the ledger path.
pub fn add_manual_transaction(
    conn: &Connection,
    project: Option<&Project>,
    date: &str,
    amount: f64,
    label: &str,
) -> Result<i64> {
    if !amount.is_finite() || amount == 0.0 {
        return Err(CagnotteError::InvalidAmount(amount.to_string()));
    }
    if label.trim().is_empty() {
        return Err(CagnotteError::Other("label must not be empty".to_string()));
    }
    chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| CagnotteError::InvalidDate(date.to_string()))?;
    conn.execute(
        "INSERT INTO manual_transactions (project_id, date, amount, label, generated)
         VALUES (?1, ?2, ?3, ?4, 0)",
        rusqlite::params![project.map(|p| p.id), date, amount, label.trim()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn manual_transactions_for_month(conn: &Connection, month: MonthKey) -> Result<Vec<ManualRow>> {
    let mut stmt = conn.prepare(
        "SELECT m.id, p.name, m.date, m.amount, m.label, m.generated
         FROM manual_transactions m LEFT JOIN projects p ON m.project_id = p.id
         WHERE m.date LIKE ?1 ORDER BY m.date, m.id",
    )?;
    let rows = stmt.query_map([month.date_pattern()], |row| {
        Ok(ManualRow {
            id: row.get(0)?,
            project: row.get(1)?,
            date: row.get(2)?,
            amount: row.get(3)?,
            label: row.get(4)?,
            generated: row.get(5)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Remove a user-entered transaction. Mirror rows belong to their
/// allocation: zeroing the allocation is the way to remove those.
pub fn delete_manual_transaction(conn: &Connection, id: i64) -> Result<()> {
    let generated: Option<bool> = conn
        .query_row(
            "SELECT generated FROM manual_transactions WHERE id = ?1",
            [id],
            |row| row.get(0),
        )
        .optional()?;
    match generated {
        None => Err(CagnotteError::Other(format!("no manual transaction with id {id}"))),
        Some(true) => Err(CagnotteError::Other(
            "this transaction mirrors an allocation; set the allocation to 0 instead".to_string(),
        )),
        Some(false) => {
            conn.execute("DELETE FROM manual_transactions WHERE id = ?1", [id])?;
            Ok(())
        }
    }
}

#[derive(Debug, Clone)]
pub struct AllocationRow {
    pub project_id: i64,
    pub project_name: String,
    pub month: String,
    pub amount: f64,
}

pub fn allocations_for_month(conn: &Connection, month: MonthKey) -> Result<Vec<AllocationRow>> {
    let mut stmt = conn.prepare(
        "SELECT a.project_id, p.name, a.month, a.amount
         FROM project_allocations a JOIN projects p ON a.project_id = p.id
         WHERE a.month = ?1 ORDER BY p.name",
    )?;
    let rows = stmt.query_map([month.to_string()], |row| {
        Ok(AllocationRow {
            project_id: row.get(0)?,
            project_name: row.get(1)?,
            month: row.get(2)?,
            amount: row.get(3)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}
