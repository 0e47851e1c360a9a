use comfy_table::{Cell, Table};

use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::money;
use crate::month::MonthKey;
use crate::projects;
use crate::reconcile;
use crate::settings::db_path;

pub fn set(project: &str, month: &str, amount: f64) -> Result<()> {
    let month = MonthKey::parse(month)?;
    let mut conn = get_connection(&db_path())?;
    let project = projects::find_project(&conn, project)?;
    reconcile::set_allocation(&mut conn, &project, month, amount)?;
    if amount.abs() < 0.005 {
        println!("Removed allocation for {} in {month}", project.name);
    } else {
        println!("Allocated {} to {} for {month}", money(amount), project.name);
    }
    Ok(())
}

pub fn clear(month: &str) -> Result<()> {
    let month = MonthKey::parse(month)?;
    let mut conn = get_connection(&db_path())?;
    let rows = reconcile::allocations_for_month(&conn, month)?;
    if rows.is_empty() {
        println!("No allocations for {month}.");
        return Ok(());
    }
    let entries: Vec<_> = rows
        .iter()
        .map(|r| {
            projects::find_project(&conn, &r.project_name).map(|p| (p, month, 0.0))
        })
        .collect::<Result<_>>()?;
    reconcile::set_allocations(&mut conn, &entries)?;
    println!("Removed {} allocation(s) for {month}", rows.len());
    Ok(())
}

pub fn list(month: Option<&str>, json: bool) -> Result<()> {
    let month = match month {
        Some(m) => MonthKey::parse(m)?,
        None => super::current_month(),
    };
    let conn = get_connection(&db_path())?;
    let rows = reconcile::allocations_for_month(&conn, month)?;

    if json {
        let out: Vec<serde_json::Value> = rows
            .iter()
            .map(|r| {
                serde_json::json!({
                    "project": r.project_name,
                    "month": r.month,
                    "amount": crate::fmt::round2(r.amount),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Project", "Month", "Amount"]);
    let mut total = 0.0;
    for r in &rows {
        total += r.amount;
        table.add_row(vec![
            Cell::new(&r.project_name),
            Cell::new(&r.month),
            Cell::new(money(r.amount)),
        ]);
    }
    table.add_row(vec![Cell::new("Total"), Cell::new(""), Cell::new(money(total))]);
    println!("Allocations {month}\n{table}");
    Ok(())
}
