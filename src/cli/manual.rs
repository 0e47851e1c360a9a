use comfy_table::{Cell, Table};

use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::money;
use crate::month::MonthKey;
use crate::projects;
use crate::reconcile;
use crate::settings::db_path;

pub fn add(amount: f64, label: &str, project: Option<&str>, date: Option<&str>) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let project = project
        .map(|p| projects::find_project(&conn, p))
        .transpose()?;
    let date = match date {
        Some(d) => d.to_string(),
        None => chrono::Local::now().date_naive().to_string(),
    };
    let id = reconcile::add_manual_transaction(&conn, project.as_ref(), &date, amount, label)?;
    match &project {
        Some(p) => println!("Recorded {} for {} on {date} (id {id})", money(amount), p.name),
        None => println!("Recorded {} on {date} (id {id})", money(amount)),
    }
    Ok(())
}

pub fn list(month: Option<&str>, json: bool) -> Result<()> {
    let month = match month {
        Some(m) => MonthKey::parse(m)?,
        None => super::current_month(),
    };
    let conn = get_connection(&db_path())?;
    let rows = reconcile::manual_transactions_for_month(&conn, month)?;

    if json {
        let out: Vec<serde_json::Value> = rows
            .iter()
            .map(|r| {
                serde_json::json!({
                    "id": r.id,
                    "project": r.project,
                    "date": r.date,
                    "amount": crate::fmt::round2(r.amount),
                    "label": r.label,
                    "generated": r.generated,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Project", "Amount", "Label", "Source"]);
    for r in &rows {
        table.add_row(vec![
            Cell::new(r.id),
            Cell::new(&r.date),
            Cell::new(r.project.as_deref().unwrap_or("")),
            Cell::new(money(r.amount)),
            Cell::new(&r.label),
            Cell::new(if r.generated { "allocation" } else { "manual" }),
        ]);
    }
    println!("Manual transactions {month}\n{table}");
    Ok(())
}

pub fn remove(id: i64) -> Result<()> {
    let conn = get_connection(&db_path())?;
    reconcile::delete_manual_transaction(&conn, id)?;
    println!("Removed manual transaction {id}");
    Ok(())
}
