use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::aggregate::Filters;
use crate::db::get_connection;
use crate::error::{CagnotteError, Result};
use crate::fmt::money;
use crate::month::MonthKey;
use crate::report;
use crate::settings::{db_path, load_settings};

pub fn monthly(
    months: u32,
    month: Option<&str>,
    from: Option<&str>,
    to: Option<&str>,
    json: bool,
) -> Result<()> {
    let keys = if let Some(m) = month {
        vec![MonthKey::parse(m)?]
    } else if let Some(from) = from {
        let from = MonthKey::parse(from)?;
        let to = match to {
            Some(t) => MonthKey::parse(t)?,
            None => super::current_month(),
        };
        let keys = from.through(to);
        if keys.is_empty() {
            return Err(CagnotteError::Other(format!(
                "--to month {to} is before --from month {from}"
            )));
        }
        keys
    } else {
        super::current_month().trailing(months.max(1))
    };

    let conn = get_connection(&db_path())?;
    let settings = load_settings();
    let filters = Filters::build(&conn, &settings.exclusion_roots, &settings.savings_category_ids)?;
    if !json && filters.savings_categories.is_empty() {
        eprintln!(
            "note: no savings-transfer category found in the ledger; \
             per-project figures will only reflect allocations and manual transactions"
        );
    }
    let rows = report::monthly_savings(&conn, &keys, &filters)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Month", "Saved", "Project spend", "Free", "Savings balance"]);
    for row in &rows {
        let saved = if row.total_savings >= 0.0 {
            money(row.total_savings).green().to_string()
        } else {
            money(row.total_savings).red().to_string()
        };
        table.add_row(vec![
            Cell::new(&row.month),
            Cell::new(saved),
            Cell::new(money(row.total_spent)),
            Cell::new(money(row.free_savings)),
            Cell::new(row.savings_balance.map(money).unwrap_or_default()),
        ]);
    }
    println!("Monthly savings\n{table}");

    // Per-project detail for the most recent month.
    if let Some(last) = rows.last() {
        if !last.projects.is_empty() {
            let mut detail = Table::new();
            detail.set_header(vec!["Project", "Saved", "Spent"]);
            for p in &last.projects {
                detail.add_row(vec![
                    Cell::new(&p.project),
                    Cell::new(money(p.saved)),
                    Cell::new(money(p.spent)),
                ]);
            }
            println!("\nProjects {}\n{detail}", last.month);
        }
    }
    Ok(())
}
