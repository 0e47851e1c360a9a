use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::aggregate::{self, Filters};
use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::money;
use crate::goals;
use crate::month::MonthKey;
use crate::projects;
use crate::reconcile;
use crate::settings::{db_path, load_settings};

fn build_filters(conn: &rusqlite::Connection) -> Result<Filters> {
    let settings = load_settings();
    Filters::build(conn, &settings.exclusion_roots, &settings.savings_category_ids)
}

pub fn suggest(project: &str, as_of: Option<&str>, json: bool) -> Result<()> {
    let as_of = match as_of {
        Some(m) => MonthKey::parse(m)?,
        None => super::current_month(),
    };
    let conn = get_connection(&db_path())?;
    let project = projects::find_project(&conn, project)?;
    let filters = build_filters(&conn)?;
    let saved = reconcile::saved_to_date(&conn, &project, as_of, &filters)?;
    let suggestion = goals::suggest(&project, as_of, saved)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&suggestion)?);
        return Ok(());
    }

    let status = match suggestion.status {
        goals::GoalStatus::Completed | goals::GoalStatus::Ahead => {
            suggestion.status.to_string().green().bold()
        }
        goals::GoalStatus::Behind => suggestion.status.to_string().red().bold(),
        goals::GoalStatus::OnTrack => suggestion.status.to_string().bold(),
    };
    println!("Goal suggestion for {} as of {}", suggestion.project, suggestion.as_of);
    println!("  Saved to date:     {}", money(suggestion.saved_to_date));
    println!("  Remaining budget:  {}", money(suggestion.remaining_budget));
    println!("  Remaining months:  {}", suggestion.remaining_months);
    println!("  Suggested monthly: {}", money(suggestion.suggested_goal).bold());
    println!("  Baseline gap:      {}", money(suggestion.performance_gap));
    println!("  Status:            {status}");
    println!("Accept with: cagnotte goal accept '{}' --amount {}", suggestion.project, suggestion.suggested_goal);
    Ok(())
}

pub fn accept(project: &str, amount: f64, reason: Option<&str>, month: Option<&str>) -> Result<()> {
    let start_month = match month {
        Some(m) => MonthKey::parse(m)?,
        None => super::current_month(),
    };
    let mut conn = get_connection(&db_path())?;
    let project = projects::find_project(&conn, project)?;
    goals::accept(&mut conn, &project, amount, reason, start_month)?;
    println!(
        "Goal for {} is now {} per month starting {start_month}",
        project.name,
        money(amount)
    );
    Ok(())
}

pub fn history(project: &str, json: bool) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let project = projects::find_project(&conn, project)?;
    let goals = goals::history(&conn, project.id)?;

    if json {
        let out: Vec<serde_json::Value> = goals
            .iter()
            .map(|g| {
                serde_json::json!({
                    "monthly_amount": crate::fmt::round2(g.monthly_amount),
                    "start_date": g.start_date,
                    "end_date": g.end_date,
                    "reason": g.reason,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Monthly amount", "From", "To", "Reason"]);
    for g in &goals {
        table.add_row(vec![
            Cell::new(money(g.monthly_amount)),
            Cell::new(&g.start_date),
            Cell::new(g.end_date.as_deref().unwrap_or("open")),
            Cell::new(g.reason.as_deref().unwrap_or("")),
        ]);
    }
    println!("Goal history for {}\n{table}", project.name);
    Ok(())
}

pub fn performance(project: &str, month: &str, json: bool) -> Result<()> {
    let month = MonthKey::parse(month)?;
    let conn = get_connection(&db_path())?;
    let project = projects::find_project(&conn, project)?;
    let filters = build_filters(&conn)?;
    let agg = aggregate::aggregate(&conn, month, &filters, std::slice::from_ref(&project))?;
    let actual = reconcile::reconcile(&conn, &project, month, &agg)?.saved;
    let perf = goals::monthly_performance(&conn, &project, month, actual)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&perf)?);
        return Ok(());
    }

    let status = match perf.status {
        goals::PerformanceStatus::Over => perf.status.to_string().green().bold(),
        goals::PerformanceStatus::Under => perf.status.to_string().red().bold(),
        _ => perf.status.to_string().bold(),
    };
    println!("Performance for {} in {}", perf.project, perf.month);
    println!("  Goal:   {}", money(perf.goal));
    println!("  Actual: {}", money(perf.actual));
    println!("  Delta:  {}", money(perf.delta));
    println!("  Status: {status}");
    Ok(())
}
