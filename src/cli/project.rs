use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::money;
use crate::projects;
use crate::settings::db_path;

pub fn add(
    name: &str,
    budget: f64,
    start: Option<&str>,
    end: Option<&str>,
    tag: Option<&str>,
) -> Result<()> {
    let conn = get_connection(&db_path())?;
    projects::add_project(&conn, name, budget, start, end, tag)?;
    println!("Added project: {name} ({})", money(budget));
    Ok(())
}

pub fn list(all: bool) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let rows = projects::list_projects(&conn, all)?;

    let mut table = Table::new();
    table.set_header(vec!["Name", "Budget", "Start", "End", "Tag", "Status"]);
    for p in &rows {
        let status = if p.archived {
            "archived".to_string()
        } else {
            "active".green().to_string()
        };
        table.add_row(vec![
            Cell::new(&p.name),
            Cell::new(money(p.planned_budget)),
            Cell::new(p.start_date.as_deref().unwrap_or("")),
            Cell::new(p.end_date.as_deref().unwrap_or("")),
            Cell::new(p.ledger_tag.as_deref().unwrap_or("")),
            Cell::new(status),
        ]);
    }
    println!("Projects\n{table}");
    Ok(())
}

pub fn edit(
    name: &str,
    budget: Option<f64>,
    start: Option<&str>,
    end: Option<&str>,
    tag: Option<&str>,
) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let project = projects::find_project(&conn, name)?;
    projects::update_project(&conn, &project, budget, start, end, tag)?;
    println!("Updated project: {name}");
    Ok(())
}

pub fn archive(name: &str) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let project = projects::find_project(&conn, name)?;
    projects::archive_project(&conn, project.id)?;
    println!("Archived project: {name}");
    Ok(())
}

pub fn delete(name: &str) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let project = projects::find_project(&conn, name)?;
    projects::delete_project(&conn, project.id)?;
    println!("Deleted project: {name}");
    Ok(())
}
