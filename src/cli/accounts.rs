use comfy_table::{Cell, Table};
use rusqlite::{Connection, OptionalExtension};

use crate::classifier;
use crate::db::get_connection;
use crate::error::{CagnotteError, Result};
use crate::settings::db_path;

pub fn list() -> Result<()> {
    let conn = get_connection(&db_path())?;
    let mut stmt = conn.prepare(
        "SELECT a.id, COALESCE(p.display_name, a.name), a.kind,
                COALESCE(p.include_checking, 0), COALESCE(p.include_savings, 0),
                p.account_id IS NOT NULL
         FROM accounts a LEFT JOIN account_preferences p ON a.id = p.account_id
         WHERE a.hidden = 0 ORDER BY 2",
    )?;
    let rows: Vec<(i64, String, String, bool, bool, bool)> = stmt
        .query_map([], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Type", "Checking", "Savings", "Configured"]);
    for (id, name, kind, checking, savings, configured) in rows {
        table.add_row(vec![
            Cell::new(id),
            Cell::new(name),
            Cell::new(kind),
            Cell::new(if checking { "yes" } else { "" }),
            Cell::new(if savings { "yes" } else { "" }),
            Cell::new(if configured { "yes" } else { "no" }),
        ]);
    }
    println!("Accounts\n{table}");
    Ok(())
}

pub fn refresh() -> Result<()> {
    let conn = get_connection(&db_path())?;
    let created = classifier::refresh_preferences(&conn)?;
    println!("Created {created} account preference(s).");
    Ok(())
}

fn find_account_id(conn: &Connection, name: &str) -> Result<i64> {
    let id = conn
        .query_row(
            "SELECT a.id FROM accounts a
             LEFT JOIN account_preferences p ON a.id = p.account_id
             WHERE a.name = ?1 OR p.display_name = ?1",
            [name],
            |row| row.get(0),
        )
        .optional()?;
    id.ok_or_else(|| CagnotteError::UnknownAccount(name.to_string()))
}

pub fn set(
    account: &str,
    savings: Option<bool>,
    checking: Option<bool>,
    name: Option<&str>,
) -> Result<()> {
    if savings.is_none() && checking.is_none() && name.is_none() {
        return Err(CagnotteError::Other(
            "nothing to change: pass --savings, --checking and/or --name".to_string(),
        ));
    }
    let conn = get_connection(&db_path())?;
    let id = find_account_id(&conn, account)?;
    if savings.is_some() || checking.is_some() {
        classifier::set_preference(&conn, id, savings, checking)?;
    }
    if let Some(name) = name {
        classifier::set_display_name(&conn, id, name)?;
    }
    println!("Updated account: {account}");
    Ok(())
}
