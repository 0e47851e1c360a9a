use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};

use crate::error::{CagnotteError, Result};
use crate::models::Project;

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| CagnotteError::InvalidDate(s.to_string()))
}

fn check_dates(start: Option<&str>, end: Option<&str>) -> Result<()> {
    let start = start.map(parse_date).transpose()?;
    let end = end.map(parse_date).transpose()?;
    if let (Some(s), Some(e)) = (start, end) {
        if e < s {
            return Err(CagnotteError::Other(format!(
                "end date {e} is before start date {s}"
            )));
        }
    }
    Ok(())
}

pub fn add_project(
    conn: &Connection,
    name: &str,
    planned_budget: f64,
    start_date: Option<&str>,
    end_date: Option<&str>,
    ledger_tag: Option<&str>,
) -> Result<i64> {
    if name.trim().is_empty() {
        return Err(CagnotteError::Other("project name must not be empty".to_string()));
    }
    if !planned_budget.is_finite() || planned_budget < 0.0 {
        return Err(CagnotteError::InvalidAmount(planned_budget.to_string()));
    }
    check_dates(start_date, end_date)?;
    conn.execute(
        "INSERT INTO projects (name, planned_budget, start_date, end_date, ledger_tag)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![name.trim(), planned_budget, start_date, end_date, ledger_tag],
    )?;
    Ok(conn.last_insert_rowid())
}

fn row_to_project(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        start_date: row.get(2)?,
        end_date: row.get(3)?,
        planned_budget: row.get(4)?,
        archived: row.get(5)?,
        ledger_tag: row.get(6)?,
    })
}

const PROJECT_COLUMNS: &str =
    "id, name, start_date, end_date, planned_budget, archived, ledger_tag";

pub fn list_projects(conn: &Connection, include_archived: bool) -> Result<Vec<Project>> {
    let sql = if include_archived {
        format!("SELECT {PROJECT_COLUMNS} FROM projects ORDER BY name")
    } else {
        format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE archived = 0 ORDER BY name")
    };
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| row_to_project(row))?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Look a project up by name, or by id when the argument is numeric.
pub fn find_project(conn: &Connection, name_or_id: &str) -> Result<Project> {
    let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE name = ?1");
    let by_name = conn
        .query_row(&sql, [name_or_id], |row| row_to_project(row))
        .optional()?;
    if let Some(project) = by_name {
        return Ok(project);
    }
    if let Ok(id) = name_or_id.parse::<i64>() {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1");
        let by_id = conn.query_row(&sql, [id], |row| row_to_project(row)).optional()?;
        if let Some(project) = by_id {
            return Ok(project);
        }
    }
    Err(CagnotteError::UnknownProject(name_or_id.to_string()))
}

pub fn update_project(
    conn: &Connection,
    project: &Project,
    planned_budget: Option<f64>,
    start_date: Option<&str>,
    end_date: Option<&str>,
    ledger_tag: Option<&str>,
) -> Result<()> {
    if let Some(budget) = planned_budget {
        if !budget.is_finite() || budget < 0.0 {
            return Err(CagnotteError::InvalidAmount(budget.to_string()));
        }
    }
    let new_start = start_date.map(str::to_string).or_else(|| project.start_date.clone());
    let new_end = end_date.map(str::to_string).or_else(|| project.end_date.clone());
    check_dates(new_start.as_deref(), new_end.as_deref())?;
    conn.execute(
        "UPDATE projects SET planned_budget = ?1, start_date = ?2, end_date = ?3, ledger_tag = ?4
         WHERE id = ?5",
        rusqlite::params![
            planned_budget.unwrap_or(project.planned_budget),
            new_start,
            new_end,
            ledger_tag.map(str::to_string).or_else(|| project.ledger_tag.clone()),
            project.id
        ],
    )?;
    Ok(())
}

pub fn archive_project(conn: &Connection, project_id: i64) -> Result<()> {
    conn.execute("UPDATE projects SET archived = 1 WHERE id = ?1", [project_id])?;
    Ok(())
}

/// Hard delete, refused while goal history, allocations or manual
/// transactions still reference the project; archive covers that case.
pub fn delete_project(conn: &Connection, project_id: i64) -> Result<()> {
    let referenced: i64 = conn.query_row(
        "SELECT (SELECT count(*) FROM project_saving_goals WHERE project_id = ?1)
              + (SELECT count(*) FROM project_allocations WHERE project_id = ?1)
              + (SELECT count(*) FROM manual_transactions WHERE project_id = ?1)",
        [project_id],
        |row| row.get(0),
    )?;
    if referenced > 0 {
        return Err(CagnotteError::Other(
            "project has goals, allocations or manual transactions; archive it instead".to_string(),
        ));
    }
    conn.execute("DELETE FROM projects WHERE id = ?1", [project_id])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    #[test]
    fn test_add_and_find_project() {
        let (_dir, conn) = test_db();
        let id = add_project(&conn, "Japon", 6000.0, Some("2024-01-01"), Some("2024-06-30"), None)
            .unwrap();
        let p = find_project(&conn, "Japon").unwrap();
        assert_eq!(p.id, id);
        assert_eq!(p.planned_budget, 6000.0);
        assert_eq!(p.tag(), "Japon");

        let by_id = find_project(&conn, &id.to_string()).unwrap();
        assert_eq!(by_id.name, "Japon");
    }

    #[test]
    fn test_find_unknown_project_fails() {
        let (_dir, conn) = test_db();
        assert!(matches!(
            find_project(&conn, "Nope"),
            Err(CagnotteError::UnknownProject(_))
        ));
    }

    #[test]
    fn test_ledger_tag_overrides_name() {
        let (_dir, conn) = test_db();
        add_project(&conn, "Voyage au Japon", 6000.0, None, None, Some("Japon")).unwrap();
        let p = find_project(&conn, "Voyage au Japon").unwrap();
        assert_eq!(p.tag(), "Japon");
    }

    #[test]
    fn test_add_rejects_bad_input() {
        let (_dir, conn) = test_db();
        assert!(add_project(&conn, "  ", 100.0, None, None, None).is_err());
        assert!(add_project(&conn, "X", -5.0, None, None, None).is_err());
        assert!(add_project(&conn, "X", 100.0, Some("01/02/2024"), None, None).is_err());
        assert!(add_project(&conn, "X", 100.0, Some("2024-06-01"), Some("2024-01-01"), None).is_err());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let (_dir, conn) = test_db();
        add_project(&conn, "Japon", 100.0, None, None, None).unwrap();
        assert!(add_project(&conn, "Japon", 200.0, None, None, None).is_err());
    }

    #[test]
    fn test_list_skips_archived_by_default() {
        let (_dir, conn) = test_db();
        let a = add_project(&conn, "Actif", 100.0, None, None, None).unwrap();
        let b = add_project(&conn, "Fini", 100.0, None, None, None).unwrap();
        archive_project(&conn, b).unwrap();

        let active = list_projects(&conn, false).unwrap();
        assert_eq!(active.iter().map(|p| p.id).collect::<Vec<_>>(), vec![a]);
        let all = list_projects(&conn, true).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_update_keeps_unset_fields() {
        let (_dir, conn) = test_db();
        add_project(&conn, "Japon", 6000.0, Some("2024-01-01"), Some("2024-06-30"), None).unwrap();
        let p = find_project(&conn, "Japon").unwrap();
        update_project(&conn, &p, Some(7000.0), None, None, None).unwrap();
        let p = find_project(&conn, "Japon").unwrap();
        assert_eq!(p.planned_budget, 7000.0);
        assert_eq!(p.start_date.as_deref(), Some("2024-01-01"));
    }

    #[test]
    fn test_delete_refused_when_referenced() {
        let (_dir, conn) = test_db();
        let id = add_project(&conn, "Japon", 6000.0, None, None, None).unwrap();
        conn.execute(
            "INSERT INTO project_allocations (project_id, month, amount) VALUES (?1, '2024-04', 100)",
            [id],
        )
        .unwrap();
        assert!(delete_project(&conn, id).is_err());
        conn.execute("DELETE FROM project_allocations WHERE project_id = ?1", [id])
            .unwrap();
        delete_project(&conn, id).unwrap();
        assert!(find_project(&conn, "Japon").is_err());
    }
}
