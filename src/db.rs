use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    kind TEXT NOT NULL DEFAULT '',
    hidden INTEGER DEFAULT 0
);

CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    parent_id INTEGER,
    FOREIGN KEY (parent_id) REFERENCES categories(id)
);

CREATE TABLE IF NOT EXISTS ledger_transactions (
    id INTEGER PRIMARY KEY,
    account_id INTEGER NOT NULL,
    date TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'cleared',
    FOREIGN KEY (account_id) REFERENCES accounts(id)
);

CREATE TABLE IF NOT EXISTS splits (
    id INTEGER PRIMARY KEY,
    transaction_id INTEGER NOT NULL,
    amount REAL NOT NULL,
    category_id INTEGER,
    project_tag TEXT,
    comment TEXT,
    FOREIGN KEY (transaction_id) REFERENCES ledger_transactions(id),
    FOREIGN KEY (category_id) REFERENCES categories(id)
);

CREATE INDEX IF NOT EXISTS idx_splits_transaction ON splits(transaction_id);
CREATE INDEX IF NOT EXISTS idx_ledger_transactions_date ON ledger_transactions(date);

CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    start_date TEXT,
    end_date TEXT,
    planned_budget REAL NOT NULL DEFAULT 0,
    archived INTEGER DEFAULT 0,
    ledger_tag TEXT,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS project_saving_goals (
    id INTEGER PRIMARY KEY,
    project_id INTEGER NOT NULL,
    monthly_amount REAL NOT NULL,
    start_date TEXT NOT NULL,
    end_date TEXT,
    reason TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (project_id) REFERENCES projects(id)
);

CREATE TABLE IF NOT EXISTS project_allocations (
    id INTEGER PRIMARY KEY,
    project_id INTEGER NOT NULL,
    month TEXT NOT NULL,
    amount REAL NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),
    UNIQUE (project_id, month),
    FOREIGN KEY (project_id) REFERENCES projects(id)
);

CREATE TABLE IF NOT EXISTS manual_transactions (
    id INTEGER PRIMARY KEY,
    project_id INTEGER,
    date TEXT NOT NULL,
    amount REAL NOT NULL,
    label TEXT NOT NULL,
    category TEXT,
    generated INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (project_id) REFERENCES projects(id)
);

CREATE TABLE IF NOT EXISTS account_preferences (
    account_id INTEGER PRIMARY KEY,
    display_name TEXT NOT NULL,
    include_savings INTEGER NOT NULL DEFAULT 0,
    include_checking INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (account_id) REFERENCES accounts(id)
);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &[
            "accounts",
            "categories",
            "ledger_transactions",
            "splits",
            "projects",
            "project_saving_goals",
            "project_allocations",
            "manual_transactions",
            "account_preferences",
        ] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
    }

    #[test]
    fn test_allocation_key_is_unique() {
        let (_dir, conn) = test_db();
        conn.execute(
            "INSERT INTO projects (name, planned_budget) VALUES ('Trip', 1000)", [],
        )
        .unwrap();
        let project = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO project_allocations (project_id, month, amount) VALUES (?1, '2024-04', 100)",
            [project],
        )
        .unwrap();
        let dup = conn.execute(
            "INSERT INTO project_allocations (project_id, month, amount) VALUES (?1, '2024-04', 200)",
            [project],
        );
        assert!(dup.is_err(), "second insert for the same (project, month) must fail");
    }
}
