use rusqlite::Connection;

use crate::error::{CagnotteError, Result};

/// Ledger account ids split by role. An account may sit in both sets,
/// or in neither when the user has not opted it in.
#[derive(Debug, Default, Clone)]
pub struct AccountSets {
    pub checking: Vec<i64>,
    pub savings: Vec<i64>,
}

impl AccountSets {
    pub fn is_checking(&self, account_id: i64) -> bool {
        self.checking.contains(&account_id)
    }
}

// Ledger type tags that mark an account as savings when the user has not
// configured anything yet.
const SAVINGS_KIND_HINTS: &[&str] = &["savings", "épargne", "epargne", "livret"];

/// Derive the checking/savings account sets from `account_preferences`.
///
/// Preference rows are opt-in: an account without one lands in neither set.
/// With no preference rows at all, accounts whose ledger type tag looks like
/// a savings account are promoted into the savings set so that first-run
/// reports are not empty. An empty ledger yields empty sets.
pub fn classify(conn: &Connection) -> Result<AccountSets> {
    let mut stmt = conn.prepare(
        "SELECT account_id, include_savings, include_checking FROM account_preferences",
    )?;
    let prefs: Vec<(i64, bool, bool)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if prefs.is_empty() {
        return fallback_from_kinds(conn);
    }

    let mut sets = AccountSets::default();
    for (account_id, include_savings, include_checking) in prefs {
        if include_savings {
            sets.savings.push(account_id);
        }
        if include_checking {
            sets.checking.push(account_id);
        }
    }
    Ok(sets)
}

fn fallback_from_kinds(conn: &Connection) -> Result<AccountSets> {
    let mut stmt = conn.prepare("SELECT id, kind FROM accounts WHERE hidden = 0")?;
    let accounts: Vec<(i64, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut sets = AccountSets::default();
    for (id, kind) in accounts {
        let kind_lower = kind.to_lowercase();
        if SAVINGS_KIND_HINTS.iter().any(|h| kind_lower.contains(h)) {
            sets.savings.push(id);
        }
    }
    Ok(sets)
}

/// Create a preference row for every visible ledger account that lacks one.
/// Existing rows are untouched so user edits survive a refresh.
pub fn refresh_preferences(conn: &Connection) -> Result<usize> {
    let inserted = conn.execute(
        "INSERT INTO account_preferences (account_id, display_name)
         SELECT a.id, a.name FROM accounts a
         WHERE a.hidden = 0
           AND a.id NOT IN (SELECT account_id FROM account_preferences)",
        [],
    )?;
    Ok(inserted)
}

pub fn set_preference(
    conn: &Connection,
    account_id: i64,
    include_savings: Option<bool>,
    include_checking: Option<bool>,
) -> Result<()> {
    let name: String = conn.query_row(
        "SELECT name FROM accounts WHERE id = ?1",
        [account_id],
        |row| row.get(0),
    )?;
    conn.execute(
        "INSERT INTO account_preferences (account_id, display_name) VALUES (?1, ?2)
         ON CONFLICT(account_id) DO NOTHING",
        rusqlite::params![account_id, name],
    )?;
    if let Some(savings) = include_savings {
        conn.execute(
            "UPDATE account_preferences SET include_savings = ?1 WHERE account_id = ?2",
            rusqlite::params![savings, account_id],
        )?;
    }
    if let Some(checking) = include_checking {
        conn.execute(
            "UPDATE account_preferences SET include_checking = ?1 WHERE account_id = ?2",
            rusqlite::params![checking, account_id],
        )?;
    }
    Ok(())
}

/// Rename how an account shows up in reports; the ledger name is untouched.
pub fn set_display_name(conn: &Connection, account_id: i64, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(CagnotteError::Other("display name must not be empty".to_string()));
    }
    let updated = conn.execute(
        "UPDATE account_preferences SET display_name = ?1 WHERE account_id = ?2",
        rusqlite::params![name.trim(), account_id],
    )?;
    if updated == 0 {
        conn.execute(
            "INSERT INTO account_preferences (account_id, display_name) VALUES (?1, ?2)",
            rusqlite::params![account_id, name.trim()],
        )?;
    }
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

    fn insert_account(conn: &Connection, name: &str, kind: &str) -> i64 {
        conn.execute(
            "INSERT INTO accounts (name, kind) VALUES (?1, ?2)",
            rusqlite::params![name, kind],
        )
        .unwrap();
        conn.last_insert_rowid()
    }

    #[test]
    fn test_empty_ledger_yields_empty_sets() {
        let (_dir, conn) = test_db();
        let sets = classify(&conn).unwrap();
        assert!(sets.checking.is_empty());
        assert!(sets.savings.is_empty());
    }

    #[test]
    fn test_accounts_without_preference_are_excluded() {
        let (_dir, conn) = test_db();
        let checking = insert_account(&conn, "Compte courant", "checking");
        let other = insert_account(&conn, "Compte joint", "checking");
        set_preference(&conn, checking, None, Some(true)).unwrap();
        let sets = classify(&conn).unwrap();
        assert_eq!(sets.checking, vec![checking]);
        assert!(!sets.checking.contains(&other));
        assert!(sets.savings.is_empty());
    }

    #[test]
    fn test_kind_heuristic_applies_only_without_preferences() {
        let (_dir, conn) = test_db();
        let livret = insert_account(&conn, "Livret A", "livret");
        let checking = insert_account(&conn, "Compte courant", "checking");

        let sets = classify(&conn).unwrap();
        assert_eq!(sets.savings, vec![livret]);
        assert!(sets.checking.is_empty());

        // Any preference row switches classification to opt-in only.
        set_preference(&conn, checking, None, Some(true)).unwrap();
        let sets = classify(&conn).unwrap();
        assert!(sets.savings.is_empty());
        assert_eq!(sets.checking, vec![checking]);
    }

    #[test]
    fn test_heuristic_skips_hidden_accounts() {
        let (_dir, conn) = test_db();
        conn.execute(
            "INSERT INTO accounts (name, kind, hidden) VALUES ('Old savings', 'savings', 1)",
            [],
        )
        .unwrap();
        let sets = classify(&conn).unwrap();
        assert!(sets.savings.is_empty());
    }

    #[test]
    fn test_account_may_be_both_checking_and_savings() {
        let (_dir, conn) = test_db();
        let acct = insert_account(&conn, "Compte mixte", "checking");
        set_preference(&conn, acct, Some(true), Some(true)).unwrap();
        let sets = classify(&conn).unwrap();
        assert_eq!(sets.checking, vec![acct]);
        assert_eq!(sets.savings, vec![acct]);
    }

    #[test]
    fn test_refresh_preserves_user_edits() {
        let (_dir, conn) = test_db();
        let acct = insert_account(&conn, "Livret A", "livret");
        insert_account(&conn, "Compte courant", "checking");

        let inserted = refresh_preferences(&conn).unwrap();
        assert_eq!(inserted, 2);

        set_preference(&conn, acct, Some(true), None).unwrap();
        let inserted = refresh_preferences(&conn).unwrap();
        assert_eq!(inserted, 0);

        let sets = classify(&conn).unwrap();
        assert_eq!(sets.savings, vec![acct]);
    }

    #[test]
    fn test_set_preference_unknown_account_fails() {
        let (_dir, conn) = test_db();
        assert!(set_preference(&conn, 99, Some(true), None).is_err());
    }

    #[test]
    fn test_set_display_name() {
        let (_dir, conn) = test_db();
        let acct = insert_account(&conn, "CPT 00421337", "checking");
        set_display_name(&conn, acct, "Compte commun").unwrap();
        let name: String = conn
            .query_row(
                "SELECT display_name FROM account_preferences WHERE account_id = ?1",
                [acct],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(name, "Compte commun");
        assert!(set_display_name(&conn, acct, "   ").is_err());

        // Renaming must not flip the opt-in flags.
        let sets = classify(&conn).unwrap();
        assert!(sets.checking.is_empty());
        assert!(sets.savings.is_empty());
    }
}
