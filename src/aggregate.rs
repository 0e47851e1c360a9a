use std::collections::{HashMap, HashSet};

use rusqlite::Connection;

use crate::classifier::{self, AccountSets};
use crate::error::Result;
use crate::models::Project;
use crate::month::MonthKey;
use crate::taxonomy::{Excluder, Taxonomy};

// Savings-transfer category names, tried after explicitly configured ids.
const SAVINGS_TRANSFER_EXACT: &[&str] = &["virements d'épargne"];
const SAVINGS_TRANSFER_HINTS: &[&str] = &["épargne", "epargne"];

/// The ledger categories that represent a transfer into project savings.
/// Resolved once per request and passed down.
pub struct SavingsCategories {
    ids: HashSet<i64>,
}

impl SavingsCategories {
    /// Three-stage resolution: explicitly configured ids, then an exact
    /// name match, then a name-substring heuristic. First non-empty wins.
    pub fn resolve(conn: &Connection, explicit_ids: &[i64]) -> Result<Self> {
        let mut stmt = conn.prepare("SELECT id, name FROM categories")?;
        let categories: Vec<(i64, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let known: HashSet<i64> = categories.iter().map(|(id, _)| *id).collect();
        let configured: HashSet<i64> = explicit_ids
            .iter()
            .copied()
            .filter(|id| known.contains(id))
            .collect();
        if !configured.is_empty() {
            return Ok(Self { ids: configured });
        }

        let exact: HashSet<i64> = categories
            .iter()
            .filter(|(_, name)| {
                let lower = name.to_lowercase();
                SAVINGS_TRANSFER_EXACT.iter().any(|n| lower == *n)
            })
            .map(|(id, _)| *id)
            .collect();
        if !exact.is_empty() {
            return Ok(Self { ids: exact });
        }

        let fuzzy: HashSet<i64> = categories
            .iter()
            .filter(|(_, name)| {
                let lower = name.to_lowercase();
                SAVINGS_TRANSFER_HINTS.iter().any(|h| lower.contains(h))
            })
            .map(|(id, _)| *id)
            .collect();
        Ok(Self { ids: fuzzy })
    }

    pub fn contains(&self, category_id: Option<i64>) -> bool {
        match category_id {
            Some(id) => self.ids.contains(&id),
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Per-request filter bundle: account roles, category exclusions and the
/// savings-transfer category set, resolved once and passed to every
/// aggregation and reconciliation call of the request.
pub struct Filters {
    pub sets: AccountSets,
    pub excluder: Excluder,
    exclusion_keywords: Vec<String>,
    pub savings_categories: SavingsCategories,
}

impl Filters {
    pub fn build(
        conn: &Connection,
        exclusion_roots: &[String],
        savings_category_ids: &[i64],
    ) -> Result<Self> {
        let sets = classifier::classify(conn)?;
        let taxonomy = Taxonomy::load(conn)?;
        let excluder = taxonomy.excluder(exclusion_roots);
        let savings_categories = SavingsCategories::resolve(conn, savings_category_ids)?;
        Ok(Self {
            sets,
            excluder,
            exclusion_keywords: exclusion_roots.iter().map(|k| k.to_lowercase()).collect(),
            savings_categories,
        })
    }

    /// Fallback for splits without a category: the split's own comment may
    /// mark it as out of budget (e.g. an untagged internal transfer).
    fn comment_excluded(&self, comment: &str) -> bool {
        if comment.is_empty() {
            return false;
        }
        let lower = comment.to_lowercase();
        self.exclusion_keywords.iter().any(|k| lower.contains(k.as_str()))
    }
}

/// One month of raw ledger sums, before manual overrides are applied.
#[derive(Debug, Default)]
pub struct MonthAggregate {
    /// Global savings figure: every split in the month, all accounts,
    /// minus excluded categories. Deliberately not account-filtered.
    pub total_savings: f64,
    /// Project-attributable spend on checking accounts.
    pub total_spent: f64,
    pub per_project_savings: HashMap<i64, f64>,
    pub per_project_spent: HashMap<i64, f64>,
}

/// Sum the month's ledger splits into the figures of `MonthAggregate`.
/// A month with no splits yields zeros.
pub fn aggregate(
    conn: &Connection,
    month: MonthKey,
    filters: &Filters,
    projects: &[Project],
) -> Result<MonthAggregate> {
    let mut stmt = conn.prepare(
        "SELECT s.amount, s.category_id, s.project_tag, s.comment, t.account_id
         FROM splits s JOIN ledger_transactions t ON s.transaction_id = t.id
         WHERE t.date LIKE ?1",
    )?;
    let rows: Vec<(f64, Option<i64>, Option<String>, Option<String>, i64)> = stmt
        .query_map([month.date_pattern()], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let tags: HashMap<String, i64> = projects
        .iter()
        .map(|p| (p.tag().to_lowercase(), p.id))
        .collect();

    let mut agg = MonthAggregate::default();
    for (amount, category_id, project_tag, comment, account_id) in rows {
        if filters.excluder.is_excluded(category_id) {
            continue;
        }
        if category_id.is_none() && filters.comment_excluded(comment.as_deref().unwrap_or("")) {
            continue;
        }

        agg.total_savings += amount;

        let tag = project_tag.as_deref().unwrap_or("").trim();
        if tag.is_empty() {
            continue;
        }
        let project_id = tags.get(&tag.to_lowercase()).copied();

        if amount > 0.0 {
            if filters.savings_categories.contains(category_id) {
                if let Some(id) = project_id {
                    *agg.per_project_savings.entry(id).or_insert(0.0) += amount;
                }
            }
        } else if amount < 0.0
            && filters.sets.is_checking(account_id)
            && !filters.savings_categories.contains(category_id)
        {
            agg.total_spent += amount.abs();
            if let Some(id) = project_id {
                *agg.per_project_spent.entry(id).or_insert(0.0) += amount.abs();
            }
        }
    }
    Ok(agg)
}

/// Running balance of the savings accounts through the last day of `month`.
/// `None` when no account is classified as savings, which disables the
/// balance cap on reconciled figures.
pub fn savings_balance_through(
    conn: &Connection,
    month: MonthKey,
    sets: &AccountSets,
) -> Result<Option<f64>> {
    if sets.savings.is_empty() {
        return Ok(None);
    }
    let id_list = sets
        .savings
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",");
    let sql = format!(
        "SELECT COALESCE(SUM(s.amount), 0)
         FROM splits s JOIN ledger_transactions t ON s.transaction_id = t.id
         WHERE t.account_id IN ({id_list}) AND t.date <= ?1"
    );
    let balance: f64 = conn.query_row(&sql, [month.last_day().to_string()], |row| row.get(0))?;
    Ok(Some(balance))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};
    use crate::settings::default_exclusion_roots;

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

    fn insert_category(conn: &Connection, name: &str, parent: Option<i64>) -> i64 {
        conn.execute(
            "INSERT INTO categories (name, parent_id) VALUES (?1, ?2)",
            rusqlite::params![name, parent],
        )
        .unwrap();
        conn.last_insert_rowid()
    }

    fn insert_split(
        conn: &Connection,
        account: i64,
        date: &str,
        amount: f64,
        category: Option<i64>,
        tag: Option<&str>,
    ) {
        conn.execute(
            "INSERT INTO ledger_transactions (account_id, date) VALUES (?1, ?2)",
            rusqlite::params![account, date],
        )
        .unwrap();
        let txn = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO splits (transaction_id, amount, category_id, project_tag) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![txn, amount, category, tag],
        )
        .unwrap();
    }

    fn project(id: i64, name: &str) -> Project {
        Project {
            id,
            name: name.to_string(),
            start_date: None,
            end_date: None,
            planned_budget: 0.0,
            archived: false,
            ledger_tag: None,
        }
    }

    fn filters(conn: &Connection) -> Filters {
        Filters::build(conn, &default_exclusion_roots(), &[]).unwrap()
    }

    fn month(s: &str) -> MonthKey {
        MonthKey::parse(s).unwrap()
    }

    #[test]
    fn test_empty_month_returns_zeros() {
        let (_dir, conn) = test_db();
        let f = filters(&conn);
        let agg = aggregate(&conn, month("2024-01"), &f, &[]).unwrap();
        assert_eq!(agg.total_savings, 0.0);
        assert_eq!(agg.total_spent, 0.0);
        assert!(agg.per_project_savings.is_empty());
    }

    #[test]
    fn test_total_savings_spans_all_accounts() {
        let (_dir, conn) = test_db();
        let checking = insert_account(&conn, "Compte courant", "checking");
        let livret = insert_account(&conn, "Livret A", "livret");
        insert_split(&conn, checking, "2024-03-05", -120.0, None, None);
        insert_split(&conn, livret, "2024-03-10", 300.0, None, None);
        insert_split(&conn, livret, "2024-04-01", 999.0, None, None);

        let f = filters(&conn);
        let agg = aggregate(&conn, month("2024-03"), &f, &[]).unwrap();
        assert_eq!(agg.total_savings, 180.0);
    }

    #[test]
    fn test_excluded_root_propagates_to_descendants() {
        let (_dir, conn) = test_db();
        let acct = insert_account(&conn, "Compte courant", "checking");
        let root = insert_category(&conn, "99. Hors Budget", None);
        let leaf = insert_category(&conn, "Provisions/Loisirs", Some(root));
        let food = insert_category(&conn, "Alimentation", None);
        insert_split(&conn, acct, "2024-03-05", 250.0, Some(leaf), None);
        insert_split(&conn, acct, "2024-03-06", -40.0, Some(food), None);

        let f = filters(&conn);
        let agg = aggregate(&conn, month("2024-03"), &f, &[]).unwrap();
        // The provision sits under an out-of-budget root: only food counts.
        assert_eq!(agg.total_savings, -40.0);
    }

    #[test]
    fn test_uncategorized_split_excluded_by_comment() {
        let (_dir, conn) = test_db();
        let acct = insert_account(&conn, "Compte courant", "checking");
        conn.execute(
            "INSERT INTO ledger_transactions (account_id, date) VALUES (?1, '2024-03-07')",
            [acct],
        )
        .unwrap();
        let txn = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO splits (transaction_id, amount, comment) VALUES (?1, 500.0, 'Virements internes Livret')",
            [txn],
        )
        .unwrap();
        insert_split(&conn, acct, "2024-03-08", 100.0, None, None);

        let f = filters(&conn);
        let agg = aggregate(&conn, month("2024-03"), &f, &[]).unwrap();
        assert_eq!(agg.total_savings, 100.0);
    }

    #[test]
    fn test_spent_requires_checking_account_and_tag() {
        let (_dir, conn) = test_db();
        let checking = insert_account(&conn, "Compte courant", "checking");
        let livret = insert_account(&conn, "Livret A", "livret");
        crate::classifier::set_preference(&conn, checking, None, Some(true)).unwrap();
        crate::classifier::set_preference(&conn, livret, Some(true), None).unwrap();

        let food = insert_category(&conn, "Alimentation", None);
        let p = project(1, "Japon");
        insert_split(&conn, checking, "2024-03-05", -80.0, Some(food), Some("Japon"));
        // Untagged spend does not count as project spend.
        insert_split(&conn, checking, "2024-03-06", -50.0, Some(food), None);
        // Savings-account spend does not count either.
        insert_split(&conn, livret, "2024-03-07", -30.0, Some(food), Some("Japon"));

        let f = filters(&conn);
        let agg = aggregate(&conn, month("2024-03"), &f, &[p]).unwrap();
        assert_eq!(agg.total_spent, 80.0);
        assert_eq!(agg.per_project_spent.get(&1), Some(&80.0));
    }

    #[test]
    fn test_per_project_savings_needs_transfer_category() {
        let (_dir, conn) = test_db();
        let checking = insert_account(&conn, "Compte courant", "checking");
        crate::classifier::set_preference(&conn, checking, None, Some(true)).unwrap();
        let transfer = insert_category(&conn, "Virements d'épargne", None);
        let food = insert_category(&conn, "Alimentation", None);

        let p = project(1, "Japon");
        insert_split(&conn, checking, "2024-03-05", 200.0, Some(transfer), Some("Japon"));
        insert_split(&conn, checking, "2024-03-06", 75.0, Some(food), Some("Japon"));
        insert_split(&conn, checking, "2024-03-07", 60.0, Some(transfer), Some("Inconnu"));

        let f = filters(&conn);
        let agg = aggregate(&conn, month("2024-03"), &f, &[p]).unwrap();
        assert_eq!(agg.per_project_savings.get(&1), Some(&200.0));
        assert_eq!(agg.per_project_savings.len(), 1);
    }

    #[test]
    fn test_project_tag_match_is_case_insensitive() {
        let (_dir, conn) = test_db();
        let acct = insert_account(&conn, "Compte courant", "checking");
        let transfer = insert_category(&conn, "Virements d'épargne", None);
        let p = project(4, "Vélo cargo");
        insert_split(&conn, acct, "2024-05-02", 150.0, Some(transfer), Some("vélo cargo"));

        let f = filters(&conn);
        let agg = aggregate(&conn, month("2024-05"), &f, &[p]).unwrap();
        assert_eq!(agg.per_project_savings.get(&4), Some(&150.0));
    }

    #[test]
    fn test_savings_categories_prefer_configured_ids() {
        let (_dir, conn) = test_db();
        let a = insert_category(&conn, "Custom transfer", None);
        insert_category(&conn, "Virements d'épargne", None);
        let cats = SavingsCategories::resolve(&conn, &[a]).unwrap();
        assert!(cats.contains(Some(a)));
        assert_eq!(cats.ids.len(), 1);
    }

    #[test]
    fn test_savings_categories_exact_name_beats_substring() {
        let (_dir, conn) = test_db();
        let exact = insert_category(&conn, "Virements d'épargne", None);
        let fuzzy = insert_category(&conn, "Épargne retraite", None);
        let cats = SavingsCategories::resolve(&conn, &[]).unwrap();
        assert!(cats.contains(Some(exact)));
        assert!(!cats.contains(Some(fuzzy)));
    }

    #[test]
    fn test_savings_categories_substring_fallback() {
        let (_dir, conn) = test_db();
        let fuzzy = insert_category(&conn, "Epargne logement", None);
        let cats = SavingsCategories::resolve(&conn, &[]).unwrap();
        assert!(cats.contains(Some(fuzzy)));
    }

    #[test]
    fn test_savings_categories_unknown_configured_id_falls_through() {
        let (_dir, conn) = test_db();
        let exact = insert_category(&conn, "Virements d'épargne", None);
        let cats = SavingsCategories::resolve(&conn, &[999]).unwrap();
        assert!(cats.contains(Some(exact)));
    }

    #[test]
    fn test_savings_balance_is_cumulative() {
        let (_dir, conn) = test_db();
        let livret = insert_account(&conn, "Livret A", "livret");
        crate::classifier::set_preference(&conn, livret, Some(true), None).unwrap();
        insert_split(&conn, livret, "2024-01-15", 1000.0, None, None);
        insert_split(&conn, livret, "2024-02-10", 500.0, None, None);
        insert_split(&conn, livret, "2024-03-05", -200.0, None, None);

        let sets = crate::classifier::classify(&conn).unwrap();
        let feb = savings_balance_through(&conn, month("2024-02"), &sets).unwrap();
        assert_eq!(feb, Some(1500.0));
        let mar = savings_balance_through(&conn, month("2024-03"), &sets).unwrap();
        assert_eq!(mar, Some(1300.0));
    }

    #[test]
    fn test_savings_balance_none_without_savings_accounts() {
        let (_dir, conn) = test_db();
        let sets = AccountSets::default();
        let balance = savings_balance_through(&conn, month("2024-02"), &sets).unwrap();
        assert_eq!(balance, None);
    }
}
