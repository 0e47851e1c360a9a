use rusqlite::Connection;

use crate::db::{get_connection, init_db};
use crate::error::{CagnotteError, Result};
use crate::goals;
use crate::month::MonthKey;
use crate::projects;
use crate::reconcile;
use crate::settings::db_path;

// Fixed-day ledger lines repeated every month. Days stay below 28 so no
// month needs clamping.
struct MonthlyLine {
    day: u32,
    amount: f64,
    category: &'static str,
    tag: Option<&'static str>,
    comment: &'static str,
}

const MONTHLY_CHECKING: &[MonthlyLine] = &[
    MonthlyLine { day: 2, amount: 2850.0, category: "Salaires", tag: None, comment: "VIREMENT SALAIRE" },
    MonthlyLine { day: 4, amount: -910.0, category: "Logement", tag: None, comment: "LOYER" },
    MonthlyLine { day: 9, amount: -447.5, category: "Alimentation", tag: None, comment: "COURSES" },
    MonthlyLine { day: 14, amount: -122.0, category: "Loisirs", tag: None, comment: "SORTIES" },
    MonthlyLine { day: 6, amount: -300.0, category: "Virements d'épargne", tag: None, comment: "VIR LIVRET A" },
    MonthlyLine { day: 6, amount: -100.0, category: "Virements d'épargne", tag: None, comment: "VIR LIVRET A" },
    MonthlyLine { day: 21, amount: 150.0, category: "Provisions/Loisirs", tag: None, comment: "PROVISION VACANCES" },
];

const MONTHLY_LIVRET: &[MonthlyLine] = &[
    MonthlyLine { day: 6, amount: 300.0, category: "Virements d'épargne", tag: Some("Japon"), comment: "VIR JAPON" },
    MonthlyLine { day: 6, amount: 100.0, category: "Virements d'épargne", tag: Some("Vélo cargo"), comment: "VIR VELO" },
];

fn insert_account(conn: &Connection, name: &str, kind: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO accounts (name, kind) VALUES (?1, ?2)",
        rusqlite::params![name, kind],
    )?;
    Ok(conn.last_insert_rowid())
}

fn insert_category(conn: &Connection, name: &str, parent: Option<i64>) -> Result<i64> {
    conn.execute(
        "INSERT INTO categories (name, parent_id) VALUES (?1, ?2)",
        rusqlite::params![name, parent],
    )?;
    Ok(conn.last_insert_rowid())
}

fn insert_line(
    conn: &Connection,
    account: i64,
    month: MonthKey,
    line: &MonthlyLine,
    category_id: i64,
) -> Result<()> {
    let date = format!("{month}-{:02}", line.day);
    conn.execute(
        "INSERT INTO ledger_transactions (account_id, date) VALUES (?1, ?2)",
        rusqlite::params![account, date],
    )?;
    let txn = conn.last_insert_rowid();
    conn.execute(
        "INSERT INTO splits (transaction_id, amount, category_id, project_tag, comment)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![txn, line.amount, category_id, line.tag, line.comment],
    )?;
    Ok(())
}

pub fn run() -> Result<()> {
    std::fs::create_dir_all(crate::settings::get_data_dir())?;
    let mut conn = get_connection(&db_path())?;
    init_db(&conn)?;

    let existing: i64 = conn.query_row("SELECT count(*) FROM accounts", [], |r| r.get(0))?;
    if existing > 0 {
        return Err(CagnotteError::Other(
            "the ledger already has accounts; demo data only loads into an empty database".to_string(),
        ));
    }

    let checking = insert_account(&conn, "Compte courant", "checking")?;
    let livret = insert_account(&conn, "Livret A", "livret")?;
    crate::classifier::set_preference(&conn, checking, None, Some(true))?;
    crate::classifier::set_preference(&conn, livret, Some(true), None)?;

    let hors_budget = insert_category(&conn, "99. Hors Budget", None)?;
    insert_category(&conn, "Provisions", Some(hors_budget))?;
    let provision_loisirs = insert_category(&conn, "Provisions/Loisirs", Some(hors_budget))?;
    insert_category(&conn, "Virements internes", None)?;
    let transfers = insert_category(&conn, "Virements d'épargne", None)?;
    let salaires = insert_category(&conn, "Salaires", None)?;
    let logement = insert_category(&conn, "Logement", None)?;
    let alimentation = insert_category(&conn, "Alimentation", None)?;
    let loisirs = insert_category(&conn, "Loisirs", None)?;

    let category_id = |name: &str| -> i64 {
        match name {
            "Salaires" => salaires,
            "Logement" => logement,
            "Alimentation" => alimentation,
            "Loisirs" => loisirs,
            "Virements d'épargne" => transfers,
            "Provisions/Loisirs" => provision_loisirs,
            _ => unreachable!("demo category {name}"),
        }
    };

    // Eight months of ledger history ending with the current month.
    let months = super::current_month().trailing(8);
    for &month in &months {
        for line in MONTHLY_CHECKING {
            insert_line(&conn, checking, month, line, category_id(line.category))?;
        }
        for line in MONTHLY_LIVRET {
            insert_line(&conn, livret, month, line, category_id(line.category))?;
        }
    }

    let first = months[0];
    let japon_end = months[months.len() - 1].next().next().next();
    projects::add_project(
        &conn,
        "Japon",
        6000.0,
        Some(&first.first_day().to_string()),
        Some(&japon_end.last_day().to_string()),
        None,
    )?;
    let velo_end = months[months.len() - 1].next();
    projects::add_project(
        &conn,
        "Vélo cargo",
        1500.0,
        Some(&first.first_day().to_string()),
        Some(&velo_end.last_day().to_string()),
        None,
    )?;

    // One manual override and an accepted goal, to show both local stores.
    let japon = projects::find_project(&conn, "Japon")?;
    let velo = projects::find_project(&conn, "Vélo cargo")?;
    reconcile::set_allocation(&mut conn, &velo, months[1], 250.0)?;
    goals::accept(&mut conn, &japon, 450.0, Some("initial plan"), first)?;

    println!("Loaded demo data: 2 accounts, 8 months of ledger, 2 projects.");
    println!("Try: cagnotte savings monthly");
    println!("     cagnotte goal suggest Japon");
    Ok(())
}
