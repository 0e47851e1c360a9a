pub mod accounts;
pub mod alloc;
pub mod demo;
pub mod goal;
pub mod init;
pub mod manual;
pub mod project;
pub mod savings;

use clap::{Parser, Subcommand};

use crate::month::MonthKey;

/// Month the command applies to when none is given.
pub(crate) fn current_month() -> MonthKey {
    MonthKey::from_date(chrono::Local::now().date_naive())
}

#[derive(Parser)]
#[command(name = "cagnotte", about = "Household savings project tracker.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up cagnotte: choose a data directory and initialize the database.
    Init {
        /// Path for cagnotte data (default: ~/Documents/cagnotte)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Load a sample ledger and projects to explore cagnotte.
    Demo,
    /// Manage which ledger accounts count as checking or savings.
    Accounts {
        #[command(subcommand)]
        command: AccountsCommands,
    },
    /// Manage savings projects.
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// Monthly savings reports across the household ledger.
    Savings {
        #[command(subcommand)]
        command: SavingsCommands,
    },
    /// Manage monthly per-project allocations.
    Alloc {
        #[command(subcommand)]
        command: AllocCommands,
    },
    /// Record savings the ledger never saw (cash, one-off income).
    Manual {
        #[command(subcommand)]
        command: ManualCommands,
    },
    /// Saving-goal suggestions, history and performance.
    Goal {
        #[command(subcommand)]
        command: GoalCommands,
    },
}

#[derive(Subcommand)]
pub enum AccountsCommands {
    /// List ledger accounts and their checking/savings flags.
    List,
    /// Create preference rows for ledger accounts that lack one.
    Refresh,
    /// Flag an account as checking and/or savings, or rename it.
    Set {
        /// Account name (ledger or display name)
        account: String,
        /// Count this account's balance as savings: true/false
        #[arg(long)]
        savings: Option<bool>,
        /// Count this account's spend as checking: true/false
        #[arg(long)]
        checking: Option<bool>,
        /// Display name shown in reports
        #[arg(long)]
        name: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// Add a savings project.
    Add {
        /// Project name, e.g. 'Japon 2025'
        name: String,
        /// Planned budget
        #[arg(long)]
        budget: f64,
        /// Start date: YYYY-MM-DD
        #[arg(long)]
        start: Option<String>,
        /// End date: YYYY-MM-DD
        #[arg(long)]
        end: Option<String>,
        /// Ledger project tag when it differs from the name
        #[arg(long)]
        tag: Option<String>,
    },
    /// List projects.
    List {
        /// Include archived projects
        #[arg(long)]
        all: bool,
    },
    /// Edit a project's budget, dates or ledger tag.
    Edit {
        name: String,
        #[arg(long)]
        budget: Option<f64>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        tag: Option<String>,
    },
    /// Archive a project (kept for history, hidden from reports).
    Archive { name: String },
    /// Delete a project without goals or allocations.
    Delete { name: String },
}

#[derive(Subcommand)]
pub enum SavingsCommands {
    /// Reconciled savings per month: totals, per-project figures, balance.
    Monthly {
        /// Number of trailing months to show
        #[arg(long, default_value = "6", conflicts_with_all = ["month", "from"])]
        months: u32,
        /// Single month: YYYY-MM
        #[arg(long)]
        month: Option<String>,
        /// First month of a range: YYYY-MM
        #[arg(long, conflicts_with = "month")]
        from: Option<String>,
        /// Last month of a range: YYYY-MM (default: current month)
        #[arg(long, requires = "from")]
        to: Option<String>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum ManualCommands {
    /// Add a manual savings transaction.
    Add {
        /// Amount saved (negative for a correction)
        #[arg(long, allow_negative_numbers = true)]
        amount: f64,
        /// What the transaction was
        #[arg(long)]
        label: String,
        /// Project the savings belong to
        #[arg(long)]
        project: Option<String>,
        /// Date: YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
    },
    /// List manual transactions for a month.
    List {
        /// Month: YYYY-MM (default: current month)
        #[arg(long)]
        month: Option<String>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a manual transaction by id.
    Remove { id: i64 },
}

#[derive(Subcommand)]
pub enum AllocCommands {
    /// Set the allocation for a project and month (0 removes it).
    Set {
        /// Project name
        project: String,
        /// Month: YYYY-MM
        #[arg(long)]
        month: String,
        /// Allocated amount; may be negative for a correction
        #[arg(long, allow_negative_numbers = true)]
        amount: f64,
    },
    /// List allocations for a month.
    List {
        /// Month: YYYY-MM (default: current month)
        #[arg(long)]
        month: Option<String>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove every allocation of a month, with its mirror transactions.
    Clear {
        /// Month: YYYY-MM
        #[arg(long)]
        month: String,
    },
}

#[derive(Subcommand)]
pub enum GoalCommands {
    /// Suggest a monthly goal from remaining budget and remaining months.
    Suggest {
        /// Project name
        project: String,
        /// Month to evaluate as of: YYYY-MM (default: current month)
        #[arg(long = "as-of")]
        as_of: Option<String>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Accept a monthly goal, closing the previous one.
    Accept {
        /// Project name
        project: String,
        /// Monthly goal amount
        #[arg(long)]
        amount: f64,
        /// Why the goal changed
        #[arg(long)]
        reason: Option<String>,
        /// First month the goal applies to: YYYY-MM (default: current month)
        #[arg(long)]
        month: Option<String>,
    },
    /// Show a project's goal history.
    History {
        project: String,
        #[arg(long)]
        json: bool,
    },
    /// Compare a month's reconciled savings against the active goal.
    Performance {
        /// Project name
        project: String,
        /// Month: YYYY-MM
        #[arg(long)]
        month: String,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}
