mod aggregate;
mod classifier;
mod cli;
mod db;
mod error;
mod fmt;
mod goals;
mod models;
mod month;
mod projects;
mod reconcile;
mod report;
mod settings;
mod taxonomy;

use clap::Parser;

use cli::{
    AccountsCommands, AllocCommands, Cli, Commands, GoalCommands, ManualCommands, ProjectCommands,
    SavingsCommands,
};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Demo => cli::demo::run(),
        Commands::Accounts { command } => match command {
            AccountsCommands::List => cli::accounts::list(),
            AccountsCommands::Refresh => cli::accounts::refresh(),
            AccountsCommands::Set {
                account,
                savings,
                checking,
                name,
            } => cli::accounts::set(&account, savings, checking, name.as_deref()),
        },
        Commands::Project { command } => match command {
            ProjectCommands::Add {
                name,
                budget,
                start,
                end,
                tag,
            } => cli::project::add(&name, budget, start.as_deref(), end.as_deref(), tag.as_deref()),
            ProjectCommands::List { all } => cli::project::list(all),
            ProjectCommands::Edit {
                name,
                budget,
                start,
                end,
                tag,
            } => cli::project::edit(&name, budget, start.as_deref(), end.as_deref(), tag.as_deref()),
            ProjectCommands::Archive { name } => cli::project::archive(&name),
            ProjectCommands::Delete { name } => cli::project::delete(&name),
        },
        Commands::Savings { command } => match command {
            SavingsCommands::Monthly {
                months,
                month,
                from,
                to,
                json,
            } => cli::savings::monthly(months, month.as_deref(), from.as_deref(), to.as_deref(), json),
        },
        Commands::Manual { command } => match command {
            ManualCommands::Add {
                amount,
                label,
                project,
                date,
            } => cli::manual::add(amount, &label, project.as_deref(), date.as_deref()),
            ManualCommands::List { month, json } => cli::manual::list(month.as_deref(), json),
            ManualCommands::Remove { id } => cli::manual::remove(id),
        },
        Commands::Alloc { command } => match command {
            AllocCommands::Set {
                project,
                month,
                amount,
            } => cli::alloc::set(&project, &month, amount),
            AllocCommands::List { month, json } => cli::alloc::list(month.as_deref(), json),
            AllocCommands::Clear { month } => cli::alloc::clear(&month),
        },
        Commands::Goal { command } => match command {
            GoalCommands::Suggest { project, as_of, json } => {
                cli::goal::suggest(&project, as_of.as_deref(), json)
            }
            GoalCommands::Accept {
                project,
                amount,
                reason,
                month,
            } => cli::goal::accept(&project, amount, reason.as_deref(), month.as_deref()),
            GoalCommands::History { project, json } => cli::goal::history(&project, json),
            GoalCommands::Performance { project, month, json } => {
                cli::goal::performance(&project, &month, json)
            }
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
