use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::settings::{load_settings, save_settings};

pub fn run(data_dir: Option<String>) -> Result<()> {
    let env_override = std::env::var("CAGNOTTE_DATA_DIR")
        .ok()
        .filter(|d| !d.is_empty());

    let mut settings = load_settings();
    if let Some(dir) = data_dir {
        settings.data_dir = dir;
    }
    // An environment override wins and leaves the settings file alone.
    if env_override.is_none() {
        save_settings(&settings)?;
    }

    let dir = crate::settings::get_data_dir();
    std::fs::create_dir_all(&dir)?;
    let conn = get_connection(&crate::settings::db_path())?;
    init_db(&conn)?;

    println!("Initialized cagnotte database in {}", dir.display());
    println!("Next steps: import your ledger, or run `cagnotte demo` to explore.");
    Ok(())
}
