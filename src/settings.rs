use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{CagnotteError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    /// Category roots whose whole subtree is ignored by savings totals.
    /// Matched case-insensitively as substrings of the root name.
    #[serde(default = "default_exclusion_roots")]
    pub exclusion_roots: Vec<String>,
    /// Explicit savings-transfer category ids. When empty, resolution falls
    /// back to name matching.
    #[serde(default)]
    pub savings_category_ids: Vec<i64>,
}

pub fn default_exclusion_roots() -> Vec<String> {
    [
        "hors budget",
        "projets financés",
        "provision",
        "virements internes",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            exclusion_roots: default_exclusion_roots(),
            savings_category_ids: Vec::new(),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("cagnotte")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("cagnotte")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| CagnotteError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

/// Data directory holding `cagnotte.db`. The `CAGNOTTE_DATA_DIR` environment
/// variable overrides the settings file (used by scripts and the CLI tests).
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CAGNOTTE_DATA_DIR") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    PathBuf::from(&load_settings().data_dir)
}

pub fn db_path() -> PathBuf {
    get_data_dir().join("cagnotte.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            data_dir: "/tmp/test".to_string(),
            exclusion_roots: vec!["hors budget".to_string()],
            savings_category_ids: vec![42],
        };
        let json = serde_json::to_string_pretty(&settings).unwrap();
        std::fs::write(&path, &json).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let loaded: Settings = serde_json::from_str(&content).unwrap();
        assert_eq!(loaded.data_dir, "/tmp/test");
        assert_eq!(loaded.exclusion_roots, vec!["hors budget"]);
        assert_eq!(loaded.savings_category_ids, vec![42]);
    }

    #[test]
    fn test_defaults_include_standard_exclusions() {
        let s = Settings::default();
        assert!(s.exclusion_roots.iter().any(|r| r == "hors budget"));
        assert!(s.exclusion_roots.iter().any(|r| r == "virements internes"));
        assert!(s.savings_category_ids.is_empty());
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"data_dir": "/tmp/test"}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.data_dir, "/tmp/test");
        assert_eq!(s.exclusion_roots, default_exclusion_roots());
    }
}
