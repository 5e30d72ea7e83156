//! Where folio keeps its own state: a single `config.toml`.
//!
//! Served documents are never written here. `FOLIO_DATA_DIR` moves the directory,
//! which keeps test runs and throwaway setups away from the user's real config.

use std::path::PathBuf;

/// Environment variable that overrides the platform data directory.
pub const DATA_DIR_ENV: &str = "FOLIO_DATA_DIR";

pub const CONFIG_FILENAME: &str = "config.toml";

/// Returns the directory where folio stores its config, creating it if needed.
/// `FOLIO_DATA_DIR` wins; otherwise the platform location (on Linux `~/.local/share/folio/`).
/// Returns `None` if no location can be determined or created.
pub fn app_data_dir() -> Option<PathBuf> {
    let dir = data_dir_from(std::env::var_os(DATA_DIR_ENV).map(PathBuf::from))?;
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir)
}

/// Path of the config file inside [`app_data_dir`].
pub fn config_file() -> Option<PathBuf> {
    app_data_dir().map(|d| d.join(CONFIG_FILENAME))
}

fn data_dir_from(overridden: Option<PathBuf>) -> Option<PathBuf> {
    match overridden.filter(|p| !p.as_os_str().is_empty()) {
        Some(dir) => Some(dir),
        None => Some(directories::ProjectDirs::from("app", "Folio", "folio")?.data_local_dir().to_path_buf()),
    }
}
