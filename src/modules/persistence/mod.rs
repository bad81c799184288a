pub mod cursor_store;
pub mod identity_store;
pub mod recipient_db;

use std::fs;
use std::path::PathBuf;

pub use cursor_store::CursorStore;
pub use identity_store::IdentityStore;
pub use recipient_db::RecipientDb;

/// Resolve the service data directory (config, stores, logs).
/// `RONDO_DATA_DIR` wins, tests get a process-scoped temp dir, otherwise
/// `~/.rondo` with a temp-dir fallback for homeless environments.
pub fn data_dir() -> Result<PathBuf, String> {
    fn ensure_dir(path: &PathBuf) -> Result<(), String> {
        if !path.exists() {
            fs::create_dir_all(path).map_err(|e| format!("failed_to_create_data_dir: {}", e))?;
        }
        Ok(())
    }
    if let Ok(env_path) = std::env::var("RONDO_DATA_DIR") {
        if !env_path.trim().is_empty() {
            let data_dir = PathBuf::from(env_path);
            ensure_dir(&data_dir)?;
            return Ok(data_dir);
        }
    }
    if cfg!(test) {
        let data_dir = std::env::temp_dir().join(format!(".rondo-test-{}", std::process::id()));
        ensure_dir(&data_dir)?;
        return Ok(data_dir);
    }

    if let Some(home) = dirs::home_dir() {
        let data_dir = home.join(crate::constants::DATA_DIR);
        if ensure_dir(&data_dir).is_ok() {
            return Ok(data_dir);
        }
    }
    let fallback_dir = std::env::temp_dir().join(crate::constants::DATA_DIR);
    ensure_dir(&fallback_dir)?;
    Ok(fallback_dir)
}

#[cfg(test)]
pub(crate) fn unique_test_root(label: &str) -> PathBuf {
    let root = std::env::temp_dir().join(format!(".rondo-{}-{}", label, uuid::Uuid::new_v4()));
    fs::create_dir_all(&root).expect("create test root");
    root
}
