use std::fs;
use std::path::PathBuf;

use crate::error::{AppError, AppResult};
use crate::models::Identity;

const IDENTITIES_DIR: &str = "identities";

/// One pretty-JSON file per identity, named by its stable index. Writes go
/// through a temp file and rename so a crash mid-write never leaves a
/// half-serialized identity behind.
pub struct IdentityStore {
    root: PathBuf,
}

impl IdentityStore {
    pub fn at(root: PathBuf) -> AppResult<Self> {
        if !root.exists() {
            fs::create_dir_all(&root)?;
        }
        Ok(Self { root })
    }

    pub fn open_default() -> Result<Self, String> {
        let root = super::data_dir()?.join(IDENTITIES_DIR);
        Self::at(root).map_err(|e| format!("failed_to_open_identity_store: {}", e))
    }

    fn path_for(&self, index: u64) -> PathBuf {
        self.root.join(format!("{}.json", index))
    }

    pub fn count(&self) -> AppResult<u64> {
        let mut count = 0;
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn get(&self, index: u64) -> AppResult<Option<Identity>> {
        let path = self.path_for(index);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let identity: Identity = serde_json::from_str(&content)
            .map_err(|e| AppError::Store(format!("corrupt identity file {}: {}", path.display(), e)))?;
        Ok(Some(identity))
    }

    pub fn upsert(&self, identity: &Identity) -> AppResult<()> {
        let path = self.path_for(identity.index);
        let temp_path = self.root.join(format!("{}.json.tmp", identity.index));

        let content = serde_json::to_string_pretty(identity)
            .map_err(|e| AppError::Store(format!("failed_to_serialize_identity: {}", e)))?;
        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, &path)?;
        Ok(())
    }

    pub fn list(&self) -> AppResult<Vec<Identity>> {
        let mut identities = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if !path.extension().map(|e| e == "json").unwrap_or(false) {
                continue;
            }
            let content = fs::read_to_string(&path)?;
            match serde_json::from_str::<Identity>(&content) {
                Ok(identity) => identities.push(identity),
                Err(e) => {
                    tracing::warn!("Skipping corrupt identity file {}: {}", path.display(), e);
                }
            }
        }
        identities.sort_by_key(|i| i.index);
        Ok(identities)
    }
}
