use std::fs;
use std::path::PathBuf;

use crate::error::{AppError, AppResult};
use crate::models::RotationCursor;

const STATE_FILE: &str = "state.json";

/// Singleton rotation cursor, persisted as `state.json` in the data
/// directory. Created lazily on the first cycle.
pub struct CursorStore {
    path: PathBuf,
}

impl CursorStore {
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn open_default() -> Result<Self, String> {
        Ok(Self::at(super::data_dir()?.join(STATE_FILE)))
    }

    pub fn load(&self) -> AppResult<Option<RotationCursor>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        let cursor: RotationCursor = serde_json::from_str(&content)
            .map_err(|e| AppError::Store(format!("corrupt cursor file: {}", e)))?;
        Ok(Some(cursor))
    }

    pub fn load_or_init(&self) -> AppResult<RotationCursor> {
        if let Some(cursor) = self.load()? {
            return Ok(cursor);
        }
        let cursor = RotationCursor::new();
        self.save(&cursor)?;
        Ok(cursor)
    }

    pub fn save(&self, cursor: &RotationCursor) -> AppResult<()> {
        let temp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(cursor)
            .map_err(|e| AppError::Store(format!("failed_to_serialize_cursor: {}", e)))?;
        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}
