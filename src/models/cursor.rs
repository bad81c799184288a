use serde::{Deserialize, Serialize};

/// Singleton pointer to the next identity due for a cycle. Persisted once
/// per completed cycle; advancing wraps at the identity count so rotation
/// never starves any index for longer than one full revolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationCursor {
    pub next_identity_index: u64,
    pub updated_at: i64,
}

impl RotationCursor {
    pub fn new() -> Self {
        Self {
            next_identity_index: 0,
            updated_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Point at `(from + 1) mod total`. `total` must be non-zero; callers
    /// skip the cycle entirely when no identities exist.
    pub fn advance_from(&mut self, from: u64, total: u64) {
        self.next_identity_index = (from + 1) % total;
        self.updated_at = chrono::Utc::now().timestamp();
    }

    pub fn reset(&mut self) {
        self.next_identity_index = 0;
        self.updated_at = chrono::Utc::now().timestamp();
    }
}

impl Default for RotationCursor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_wraps_at_total() {
        let mut cursor = RotationCursor::new();
        cursor.advance_from(0, 3);
        assert_eq!(cursor.next_identity_index, 1);
        cursor.advance_from(2, 3);
        assert_eq!(cursor.next_identity_index, 0);
    }

    #[test]
    fn advance_with_single_identity_stays_at_zero() {
        let mut cursor = RotationCursor::new();
        cursor.advance_from(0, 1);
        assert_eq!(cursor.next_identity_index, 0);
    }

    #[test]
    fn reset_points_at_zero() {
        let mut cursor = RotationCursor::new();
        cursor.advance_from(4, 10);
        cursor.reset();
        assert_eq!(cursor.next_identity_index, 0);
    }
}
