use serde::{Deserialize, Serialize};

/// Opaque authentication material for one sender identity. Never logged in
/// full; use [`Credentials::redacted`] for anything operator-visible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

impl Credentials {
    pub fn redacted(&self) -> String {
        let prefix: String = self.api_key.chars().take(4).collect();
        format!("{}…", prefix)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Limited,
    Banned,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Limited => "limited",
            HealthStatus::Banned => "banned",
        }
    }

    /// Only healthy identities dispatch. `limited` and `banned` both skip
    /// the batch; the probe may still rehabilitate them next time around.
    pub fn can_dispatch(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

/// One rotating sender identity. `index` is the stable ordinal used for
/// rotation order and proxy assignment; it never changes after provisioning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub index: u64,
    pub handle: String,
    pub credentials: Credentials,
    pub session_token: String,
    #[serde(default = "default_status")]
    pub status: HealthStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked_at: Option<i64>,
    #[serde(default)]
    pub status_evidence: String,
    pub created_at: i64,
}

fn default_status() -> HealthStatus {
    HealthStatus::Healthy
}

impl Identity {
    pub fn new(index: u64, handle: String, credentials: Credentials, session_token: String) -> Self {
        Self {
            index,
            handle,
            credentials,
            session_token,
            status: HealthStatus::Healthy,
            last_checked_at: None,
            status_evidence: String::new(),
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn record_check(&mut self, status: HealthStatus, evidence: String) {
        self.status = status;
        self.status_evidence = evidence;
        self.last_checked_at = Some(chrono::Utc::now().timestamp());
    }
}
