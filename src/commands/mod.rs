//! One-shot CLI modes sharing the service's stores: identity provisioning
//! from a seed file, and bulk recipient import.

use serde::Deserialize;
use std::fs;
use tracing::{info, warn};

use crate::models::{Credentials, Identity};
use crate::modules::persistence::{IdentityStore, RecipientDb};

/// One entry of a `seed-identities` file: an already-provisioned account
/// (interactive login happens elsewhere; this file carries the result).
#[derive(Debug, Deserialize)]
pub struct SeedIdentity {
    pub handle: String,
    pub api_key: String,
    pub api_secret: String,
    pub session_token: String,
}

/// Upsert identities from a JSON seed file. Indexes are assigned by file
/// order; entries whose index already holds an identity are skipped so
/// re-running a seed never clobbers accumulated health state.
pub fn seed_identities(path: &str) -> Result<usize, String> {
    let content =
        fs::read_to_string(path).map_err(|e| format!("failed_to_read_seed_file {}: {}", path, e))?;
    let seeds: Vec<SeedIdentity> = serde_json::from_str(&content)
        .map_err(|e| format!("failed_to_parse_seed_file {}: {}", path, e))?;

    let store = IdentityStore::open_default()?;
    let mut created = 0;
    for (position, seed) in seeds.iter().enumerate() {
        let index = position as u64;
        let existing = store
            .get(index)
            .map_err(|e| format!("failed_to_read_identity #{}: {}", index, e))?;
        if let Some(existing) = existing {
            info!(
                "[Seed] Identity #{} ({}) already provisioned. Skipping.",
                index, existing.handle
            );
            continue;
        }

        if seed.session_token.trim().is_empty() {
            warn!("[Seed] Entry #{} ({}) has no session token. Skipping.", index, seed.handle);
            continue;
        }

        let identity = Identity::new(
            index,
            seed.handle.clone(),
            Credentials {
                api_key: seed.api_key.clone(),
                api_secret: seed.api_secret.clone(),
            },
            seed.session_token.clone(),
        );
        store
            .upsert(&identity)
            .map_err(|e| format!("failed_to_save_identity #{}: {}", index, e))?;
        info!("[Seed] Provisioned identity #{} ({})", index, seed.handle);
        created += 1;
    }

    Ok(created)
}

/// Bulk-import recipients from a text file, one username per line. Existing
/// rows keep their delivery state.
pub fn import_recipients(path: &str) -> Result<usize, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("failed_to_read_recipient_file {}: {}", path, e))?;
    let usernames: Vec<String> = content
        .lines()
        .map(|l| l.trim().trim_start_matches('@').to_string())
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .collect();

    let db = RecipientDb::open_default()?;
    db.init()
        .map_err(|e| format!("failed_to_init_recipient_db: {}", e))?;
    let added = db
        .import_usernames(&usernames)
        .map_err(|e| format!("failed_to_import_recipients: {}", e))?;

    info!(
        "[Import] {} new recipient(s) added ({} lines read)",
        added,
        usernames.len()
    );
    Ok(added)
}
