use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::models::{AppConfig, HealthStatus, Identity};
use crate::modules::persistence::{CursorStore, IdentityStore, RecipientDb};
use crate::modules::{dispatch, probe};
use crate::transport::proxy_pool::ProxyPool;
use crate::transport::Transport;

/// How one cycle ended. Everything here is operator-facing; it feeds the
/// cycle log line and the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Nothing provisioned yet; the cursor was left untouched.
    NoIdentities,
    /// The identity the cursor pointed at is gone; the cursor was reset to 0
    /// and the cycle ended without dispatching.
    CursorHealed { stale_index: u64 },
    /// The probe said the identity cannot send this cycle.
    SkippedUnhealthy {
        index: u64,
        status: HealthStatus,
        next_index: u64,
    },
    /// Healthy identity, but the recipient queue had nothing active.
    NoActiveRecipients { index: u64, next_index: u64 },
    Dispatched {
        index: u64,
        sent: usize,
        aborted: bool,
        next_index: u64,
    },
    /// The probe-and-dispatch phase outlived the cycle cap and was abandoned.
    TimedOut { index: u64, next_index: u64 },
}

enum PhaseOutcome {
    Skipped,
    NoActiveRecipients,
    Dispatched { sent: usize, aborted: bool },
}

/// Owns one full probe-then-dispatch-then-advance cycle. Exactly one cycle
/// runs at a time; the scheduler task awaits each call to completion before
/// the next tick can fire.
pub struct Rotator {
    transport: Arc<dyn Transport>,
    proxy_pool: ProxyPool,
    identities: IdentityStore,
    recipients: RecipientDb,
    cursor_store: CursorStore,
    message_templates: Vec<String>,
    config: AppConfig,
}

impl Rotator {
    pub fn new(
        transport: Arc<dyn Transport>,
        proxy_pool: ProxyPool,
        identities: IdentityStore,
        recipients: RecipientDb,
        cursor_store: CursorStore,
        message_templates: Vec<String>,
        config: AppConfig,
    ) -> Self {
        Self {
            transport,
            proxy_pool,
            identities,
            recipients,
            cursor_store,
            message_templates,
            config,
        }
    }

    pub fn identities(&self) -> &IdentityStore {
        &self.identities
    }

    pub fn recipients(&self) -> &RecipientDb {
        &self.recipients
    }

    /// One complete cycle. The cursor only moves here: it advances after the
    /// probe-and-dispatch phase regardless of how that phase went (success,
    /// skip, infrastructure error, or cap timeout), so a crash mid-cycle
    /// re-runs the same identity and a bad identity can stall rotation for at
    /// most one cycle.
    pub async fn run_cycle(&self) -> AppResult<CycleOutcome> {
        let mut cursor = self.cursor_store.load_or_init()?;

        let total = self.identities.count()?;
        if total == 0 {
            info!("[Rotation] No identities provisioned. Sleeping until next cycle.");
            return Ok(CycleOutcome::NoIdentities);
        }

        let index = cursor.next_identity_index;
        let Some(mut identity) = self.identities.get(index)? else {
            warn!(
                "[Rotation] Identity #{} not found in store. Resetting cursor to 0.",
                index
            );
            cursor.reset();
            self.cursor_store.save(&cursor)?;
            return Ok(CycleOutcome::CursorHealed { stale_index: index });
        };

        info!(
            "[Rotation] Selected identity #{} ({}) for this cycle",
            index, identity.handle
        );

        let cap = Duration::from_secs(self.config.schedule.cycle_cap_secs);
        let phase = tokio::time::timeout(cap, self.probe_and_dispatch(&mut identity)).await;

        // Unconditional advance: rotation progress must never depend on one
        // identity's network luck.
        cursor.advance_from(index, total);
        self.cursor_store.save(&cursor)?;
        let next_index = cursor.next_identity_index;
        info!("[Rotation] Cycle finished for identity #{}. Next index: #{}", index, next_index);

        match phase {
            Err(_) => {
                warn!(
                    "[Rotation] Identity #{}: cycle cap ({}s) elapsed, batch abandoned",
                    index, self.config.schedule.cycle_cap_secs
                );
                Ok(CycleOutcome::TimedOut { index, next_index })
            }
            Ok(Err(e)) => Err(e),
            Ok(Ok(PhaseOutcome::Skipped)) => Ok(CycleOutcome::SkippedUnhealthy {
                index,
                status: identity.status,
                next_index,
            }),
            Ok(Ok(PhaseOutcome::NoActiveRecipients)) => {
                Ok(CycleOutcome::NoActiveRecipients { index, next_index })
            }
            Ok(Ok(PhaseOutcome::Dispatched { sent, aborted })) => Ok(CycleOutcome::Dispatched {
                index,
                sent,
                aborted,
                next_index,
            }),
        }
    }

    async fn probe_and_dispatch(&self, identity: &mut Identity) -> AppResult<PhaseOutcome> {
        let proxy = self.proxy_pool.assign(identity.index);

        let verdict =
            probe::check(self.transport.as_ref(), identity, proxy, &self.config.probe).await;
        identity.record_check(verdict.status, verdict.evidence);
        // The verdict is persisted whether or not we go on to dispatch.
        self.identities.upsert(identity)?;

        if !identity.status.can_dispatch() {
            info!(
                "[Rotation] Identity #{} is {} after checks. Skipping dispatch. Evidence: {}",
                identity.index,
                identity.status.as_str(),
                identity.status_evidence
            );
            return Ok(PhaseOutcome::Skipped);
        }

        let batch = self.recipients.find_active(self.config.dispatch.batch_size)?;
        if batch.is_empty() {
            info!("[Rotation] No active recipients found. Nothing to send.");
            return Ok(PhaseOutcome::NoActiveRecipients);
        }

        info!(
            "[Rotation] Identity #{} is healthy. Dispatching to {} recipient(s)",
            identity.index,
            batch.len()
        );

        let session = self
            .transport
            .connect(identity, proxy)
            .await
            .map_err(AppError::Transport)?;
        let result = dispatch::run(
            session.as_ref(),
            identity,
            &batch,
            &self.recipients,
            &self.message_templates,
            &self.config.dispatch,
        )
        .await;
        session.disconnect().await;
        let report = result?;

        if report.aborted {
            // The dispatch loop flipped the identity to limited; make that
            // stick before the cycle ends.
            self.identities.upsert(identity)?;
            warn!(
                "[Rotation] Identity #{}: batch aborted after {} sent. {}",
                identity.index,
                report.sent,
                report.abort_evidence.as_deref().unwrap_or("")
            );
        }

        Ok(PhaseOutcome::Dispatched {
            sent: report.sent,
            aborted: report.aborted,
        })
    }
}
