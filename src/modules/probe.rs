use std::time::Duration;
use tracing::{info, warn};

use crate::constants::NO_REPLY_EVIDENCE;
use crate::models::{HealthStatus, Identity, ProbeSettings};
use crate::transport::proxy_pool::ProxyEndpoint;
use crate::transport::{Session, Transport};

/// Outcome of one reputation check. `status` is only ever `Healthy` or
/// `Limited`; `evidence` carries the oracle's own words (or the error that
/// prevented us from hearing them).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeVerdict {
    pub status: HealthStatus,
    pub evidence: String,
}

impl ProbeVerdict {
    fn healthy(evidence: String) -> Self {
        Self {
            status: HealthStatus::Healthy,
            evidence,
        }
    }

    fn limited(evidence: String) -> Self {
        Self {
            status: HealthStatus::Limited,
            evidence,
        }
    }
}

/// Ask the reputation oracle about one identity, retrying while it reports a
/// restriction. A reply free of restriction keywords is healthy evidence and
/// returns immediately, even on attempt 1; restrictions sometimes lift, so
/// remaining attempts wait out the retry delay. Every failure mode is
/// fail-closed: connect errors, send/fetch errors, and a silent oracle all
/// come back `limited`.
pub async fn check(
    transport: &dyn Transport,
    identity: &Identity,
    proxy: Option<&ProxyEndpoint>,
    settings: &ProbeSettings,
) -> ProbeVerdict {
    let session = match transport.connect(identity, proxy).await {
        Ok(session) => session,
        Err(e) => {
            warn!(
                "[Probe] Identity #{} ({}): connect failed: {}",
                identity.index, identity.handle, e
            );
            return ProbeVerdict::limited(format!("Error: {}", e));
        }
    };

    // Teardown on every path: the verdict is computed first, then the
    // session is dropped exactly once.
    let verdict = probe_session(session.as_ref(), identity, settings).await;
    session.disconnect().await;
    verdict
}

async fn probe_session(
    session: &dyn Session,
    identity: &Identity,
    settings: &ProbeSettings,
) -> ProbeVerdict {
    let mut last_reply: Option<String> = None;

    for attempt in 1..=settings.max_retries {
        info!(
            "[Probe] Identity #{} ({}): attempt {}/{}",
            identity.index, identity.handle, attempt, settings.max_retries
        );

        if let Err(e) = session.send_text(&settings.oracle, &settings.probe_command).await {
            warn!(
                "[Probe] Identity #{} ({}): probe send failed: {}",
                identity.index, identity.handle, e
            );
            return ProbeVerdict::limited(format!("Error: {}", e));
        }

        // Give the oracle a moment to answer before reading its reply.
        tokio::time::sleep(Duration::from_secs(settings.settle_secs)).await;

        let reply = match session.fetch_latest(&settings.oracle).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(
                    "[Probe] Identity #{} ({}): reply fetch failed: {}",
                    identity.index, identity.handle, e
                );
                return ProbeVerdict::limited(format!("Error: {}", e));
            }
        };

        if let Some(text) = reply {
            let restricted = is_restricted(&text, &settings.restriction_keywords);
            last_reply = Some(text);

            if !restricted {
                let evidence = last_reply.unwrap_or_default();
                info!(
                    "[Probe] Identity #{} ({}) is healthy. Reply: \"{}\"",
                    identity.index, identity.handle, evidence
                );
                return ProbeVerdict::healthy(evidence);
            }

            info!(
                "[Probe] Identity #{} ({}) reported restricted on attempt {}",
                identity.index, identity.handle, attempt
            );
        } else {
            info!(
                "[Probe] Identity #{} ({}): no reply yet on attempt {}",
                identity.index, identity.handle, attempt
            );
        }

        if attempt < settings.max_retries {
            tokio::time::sleep(Duration::from_secs(settings.retry_delay_secs)).await;
        }
    }

    warn!(
        "[Probe] Identity #{} ({}) still restricted after {} attempts",
        identity.index, identity.handle, settings.max_retries
    );
    ProbeVerdict::limited(last_reply.unwrap_or_else(|| NO_REPLY_EVIDENCE.to_string()))
}

fn is_restricted(reply: &str, keywords: &[String]) -> bool {
    let lowered = reply.to_lowercase();
    keywords.iter().any(|kw| lowered.contains(&kw.to_lowercase()))
}
