use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::models::{DeliveryStatus, DispatchSettings, HealthStatus, Identity, PacingConfig, Recipient};
use crate::modules::classify::{classify, SendDisposition};
use crate::modules::persistence::RecipientDb;
use crate::modules::templates;
use crate::transport::Session;

/// What one batch did. `sent` counts successful deliveries; `aborted` means
/// a flood signal cut the batch short and the identity is now limited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub attempted: usize,
    pub sent: usize,
    pub aborted: bool,
    pub abort_evidence: Option<String>,
}

/// Walk the batch strictly in order, pacing between sends. Recipient state
/// is persisted after every attempt, never in bulk, so an interrupted cycle
/// loses at most the send that was in flight.
pub async fn run(
    session: &dyn Session,
    identity: &mut Identity,
    recipients: &[Recipient],
    recipient_db: &RecipientDb,
    message_templates: &[String],
    settings: &DispatchSettings,
) -> AppResult<DispatchReport> {
    if message_templates.is_empty() {
        return Err(AppError::Config(
            "no message templates configured".to_string(),
        ));
    }

    let mut report = DispatchReport {
        attempted: 0,
        sent: 0,
        aborted: false,
        abort_evidence: None,
    };

    for (position, recipient) in recipients.iter().enumerate() {
        let body = templates::select(message_templates, settings.template_selection, position);
        report.attempted += 1;

        match session.send_text(&recipient.username, body).await {
            Ok(()) => {
                recipient_db.mark_messaged(&recipient.username)?;
                report.sent += 1;
                info!(
                    "[Dispatch] Identity #{}: sent to {} ({}/{})",
                    identity.index,
                    recipient.username,
                    position + 1,
                    recipients.len()
                );
            }
            Err(e) => match classify(&e) {
                SendDisposition::InvalidRecipient => {
                    recipient_db.set_status(&recipient.username, DeliveryStatus::InvalidRecipient)?;
                    warn!(
                        "[Dispatch] Identity #{}: recipient {} does not resolve, disqualified: {}",
                        identity.index, recipient.username, e
                    );
                }
                SendDisposition::RateLimited => {
                    let evidence = format!("Stopped after flood signal from transport: {}", e);
                    identity.status = HealthStatus::Limited;
                    identity.status_evidence = evidence.clone();
                    warn!(
                        "[Dispatch] Identity #{}: flood signal at recipient {} ({}/{}), aborting batch",
                        identity.index,
                        recipient.username,
                        position + 1,
                        recipients.len()
                    );
                    report.aborted = true;
                    report.abort_evidence = Some(evidence);
                    break;
                }
                SendDisposition::Transient => {
                    warn!(
                        "[Dispatch] Identity #{}: transient failure for {}, will retry a later cycle: {}",
                        identity.index, recipient.username, e
                    );
                }
            },
        }

        let is_last = position + 1 == recipients.len();
        if !is_last {
            tokio::time::sleep(pacing_delay(&settings.pacing, settings.batch_size)).await;
        }
    }

    Ok(report)
}

/// Delay before the next send. Validation guarantees the configured pacing
/// never collapses to zero; bursts are what get a sender flagged.
fn pacing_delay(pacing: &PacingConfig, batch_size: usize) -> Duration {
    match pacing {
        PacingConfig::Fixed { window_secs } => {
            Duration::from_secs(window_secs / batch_size.max(1) as u64)
        }
        PacingConfig::Jitter { min_secs, max_secs } => {
            let (lo, hi) = if min_secs <= max_secs {
                (*min_secs, *max_secs)
            } else {
                (*max_secs, *min_secs)
            };
            Duration::from_secs(rand::thread_rng().gen_range(lo..=hi))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Credentials, TemplateSelection};
    use crate::transport::mock::ScriptedTransport;
    use crate::transport::{Transport, TransportError, TransportSignal};

    fn identity() -> Identity {
        Identity::new(
            0,
            "sender-0".to_string(),
            Credentials {
                api_key: "key".to_string(),
                api_secret: "secret".to_string(),
            },
            "token".to_string(),
        )
    }

    fn fast_settings() -> DispatchSettings {
        DispatchSettings {
            batch_size: 50,
            // Window of zero keeps unit tests instant; the production path
            // never sees this because validation rejects zero pacing.
            pacing: PacingConfig::Fixed { window_secs: 0 },
            template_selection: TemplateSelection::RoundRobin,
        }
    }

    fn message_templates() -> Vec<String> {
        vec!["first body".to_string(), "second body".to_string()]
    }

    fn seeded_db(names: &[&str]) -> (RecipientDb, Vec<Recipient>) {
        let db = RecipientDb::at(
            crate::modules::persistence::unique_test_root("dispatch").join("recipients.db"),
        );
        db.init().unwrap();
        db.import_usernames(&names.iter().map(|s| s.to_string()).collect::<Vec<_>>())
            .unwrap();
        let batch = db.find_active(names.len()).unwrap();
        (db, batch)
    }

    async fn session_for(transport: &ScriptedTransport) -> Box<dyn Session> {
        transport.connect(&identity(), None).await.unwrap()
    }

    #[tokio::test]
    async fn all_success_marks_every_recipient_messaged() {
        let (db, batch) = seeded_db(&["alice", "bob", "carol"]);
        let transport = ScriptedTransport::new();
        let session = session_for(&transport).await;
        let mut sender = identity();

        let report = run(
            session.as_ref(),
            &mut sender,
            &batch,
            &db,
            &message_templates(),
            &fast_settings(),
        )
        .await
        .unwrap();

        assert_eq!(report.sent, 3);
        assert_eq!(report.attempted, 3);
        assert!(!report.aborted);
        assert!(db.find_active(10).unwrap().is_empty());
        for name in ["alice", "bob", "carol"] {
            let recipient = db.get(name).unwrap().unwrap();
            assert_eq!(recipient.status, DeliveryStatus::Messaged);
            assert_eq!(recipient.message_count, 1);
        }
        assert_eq!(sender.status, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn recipients_are_processed_in_input_order_with_round_robin_templates() {
        let (db, batch) = seeded_db(&["alice", "bob", "carol"]);
        let transport = ScriptedTransport::new();
        let session = session_for(&transport).await;
        let mut sender = identity();

        run(
            session.as_ref(),
            &mut sender,
            &batch,
            &db,
            &message_templates(),
            &fast_settings(),
        )
        .await
        .unwrap();

        let sent = transport.sent();
        assert_eq!(sent[0], ("alice".to_string(), "first body".to_string()));
        assert_eq!(sent[1], ("bob".to_string(), "second body".to_string()));
        assert_eq!(sent[2], ("carol".to_string(), "first body".to_string()));
    }

    #[tokio::test]
    async fn flood_signal_aborts_and_leaves_the_tail_untouched() {
        let (db, batch) = seeded_db(&["alice", "bob", "carol", "dave"]);
        let transport = ScriptedTransport::new();
        transport.script_send(
            "bob",
            Err(TransportError::new(TransportSignal::PeerFlood, "cool off")),
        );
        let session = session_for(&transport).await;
        let mut sender = identity();

        let report = run(
            session.as_ref(),
            &mut sender,
            &batch,
            &db,
            &message_templates(),
            &fast_settings(),
        )
        .await
        .unwrap();

        assert!(report.aborted);
        assert_eq!(report.sent, 1);
        assert_eq!(report.attempted, 2);
        assert_eq!(sender.status, HealthStatus::Limited);
        assert!(sender.status_evidence.contains("PEER_FLOOD"));

        // alice made it out before the abort.
        assert_eq!(db.get("alice").unwrap().unwrap().status, DeliveryStatus::Messaged);
        // bob stays active: a flood signal says nothing about the recipient.
        assert_eq!(db.get("bob").unwrap().unwrap().status, DeliveryStatus::Active);
        // carol and dave were never attempted.
        assert_eq!(db.get("carol").unwrap().unwrap().status, DeliveryStatus::Active);
        assert_eq!(db.get("dave").unwrap().unwrap().status, DeliveryStatus::Active);
        assert_eq!(transport.sends_to("carol"), 0);
        assert_eq!(transport.sends_to("dave"), 0);
    }

    #[tokio::test]
    async fn invalid_recipient_is_disqualified_without_aborting() {
        let (db, batch) = seeded_db(&["alice", "bob", "carol"]);
        let transport = ScriptedTransport::new();
        transport.script_send(
            "bob",
            Err(TransportError::new(
                TransportSignal::UsernameNotOccupied,
                "no such user",
            )),
        );
        let session = session_for(&transport).await;
        let mut sender = identity();

        let report = run(
            session.as_ref(),
            &mut sender,
            &batch,
            &db,
            &message_templates(),
            &fast_settings(),
        )
        .await
        .unwrap();

        assert!(!report.aborted);
        assert_eq!(report.sent, 2);
        assert_eq!(report.attempted, 3);
        assert_eq!(
            db.get("bob").unwrap().unwrap().status,
            DeliveryStatus::InvalidRecipient
        );
        assert_eq!(db.get("carol").unwrap().unwrap().status, DeliveryStatus::Messaged);
        assert_eq!(sender.status, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn transient_failure_leaves_the_recipient_active() {
        let (db, batch) = seeded_db(&["alice", "bob"]);
        let transport = ScriptedTransport::new();
        transport.script_send(
            "alice",
            Err(TransportError::new(TransportSignal::Timeout, "slow network")),
        );
        let session = session_for(&transport).await;
        let mut sender = identity();

        let report = run(
            session.as_ref(),
            &mut sender,
            &batch,
            &db,
            &message_templates(),
            &fast_settings(),
        )
        .await
        .unwrap();

        assert!(!report.aborted);
        assert_eq!(report.sent, 1);
        let alice = db.get("alice").unwrap().unwrap();
        assert_eq!(alice.status, DeliveryStatus::Active);
        assert_eq!(alice.message_count, 0);
        assert_eq!(db.get("bob").unwrap().unwrap().status, DeliveryStatus::Messaged);
    }

    #[tokio::test]
    async fn empty_template_list_is_a_config_error() {
        let (db, batch) = seeded_db(&["alice"]);
        let transport = ScriptedTransport::new();
        let session = session_for(&transport).await;
        let mut sender = identity();

        let result = run(
            session.as_ref(),
            &mut sender,
            &batch,
            &db,
            &[],
            &fast_settings(),
        )
        .await;
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn fixed_pacing_spreads_the_window_over_the_batch() {
        let delay = pacing_delay(&PacingConfig::Fixed { window_secs: 3600 }, 50);
        assert_eq!(delay, Duration::from_secs(72));
    }

    #[test]
    fn jitter_pacing_stays_inside_the_window_even_when_bounds_are_swapped() {
        for _ in 0..20 {
            let delay = pacing_delay(
                &PacingConfig::Jitter {
                    min_secs: 420,
                    max_secs: 300,
                },
                50,
            );
            assert!(delay >= Duration::from_secs(300) && delay <= Duration::from_secs(420));
        }
    }
}
