#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use crate::models::{
        AppConfig, Credentials, DeliveryStatus, HealthStatus, Identity, PacingConfig,
        RotationCursor,
    };
    use crate::modules::persistence::{CursorStore, IdentityStore, RecipientDb};
    use crate::modules::rotation::{CycleOutcome, Rotator};
    use crate::transport::mock::ScriptedTransport;
    use crate::transport::proxy_pool::{ProxyEndpoint, ProxyPool};
    use crate::transport::{TransportError, TransportSignal};

    const CLEAN_REPLY: &str = "Good news, no restrictions are active.";
    const RESTRICTED_REPLY: &str = "Sorry, your account is limited for a while.";

    struct Harness {
        root: PathBuf,
        transport: ScriptedTransport,
        rotator: Rotator,
    }

    fn fast_config(batch_size: usize) -> AppConfig {
        let mut config = AppConfig::new();
        config.probe.settle_secs = 0;
        config.probe.retry_delay_secs = 0;
        config.dispatch.batch_size = batch_size;
        // Zero window keeps the tests instant; production configs are
        // validated to never pace at zero.
        config.dispatch.pacing = PacingConfig::Fixed { window_secs: 0 };
        config
    }

    fn sample_identity(index: u64) -> Identity {
        Identity::new(
            index,
            format!("sender-{}", index),
            Credentials {
                api_key: format!("key-{}", index),
                api_secret: "secret".to_string(),
            },
            format!("token-{}", index),
        )
    }

    fn harness(
        config: AppConfig,
        identity_count: u64,
        recipients: &[&str],
        pool: ProxyPool,
    ) -> Harness {
        let root = crate::modules::persistence::unique_test_root("cycle");

        let identities = IdentityStore::at(root.join("identities")).unwrap();
        for index in 0..identity_count {
            identities.upsert(&sample_identity(index)).unwrap();
        }

        let db = RecipientDb::at(root.join("recipients.db"));
        db.init().unwrap();
        db.import_usernames(&recipients.iter().map(|s| s.to_string()).collect::<Vec<_>>())
            .unwrap();

        let cursor_store = CursorStore::at(root.join("state.json"));
        let transport = ScriptedTransport::new();
        let rotator = Rotator::new(
            Arc::new(transport.clone()),
            pool,
            identities,
            db,
            cursor_store,
            vec!["hello there".to_string(), "quick update".to_string()],
            config,
        );

        Harness {
            root,
            transport,
            rotator,
        }
    }

    impl Harness {
        fn cursor_index(&self) -> Option<u64> {
            CursorStore::at(self.root.join("state.json"))
                .load()
                .unwrap()
                .map(|c| c.next_identity_index)
        }

        fn set_cursor(&self, index: u64) {
            let mut cursor = RotationCursor::new();
            cursor.next_identity_index = index;
            CursorStore::at(self.root.join("state.json"))
                .save(&cursor)
                .unwrap();
        }

        fn stored_identity(&self, index: u64) -> Identity {
            IdentityStore::at(self.root.join("identities"))
                .unwrap()
                .get(index)
                .unwrap()
                .expect("identity present")
        }

        fn recipient_db(&self) -> RecipientDb {
            RecipientDb::at(self.root.join("recipients.db"))
        }
    }

    #[tokio::test]
    async fn rotation_visits_every_identity_once_before_repeating() {
        let h = harness(fast_config(2), 3, &[], ProxyPool::empty());

        let mut visited = Vec::new();
        for _ in 0..4 {
            h.transport.push_reply(Some(CLEAN_REPLY));
            match h.rotator.run_cycle().await.unwrap() {
                CycleOutcome::NoActiveRecipients { index, .. } => visited.push(index),
                other => panic!("unexpected outcome: {:?}", other),
            }
        }

        assert_eq!(visited, vec![0, 1, 2, 0]);
        assert_eq!(h.cursor_index(), Some(1));
    }

    #[tokio::test]
    async fn missing_identity_heals_the_cursor_without_dispatching() {
        let h = harness(fast_config(2), 2, &["alice"], ProxyPool::empty());
        h.set_cursor(7);

        let outcome = h.rotator.run_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::CursorHealed { stale_index: 7 });
        assert_eq!(h.cursor_index(), Some(0));
        // No probe session, no sends: the cycle ended before any network use.
        assert_eq!(h.transport.connect_count(), 0);
        assert_eq!(
            h.recipient_db().get("alice").unwrap().unwrap().status,
            DeliveryStatus::Active
        );
    }

    #[tokio::test]
    async fn limited_probe_skips_dispatch_and_still_advances() {
        let h = harness(fast_config(10), 2, &["alice", "bob"], ProxyPool::empty());
        for _ in 0..5 {
            h.transport.push_reply(Some(RESTRICTED_REPLY));
        }

        let outcome = h.rotator.run_cycle().await.unwrap();
        assert_eq!(
            outcome,
            CycleOutcome::SkippedUnhealthy {
                index: 0,
                status: HealthStatus::Limited,
                next_index: 1,
            }
        );

        // All five probe attempts went to the oracle; no recipient was touched.
        assert_eq!(h.transport.sends_to("ReputationBot"), 5);
        assert_eq!(h.transport.sends_to("alice"), 0);
        assert_eq!(h.transport.sends_to("bob"), 0);

        let limited = h.stored_identity(0);
        assert_eq!(limited.status, HealthStatus::Limited);
        assert_eq!(limited.status_evidence, RESTRICTED_REPLY);
        assert!(limited.last_checked_at.is_some());

        assert_eq!(h.cursor_index(), Some(1));
    }

    #[tokio::test]
    async fn end_to_end_two_cycles_walk_the_recipient_queue() {
        let h = harness(
            fast_config(2),
            3,
            &["alice", "bob", "carol", "dave", "eve"],
            ProxyPool::empty(),
        );

        h.transport.push_reply(Some(CLEAN_REPLY));
        let first = h.rotator.run_cycle().await.unwrap();
        assert_eq!(
            first,
            CycleOutcome::Dispatched {
                index: 0,
                sent: 2,
                aborted: false,
                next_index: 1,
            }
        );

        let db = h.recipient_db();
        for name in ["alice", "bob"] {
            let recipient = db.get(name).unwrap().unwrap();
            assert_eq!(recipient.status, DeliveryStatus::Messaged);
            assert_eq!(recipient.message_count, 1);
        }
        for name in ["carol", "dave", "eve"] {
            assert_eq!(db.get(name).unwrap().unwrap().status, DeliveryStatus::Active);
        }
        assert_eq!(h.cursor_index(), Some(1));

        // Next cycle selects identity 1 and continues down the queue;
        // already-messaged recipients never reappear.
        h.transport.push_reply(Some(CLEAN_REPLY));
        let second = h.rotator.run_cycle().await.unwrap();
        assert_eq!(
            second,
            CycleOutcome::Dispatched {
                index: 1,
                sent: 2,
                aborted: false,
                next_index: 2,
            }
        );
        assert_eq!(db.get("carol").unwrap().unwrap().status, DeliveryStatus::Messaged);
        assert_eq!(db.get("dave").unwrap().unwrap().status, DeliveryStatus::Messaged);
        assert_eq!(h.transport.sends_to("alice"), 1);
    }

    #[tokio::test]
    async fn no_identities_is_a_quiet_noop() {
        let h = harness(fast_config(2), 0, &["alice"], ProxyPool::empty());

        let outcome = h.rotator.run_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::NoIdentities);
        assert_eq!(h.transport.connect_count(), 0);
        // The lazily-created cursor stays untouched at zero.
        assert_eq!(h.cursor_index(), Some(0));
    }

    #[tokio::test]
    async fn interrupted_cycle_resumes_at_the_same_identity() {
        let h = harness(fast_config(2), 3, &["alice", "bob", "carol"], ProxyPool::empty());

        // A previous run crashed mid-dispatch: alice already got her message,
        // but the cursor never advanced past identity 0.
        h.recipient_db().mark_messaged("alice").unwrap();
        h.set_cursor(0);

        h.transport.push_reply(Some(CLEAN_REPLY));
        let outcome = h.rotator.run_cycle().await.unwrap();
        assert_eq!(
            outcome,
            CycleOutcome::Dispatched {
                index: 0,
                sent: 2,
                aborted: false,
                next_index: 1,
            }
        );

        // The re-run picked up where the queue left off, without re-sending.
        assert_eq!(h.transport.sends_to("alice"), 0);
        assert_eq!(h.transport.sends_to("bob"), 1);
        assert_eq!(h.transport.sends_to("carol"), 1);
        assert_eq!(
            h.recipient_db().get("alice").unwrap().unwrap().message_count,
            1
        );
    }

    #[tokio::test]
    async fn flood_mid_batch_marks_identity_limited_and_advances() {
        let h = harness(fast_config(3), 2, &["alice", "bob", "carol"], ProxyPool::empty());
        h.transport.push_reply(Some(CLEAN_REPLY));
        h.transport.script_send(
            "alice",
            Err(TransportError::new(TransportSignal::PeerFlood, "cool off")),
        );

        let outcome = h.rotator.run_cycle().await.unwrap();
        assert_eq!(
            outcome,
            CycleOutcome::Dispatched {
                index: 0,
                sent: 0,
                aborted: true,
                next_index: 1,
            }
        );

        let limited = h.stored_identity(0);
        assert_eq!(limited.status, HealthStatus::Limited);
        assert!(limited.status_evidence.contains("flood signal"));

        let db = h.recipient_db();
        for name in ["alice", "bob", "carol"] {
            assert_eq!(db.get(name).unwrap().unwrap().status, DeliveryStatus::Active);
        }
        assert_eq!(h.cursor_index(), Some(1));
    }

    #[tokio::test]
    async fn probe_connect_failure_fails_closed_and_advances() {
        let h = harness(fast_config(2), 2, &["alice"], ProxyPool::empty());
        h.transport
            .fail_next_connect(TransportError::connection("dial refused"));

        let outcome = h.rotator.run_cycle().await.unwrap();
        assert_eq!(
            outcome,
            CycleOutcome::SkippedUnhealthy {
                index: 0,
                status: HealthStatus::Limited,
                next_index: 1,
            }
        );
        assert!(h.stored_identity(0).status_evidence.contains("dial refused"));
        assert_eq!(h.transport.sends_to("alice"), 0);
    }

    #[tokio::test]
    async fn proxy_assignment_follows_the_identity_index() {
        let pool = ProxyPool::from_endpoints(vec![
            ProxyEndpoint {
                host: "proxy-a".to_string(),
                port: 1080,
                username: None,
                password: None,
            },
            ProxyEndpoint {
                host: "proxy-b".to_string(),
                port: 1080,
                username: None,
                password: None,
            },
        ]);
        let h = harness(fast_config(2), 3, &[], pool);
        h.set_cursor(1);

        h.transport.push_reply(Some(CLEAN_REPLY));
        h.rotator.run_cycle().await.unwrap();
        assert_eq!(h.transport.last_proxy().unwrap().host, "proxy-b");

        // Identity 2 wraps back around to the first endpoint.
        h.transport.push_reply(Some(CLEAN_REPLY));
        h.rotator.run_cycle().await.unwrap();
        assert_eq!(h.transport.last_proxy().unwrap().host, "proxy-a");
    }
}
