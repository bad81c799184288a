//! Scripted in-memory transport for tests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::proxy_pool::ProxyEndpoint;
use super::{Session, Transport, TransportError};
use crate::models::Identity;

#[derive(Default)]
pub struct ScriptState {
    connect_errors: Mutex<VecDeque<TransportError>>,
    send_script: Mutex<HashMap<String, VecDeque<Result<(), TransportError>>>>,
    replies: Mutex<VecDeque<Option<String>>>,
    sent: Mutex<Vec<(String, String)>>,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    last_proxy: Mutex<Option<ProxyEndpoint>>,
}

/// Transport whose behavior is scripted up front. Unscripted sends succeed,
/// unscripted fetches return no reply, so tests only describe deviations.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    state: Arc<ScriptState>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a connect failure; consumed by the next `connect` call.
    pub fn fail_next_connect(&self, err: TransportError) {
        self.state.connect_errors.lock().unwrap().push_back(err);
    }

    /// Queue the next oracle reply observed by `fetch_latest` (any peer).
    pub fn push_reply(&self, reply: Option<&str>) {
        self.state
            .replies
            .lock()
            .unwrap()
            .push_back(reply.map(|s| s.to_string()));
    }

    /// Queue an outcome for the next `send_text` to `peer`.
    pub fn script_send(&self, peer: &str, outcome: Result<(), TransportError>) {
        self.state
            .send_script
            .lock()
            .unwrap()
            .entry(peer.to_string())
            .or_default()
            .push_back(outcome);
    }

    /// All attempted sends, in order, as `(peer, body)`.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.state.sent.lock().unwrap().clone()
    }

    pub fn sends_to(&self, peer: &str) -> usize {
        self.state
            .sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == peer)
            .count()
    }

    pub fn connect_count(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub fn disconnect_count(&self) -> usize {
        self.state.disconnects.load(Ordering::SeqCst)
    }

    pub fn last_proxy(&self) -> Option<ProxyEndpoint> {
        self.state.last_proxy.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn connect(
        &self,
        _identity: &Identity,
        proxy: Option<&ProxyEndpoint>,
    ) -> Result<Box<dyn Session>, TransportError> {
        *self.state.last_proxy.lock().unwrap() = proxy.cloned();
        if let Some(err) = self.state.connect_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            state: self.state.clone(),
        }))
    }
}

struct ScriptedSession {
    state: Arc<ScriptState>,
}

#[async_trait]
impl Session for ScriptedSession {
    async fn send_text(&self, peer: &str, body: &str) -> Result<(), TransportError> {
        self.state
            .sent
            .lock()
            .unwrap()
            .push((peer.to_string(), body.to_string()));

        let mut script = self.state.send_script.lock().unwrap();
        if let Some(queue) = script.get_mut(peer) {
            if let Some(outcome) = queue.pop_front() {
                return outcome;
            }
        }
        Ok(())
    }

    async fn fetch_latest(&self, _peer: &str) -> Result<Option<String>, TransportError> {
        Ok(self
            .state
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(None))
    }

    async fn disconnect(&self) {
        self.state.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}
