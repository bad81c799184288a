use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::proxy_pool::ProxyEndpoint;
use super::{Session, Transport, TransportError, TransportSignal};
use crate::models::Identity;

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Transport adapter for a local protocol gateway speaking JSON over HTTP.
/// The gateway owns the actual messenger wire protocol; this client only
/// opens sessions, relays sends/fetches, and maps gateway error codes onto
/// [`TransportSignal`]s. Egress is routed through the identity's assigned
/// proxy endpoint when one is given.
pub struct HttpBridgeTransport {
    base_url: String,
}

impl HttpBridgeTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    fn build_client(&self, proxy: Option<&ProxyEndpoint>) -> Result<reqwest::Client, TransportError> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(crate::constants::USER_AGENT.as_str());
        if let Some(endpoint) = proxy {
            let proxy = endpoint
                .to_reqwest_proxy()
                .map_err(|e| TransportError::connection(e))?;
            builder = builder.proxy(proxy);
        }
        builder
            .build()
            .map_err(|e| TransportError::connection(format!("failed to build HTTP client: {}", e)))
    }
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct LatestMessageResponse {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GatewayError {
    error: GatewayErrorBody,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorBody {
    code: String,
    #[serde(default)]
    message: String,
}

async fn error_from_response(response: reqwest::Response) -> TransportError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if let Ok(parsed) = serde_json::from_str::<GatewayError>(&body) {
        let signal = TransportSignal::from_wire(&parsed.error.code);
        let message = if parsed.error.message.is_empty() {
            parsed.error.code
        } else {
            parsed.error.message
        };
        return TransportError::new(signal, message);
    }

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return TransportError::new(TransportSignal::TooManyRequests, "gateway returned 429");
    }

    TransportError::new(
        TransportSignal::Internal,
        format!("gateway error: HTTP {} - {}", status, body),
    )
}

fn network_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::new(TransportSignal::Timeout, e.to_string())
    } else {
        TransportError::connection(e.to_string())
    }
}

#[async_trait]
impl Transport for HttpBridgeTransport {
    async fn connect(
        &self,
        identity: &Identity,
        proxy: Option<&ProxyEndpoint>,
    ) -> Result<Box<dyn Session>, TransportError> {
        let client = self.build_client(proxy)?;

        let response = client
            .post(format!("{}/v1/sessions", self.base_url))
            .json(&json!({
                "api_key": identity.credentials.api_key,
                "session_token": identity.session_token,
            }))
            .send()
            .await
            .map_err(network_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| TransportError::connection(format!("bad session response: {}", e)))?;

        Ok(Box::new(HttpBridgeSession {
            client,
            base_url: self.base_url.clone(),
            session_id: session.session_id,
        }))
    }
}

struct HttpBridgeSession {
    client: reqwest::Client,
    base_url: String,
    session_id: String,
}

#[async_trait]
impl Session for HttpBridgeSession {
    async fn send_text(&self, peer: &str, body: &str) -> Result<(), TransportError> {
        let response = self
            .client
            .post(format!(
                "{}/v1/sessions/{}/messages",
                self.base_url, self.session_id
            ))
            .json(&json!({ "peer": peer, "body": body }))
            .send()
            .await
            .map_err(network_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }

    async fn fetch_latest(&self, peer: &str) -> Result<Option<String>, TransportError> {
        let response = self
            .client
            .get(format!(
                "{}/v1/sessions/{}/peers/{}/messages/latest",
                self.base_url, self.session_id, peer
            ))
            .send()
            .await
            .map_err(network_error)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let latest: LatestMessageResponse = response
            .json()
            .await
            .map_err(|e| TransportError::connection(format!("bad message response: {}", e)))?;
        Ok(latest.text)
    }

    async fn disconnect(&self) {
        // Best-effort teardown; the gateway reaps dead sessions on its own.
        let _ = self
            .client
            .delete(format!("{}/v1/sessions/{}", self.base_url, self.session_id))
            .send()
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let transport = HttpBridgeTransport::new("http://127.0.0.1:8954///");
        assert_eq!(transport.base_url, "http://127.0.0.1:8954");
    }

    #[test]
    fn gateway_error_body_parses() {
        let parsed: GatewayError =
            serde_json::from_str(r#"{"error":{"code":"PEER_FLOOD","message":"cool off"}}"#)
                .expect("parse gateway error");
        assert_eq!(parsed.error.code, "PEER_FLOOD");
        assert_eq!(parsed.error.message, "cool off");
    }
}
