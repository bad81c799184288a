//! Read-only operator surface. Localhost only; the rotation core itself
//! exposes no network API.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

use crate::models::DeliveryStatus;
use crate::modules::rotation::Rotator;
use crate::modules::system::scheduler::scheduler_observability_snapshot;

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn status(State(rotator): State<Arc<Rotator>>) -> Json<Value> {
    let identities: Vec<Value> = rotator
        .identities()
        .list()
        .map(|list| {
            list.iter()
                .map(|identity| {
                    json!({
                        "index": identity.index,
                        "handle": identity.handle,
                        "status": identity.status,
                        "last_checked_at": identity.last_checked_at,
                        "status_evidence": identity.status_evidence,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let recipient_counts = json!({
        "active": rotator.recipients().count_by_status(DeliveryStatus::Active).unwrap_or(0),
        "messaged": rotator.recipients().count_by_status(DeliveryStatus::Messaged).unwrap_or(0),
        "invalid_recipient": rotator
            .recipients()
            .count_by_status(DeliveryStatus::InvalidRecipient)
            .unwrap_or(0),
    });

    Json(json!({
        "scheduler": scheduler_observability_snapshot(),
        "identities": identities,
        "recipients": recipient_counts,
    }))
}

pub fn start_status_server(rotator: Arc<Rotator>, port: u16) {
    tokio::spawn(async move {
        let app = Router::new()
            .route("/health", get(health))
            .route("/status", get(status))
            .with_state(rotator);

        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => {
                info!("Status server listening on http://{}", addr);
                if let Err(e) = axum::serve(listener, app).await {
                    error!("Status server stopped: {}", e);
                }
            }
            Err(e) => {
                error!("Failed to bind status server on {}: {}", addr, e);
            }
        }
    });
}
