use std::time::Duration;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::info;
use ureq::Agent;

use crate::config::ServerSyncConfig;
use crate::data::ClientRecord;
use crate::dates::format_iso;
use crate::errors::WatchError;
use crate::transport::github::{transport_error, unexpected_status};

/// One client in the uploaded snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SnapshotClient {
    /// Company name.
    pub empresa: String,
    /// ISO date, or empty when the record is undated.
    pub vencimento_iso: String,
    /// Display date, or the raw value when unparseable.
    pub vencimento_br: String,
}

/// Full client list pushed to the companion web service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ServerSnapshot {
    /// Clients in file order.
    pub clients: Vec<SnapshotClient>,
    /// Local time the snapshot was built, ISO 8601.
    pub generated_at: String,
}

impl ServerSnapshot {
    /// Build a snapshot stamped with `generated_at`.
    pub fn build(records: &[ClientRecord], generated_at: NaiveDateTime) -> Self {
        let clients = records
            .iter()
            .map(|record| SnapshotClient {
                empresa: record.company.clone(),
                vencimento_iso: record.due_date().map(format_iso).unwrap_or_default(),
                vencimento_br: record.display_due(),
            })
            .collect();
        Self {
            clients,
            generated_at: generated_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }
}

/// POST `snapshot` as JSON; any non-2xx status is a transport failure.
pub fn post_snapshot(
    config: &ServerSyncConfig,
    snapshot: &ServerSnapshot,
    timeout: Duration,
) -> Result<(), WatchError> {
    let agent: Agent = Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into();
    let body = serde_json::to_vec(snapshot)
        .map_err(|err| WatchError::Transport(format!("failed to encode snapshot: {err}")))?;
    let mut request = agent
        .post(&config.url)
        .header("Content-Type", "application/json");
    if let Some(token) = config.token.as_deref() {
        request = request.header("Authorization", format!("Bearer {token}"));
    }
    let response = request.send(&body[..]).map_err(transport_error)?;
    let status = response.status().as_u16();
    if !(200..300).contains(&status) {
        let text = response.into_body().read_to_string().unwrap_or_default();
        return Err(unexpected_status(status, &text));
    }
    info!(
        "[license-watch:server-sync] uploaded {} clients to {}",
        snapshot.clients.len(),
        config.url
    );
    Ok(())
}
