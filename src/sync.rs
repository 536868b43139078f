//! Compare-and-swap write-back of the record file to the remote store.

use std::io;
use std::sync::Arc;

use tracing::info;

use crate::config::WatchConfig;
use crate::errors::WatchError;
use crate::task::{DetachedTask, spawn_detached};
use crate::transport::{GithubContentsStore, RemoteStore};
use crate::types::{SourceId, VersionToken};

/// Whether a push created the remote document or replaced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteMode {
    /// No document existed; it was created.
    Create,
    /// An existing document was replaced.
    Update,
}

/// Result of an accepted push.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PushOutcome {
    /// Whether the push created or replaced the document.
    pub mode: WriteMode,
    /// New version reported by the store, if any.
    pub version: Option<VersionToken>,
}

/// Writes the record file back to the remote store.
///
/// Every push reads the live version token right before writing and issues
/// exactly one conditional write. Conflicts and credential failures are
/// returned to the caller without retrying.
#[derive(Clone)]
pub struct RemoteSyncClient {
    store: Arc<dyn RemoteStore>,
}

impl RemoteSyncClient {
    /// Client over any remote store.
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    /// GitHub-backed client, or `None` when no repository is configured.
    pub fn from_config(config: &WatchConfig) -> Option<Self> {
        config.remote.as_ref().map(|remote| {
            Self::new(Arc::new(GithubContentsStore::new(
                remote.clone(),
                config.http_timeout,
            )))
        })
    }

    /// Location of the underlying store.
    pub fn location(&self) -> SourceId {
        self.store.location()
    }

    /// Push `content` with a single conditional write.
    pub fn push(&self, content: &[u8], message: &str) -> Result<PushOutcome, WatchError> {
        let expected = self.store.fetch()?.map(|document| document.version);
        let mode = match expected {
            Some(_) => WriteMode::Update,
            None => WriteMode::Create,
        };
        let receipt = self.store.put(content, message, expected.as_ref())?;
        info!(
            "[license-watch:sync] pushed {} bytes to {} ({:?})",
            content.len(),
            self.location(),
            mode
        );
        Ok(PushOutcome {
            mode,
            version: receipt.version,
        })
    }

    /// Run [`push`](Self::push) on a detached thread.
    pub fn push_detached(
        &self,
        content: Vec<u8>,
        message: impl Into<String>,
    ) -> io::Result<DetachedTask<PushOutcome>> {
        let client = self.clone();
        let message = message.into();
        spawn_detached("remote-push", move || client.push(&content, &message))
    }
}
