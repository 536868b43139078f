//! Storage transports behind the record sources and the sync client.
//!
//! `RemoteStore` is the seam for the authoritative remote copy. It exposes
//! exactly the two calls compare-and-swap needs: read the current document
//! with its version token, and write new content conditioned on a token.

use std::sync::Mutex;

use crate::errors::WatchError;
use crate::hash::content_version;
use crate::types::{SourceId, VersionToken};

/// Local filesystem helpers.
pub mod fs;
/// GitHub contents API store.
pub mod github;
/// JSON snapshot upload to the companion web service.
pub mod snapshot;

pub use github::GithubContentsStore;

/// Remote document together with the version it was read at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteDocument {
    /// Raw file bytes.
    pub content: Vec<u8>,
    /// Token to pass back on the next conditional write.
    pub version: VersionToken,
}

/// Acknowledgement of an accepted remote write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PutReceipt {
    /// Version of the new content, when the store reports it.
    pub version: Option<VersionToken>,
}

/// Remote authoritative copy of the record file.
pub trait RemoteStore: Send + Sync {
    /// Human-readable location, used in logs and source descriptors.
    fn location(&self) -> SourceId;

    /// Read the current document. `Ok(None)` means it does not exist yet.
    fn fetch(&self) -> Result<Option<RemoteDocument>, WatchError>;

    /// Write `content`.
    ///
    /// With `expected = Some(token)` the store must reject the write with
    /// [`WatchError::Conflict`] unless `token` is still the live version.
    /// With `expected = None` the write creates the document and must be
    /// rejected as a conflict when it already exists.
    fn put(
        &self,
        content: &[u8],
        message: &str,
        expected: Option<&VersionToken>,
    ) -> Result<PutReceipt, WatchError>;
}

/// In-memory remote store with strict compare-and-swap semantics.
///
/// Useful for tests and offline runs. Versions are content hashes.
#[derive(Debug, Default)]
pub struct InMemoryRemoteStore {
    location: SourceId,
    state: Mutex<Option<RemoteDocument>>,
    commits: Mutex<Vec<String>>,
}

impl InMemoryRemoteStore {
    /// Create an empty store (the document does not exist yet).
    pub fn new(location: impl Into<SourceId>) -> Self {
        Self {
            location: location.into(),
            state: Mutex::new(None),
            commits: Mutex::new(Vec::new()),
        }
    }

    /// Create a store that already holds `content`.
    pub fn with_content(location: impl Into<SourceId>, content: impl Into<Vec<u8>>) -> Self {
        let content = content.into();
        let store = Self::new(location);
        *store.lock_state() = Some(RemoteDocument {
            version: content_version(&content),
            content,
        });
        store
    }

    /// Current content, if any.
    pub fn content(&self) -> Option<Vec<u8>> {
        self.lock_state().as_ref().map(|doc| doc.content.clone())
    }

    /// Commit messages of every accepted write, oldest first.
    pub fn commit_messages(&self) -> Vec<String> {
        self.commits
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, Option<RemoteDocument>> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RemoteStore for InMemoryRemoteStore {
    fn location(&self) -> SourceId {
        self.location.clone()
    }

    fn fetch(&self) -> Result<Option<RemoteDocument>, WatchError> {
        Ok(self.lock_state().clone())
    }

    fn put(
        &self,
        content: &[u8],
        message: &str,
        expected: Option<&VersionToken>,
    ) -> Result<PutReceipt, WatchError> {
        let mut state = self.lock_state();
        let live = state.as_ref().map(|doc| &doc.version);
        if live != expected {
            return Err(WatchError::Conflict {
                path: self.location.clone(),
            });
        }
        let version = content_version(content);
        *state = Some(RemoteDocument {
            content: content.to_vec(),
            version: version.clone(),
        });
        self.commits
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(message.to_string());
        Ok(PutReceipt {
            version: Some(version),
        })
    }
}
