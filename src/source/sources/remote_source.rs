use std::sync::Arc;

use crate::constants::env;
use crate::data::ClientRecord;
use crate::errors::WatchError;
use crate::parser::parse_record_bytes;
use crate::source::{ProviderKind, RecordProvider};
use crate::transport::RemoteStore;
use crate::types::SourceId;

/// Record file read from the remote authoritative store.
///
/// Failures keep their classification (`Auth`, `NotFound`, `Transport`) for
/// diagnostics; the resolver moves on regardless.
pub struct RemoteSourceProvider {
    store: Arc<dyn RemoteStore>,
}

impl RemoteSourceProvider {
    /// Provider over `store`.
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }
}

impl RecordProvider for RemoteSourceProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Remote
    }

    fn origin(&self) -> SourceId {
        self.store.location()
    }

    fn load(&self) -> Result<Vec<ClientRecord>, WatchError> {
        match self.store.fetch()? {
            Some(document) => parse_record_bytes(&document.content),
            None => Err(WatchError::NotFound {
                path: self.store.location(),
            }),
        }
    }
}

/// Placeholder for the remote slot when no repository is configured.
pub struct UnconfiguredRemoteProvider;

impl RecordProvider for UnconfiguredRemoteProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Remote
    }

    fn origin(&self) -> SourceId {
        "github".into()
    }

    fn load(&self) -> Result<Vec<ClientRecord>, WatchError> {
        Err(WatchError::SourceUnavailable {
            source_id: self.origin(),
            reason: format!("{} is not set", env::GITHUB_REPO),
        })
    }
}
