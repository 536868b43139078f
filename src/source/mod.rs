//! Record providers and the ordered source chain.
//!
//! Ownership model:
//! - `RecordProvider` loads the whole record list from one origin.
//! - `SourceResolver` owns the providers and consults them in the fixed
//!   order remote → secret → local, stopping at the first success.
//! - Per-provider failures are recovered internally; only an exhausted chain
//!   surfaces as `WatchError::AggregateSourceFailure`.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{info, warn};

use crate::config::WatchConfig;
use crate::data::ClientRecord;
use crate::errors::{SourceFailure, WatchError};
use crate::transport::{GithubContentsStore, RemoteStore};
use crate::types::SourceId;

/// Source implementation modules.
pub mod sources;

pub use sources::file_source::FileSourceProvider;
pub use sources::remote_source::{RemoteSourceProvider, UnconfiguredRemoteProvider};

/// Slot of a provider in the source chain. Declaration order is consult order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProviderKind {
    /// GitHub contents API.
    Remote,
    /// Secret-mounted file.
    Secret,
    /// Local record file.
    Local,
}

impl ProviderKind {
    /// Stable lowercase name used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Remote => "remote",
            ProviderKind::Secret => "secret",
            ProviderKind::Local => "local",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which provider satisfied a load, and from where.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceDescriptor {
    /// Slot that supplied the records.
    pub kind: ProviderKind,
    /// Path or URL the records came from.
    pub origin: SourceId,
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.origin, self.kind)
    }
}

/// One origin of the full record list.
pub trait RecordProvider: Send + Sync {
    /// Slot in the source chain.
    fn kind(&self) -> ProviderKind;
    /// Human-readable origin used in diagnostics.
    fn origin(&self) -> SourceId;
    /// Load every record. An empty list is a success.
    fn load(&self) -> Result<Vec<ClientRecord>, WatchError>;
}

/// Outcome of a successful resolution.
#[derive(Debug)]
pub struct ResolvedRecords {
    /// Records in source order.
    pub records: Vec<ClientRecord>,
    /// Provider that succeeded.
    pub source: SourceDescriptor,
    /// Failures of providers consulted before the successful one.
    pub skipped: Vec<SourceFailure>,
}

/// Ordered chain of record providers.
#[derive(Default)]
pub struct SourceResolver {
    providers: Vec<Box<dyn RecordProvider>>,
}

impl SourceResolver {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the standard chain: GitHub repository, secret file, local file.
    pub fn from_config(config: &WatchConfig) -> Self {
        let remote: Box<dyn RecordProvider> = match &config.remote {
            Some(remote) => {
                let store: Arc<dyn RemoteStore> =
                    Arc::new(GithubContentsStore::new(remote.clone(), config.http_timeout));
                Box::new(RemoteSourceProvider::new(store))
            }
            None => Box::new(UnconfiguredRemoteProvider),
        };
        Self::new()
            .with_boxed_provider(remote)
            .with_provider(FileSourceProvider::secret(&config.secret_file))
            .with_provider(FileSourceProvider::local(&config.local_file))
    }

    /// Register a provider. The chain stays ordered by [`ProviderKind`];
    /// providers of the same kind keep their registration order.
    pub fn with_provider(self, provider: impl RecordProvider + 'static) -> Self {
        self.with_boxed_provider(Box::new(provider))
    }

    /// Register an already boxed provider.
    pub fn with_boxed_provider(mut self, provider: Box<dyn RecordProvider>) -> Self {
        let position = self
            .providers
            .iter()
            .position(|existing| existing.kind() > provider.kind())
            .unwrap_or(self.providers.len());
        self.providers.insert(position, provider);
        self
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// True when no provider is registered.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Consult providers in order until one succeeds.
    pub fn resolve(&self) -> Result<ResolvedRecords, WatchError> {
        let mut failures = Vec::new();
        for provider in &self.providers {
            let origin = provider.origin();
            match provider.load() {
                Ok(records) => {
                    info!(
                        "[license-watch:source] loaded {} records from {} ({})",
                        records.len(),
                        origin,
                        provider.kind()
                    );
                    return Ok(ResolvedRecords {
                        records,
                        source: SourceDescriptor {
                            kind: provider.kind(),
                            origin,
                        },
                        skipped: failures,
                    });
                }
                Err(error) => {
                    warn!(
                        "[license-watch:source] {} source {} failed: {}",
                        provider.kind(),
                        origin,
                        error
                    );
                    failures.push(SourceFailure {
                        provider: provider.kind(),
                        origin,
                        error,
                    });
                }
            }
        }
        Err(WatchError::AggregateSourceFailure(failures))
    }
}

/// In-memory provider for tests and fixed datasets.
///
/// Counts how often it was consulted.
pub struct InMemoryProvider {
    kind: ProviderKind,
    origin: SourceId,
    outcome: Result<Vec<ClientRecord>, String>,
    loads: AtomicUsize,
}

impl InMemoryProvider {
    /// Provider that always returns `records`.
    pub fn new(kind: ProviderKind, origin: impl Into<SourceId>, records: Vec<ClientRecord>) -> Self {
        Self {
            kind,
            origin: origin.into(),
            outcome: Ok(records),
            loads: AtomicUsize::new(0),
        }
    }

    /// Provider that always fails with `SourceUnavailable { reason }`.
    pub fn failing(kind: ProviderKind, origin: impl Into<SourceId>, reason: impl Into<String>) -> Self {
        Self {
            kind,
            origin: origin.into(),
            outcome: Err(reason.into()),
            loads: AtomicUsize::new(0),
        }
    }

    /// Number of `load` calls so far.
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl RecordProvider for InMemoryProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn origin(&self) -> SourceId {
        self.origin.clone()
    }

    fn load(&self) -> Result<Vec<ClientRecord>, WatchError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            Ok(records) => Ok(records.clone()),
            Err(reason) => Err(WatchError::SourceUnavailable {
                source_id: self.origin.clone(),
                reason: reason.clone(),
            }),
        }
    }
}

impl<T: RecordProvider + ?Sized> RecordProvider for Arc<T> {
    fn kind(&self) -> ProviderKind {
        (**self).kind()
    }

    fn origin(&self) -> SourceId {
        (**self).origin()
    }

    fn load(&self) -> Result<Vec<ClientRecord>, WatchError> {
        (**self).load()
    }
}
