#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Due-date classification: display bands and notification eligibility.
pub mod classify;
/// Command-line runners shared by the binaries.
pub mod cli;
/// Runtime configuration, thresholds, and preferences.
pub mod config;
/// Centralized constants grouped by concern.
pub mod constants;
/// Client record and classification types.
pub mod data;
/// Due-date parsing and rendering.
pub mod dates;
mod hash;
/// Notification composition and mail delivery.
pub mod notify;
/// Delimited-text record parsing and rendering.
pub mod parser;
/// Record providers and the ordered source chain.
pub mod source;
/// Editable local record file.
pub mod store;
/// Compare-and-swap write-back to the remote store.
pub mod sync;
/// Detached background tasks.
pub mod task;
/// Storage transports (filesystem, GitHub, companion server).
pub mod transport;
/// Shared type aliases.
pub mod types;

mod errors;

pub use classify::{DueClassifier, NotifyPolicy};
pub use config::{Preferences, RemoteConfig, ThresholdSet, WatchConfig};
pub use data::{ClassifiedRecord, ClientRecord, DisplayBand, DisplayRow};
pub use errors::{SourceFailure, WatchError};
pub use notify::{MailTransport, Notification, SmtpMailer, compose};
pub use source::{ProviderKind, RecordProvider, SourceDescriptor, SourceResolver};
pub use store::ClientStore;
pub use sync::{PushOutcome, RemoteSyncClient, WriteMode};
pub use transport::{InMemoryRemoteStore, RemoteStore};
pub use types::{CompanyName, RawDate, SourceId, VersionToken};
