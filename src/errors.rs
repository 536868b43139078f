use std::fmt;
use std::io;

use thiserror::Error;

use crate::source::ProviderKind;
use crate::types::{ConfigProblem, SourceId};

/// Error type for record resolution, remote sync, configuration, and IO failures.
#[derive(Debug, Error)]
pub enum WatchError {
    /// A record document or preferences file could not be decoded.
    #[error("failed to decode record document: {0}")]
    Parse(String),
    /// A single provider could not be read.
    #[error("record source '{source_id}' is unavailable: {reason}")]
    SourceUnavailable {
        /// Origin of the failing provider.
        source_id: SourceId,
        /// Underlying failure.
        reason: String,
    },
    /// Every provider in the chain failed.
    #[error("all record sources failed: {}", SourceFailures(.0))]
    AggregateSourceFailure(Vec<SourceFailure>),
    /// The remote store refused the credentials.
    #[error(
        "remote store rejected the credentials (HTTP {status}); set GITHUB_TOKEN to a token with contents read/write access"
    )]
    Auth {
        /// HTTP status returned by the store.
        status: u16,
    },
    /// The remote file or repository does not exist.
    #[error("remote file '{path}' was not found (check GITHUB_REPO, GITHUB_FILE and GITHUB_BRANCH)")]
    NotFound {
        /// Remote location that was requested.
        path: String,
    },
    /// The remote file changed after its version token was read.
    #[error("remote file '{path}' changed since it was read; reload the records and retry")]
    Conflict {
        /// Remote location that changed.
        path: String,
    },
    /// One or more configuration values are missing or invalid.
    #[error("configuration error: {}", .problems.join("; "))]
    Configuration {
        /// Every problem found, in check order.
        problems: Vec<ConfigProblem>,
    },
    /// Network, timeout, or unexpected HTTP status.
    #[error("transport failure: {0}")]
    Transport(String),
    /// User input was rejected.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// No record matches the company and due date given.
    #[error("client '{company}' with due date '{due}' was not found")]
    RecordNotFound {
        /// Company name searched for.
        company: String,
        /// Due date searched for.
        due: String,
    },
    /// Filesystem failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl WatchError {
    /// Build a configuration error from a single problem.
    pub fn config(problem: impl Into<ConfigProblem>) -> Self {
        Self::Configuration {
            problems: vec![problem.into()],
        }
    }
}

/// One provider's failure, tagged with the provider that produced it.
#[derive(Debug)]
pub struct SourceFailure {
    /// Provider slot in the source chain.
    pub provider: ProviderKind,
    /// Human-readable origin the provider tried to read.
    pub origin: SourceId,
    /// Failure reason.
    pub error: WatchError,
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.provider, self.origin, self.error)
    }
}

struct SourceFailures<'a>(&'a [SourceFailure]);

impl fmt::Display for SourceFailures<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, failure) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}
