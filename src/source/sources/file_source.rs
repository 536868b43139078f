use std::path::{Path, PathBuf};

use tracing::debug;

use crate::data::ClientRecord;
use crate::errors::WatchError;
use crate::parser::parse_record_bytes;
use crate::source::{ProviderKind, RecordProvider};
use crate::transport::fs::read_optional;
use crate::types::SourceId;

/// Record file on the local filesystem.
///
/// Used twice in the standard chain: once for a secret-mounted file
/// (deployment platforms expose secrets as read-only files) and once for the
/// editable local data file.
pub struct FileSourceProvider {
    kind: ProviderKind,
    path: PathBuf,
}

impl FileSourceProvider {
    /// Provider for a secret-mounted file.
    pub fn secret(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: ProviderKind::Secret,
            path: path.into(),
        }
    }

    /// Provider for the local data file.
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: ProviderKind::Local,
            path: path.into(),
        }
    }

    /// File this provider reads.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordProvider for FileSourceProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn origin(&self) -> SourceId {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<Vec<ClientRecord>, WatchError> {
        let Some(bytes) = read_optional(&self.path)? else {
            return Err(WatchError::SourceUnavailable {
                source_id: self.origin(),
                reason: "file does not exist".into(),
            });
        };
        debug!(
            "[license-watch:file] read {} bytes from {}",
            bytes.len(),
            self.path.display()
        );
        parse_record_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn loads_records_from_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("clientes.csv");
        std::fs::write(&path, "empresa;vencimento\nAcme;2025-01-01\n").unwrap();

        let provider = FileSourceProvider::local(&path);
        assert_eq!(provider.kind(), ProviderKind::Local);
        let records = provider.load().unwrap();
        assert_eq!(records, vec![ClientRecord::new("Acme", "2025-01-01")]);
    }

    #[test]
    fn header_only_file_is_a_successful_empty_load() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("clientes.csv");
        std::fs::write(&path, "empresa,vencimento\n").unwrap();
        assert!(FileSourceProvider::secret(&path).load().unwrap().is_empty());
    }

    #[test]
    fn missing_file_is_unavailable() {
        let temp = tempdir().unwrap();
        let provider = FileSourceProvider::secret(temp.path().join("absent.csv"));
        let err = provider.load().unwrap_err();
        assert!(matches!(err, WatchError::SourceUnavailable { ref reason, .. } if reason == "file does not exist"));
    }

    #[test]
    fn undecodable_file_is_a_parse_failure() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("clientes.csv");
        std::fs::write(&path, [0xffu8, 0xfe, 0x00, b'\n']).unwrap();
        assert!(matches!(
            FileSourceProvider::local(&path).load(),
            Err(WatchError::Parse(_))
        ));
    }
}
