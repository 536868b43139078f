use sha2::{Digest, Sha256};

use crate::types::VersionToken;

/// Content-derived version token (lowercase hex SHA-256).
pub fn content_version(content: &[u8]) -> VersionToken {
    format!("{:x}", Sha256::digest(content))
}
