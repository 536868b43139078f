/// Filesystem-backed providers (secret mount and local file).
pub mod file_source;

/// Remote repository provider.
pub mod remote_source;
