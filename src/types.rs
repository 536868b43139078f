/// Company display name as stored in the record file.
/// Examples: `Acme Ltda`, `Zed Comércio`
pub type CompanyName = String;
/// Due date exactly as read from the record file (may be unparseable).
/// Examples: `2025-02-25`, `25/02/2025`, `soon`
pub type RawDate = String;
/// Human-readable origin of a record source.
/// Examples: `github:acme/licenses/clientes.csv@main`, `/etc/secrets/clientes.csv`
pub type SourceId = String;
/// Opaque identifier of the remote copy's content state.
/// Example: `95b966ae1c166bd92f8ae7d1c313e738c731dfc3`
pub type VersionToken = String;
/// Environment variable name used by the configuration loader.
/// Examples: `SMTP_EMAIL`, `DAYS_THRESHOLDS`
pub type EnvKey = &'static str;
/// Configuration problem description reported by the loader.
/// Example: `DAYS_THRESHOLDS entry 'x' is not a non-negative integer`
pub type ConfigProblem = String;
