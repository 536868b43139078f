//! Runtime configuration.
//!
//! Everything except the sender display name comes from the process
//! environment and is never persisted. [`WatchConfig::from_lookup`] validates
//! every value up front and reports all problems in one
//! [`WatchError::Configuration`].

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::constants::classify::DEFAULT_THRESHOLDS;
use crate::constants::env;
use crate::constants::files::{
    DEFAULT_LOCAL_FILE, DEFAULT_PREFERENCES_FILE, DEFAULT_SECRET_FILE, ENV_FILES,
};
use crate::constants::notify::{DEFAULT_FROM_NAME, DEFAULT_SMTP_HOST, DEFAULT_SMTP_PORT};
use crate::constants::remote::{
    DEFAULT_API_URL, DEFAULT_BRANCH, DEFAULT_COMMITTER_EMAIL, DEFAULT_COMMITTER_NAME,
    DEFAULT_FILE, DEFAULT_HTTP_TIMEOUT_SECS,
};
use crate::errors::WatchError;
use crate::transport::fs::{read_optional, write_atomic};
use crate::types::{ConfigProblem, SourceId};

/// Day counts at which an advance notification fires. Never empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThresholdSet {
    days: BTreeSet<u32>,
}

impl ThresholdSet {
    /// Build a set from day counts; an empty input is rejected.
    pub fn new(days: impl IntoIterator<Item = u32>) -> Result<Self, WatchError> {
        let days: BTreeSet<u32> = days.into_iter().collect();
        if days.is_empty() {
            return Err(WatchError::config("threshold set must not be empty"));
        }
        Ok(Self { days })
    }

    /// Parse a comma-separated list such as `30,15,5`.
    ///
    /// Every invalid entry is reported, not just the first.
    pub fn parse(raw: &str) -> Result<Self, Vec<ConfigProblem>> {
        let mut days = BTreeSet::new();
        let mut problems = Vec::new();
        for entry in raw.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
            match entry.parse::<u32>() {
                Ok(value) => {
                    days.insert(value);
                }
                Err(_) => problems.push(format!(
                    "{} entry '{entry}' is not a non-negative integer",
                    env::DAYS_THRESHOLDS
                )),
            }
        }
        if problems.is_empty() && days.is_empty() {
            problems.push(format!("{} must list at least one day count", env::DAYS_THRESHOLDS));
        }
        if problems.is_empty() {
            Ok(Self { days })
        } else {
            Err(problems)
        }
    }

    /// Whether `days_until_due` matches a configured milestone exactly.
    pub fn contains(&self, days_until_due: i64) -> bool {
        u32::try_from(days_until_due)
            .map(|days| self.days.contains(&days))
            .unwrap_or(false)
    }

    /// Milestones in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.days.iter().copied()
    }
}

impl Default for ThresholdSet {
    fn default() -> Self {
        Self {
            days: DEFAULT_THRESHOLDS.into_iter().collect(),
        }
    }
}

/// Location and credentials of the remote repository copy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteConfig {
    /// API base URL, e.g. `https://api.github.com`.
    pub api_url: String,
    /// Repository as `owner/name`.
    pub repo: String,
    /// Path of the record file inside the repository.
    pub file: String,
    /// Branch read from and written to.
    pub branch: String,
    /// Optional token; public repositories can be read without one.
    pub token: Option<String>,
    /// Commit author name for pushes.
    pub committer_name: String,
    /// Commit author email for pushes.
    pub committer_email: String,
}

impl RemoteConfig {
    /// Create a config for `repo` with default file, branch, and API URL.
    pub fn new(repo: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            repo: repo.into(),
            file: DEFAULT_FILE.to_string(),
            branch: DEFAULT_BRANCH.to_string(),
            token: None,
            committer_name: DEFAULT_COMMITTER_NAME.to_string(),
            committer_email: DEFAULT_COMMITTER_EMAIL.to_string(),
        }
    }

    /// Override the API base URL.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Override the file path inside the repository.
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = file.into();
        self
    }

    /// Override the branch.
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    /// Set the access token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Human-readable location, e.g. `github:acme/licenses/clientes.csv@main`.
    pub fn location(&self) -> SourceId {
        format!("github:{}/{}@{}", self.repo, self.file, self.branch)
    }
}

/// Outbound mail settings, present only when fully configured.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MailSettings {
    /// Login address, also the default sender address.
    pub smtp_email: String,
    /// App password for the SMTP login.
    pub app_password: String,
    /// Notification recipient; defaults to `smtp_email`.
    pub recipient: String,
    /// Display name in the `From` header.
    pub from_name: String,
    /// SMTP relay host.
    pub host: String,
    /// SMTP relay port; 465 uses implicit TLS, other ports STARTTLS.
    pub port: u16,
}

/// Companion web service that receives JSON snapshots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerSyncConfig {
    /// Snapshot endpoint.
    pub url: String,
    /// Bearer token, if the service requires one.
    pub token: Option<String>,
}

/// Which optional groups must be present for the current command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConfigRequirements {
    /// Mail credentials must be complete (sending notifications).
    pub mail: bool,
    /// The remote repository must be configured (explicit push).
    pub remote: bool,
    /// The server sync endpoint must be configured.
    pub server_sync: bool,
}

/// Immutable runtime configuration, built once at startup.
#[derive(Clone, Debug)]
pub struct WatchConfig {
    /// Sender display name used in subjects and the `From` header.
    pub from_name: String,
    /// Milestones for advance notices.
    pub thresholds: ThresholdSet,
    /// Mail settings, when complete.
    pub mail: Option<MailSettings>,
    /// Remote repository, when `GITHUB_REPO` is set.
    pub remote: Option<RemoteConfig>,
    /// Companion server, when a URL is set.
    pub server_sync: Option<ServerSyncConfig>,
    /// Local record file (last source in the chain, and the edit target).
    pub local_file: PathBuf,
    /// Secret-mounted record file (second source in the chain).
    pub secret_file: PathBuf,
    /// Where the sender display name is persisted.
    pub preferences_file: PathBuf,
    /// Start a best-effort remote push after each local save.
    pub push_on_save: bool,
    /// Bound applied to every blocking network call.
    pub http_timeout: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            from_name: DEFAULT_FROM_NAME.to_string(),
            thresholds: ThresholdSet::default(),
            mail: None,
            remote: None,
            server_sync: None,
            local_file: PathBuf::from(DEFAULT_LOCAL_FILE),
            secret_file: PathBuf::from(DEFAULT_SECRET_FILE),
            preferences_file: PathBuf::from(DEFAULT_PREFERENCES_FILE),
            push_on_save: false,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl WatchConfig {
    /// Load from the process environment and the preferences file.
    pub fn from_env(requirements: ConfigRequirements) -> Result<Self, WatchError> {
        let lookup = |key: &str| std::env::var(key).ok();
        let preferences = Preferences::load_or_default(&preferences_path(&lookup));
        Self::from_lookup(&lookup, &preferences, requirements)
    }

    /// Build a configuration from an environment lookup.
    ///
    /// Blank values count as missing. All missing or invalid values are
    /// collected before returning.
    pub fn from_lookup<E>(
        lookup: &E,
        preferences: &Preferences,
        requirements: ConfigRequirements,
    ) -> Result<Self, WatchError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut problems: Vec<ConfigProblem> = Vec::new();
        let defaults = Self::default();

        let from_name = get(env::FROM_NAME)
            .or_else(|| {
                preferences
                    .from_name
                    .as_deref()
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| DEFAULT_FROM_NAME.to_string());

        let thresholds = match get(env::DAYS_THRESHOLDS) {
            Some(raw) => ThresholdSet::parse(&raw).unwrap_or_else(|mut found| {
                problems.append(&mut found);
                ThresholdSet::default()
            }),
            None => ThresholdSet::default(),
        };

        let http_timeout = match get(env::HTTP_TIMEOUT_SECS) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    problems.push(format!(
                        "{} '{raw}' must be a positive number of seconds",
                        env::HTTP_TIMEOUT_SECS
                    ));
                    defaults.http_timeout
                }
            },
            None => defaults.http_timeout,
        };

        let mail = load_mail(&get, &from_name, requirements.mail, &mut problems);
        let remote = load_remote(&get, requirements.remote, &mut problems);

        let server_sync = first_present(&get, &env::SERVER_URL_KEYS).map(|url| ServerSyncConfig {
            url,
            token: first_present(&get, &env::SERVER_TOKEN_KEYS),
        });
        if requirements.server_sync && server_sync.is_none() {
            problems.push(format!(
                "{} is required to sync with the server",
                env::SERVER_URL_KEYS[0]
            ));
        }

        if !problems.is_empty() {
            return Err(WatchError::Configuration { problems });
        }

        Ok(Self {
            from_name,
            thresholds,
            mail,
            remote,
            server_sync,
            local_file: get(env::CLIENTS_FILE)
                .map(PathBuf::from)
                .unwrap_or(defaults.local_file),
            secret_file: get(env::CLIENTS_SECRET_FILE)
                .map(PathBuf::from)
                .unwrap_or(defaults.secret_file),
            preferences_file: preferences_path(lookup),
            push_on_save: get(env::GITHUB_PUSH_ON_SAVE).as_deref() == Some("1"),
            http_timeout,
        })
    }
}

fn load_mail(
    get: &impl Fn(&str) -> Option<String>,
    from_name: &str,
    required: bool,
    problems: &mut Vec<ConfigProblem>,
) -> Option<MailSettings> {
    let smtp_email = get(env::SMTP_EMAIL);
    let app_password = get(env::SMTP_APP_PASSWORD);
    let owner_email = get(env::OWNER_EMAIL);
    let mut valid = true;

    if required && smtp_email.is_none() {
        problems.push(format!("{} is required to send notifications", env::SMTP_EMAIL));
    }
    if required && app_password.is_none() {
        problems.push(format!("{} is required to send notifications", env::SMTP_APP_PASSWORD));
    }
    for (key, value) in [(env::SMTP_EMAIL, &smtp_email), (env::OWNER_EMAIL, &owner_email)] {
        if let Some(address) = value {
            if !is_valid_address(address) {
                problems.push(format!("{key} '{address}' is not a valid email address"));
                valid = false;
            }
        }
    }
    let port = match get(env::SMTP_PORT) {
        Some(raw) => match raw.parse::<u16>() {
            Ok(port) if port > 0 => port,
            _ => {
                problems.push(format!("{} '{raw}' is not a valid port", env::SMTP_PORT));
                valid = false;
                DEFAULT_SMTP_PORT
            }
        },
        None => DEFAULT_SMTP_PORT,
    };

    let (Some(smtp_email), Some(app_password)) = (smtp_email, app_password) else {
        return None;
    };
    if !valid {
        return None;
    }
    Some(MailSettings {
        recipient: owner_email.unwrap_or_else(|| smtp_email.clone()),
        smtp_email,
        app_password,
        from_name: from_name.to_string(),
        host: get(env::SMTP_HOST).unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
        port,
    })
}

fn load_remote(
    get: &impl Fn(&str) -> Option<String>,
    required: bool,
    problems: &mut Vec<ConfigProblem>,
) -> Option<RemoteConfig> {
    let Some(repo) = get(env::GITHUB_REPO) else {
        if required {
            problems.push(format!("{} is required to push to the remote store", env::GITHUB_REPO));
        }
        return None;
    };
    let well_formed = repo
        .split_once('/')
        .is_some_and(|(owner, name)| !owner.is_empty() && !name.is_empty() && !name.contains('/'));
    if !well_formed {
        problems.push(format!("{} '{repo}' must look like owner/name", env::GITHUB_REPO));
        return None;
    }
    let mut config = RemoteConfig::new(repo);
    if let Some(api_url) = get(env::GITHUB_API_URL) {
        config = config.with_api_url(api_url);
    }
    if let Some(file) = get(env::GITHUB_FILE) {
        config = config.with_file(file);
    }
    if let Some(branch) = get(env::GITHUB_BRANCH) {
        config = config.with_branch(branch);
    }
    if let Some(token) = get(env::GITHUB_TOKEN) {
        config = config.with_token(token);
    }
    if let Some(name) = get(env::GITHUB_COMMITTER_NAME) {
        config.committer_name = name;
    }
    if let Some(email) = get(env::GITHUB_COMMITTER_EMAIL) {
        config.committer_email = email;
    }
    Some(config)
}

fn first_present(get: &impl Fn(&str) -> Option<String>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| get(*key))
}

fn is_valid_address(value: &str) -> bool {
    value.parse::<lettre::Address>().is_ok()
}

/// Load `DadApp.env` and then `.env` from `dir` into the process environment.
///
/// Variables that are already set are never overridden, so the first file
/// wins over the second and the real environment wins over both. Missing
/// files are skipped and unreadable ones are logged. Returns the files loaded.
pub fn load_env_files(dir: &Path) -> Vec<PathBuf> {
    let mut loaded = Vec::new();
    for name in ENV_FILES {
        let path = dir.join(name);
        if !path.is_file() {
            debug!("[license-watch:config] no env file at {}", path.display());
            continue;
        }
        match dotenv::from_path(&path) {
            Ok(()) => {
                debug!("[license-watch:config] loaded {}", path.display());
                loaded.push(path);
            }
            Err(err) => warn!("[license-watch:config] skipping {}: {err}", path.display()),
        }
    }
    loaded
}

/// Path of the preferences file for an environment lookup.
pub fn preferences_path(lookup: &impl Fn(&str) -> Option<String>) -> PathBuf {
    lookup(env::PREFERENCES_FILE)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PREFERENCES_FILE))
}

/// Small non-sensitive preferences record persisted next to the data file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Sender display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_name: Option<String>,
}

impl Preferences {
    /// Read preferences; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, WatchError> {
        let Some(bytes) = read_optional(path)? else {
            return Ok(Self::default());
        };
        serde_json::from_slice(&bytes).map_err(|err| {
            WatchError::Parse(format!("preferences file {} is invalid: {err}", path.display()))
        })
    }

    /// Read preferences, logging and ignoring any failure.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|err| {
            warn!("[license-watch:config] ignoring preferences: {err}");
            Self::default()
        })
    }

    /// Replace the preferences file as a whole.
    pub fn save(&self, path: &Path) -> Result<(), WatchError> {
        let mut bytes = serde_json::to_vec_pretty(self)
            .map_err(|err| WatchError::Io(std::io::Error::other(err)))?;
        bytes.push(b'\n');
        write_atomic(path, &bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::tempdir;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn env_files_load_in_order_without_overriding() {
        let temp = tempdir().unwrap();
        fs::write(
            temp.path().join("DadApp.env"),
            "LICENSE_WATCH_ENV_ORDER=app\nLICENSE_WATCH_ENV_PATH=from-app\n",
        )
        .unwrap();
        fs::write(
            temp.path().join(".env"),
            "LICENSE_WATCH_ENV_ORDER=dot\nLICENSE_WATCH_ENV_DOT_ONLY=dot\nPATH=overridden\n",
        )
        .unwrap();
        let path_before = std::env::var("PATH").ok();

        let loaded = load_env_files(temp.path());
        assert_eq!(loaded, vec![temp.path().join("DadApp.env"), temp.path().join(".env")]);
        assert_eq!(std::env::var("LICENSE_WATCH_ENV_ORDER").unwrap(), "app");
        assert_eq!(std::env::var("LICENSE_WATCH_ENV_PATH").unwrap(), "from-app");
        assert_eq!(std::env::var("LICENSE_WATCH_ENV_DOT_ONLY").unwrap(), "dot");
        assert_eq!(std::env::var("PATH").ok(), path_before);
    }

    #[test]
    fn missing_env_files_are_skipped() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join(".env"), "LICENSE_WATCH_ENV_ONLY_DOT=yes\n").unwrap();
        let loaded = load_env_files(temp.path());
        assert_eq!(loaded, vec![temp.path().join(".env")]);
        assert_eq!(std::env::var("LICENSE_WATCH_ENV_ONLY_DOT").unwrap(), "yes");
        assert!(load_env_files(&temp.path().join("absent")).is_empty());
    }

    fn problems_of(err: WatchError) -> Vec<ConfigProblem> {
        match err {
            WatchError::Configuration { problems } => problems,
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = WatchConfig::from_lookup(
            &lookup_from(&[]),
            &Preferences::default(),
            ConfigRequirements::default(),
        )
        .unwrap();
        assert_eq!(config.from_name, DEFAULT_FROM_NAME);
        assert_eq!(config.thresholds.iter().collect::<Vec<_>>(), vec![5, 15, 30]);
        assert!(config.mail.is_none());
        assert!(config.remote.is_none());
        assert!(!config.push_on_save);
        assert_eq!(config.local_file, PathBuf::from(DEFAULT_LOCAL_FILE));
    }

    #[test]
    fn every_problem_is_reported_at_once() {
        let lookup = lookup_from(&[
            ("OWNER_EMAIL", "not-an-address"),
            ("DAYS_THRESHOLDS", "30,x,-1"),
            ("HTTP_TIMEOUT_SECS", "0"),
            ("GITHUB_REPO", "just-a-name"),
        ]);
        let err = WatchConfig::from_lookup(
            &lookup,
            &Preferences::default(),
            ConfigRequirements {
                mail: true,
                ..ConfigRequirements::default()
            },
        )
        .unwrap_err();
        let problems = problems_of(err);
        assert_eq!(problems.len(), 7, "{problems:?}");
        assert!(problems.iter().any(|p| p.starts_with("SMTP_EMAIL is required")));
        assert!(problems.iter().any(|p| p.starts_with("SMTP_APP_PASSWORD is required")));
        assert!(problems.iter().any(|p| p.contains("'not-an-address'")));
        assert!(problems.iter().any(|p| p.contains("'x'")));
        assert!(problems.iter().any(|p| p.contains("'-1'")));
        assert!(problems.iter().any(|p| p.starts_with("HTTP_TIMEOUT_SECS")));
        assert!(problems.iter().any(|p| p.starts_with("GITHUB_REPO")));
    }

    #[test]
    fn empty_threshold_list_is_rejected() {
        let problems = ThresholdSet::parse(" , ,").unwrap_err();
        assert_eq!(problems.len(), 1);
        assert!(ThresholdSet::new(Vec::new()).is_err());
    }

    #[test]
    fn thresholds_match_exact_non_negative_days() {
        let set = ThresholdSet::parse("30, 15,5,15").unwrap();
        assert!(set.contains(15));
        assert!(set.contains(5));
        assert!(!set.contains(20));
        assert!(!set.contains(-15));
        let zero = ThresholdSet::parse("0").unwrap();
        assert!(zero.contains(0));
    }

    #[test]
    fn recipient_falls_back_to_sender() {
        let lookup = lookup_from(&[
            ("SMTP_EMAIL", "alerts@example.com"),
            ("SMTP_APP_PASSWORD", "app-pass"),
        ]);
        let config = WatchConfig::from_lookup(
            &lookup,
            &Preferences::default(),
            ConfigRequirements {
                mail: true,
                ..ConfigRequirements::default()
            },
        )
        .unwrap();
        let mail = config.mail.unwrap();
        assert_eq!(mail.recipient, "alerts@example.com");
        assert_eq!(mail.host, DEFAULT_SMTP_HOST);
        assert_eq!(mail.port, DEFAULT_SMTP_PORT);
    }

    #[test]
    fn from_name_prefers_env_then_preferences() {
        let prefs = Preferences {
            from_name: Some("Saved Name".into()),
        };
        let config =
            WatchConfig::from_lookup(&lookup_from(&[]), &prefs, ConfigRequirements::default())
                .unwrap();
        assert_eq!(config.from_name, "Saved Name");

        let config = WatchConfig::from_lookup(
            &lookup_from(&[("FROM_NAME", "Env Name")]),
            &prefs,
            ConfigRequirements::default(),
        )
        .unwrap();
        assert_eq!(config.from_name, "Env Name");
    }

    #[test]
    fn remote_config_reads_location_and_optional_token() {
        let lookup = lookup_from(&[
            ("GITHUB_REPO", "acme/licenses"),
            ("GITHUB_BRANCH", "prod"),
            ("GITHUB_FILE", "data/clients.csv"),
            ("GITHUB_PUSH_ON_SAVE", "1"),
        ]);
        let config =
            WatchConfig::from_lookup(&lookup, &Preferences::default(), ConfigRequirements::default())
                .unwrap();
        let remote = config.remote.unwrap();
        assert_eq!(remote.location(), "github:acme/licenses/data/clients.csv@prod");
        assert!(remote.token.is_none());
        assert!(config.push_on_save);
    }

    #[test]
    fn required_groups_are_enforced() {
        let err = WatchConfig::from_lookup(
            &lookup_from(&[]),
            &Preferences::default(),
            ConfigRequirements {
                remote: true,
                server_sync: true,
                ..ConfigRequirements::default()
            },
        )
        .unwrap_err();
        assert_eq!(problems_of(err).len(), 2);
    }

    #[test]
    fn preferences_round_trip_through_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("prefs").join("preferences.json");
        assert_eq!(Preferences::load(&path).unwrap(), Preferences::default());

        let prefs = Preferences {
            from_name: Some("Licenças 3N".into()),
        };
        prefs.save(&path).unwrap();
        assert_eq!(Preferences::load(&path).unwrap(), prefs);

        std::fs::write(&path, b"{not json").unwrap();
        assert!(matches!(Preferences::load(&path), Err(WatchError::Parse(_))));
        assert_eq!(Preferences::load_or_default(&path), Preferences::default());
    }
}
