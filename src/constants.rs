/// Constants used by the delimited record parser and writer.
pub mod parser {
    /// Header aliases for the company column, in priority order.
    pub const COMPANY_ALIASES: &[&str] = &["empresa", "company", "cliente", "client", "nome", "name"];
    /// Header aliases for the due-date column, in priority order.
    pub const DUE_DATE_ALIASES: &[&str] = &[
        "vencimento",
        "due_date",
        "due",
        "data_vencimento",
        "validade",
        "expiration",
    ];
    /// Header written by the canonical record file writer.
    pub const CANONICAL_HEADER: [&str; 2] = ["empresa", "vencimento"];
    /// Maximum number of bytes inspected when sniffing the delimiter.
    pub const SNIFF_SAMPLE_BYTES: usize = 2048;
    /// Maximum number of lines inspected when sniffing the delimiter.
    pub const SNIFF_SAMPLE_LINES: usize = 10;
    /// Delimiter used when sniffing is inconclusive.
    pub const FALLBACK_DELIMITER: u8 = b',';
    /// Candidate delimiters considered by the sniffer.
    pub const CANDIDATE_DELIMITERS: [u8; 2] = [b',', b';'];
}

/// Constants used by date parsing and rendering.
pub mod dates {
    /// Display convention, tried first when parsing.
    pub const DISPLAY_FORMAT: &str = "%d/%m/%Y";
    /// At-rest convention, tried second when parsing.
    pub const ISO_FORMAT: &str = "%Y-%m-%d";
    /// Formats tried by `parse_due_date`, in order.
    pub const PARSE_ORDER: [&str; 2] = [DISPLAY_FORMAT, ISO_FORMAT];
}

/// Constants used by due-date classification.
pub mod classify {
    /// Inclusive upper bound (days) of the most urgent non-overdue band.
    pub const BAND_URGENT_DAYS: i64 = 15;
    /// Inclusive upper bound (days) of the monthly band.
    pub const BAND_MONTH_DAYS: i64 = 30;
    /// Default notification milestones (days before due).
    pub const DEFAULT_THRESHOLDS: [u32; 3] = [30, 15, 5];
}

/// Constants used by notification composition and delivery.
pub mod notify {
    /// Sender display name used when neither env nor preferences provide one.
    pub const DEFAULT_FROM_NAME: &str = "License Watch";
    /// Body used when no record is eligible for notification.
    pub const NOTHING_DUE_MESSAGE: &str =
        "No licenses are overdue or reaching a notification milestone today.";
    /// Status phrase for overdue records.
    pub const STATUS_OVERDUE: &str = "overdue";
    /// Separator between fields of a body line.
    pub const LINE_SEPARATOR: &str = " | ";
    /// Default SMTP relay host.
    pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
    /// Default SMTPS port.
    pub const DEFAULT_SMTP_PORT: u16 = 465;
}

/// Constants used by the remote repository store.
pub mod remote {
    /// Default GitHub REST API base URL.
    pub const DEFAULT_API_URL: &str = "https://api.github.com";
    /// Default path of the record file inside the repository.
    pub const DEFAULT_FILE: &str = "clientes.csv";
    /// Default branch read from and written to.
    pub const DEFAULT_BRANCH: &str = "main";
    /// Default committer name for remote writes.
    pub const DEFAULT_COMMITTER_NAME: &str = "License Watch Bot";
    /// Default committer email for remote writes.
    pub const DEFAULT_COMMITTER_EMAIL: &str = "noreply@localhost";
    /// Accept header sent to the contents API.
    pub const ACCEPT_HEADER: &str = "application/vnd.github+json";
    /// API version header value.
    pub const API_VERSION: &str = "2022-11-28";
    /// Default blocking timeout for remote calls, in seconds.
    pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;
    /// Maximum number of response-body characters quoted in diagnostics.
    pub const ERROR_SNIPPET_CHARS: usize = 200;
    /// Commit message used by explicit pushes.
    pub const SYNC_COMMIT_MESSAGE: &str = "Sync clientes.csv";
}

/// Constants used for local files.
pub mod files {
    /// Default local record file.
    pub const DEFAULT_LOCAL_FILE: &str = "Data/clientes.csv";
    /// Default secret-mounted record file.
    pub const DEFAULT_SECRET_FILE: &str = "/etc/secrets/clientes.csv";
    /// Default preferences file.
    pub const DEFAULT_PREFERENCES_FILE: &str = "Data/preferences.json";
    /// Env files loaded at startup, in priority order.
    pub const ENV_FILES: [&str; 2] = ["DadApp.env", ".env"];
}

/// Environment variable names recognized by the configuration loader.
pub mod env {
    use crate::types::EnvKey;

    /// SMTP login address.
    pub const SMTP_EMAIL: EnvKey = "SMTP_EMAIL";
    /// SMTP app password.
    pub const SMTP_APP_PASSWORD: EnvKey = "SMTP_APP_PASSWORD";
    /// SMTP relay host override.
    pub const SMTP_HOST: EnvKey = "SMTP_HOST";
    /// SMTP relay port override.
    pub const SMTP_PORT: EnvKey = "SMTP_PORT";
    /// Notification recipient; defaults to the login address.
    pub const OWNER_EMAIL: EnvKey = "OWNER_EMAIL";
    /// Sender display name; falls back to the preferences file.
    pub const FROM_NAME: EnvKey = "FROM_NAME";
    /// Comma-separated milestone day counts.
    pub const DAYS_THRESHOLDS: EnvKey = "DAYS_THRESHOLDS";
    /// Remote repository as `owner/name`.
    pub const GITHUB_REPO: EnvKey = "GITHUB_REPO";
    /// Record file path inside the repository.
    pub const GITHUB_FILE: EnvKey = "GITHUB_FILE";
    /// Branch read from and written to.
    pub const GITHUB_BRANCH: EnvKey = "GITHUB_BRANCH";
    /// Contents API token.
    pub const GITHUB_TOKEN: EnvKey = "GITHUB_TOKEN";
    /// API base URL override.
    pub const GITHUB_API_URL: EnvKey = "GITHUB_API_URL";
    /// Commit author name.
    pub const GITHUB_COMMITTER_NAME: EnvKey = "GITHUB_COMMITTER_NAME";
    /// Commit author email.
    pub const GITHUB_COMMITTER_EMAIL: EnvKey = "GITHUB_COMMITTER_EMAIL";
    /// Push after every local save when truthy.
    pub const GITHUB_PUSH_ON_SAVE: EnvKey = "GITHUB_PUSH_ON_SAVE";
    /// Local record file.
    pub const CLIENTS_FILE: EnvKey = "CLIENTS_FILE";
    /// Secret-mounted record file.
    pub const CLIENTS_SECRET_FILE: EnvKey = "CLIENTS_SECRET_FILE";
    /// Preferences file.
    pub const PREFERENCES_FILE: EnvKey = "PREFERENCES_FILE";
    /// Timeout for every HTTP call, in seconds.
    pub const HTTP_TIMEOUT_SECS: EnvKey = "HTTP_TIMEOUT_SECS";
    /// Server sync endpoint, with legacy aliases tried in order.
    pub const SERVER_URL_KEYS: [EnvKey; 3] = ["RENDER_API_URL", "RENDER_URL", "API_URL"];
    /// Server sync bearer token, with legacy aliases tried in order.
    pub const SERVER_TOKEN_KEYS: [EnvKey; 3] = ["RENDER_API_KEY", "RENDER_API_TOKEN", "API_KEY"];
}
