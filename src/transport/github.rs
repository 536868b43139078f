use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use ureq::Agent;

use crate::config::RemoteConfig;
use crate::constants::remote::{ACCEPT_HEADER, API_VERSION, ERROR_SNIPPET_CHARS};
use crate::errors::WatchError;
use crate::transport::{PutReceipt, RemoteDocument, RemoteStore};
use crate::types::{SourceId, VersionToken};

/// Record file stored in a GitHub repository, accessed through the contents API.
///
/// `GET /repos/{repo}/contents/{file}?ref={branch}` yields base64 content and
/// the blob sha, which is the version token. `PUT` to the same path writes new
/// content; GitHub rejects a stale sha with `409 Conflict`.
pub struct GithubContentsStore {
    config: RemoteConfig,
    agent: Agent,
}

#[derive(Deserialize)]
struct ContentsResponse {
    #[serde(default)]
    content: Option<String>,
    sha: String,
}

#[derive(Serialize)]
struct Committer<'a> {
    name: &'a str,
    email: &'a str,
}

#[derive(Serialize)]
struct PutRequest<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    committer: Committer<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Deserialize)]
struct PutResponse {
    #[serde(default)]
    content: Option<PutResponseContent>,
}

#[derive(Deserialize)]
struct PutResponseContent {
    sha: String,
}

impl GithubContentsStore {
    /// Create a store with a blocking agent bounded by `timeout`.
    pub fn new(config: RemoteConfig, timeout: Duration) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();
        Self { config, agent }
    }

    /// Store configuration.
    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    fn contents_url(&self) -> String {
        format!(
            "{}/repos/{}/contents/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.repo,
            self.config.file.trim_start_matches('/')
        )
    }

    fn bearer(&self) -> Option<String> {
        self.config
            .token
            .as_deref()
            .map(|token| format!("Bearer {token}"))
    }

    fn decode_content(&self, encoded: Option<&str>) -> Result<Vec<u8>, WatchError> {
        let Some(encoded) = encoded else {
            return Ok(Vec::new());
        };
        // GitHub wraps base64 payloads at 60 columns.
        let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        STANDARD.decode(compact).map_err(|err| {
            WatchError::Parse(format!(
                "remote content for {} is not valid base64: {err}",
                self.location()
            ))
        })
    }
}

impl RemoteStore for GithubContentsStore {
    fn location(&self) -> SourceId {
        self.config.location()
    }

    fn fetch(&self) -> Result<Option<RemoteDocument>, WatchError> {
        let url = self.contents_url();
        debug!("[license-watch:github] GET {url} ref={}", self.config.branch);
        let mut request = self
            .agent
            .get(&url)
            .header("Accept", ACCEPT_HEADER)
            .header("X-GitHub-Api-Version", API_VERSION)
            .query("ref", &self.config.branch);
        if let Some(bearer) = self.bearer() {
            request = request.header("Authorization", bearer);
        }
        let response = request.call().map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response
            .into_body()
            .read_to_string()
            .map_err(transport_error)?;

        match status {
            200 => {
                let payload: ContentsResponse = serde_json::from_str(&body).map_err(|err| {
                    WatchError::Parse(format!(
                        "unexpected contents payload for {}: {err}",
                        self.location()
                    ))
                })?;
                let content = self.decode_content(payload.content.as_deref())?;
                info!(
                    "[license-watch:github] read {} bytes from {} (sha {})",
                    content.len(),
                    self.location(),
                    payload.sha
                );
                Ok(Some(RemoteDocument {
                    content,
                    version: payload.sha,
                }))
            }
            404 => Ok(None),
            401 | 403 => Err(WatchError::Auth { status }),
            _ => Err(unexpected_status(status, &body)),
        }
    }

    fn put(
        &self,
        content: &[u8],
        message: &str,
        expected: Option<&VersionToken>,
    ) -> Result<PutReceipt, WatchError> {
        let url = self.contents_url();
        let payload = PutRequest {
            message,
            content: STANDARD.encode(content),
            branch: &self.config.branch,
            committer: Committer {
                name: &self.config.committer_name,
                email: &self.config.committer_email,
            },
            sha: expected.map(String::as_str),
        };
        let body = serde_json::to_vec(&payload)
            .map_err(|err| WatchError::Transport(format!("failed to encode request: {err}")))?;
        debug!(
            "[license-watch:github] PUT {url} branch={} update={}",
            self.config.branch,
            expected.is_some()
        );
        let mut request = self
            .agent
            .put(&url)
            .header("Accept", ACCEPT_HEADER)
            .header("X-GitHub-Api-Version", API_VERSION)
            .header("Content-Type", "application/json");
        if let Some(bearer) = self.bearer() {
            request = request.header("Authorization", bearer);
        }
        let response = request.send(&body[..]).map_err(transport_error)?;
        let status = response.status().as_u16();
        let response_body = response
            .into_body()
            .read_to_string()
            .map_err(transport_error)?;

        match status {
            200 | 201 => {
                let version = serde_json::from_str::<PutResponse>(&response_body)
                    .ok()
                    .and_then(|parsed| parsed.content)
                    .map(|content| content.sha);
                Ok(PutReceipt { version })
            }
            401 | 403 => Err(WatchError::Auth { status }),
            404 => Err(WatchError::NotFound {
                path: self.location(),
            }),
            // 409: sha no longer matches. 422: created without a sha while the
            // file appeared concurrently.
            409 | 422 => Err(WatchError::Conflict {
                path: self.location(),
            }),
            _ => Err(unexpected_status(status, &response_body)),
        }
    }
}

pub(crate) fn transport_error(err: ureq::Error) -> WatchError {
    WatchError::Transport(err.to_string())
}

pub(crate) fn unexpected_status(status: u16, body: &str) -> WatchError {
    let snippet: String = body.chars().take(ERROR_SNIPPET_CHARS).collect();
    WatchError::Transport(format!("unexpected HTTP {status}: {snippet}"))
}


#[cfg(test)]
mod tests {
    use super::test_server::spawn_one_shot_http;
    use super::*;

    fn store_for(base_url: &str, token: Option<&str>) -> GithubContentsStore {
        let mut config = RemoteConfig::new("acme/licenses").with_api_url(base_url);
        if let Some(token) = token {
            config = config.with_token(token);
        }
        GithubContentsStore::new(config, Duration::from_secs(5))
    }

    #[test]
    fn fetch_decodes_wrapped_base64_and_reads_sha() {
        let encoded = STANDARD.encode(b"empresa,vencimento\nAcme,2020-01-01\n");
        let wrapped = format!("{}\n{}", &encoded[..20], &encoded[20..]);
        let body = serde_json::json!({ "content": wrapped, "sha": "abc123", "encoding": "base64" });
        let (base_url, server) = spawn_one_shot_http("200 OK", body.to_string());

        let store = store_for(&base_url, Some("secret-token"));
        let document = store.fetch().unwrap().unwrap();
        let request = server.join().unwrap();

        assert_eq!(document.version, "abc123");
        assert_eq!(document.content, b"empresa,vencimento\nAcme,2020-01-01\n");
        assert!(request.starts_with("GET /repos/acme/licenses/contents/clientes.csv?ref=main "));
        assert!(request.to_lowercase().contains("authorization: bearer secret-token"));
    }

    #[test]
    fn fetch_without_token_sends_no_authorization() {
        let body = serde_json::json!({ "content": "", "sha": "e69de29" });
        let (base_url, server) = spawn_one_shot_http("200 OK", body.to_string());
        let document = store_for(&base_url, None).fetch().unwrap().unwrap();
        let request = server.join().unwrap();
        assert!(document.content.is_empty());
        assert!(!request.to_lowercase().contains("authorization:"));
    }

    #[test]
    fn fetch_classifies_error_statuses() {
        let (base_url, server) = spawn_one_shot_http("404 Not Found", "{}");
        assert!(store_for(&base_url, None).fetch().unwrap().is_none());
        server.join().unwrap();

        for (status_line, expected) in [("401 Unauthorized", 401u16), ("403 Forbidden", 403)] {
            let (base_url, server) = spawn_one_shot_http(status_line, "{}");
            let err = store_for(&base_url, Some("bad")).fetch().unwrap_err();
            server.join().unwrap();
            assert!(matches!(err, WatchError::Auth { status } if status == expected));
        }

        let (base_url, server) = spawn_one_shot_http("500 Internal Server Error", "boom");
        let err = store_for(&base_url, None).fetch().unwrap_err();
        server.join().unwrap();
        assert!(matches!(err, WatchError::Transport(ref message) if message.contains("500")));
    }

    #[test]
    fn fetch_reports_unreachable_host_as_transport_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = store_for(&format!("http://{addr}"), None).fetch().unwrap_err();
        assert!(matches!(err, WatchError::Transport(_)));
    }

    #[test]
    fn put_sends_sha_in_update_mode_and_reads_new_version() {
        let body = serde_json::json!({ "content": { "sha": "def456" }, "commit": { "sha": "c0ffee" } });
        let (base_url, server) = spawn_one_shot_http("200 OK", body.to_string());
        let store = store_for(&base_url, Some("t"));
        let receipt = store
            .put(b"empresa,vencimento\n", "Sync clientes.csv", Some(&"abc123".to_string()))
            .unwrap();
        let request = server.join().unwrap();

        assert_eq!(receipt.version.as_deref(), Some("def456"));
        assert!(request.starts_with("PUT /repos/acme/licenses/contents/clientes.csv "));
        let json_start = request.find("\r\n\r\n").unwrap() + 4;
        let sent: serde_json::Value = serde_json::from_str(&request[json_start..]).unwrap();
        assert_eq!(sent["sha"], "abc123");
        assert_eq!(sent["branch"], "main");
        assert_eq!(sent["message"], "Sync clientes.csv");
        assert_eq!(
            STANDARD.decode(sent["content"].as_str().unwrap()).unwrap(),
            b"empresa,vencimento\n"
        );
    }

    #[test]
    fn put_omits_sha_in_create_mode() {
        let (base_url, server) = spawn_one_shot_http("201 Created", "{\"content\":{\"sha\":\"n1\"}}");
        let receipt = store_for(&base_url, Some("t")).put(b"x", "create", None).unwrap();
        let request = server.join().unwrap();
        assert_eq!(receipt.version.as_deref(), Some("n1"));
        let json_start = request.find("\r\n\r\n").unwrap() + 4;
        let sent: serde_json::Value = serde_json::from_str(&request[json_start..]).unwrap();
        assert!(sent.get("sha").is_none());
    }

    #[test]
    fn put_maps_stale_sha_to_conflict() {
        for status_line in ["409 Conflict", "422 Unprocessable Entity"] {
            let (base_url, server) = spawn_one_shot_http(status_line, "{\"message\":\"sha mismatch\"}");
            let err = store_for(&base_url, Some("t"))
                .put(b"x", "update", Some(&"stale".to_string()))
                .unwrap_err();
            server.join().unwrap();
            assert!(matches!(err, WatchError::Conflict { .. }));
        }
    }
}
