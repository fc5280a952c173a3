//! Client configuration.
//!
//! Loaded from a TOML file, from `ASANA_*` environment variables, or built
//! in code. A credential must resolve before a `Client` can exist.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "https://app.asana.com/api/1.0/";

/// How every request of a client authenticates. Fixed for the client's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Personal access token or OAuth token, sent as `Authorization: Bearer`.
    Bearer(String),
    /// Legacy API key, sent as HTTP basic auth with an empty password.
    ApiKey(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Default workspace substituted when an operation omits one.
    #[serde(default)]
    pub workspace_id: Option<String>,
    /// Default project substituted when an operation omits one.
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Skip TLS certificate verification. Only for test servers.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_timeout() -> u64 {
    90
}

impl Default for Config {
    fn default() -> Self {
        Self {
            access_token: None,
            api_key: None,
            workspace_id: None,
            project_id: None,
            base_url: default_base_url(),
            connect_timeout_secs: default_connect_timeout(),
            timeout_secs: default_timeout(),
            accept_invalid_certs: false,
        }
    }
}

impl Config {
    /// Configuration authenticating with an access token.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            access_token: Some(token.into()),
            ..Self::default()
        }
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_toml(&content, path)
    }

    /// Parse TOML text. Errors name `<string>` as their path.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse_toml(content, Path::new("<string>"))
    }

    fn parse_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| {
            let (line, column) = e
                .span()
                .map(|span| {
                    let line = content[..span.start].matches('\n').count() + 1;
                    let last_newline = content[..span.start]
                        .rfind('\n')
                        .map(|p| p + 1)
                        .unwrap_or(0);
                    (line, span.start - last_newline + 1)
                })
                .unwrap_or((0, 0));
            ConfigError::Parse {
                path: path.to_path_buf(),
                line,
                column,
                message: e.message().to_string(),
            }
        })
    }

    /// Build entirely from `ASANA_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Overlay any `ASANA_*` environment variables that are set.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|value| !value.is_empty());
        if let Some(token) = var("ASANA_ACCESS_TOKEN") {
            self.access_token = Some(token);
        }
        if let Some(key) = var("ASANA_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(workspace) = var("ASANA_WORKSPACE_ID") {
            self.workspace_id = Some(workspace);
        }
        if let Some(project) = var("ASANA_PROJECT_ID") {
            self.project_id = Some(project);
        }
        if let Some(base_url) = var("ASANA_BASE_URL") {
            self.base_url = base_url;
        }
        self
    }

    /// Resolve the credential. A token wins over an API key.
    pub fn credential(&self) -> Result<Credential, ConfigError> {
        let present = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());
        if let Some(token) = present(&self.access_token) {
            return Ok(Credential::Bearer(token));
        }
        if let Some(key) = present(&self.api_key) {
            return Ok(Credential::ApiKey(key));
        }
        Err(ConfigError::MissingCredential)
    }

    /// Base URL with exactly one trailing slash.
    pub fn normalized_base_url(&self) -> Result<String, ConfigError> {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        if !(trimmed.starts_with("https://") || trimmed.starts_with("http://")) {
            return Err(ConfigError::InvalidValue {
                key: "base_url",
                reason: format!("`{}` is not an http(s) URL", self.base_url),
            });
        }
        Ok(format!("{trimmed}/"))
    }

    pub fn connect_timeout(&self) -> Result<Duration, ConfigError> {
        positive_secs("connect_timeout_secs", self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Result<Duration, ConfigError> {
        positive_secs("timeout_secs", self.timeout_secs)
    }
}

fn positive_secs(key: &'static str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::InvalidValue {
            key,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn defaults_match_asana_endpoint_and_timeouts() {
        let config = Config::default();
        assert_eq!(config.base_url, "https://app.asana.com/api/1.0/");
        assert_eq!(config.connect_timeout().unwrap(), Duration::from_secs(10));
        assert_eq!(config.timeout().unwrap(), Duration::from_secs(90));
        assert!(!config.accept_invalid_certs);
    }

    #[test]
    fn toml_fills_missing_keys_with_defaults() {
        let config = Config::from_toml_str(
            r#"
access_token = "T"
workspace_id = "1768"
"#,
        )
        .unwrap();
        assert_eq!(config.access_token.as_deref(), Some("T"));
        assert_eq!(config.workspace_id.as_deref(), Some("1768"));
        assert_eq!(config.project_id, None);
        assert_eq!(config.timeout_secs, 90);
    }

    #[test]
    fn toml_parse_error_reports_position() {
        let err = Config::from_toml_str("access_token = \"T\"\ntimeout_secs = \"soon\"\n").unwrap_err();
        match err {
            ConfigError::Parse { line, column, .. } => {
                assert_eq!(line, 2);
                assert!(column > 0);
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn load_reads_file_from_disk() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "api_key = \"legacy\"\nproject_id = \"99\"").unwrap();
        let config = Config::load(tmp.path()).unwrap();
        assert_eq!(config.credential().unwrap(), Credential::ApiKey("legacy".into()));
        assert_eq!(config.project_id.as_deref(), Some("99"));
    }

    #[test]
    fn load_missing_file_is_read_error() {
        let err = Config::load(Path::new("/no/such/asana.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn token_wins_over_api_key() {
        let config = Config {
            access_token: Some("T".into()),
            api_key: Some("K".into()),
            ..Config::default()
        };
        assert_eq!(config.credential().unwrap(), Credential::Bearer("T".into()));
    }

    #[test]
    fn empty_credentials_count_as_missing() {
        let config = Config {
            access_token: Some(String::new()),
            api_key: Some(String::new()),
            ..Config::default()
        };
        assert!(matches!(config.credential(), Err(ConfigError::MissingCredential)));
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let env: HashMap<&str, &str> = [
            ("ASANA_ACCESS_TOKEN", "from-env"),
            ("ASANA_PROJECT_ID", "42"),
            ("ASANA_WORKSPACE_ID", ""),
        ]
        .into_iter()
        .collect();
        let config = Config {
            access_token: Some("from-file".into()),
            workspace_id: Some("1768".into()),
            ..Config::default()
        }
        .with_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.access_token.as_deref(), Some("from-env"));
        assert_eq!(config.project_id.as_deref(), Some("42"));
        // Empty variables do not clear file values.
        assert_eq!(config.workspace_id.as_deref(), Some("1768"));
    }

    #[test]
    fn base_url_is_normalized() {
        let config = Config {
            base_url: "http://127.0.0.1:3000/api/1.0".into(),
            ..Config::default()
        };
        assert_eq!(config.normalized_base_url().unwrap(), "http://127.0.0.1:3000/api/1.0/");

        let config = Config {
            base_url: "https://app.asana.com/api/1.0//".into(),
            ..Config::default()
        };
        assert_eq!(config.normalized_base_url().unwrap(), "https://app.asana.com/api/1.0/");
    }

    #[test]
    fn non_http_base_url_is_rejected() {
        let config = Config {
            base_url: "app.asana.com".into(),
            ..Config::default()
        };
        assert!(matches!(
            config.normalized_base_url(),
            Err(ConfigError::InvalidValue { key: "base_url", .. })
        ));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = Config {
            timeout_secs: 0,
            ..Config::default()
        };
        assert!(config.timeout().is_err());
    }
}
