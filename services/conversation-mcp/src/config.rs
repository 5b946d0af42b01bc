//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The OAuth client secret comes from OAUTH_CLIENT_SECRET or
//! `client_secret_file`, never from the TOML itself, and has no default.

use common::Secret;
use oauth_client::Credentials;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use upstream_client::HttpSettings;

pub const DEFAULT_CONFIG_PATH: &str = "conversation-mcp.toml";
pub const DEFAULT_BASE_URL: &str = "https://conversation-state-service.care.dev-godaddy.com";
pub const DEFAULT_SEARCH_ENDPOINT: &str = "/conversation-state/filters/search";
pub const DEFAULT_UCID_ENDPOINT: &str = "/conversation-state/{ucid}";
pub const DEFAULT_TRANSCRIPTS_ENDPOINT: &str = "/transcripts/ucid/{ucid}";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub oauth: OAuthConfig,
    pub upstream: UpstreamConfig,
    pub endpoints: EndpointsConfig,
}

/// Inbound transport settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub name: String,
    /// Concurrent inbound HTTP requests
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            name: "Conversation State Service MCP Server".into(),
            max_connections: 1000,
        }
    }
}

/// Client-credentials settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    pub token_endpoint: String,
    pub scope: String,
    pub client_id: Option<String>,
    /// Path to a file containing the client secret (alternative to OAUTH_CLIENT_SECRET)
    pub client_secret_file: Option<PathBuf>,
    #[serde(skip)]
    pub client_secret: Option<Secret<String>>,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            token_endpoint: oauth_client::DEFAULT_TOKEN_ENDPOINT.into(),
            scope: oauth_client::DEFAULT_SCOPE.into(),
            client_id: None,
            client_secret_file: None,
            client_secret: None,
        }
    }
}

/// Outbound HTTP settings for the conversation API
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub max_connections: usize,
    pub max_connections_per_host: usize,
    pub dns_cache_ttl_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            max_connections: 10,
            max_connections_per_host: 5,
            dns_cache_ttl_secs: 300,
        }
    }
}

/// Path templates appended to `upstream.base_url`
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    pub search: String,
    pub ucid_detail: String,
    pub transcripts: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            search: DEFAULT_SEARCH_ENDPOINT.into(),
            ucid_detail: DEFAULT_UCID_ENDPOINT.into(),
            transcripts: DEFAULT_TRANSCRIPTS_ENDPOINT.into(),
        }
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load configuration, overlay environment variables, then validate.
    ///
    /// `path` is an explicitly requested file and must exist. With `None`
    /// the default path is read if present; otherwise defaults apply.
    pub fn load(path: Option<&Path>) -> common::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::from_file(default)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env();
        config.resolve_secret()?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Overlay the enumerated environment overrides.
    pub fn apply_env(&mut self) {
        if let Some(url) = env_value("CONVERSATION_API_BASE_URL") {
            self.upstream.base_url = url;
        }
        if let Some(path) = env_value("CONVERSATION_STATE_SEARCH_ENDPOINT") {
            self.endpoints.search = path;
        }
        if let Some(path) = env_value("CONVERSATION_STATE_UCID_ENDPOINT") {
            self.endpoints.ucid_detail = path;
        }
        if let Some(path) = env_value("CONVERSATION_STATE_TRANSCRIPTS_ENDPOINT") {
            self.endpoints.transcripts = path;
        }
        if let Some(id) = env_value("OAUTH_CLIENT_ID") {
            self.oauth.client_id = Some(id);
        }
        if let Some(scope) = env_value("OAUTH_SCOPE") {
            self.oauth.scope = scope;
        }
        if let Some(url) = env_value("OAUTH_TOKEN_URL") {
            self.oauth.token_endpoint = url;
        }
    }

    /// Resolve the client secret: env var takes precedence over file.
    fn resolve_secret(&mut self) -> common::Result<()> {
        if let Some(secret) = env_value("OAUTH_CLIENT_SECRET") {
            self.oauth.client_secret = Some(Secret::new(secret));
        } else if let Some(ref secret_file) = self.oauth.client_secret_file {
            let secret = std::fs::read_to_string(secret_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read client_secret_file {}: {e}",
                    secret_file.display()
                ))
            })?;
            let secret = secret.trim().to_owned();
            if !secret.is_empty() {
                self.oauth.client_secret = Some(Secret::new(secret));
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> common::Result<()> {
        for (name, url) in [
            ("upstream.base_url", &self.upstream.base_url),
            ("oauth.token_endpoint", &self.oauth.token_endpoint),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(common::Error::Config(format!(
                    "{name} must start with http:// or https://, got: {url}"
                )));
            }
        }

        for (name, value) in [
            ("upstream.timeout_secs", self.upstream.timeout_secs),
            ("upstream.connect_timeout_secs", self.upstream.connect_timeout_secs),
            ("upstream.dns_cache_ttl_secs", self.upstream.dns_cache_ttl_secs),
            ("upstream.max_connections", self.upstream.max_connections as u64),
            (
                "upstream.max_connections_per_host",
                self.upstream.max_connections_per_host as u64,
            ),
            ("server.max_connections", self.server.max_connections as u64),
        ] {
            if value == 0 {
                return Err(common::Error::Config(format!(
                    "{name} must be greater than 0"
                )));
            }
        }

        for (name, template, needs_ucid) in [
            ("endpoints.search", &self.endpoints.search, false),
            ("endpoints.ucid_detail", &self.endpoints.ucid_detail, true),
            ("endpoints.transcripts", &self.endpoints.transcripts, true),
        ] {
            if !template.starts_with('/') {
                return Err(common::Error::Config(format!(
                    "{name} must start with '/', got: {template}"
                )));
            }
            if needs_ucid && !template.contains("{ucid}") {
                return Err(common::Error::Config(format!(
                    "{name} must contain the {{ucid}} placeholder, got: {template}"
                )));
            }
        }

        if self.oauth.client_id.as_deref().is_none_or(|id| id.trim().is_empty()) {
            return Err(common::Error::missing(
                "oauth client id",
                "OAUTH_CLIENT_ID or oauth.client_id",
            ));
        }
        if self.oauth.client_secret.as_ref().is_none_or(|s| s.is_blank()) {
            return Err(common::Error::missing(
                "oauth client secret",
                "OAUTH_CLIENT_SECRET or oauth.client_secret_file",
            ));
        }
        Ok(())
    }

    pub fn credentials(&self) -> common::Result<Credentials> {
        let client_id = self.oauth.client_id.clone().ok_or_else(|| {
            common::Error::missing("oauth client id", "OAUTH_CLIENT_ID or oauth.client_id")
        })?;
        let secret = self.oauth.client_secret.clone().ok_or_else(|| {
            common::Error::missing(
                "oauth client secret",
                "OAUTH_CLIENT_SECRET or oauth.client_secret_file",
            )
        })?;
        Ok(Credentials::new(client_id, secret)
            .with_scope(self.oauth.scope.clone())
            .with_token_endpoint(self.oauth.token_endpoint.clone()))
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            timeout: Duration::from_secs(self.upstream.timeout_secs),
            connect_timeout: Duration::from_secs(self.upstream.connect_timeout_secs),
            max_connections: self.upstream.max_connections,
            max_connections_per_host: self.upstream.max_connections_per_host,
            dns_cache_ttl: Duration::from_secs(self.upstream.dns_cache_ttl_secs),
        }
    }

    /// Resolve an explicitly requested config path from CLI arg or CONFIG_PATH.
    ///
    /// `None` means "use the default path if it exists".
    pub fn resolve_path(cli_path: Option<&str>) -> Option<PathBuf> {
        if let Some(p) = cli_path {
            return Some(PathBuf::from(p));
        }
        env_value("CONFIG_PATH").map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mutex to serialize tests that mutate environment variables, preventing
    /// data races when tests run in parallel.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const ENV_KEYS: &[&str] = &[
        "CONVERSATION_API_BASE_URL",
        "CONVERSATION_STATE_SEARCH_ENDPOINT",
        "CONVERSATION_STATE_UCID_ENDPOINT",
        "CONVERSATION_STATE_TRANSCRIPTS_ENDPOINT",
        "OAUTH_CLIENT_ID",
        "OAUTH_CLIENT_SECRET",
        "OAUTH_SCOPE",
        "OAUTH_TOKEN_URL",
        "CONFIG_PATH",
    ];

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn clear_env() {
        for key in ENV_KEYS {
            unsafe { std::env::remove_var(key) };
        }
    }

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    const MINIMAL_TOML: &str = r#"
[oauth]
client_id = "file-client"
"#;

    #[test]
    fn file_values_with_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_env() };
        unsafe { set_env("OAUTH_CLIENT_SECRET", "s3cret") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, MINIMAL_TOML);

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.oauth.client_id.as_deref(), Some("file-client"));
        assert_eq!(config.oauth.scope, "care.dataplane.read:all");
        assert_eq!(config.upstream.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.endpoints.ucid_detail, "/conversation-state/{ucid}");
        assert_eq!(config.server.max_connections, 1000);
        let settings = config.http_settings();
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert_eq!(settings.max_connections_per_host, 5);

        unsafe { clear_env() };
    }

    #[test]
    fn env_overrides_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_env() };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[oauth]
client_id = "file-client"
scope = "file.scope"

[upstream]
base_url = "https://file.example.com"

[endpoints]
search = "/file/search"
"#,
        );
        unsafe {
            set_env("OAUTH_CLIENT_SECRET", "s3cret");
            set_env("OAUTH_CLIENT_ID", "env-client");
            set_env("OAUTH_SCOPE", "env.scope");
            set_env("OAUTH_TOKEN_URL", "http://127.0.0.1:9/token");
            set_env("CONVERSATION_API_BASE_URL", "http://env.example.com");
            set_env("CONVERSATION_STATE_SEARCH_ENDPOINT", "/env/search");
            set_env("CONVERSATION_STATE_UCID_ENDPOINT", "/env/{ucid}");
            set_env("CONVERSATION_STATE_TRANSCRIPTS_ENDPOINT", "/env/t/{ucid}");
        }

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.oauth.client_id.as_deref(), Some("env-client"));
        assert_eq!(config.oauth.scope, "env.scope");
        assert_eq!(config.oauth.token_endpoint, "http://127.0.0.1:9/token");
        assert_eq!(config.upstream.base_url, "http://env.example.com");
        assert_eq!(config.endpoints.search, "/env/search");
        assert_eq!(config.endpoints.ucid_detail, "/env/{ucid}");
        assert_eq!(config.endpoints.transcripts, "/env/t/{ucid}");

        let credentials = config.credentials().unwrap();
        assert_eq!(credentials.client_id, "env-client");
        assert_eq!(credentials.client_secret.expose(), "s3cret");

        unsafe { clear_env() };
    }

    #[test]
    fn secret_from_file_when_env_unset() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_env() };
        let dir = tempfile::tempdir().unwrap();
        let secret_path = dir.path().join("secret");
        std::fs::write(&secret_path, "from-file\n").unwrap();
        let path = write_config(
            &dir,
            &format!(
                "[oauth]\nclient_id = \"c\"\nclient_secret_file = \"{}\"\n",
                secret_path.display()
            ),
        );

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(
            config.oauth.client_secret.as_ref().unwrap().expose(),
            "from-file"
        );
        assert_eq!(format!("{:?}", config.oauth.client_secret), "Some([REDACTED])");
    }

    #[test]
    fn missing_secret_is_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_env() };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, MINIMAL_TOML);

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("OAUTH_CLIENT_SECRET"));
    }

    #[test]
    fn missing_client_id_is_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_env() };
        unsafe { set_env("OAUTH_CLIENT_SECRET", "s3cret") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "");

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("OAUTH_CLIENT_ID"));
        unsafe { clear_env() };
    }

    #[test]
    fn explicit_missing_file_is_error() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_env() };
        let result = Config::load(Some(Path::new("/nonexistent/path/config.toml")));
        assert!(matches!(result, Err(common::Error::Io(_))));
    }

    #[test]
    fn invalid_toml_is_error() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_env() };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "not valid {{{{ toml");
        assert!(matches!(Config::load(Some(&path)), Err(common::Error::Toml(_))));
    }

    fn valid() -> Config {
        let mut config = Config::default();
        config.oauth.client_id = Some("c".into());
        config.oauth.client_secret = Some(Secret::new("s".to_string()));
        config
    }

    #[test]
    fn defaults_validate_once_credentials_set() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn validation_rules() {
        let mut config = valid();
        config.upstream.base_url = "ftp://example.com".into();
        assert!(config.validate().unwrap_err().to_string().contains("base_url"));

        let mut config = valid();
        config.oauth.token_endpoint = "example.com/token".into();
        assert!(config.validate().unwrap_err().to_string().contains("token_endpoint"));

        let mut config = valid();
        config.upstream.timeout_secs = 0;
        assert!(config.validate().unwrap_err().to_string().contains("timeout_secs"));

        let mut config = valid();
        config.upstream.max_connections_per_host = 0;
        assert!(
            config
                .validate()
                .unwrap_err()
                .to_string()
                .contains("max_connections_per_host")
        );

        let mut config = valid();
        config.endpoints.search = "search".into();
        assert!(config.validate().unwrap_err().to_string().contains("endpoints.search"));

        let mut config = valid();
        config.endpoints.transcripts = "/transcripts".into();
        assert!(config.validate().unwrap_err().to_string().contains("{ucid}"));

        let mut config = valid();
        config.oauth.client_secret = Some(Secret::new("  ".to_string()));
        assert!(config.validate().is_err());
    }

    #[test]
    fn resolve_path_prefers_cli() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_env() };
        assert_eq!(Config::resolve_path(None), None);

        unsafe { set_env("CONFIG_PATH", "/etc/from-env.toml") };
        assert_eq!(
            Config::resolve_path(None),
            Some(PathBuf::from("/etc/from-env.toml"))
        );
        assert_eq!(
            Config::resolve_path(Some("/cli.toml")),
            Some(PathBuf::from("/cli.toml"))
        );
        unsafe { clear_env() };
    }
}
