//! Client configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via MAZEWIRE_CONFIG or --config)
//! 3. Environment variables

use mazewire_wire::QueryEncoding;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API endpoint configuration.
    pub api: ApiConfig,
    /// HTTP transport configuration.
    pub http: HttpConfig,
    /// TLS configuration.
    pub tls: TlsConfig,
    /// Initial active site.
    pub site: SiteConfig,
}

impl ClientConfig {
    /// Loads configuration from file, then applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("MAZEWIRE_CONFIG").ok().map(PathBuf::from);
        Self::load_from(path.as_deref())
    }

    /// Like [`ClientConfig::load`], with an explicit file taking precedence.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: ClientConfig = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        self.api.apply_env_overrides();
        self.http.apply_env_overrides();
        self.tls.apply_env_overrides();
        self.site.apply_env_overrides();
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api.validate()?;
        self.http.validate()
    }

    /// Saves configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        Ok(())
    }
}

/// API endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// URL prefix every endpoint is appended to.
    pub base_url: String,
    /// Endpoint that logs an operator in.
    pub auth_endpoint: String,
    /// Text encoding of GET payloads.
    pub query_encoding: QueryEncoding,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api/".to_string(),
            auth_endpoint: "auth".to_string(),
            query_encoding: QueryEncoding::Hex,
        }
    }
}

impl ApiConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("MAZEWIRE_API_URL") {
            if !url.is_empty() {
                self.base_url = url;
            }
        }

        if let Ok(ep) = std::env::var("MAZEWIRE_AUTH_ENDPOINT") {
            if !ep.is_empty() {
                self.auth_endpoint = ep;
            }
        }

        if let Ok(enc) = std::env::var("MAZEWIRE_QUERY_ENCODING") {
            if let Ok(parsed) = enc.parse() {
                self.query_encoding = parsed;
            }
        }
    }

    /// Base URL with exactly one trailing slash.
    pub fn normalized_base_url(&self) -> String {
        format!("{}/", self.base_url.trim_end_matches('/'))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "api.base_url is empty".to_string(),
            ));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::ValidationError(format!(
                "api.base_url must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }
        if self.auth_endpoint.is_empty() {
            return Err(ConfigError::ValidationError(
                "api.auth_endpoint is empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// HTTP transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Connection timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
    /// User-Agent header value.
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            user_agent: concat!("mazewire/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(timeout) = std::env::var("MAZEWIRE_CONNECT_TIMEOUT") {
            if let Ok(secs) = timeout.parse() {
                self.connect_timeout_secs = secs;
            }
        }

        if let Ok(timeout) = std::env::var("MAZEWIRE_REQUEST_TIMEOUT") {
            if let Ok(secs) = timeout.parse() {
                self.request_timeout_secs = secs;
            }
        }
    }

    /// Returns the connect timeout as Duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Returns the request timeout as Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.connect_timeout_secs == 0 || self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "http timeouts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// TLS configuration for https base URLs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Path to PEM-encoded CA certificate(s) for server verification.
    /// If None, the bundled web PKI roots are used.
    pub ca_cert_path: Option<PathBuf>,
    /// Path to PEM-encoded client certificate (for mTLS).
    pub client_cert_path: Option<PathBuf>,
    /// Path to PEM-encoded client private key (for mTLS).
    pub client_key_path: Option<PathBuf>,
    /// Skip server certificate verification (INSECURE - development only).
    pub insecure: bool,
    /// Server name for SNI (defaults to the URL host).
    pub server_name: Option<String>,
}

impl TlsConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("MAZEWIRE_CA_CERT") {
            self.ca_cert_path = Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("MAZEWIRE_CLIENT_CERT") {
            self.client_cert_path = Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("MAZEWIRE_CLIENT_KEY") {
            self.client_key_path = Some(PathBuf::from(path));
        }
        if let Ok(insecure) = std::env::var("MAZEWIRE_TLS_INSECURE") {
            self.insecure = insecure == "1" || insecure.to_lowercase() == "true";
        }
    }
}

/// Site selected at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Site id; 0 acts on the site served by the API host.
    pub id: i64,
}

impl SiteConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(id) = std::env::var("MAZEWIRE_SITE_ID") {
            if let Ok(n) = id.parse() {
                self.id = n;
            }
        }
    }
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::ValidationError(msg) => {
                write!(f, "configuration validation failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.api.base_url, "http://localhost:8080/api/");
        assert_eq!(config.api.auth_endpoint, "auth");
        assert_eq!(config.api.query_encoding, QueryEncoding::Hex);
        assert_eq!(config.http.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.site.id, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_normalized_base_url() {
        let mut api = ApiConfig::default();
        api.base_url = "https://example.com/api".into();
        assert_eq!(api.normalized_base_url(), "https://example.com/api/");
        api.base_url = "https://example.com/api//".into();
        assert_eq!(api.normalized_base_url(), "https://example.com/api/");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = ClientConfig::default();
        config.api.base_url = "ftp://example.com".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));

        let mut config = ClientConfig::default();
        config.http.connect_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let mut config = ClientConfig::default();
        config.api.query_encoding = QueryEncoding::Base32;
        config.site.id = 4;
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: ClientConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.api.query_encoding, QueryEncoding::Base32);
        assert_eq!(parsed.site.id, 4);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let parsed: ClientConfig =
            serde_yaml::from_str("api:\n  base_url: https://admin.example.com/api/\n").unwrap();
        assert_eq!(parsed.api.base_url, "https://admin.example.com/api/");
        assert_eq!(parsed.api.auth_endpoint, "auth");
        assert_eq!(parsed.http.connect_timeout_secs, 10);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mazewire.yaml");

        let mut config = ClientConfig::default();
        config.api.base_url = "https://admin.example.com/api/".into();
        config.save(&path).unwrap();

        let loaded = ClientConfig::from_file(&path).unwrap();
        assert_eq!(loaded.api.base_url, "https://admin.example.com/api/");
    }

    #[test]
    fn test_missing_file_error() {
        let result = ClientConfig::from_file("/nonexistent/mazewire.yaml");
        assert!(matches!(result, Err(ConfigError::IoError(..))));
    }
}
