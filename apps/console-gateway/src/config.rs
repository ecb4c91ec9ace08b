//! Gateway configuration loading and types.

use porter_api_saml::SsoConfig;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Root gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub uploads: UploadConfig,
    #[serde(default)]
    pub sso: SsoSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Accounts the config-backed authenticator accepts.
    #[serde(default)]
    pub users: Vec<UserEntry>,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_body_size")]
    pub max_body_size_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_size_bytes: default_max_body_size(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_max_body_size() -> usize {
    64 * 1024 * 1024 // 64MB, uploads included
}

/// Session lifecycle configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: i64,
    #[serde(default = "default_cookie_path")]
    pub cookie_path: String,
    #[serde(default = "default_logout_location")]
    pub logout_location: String,
    #[serde(default = "default_target")]
    pub default_target: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            cookie_path: default_cookie_path(),
            logout_location: default_logout_location(),
            default_target: default_target(),
        }
    }
}

fn default_timeout() -> i64 {
    8 * 60 * 60
}

fn default_cookie_path() -> String {
    "/console/".to_string()
}

fn default_logout_location() -> String {
    "/".to_string()
}

fn default_target() -> String {
    "/console/manage/".to_string()
}

/// Upload staging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_upload_dir")]
    pub dir: String,
    #[serde(default = "default_min_free_kib")]
    pub min_free_kib: u64,
    #[serde(default = "default_max_file_kib")]
    pub max_file_kib: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: default_upload_dir(),
            min_free_kib: default_min_free_kib(),
            max_file_kib: default_max_file_kib(),
        }
    }
}

fn default_upload_dir() -> String {
    "/var/spool/porter-uploads".to_string()
}

fn default_min_free_kib() -> u64 {
    51_200 // 50MB
}

fn default_max_file_kib() -> u64 {
    65_536 // 64MB
}

/// Single sign-on settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SsoSettings {
    #[serde(default = "default_idp_query_param")]
    pub idp_query_param: String,
}

impl Default for SsoSettings {
    fn default() -> Self {
        Self {
            idp_query_param: default_idp_query_param(),
        }
    }
}

fn default_idp_query_param() -> String {
    "idp".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info,console_gateway=debug".to_string()
}

/// One account the config-backed authenticator accepts.
#[derive(Debug, Clone, Deserialize)]
pub struct UserEntry {
    pub username: String,
    pub password: String,
}

impl ConsoleConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Read {
                path: path.as_ref().display().to_string(),
                source,
            })?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Get the configuration file path from environment or default.
    pub fn config_path() -> String {
        std::env::var("PORTER_CONFIG").unwrap_or_else(|_| "./config/console.yaml".to_string())
    }

    /// Apply environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("PORTER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("PORTER_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(dir) = std::env::var("PORTER_UPLOAD_DIR") {
            self.uploads.dir = dir;
        }
        if let Ok(timeout) = std::env::var("PORTER_SESSION_TIMEOUT") {
            if let Ok(timeout) = timeout.parse() {
                self.session.timeout_secs = timeout;
            }
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Settings for the single sign-on routes.
    ///
    /// A finished provider logout must land on the local `/logout`
    /// route, which expires the session; `logout_location` is only
    /// where that route sends the browser afterwards.
    pub fn sso_config(&self) -> SsoConfig {
        SsoConfig {
            idp_query_param: self.sso.idp_query_param.clone(),
            acs_url: "/saml/".into(),
            default_target: self.session.default_target.clone(),
            logout_landing: "/logout".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r#"
server:
  port: 9090

users:
  - username: admin
    password: hunter2
"#;
        let config = ConsoleConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.session.timeout_secs, 8 * 60 * 60);
        assert_eq!(config.session.cookie_path, "/console/");
        assert_eq!(config.users.len(), 1);
        assert_eq!(config.users[0].username, "admin");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ConsoleConfig::from_yaml("{}").unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:8090");
        assert_eq!(config.uploads.min_free_kib, 51_200);
        assert_eq!(config.sso.idp_query_param, "idp");
        assert!(config.users.is_empty());
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
server:
  host: 127.0.0.1
  port: 8443
  max_body_size_bytes: 1048576

session:
  timeout_secs: 600
  cookie_path: /manage/
  logout_location: /goodbye
  default_target: /manage/home/

uploads:
  dir: /tmp/porter
  min_free_kib: 1024
  max_file_kib: 2048

sso:
  idp_query_param: provider

logging:
  level: debug
"#;
        let config = ConsoleConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:8443");
        assert_eq!(config.session.timeout_secs, 600);
        assert_eq!(config.session.default_target, "/manage/home/");
        assert_eq!(config.uploads.max_file_kib, 2048);
        assert_eq!(config.sso.idp_query_param, "provider");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_sso_config_finishes_provider_logouts_on_the_logout_route() {
        let yaml = r#"
session:
  logout_location: /
  default_target: /manage/home/
"#;
        let config = ConsoleConfig::from_yaml(yaml).unwrap();
        let sso = config.sso_config();
        // Landing on `logout_location` directly would leave the session
        // live with valid cookies.
        assert_eq!(sso.logout_landing, "/logout");
        assert_eq!(sso.default_target, "/manage/home/");
        assert_eq!(config.session.logout_location, "/");
    }
}
