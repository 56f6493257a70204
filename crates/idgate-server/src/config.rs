use idgate_auth::config::AuthConfig;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, time::Duration};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Token validation configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// Who may use cookie-authenticated endpoints
    #[serde(default)]
    pub access: AccessConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Server validations
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.server.request_timeout_ms == 0 {
            return Err("server.request_timeout_ms must be > 0".into());
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        // Auth validation
        self.auth
            .validate()
            .map_err(|e| format!("auth config error: {e}"))?;
        if self.auth.default_audience.is_none() {
            return Err(
                "auth.default_audience is required (or set FIREBASE_PROJECT_ID)".into(),
            );
        }
        // Access validation
        match (self.access.allow_all, &self.access.allowed_users) {
            (true, Some(_)) => {
                return Err(
                    "access.allow_all and access.allowed_users are mutually exclusive".into(),
                );
            }
            (false, None) => {
                return Err(
                    "access.allowed_users is required (or set ALLOWED_USERS, or access.allow_all = true)"
                        .into(),
                );
            }
            _ => {}
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.server.request_timeout_ms as u64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u32,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout_ms() -> u32 {
    15_000
}
fn default_body_limit() -> usize {
    64 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_ms: default_request_timeout_ms(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AccessConfig {
    /// Subjects allowed through the cookie extractor. An empty list admits
    /// nobody.
    #[serde(default)]
    pub allowed_users: Option<Vec<String>>,
    /// Admit every valid token instead of consulting `allowed_users`.
    #[serde(default)]
    pub allow_all: bool,
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Audience fallback when `auth.default_audience` is unset.
    pub const PROJECT_ID_ENV: &str = "FIREBASE_PROJECT_ID";

    /// JSON array of allowed subjects, used when `access.allowed_users` is unset.
    pub const ALLOWED_USERS_ENV: &str = "ALLOWED_USERS";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if pathbuf.exists() {
                    builder = builder.add_source(File::from(pathbuf));
                }
            }
            None => {
                // Try default root-level file
                let default_path = PathBuf::from("idgate.toml");
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g., IDGATE__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("IDGATE")
                .try_parsing(true)
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("access.allowed_users"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let mut merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;

        apply_legacy_env(&mut merged)?;

        // Validate
        merged.validate()?;
        Ok(merged)
    }

    fn apply_legacy_env(cfg: &mut AppConfig) -> Result<(), String> {
        if cfg.auth.default_audience.is_none()
            && let Ok(project) = std::env::var(PROJECT_ID_ENV)
            && !project.is_empty()
        {
            cfg.auth.default_audience = Some(project);
        }

        if cfg.access.allowed_users.is_none()
            && !cfg.access.allow_all
            && let Ok(raw) = std::env::var(ALLOWED_USERS_ENV)
            && !raw.is_empty()
        {
            let users: Vec<String> = serde_json::from_str(&raw)
                .map_err(|e| format!("{ALLOWED_USERS_ENV} must be a JSON array of strings: {e}"))?;
            cfg.access.allowed_users = Some(users);
        }

        Ok(())
    }
}
