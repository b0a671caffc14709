use serde::{Deserialize, Serialize};
use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    time::Duration,
};

use crate::retry::RetryPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Directory holding the `*.ndjson` files to import
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Scheme and host under which the FHIR server reaches this machine.
    /// The file server port is appended to build manifest URLs.
    #[serde(default = "default_url_base")]
    pub url_base: String,
    /// FHIR base URL of the server receiving `$import`
    #[serde(default = "default_fhir_server_url")]
    pub fhir_server_url: String,
    /// Block until the FHIR server answers `$meta` before submitting
    #[serde(default = "default_ping_server")]
    pub ping_server: bool,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            url_base: default_url_base(),
            fhir_server_url: default_fhir_server_url(),
            ping_server: default_ping_server(),
            server: ServerConfig::default(),
            retry: RetryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl IngestConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.server.host.parse::<IpAddr>().is_err() {
            return Err(format!(
                "server.host must be an IP address, got '{}'",
                self.server.host
            ));
        }
        if self.url_base.trim().is_empty() {
            return Err("url_base must not be empty".into());
        }
        let base = self.manifest_base_url();
        let parsed = url::Url::parse(&base)
            .map_err(|e| format!("url_base gives an invalid manifest base URL '{base}': {e}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(format!("url_base must use http or https, got '{base}'"));
        }
        if self.fhir_server_url.trim().is_empty() {
            return Err("fhir_server_url must not be empty".into());
        }
        url::Url::parse(&self.fhir_server_url)
            .map_err(|e| format!("fhir_server_url is not a valid URL: {e}"))?;
        if self.retry.poll_interval_ms == 0 || self.retry.probe_interval_ms == 0 {
            return Err("retry intervals must be > 0".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }

    pub fn addr(&self) -> Result<SocketAddr, String> {
        let host: IpAddr = self
            .server
            .host
            .parse()
            .map_err(|e| format!("server.host '{}' is not an IP address: {e}", self.server.host))?;
        Ok(SocketAddr::from((host, self.server.port)))
    }

    /// Base URL written into manifests: `{url_base}:{server.port}`.
    pub fn manifest_base_url(&self) -> String {
        format!("{}:{}", self.url_base.trim_end_matches('/'), self.server.port)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.server.shutdown_timeout_ms)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.retry.batch_delay_ms)
    }

    pub fn poll_policy(&self) -> RetryPolicy {
        self.retry
            .bounded(RetryPolicy::fixed(Duration::from_millis(self.retry.poll_interval_ms)))
    }

    pub fn probe_policy(&self) -> RetryPolicy {
        self.retry
            .bounded(RetryPolicy::fixed(Duration::from_millis(self.retry.probe_interval_ms)))
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./fhir-data")
}
fn default_url_base() -> String {
    "http://host.docker.internal".into()
}
fn default_fhir_server_url() -> String {
    "http://host.docker.internal:8080/fhir".into()
}
fn default_ping_server() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// How long in-flight downloads may drain on shutdown
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8001
}
fn default_shutdown_timeout_ms() -> u64 {
    5_000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_interval_ms")]
    pub probe_interval_ms: u64,
    /// Give up probing/polling after this long; 0 retries forever
    #[serde(default)]
    pub max_wait_secs: u64,
    /// Pause between two batches
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
}

fn default_interval_ms() -> u64 {
    5_000
}
fn default_batch_delay_ms() -> u64 {
    1_000
}

impl RetryConfig {
    fn bounded(&self, policy: RetryPolicy) -> RetryPolicy {
        match self.max_wait_secs {
            0 => policy,
            secs => policy.with_max_duration(Duration::from_secs(secs)),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_interval_ms(),
            probe_interval_ms: default_interval_ms(),
            max_wait_secs: 0,
            batch_delay_ms: default_batch_delay_ms(),
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

pub mod loader {
    use super::IngestConfig;
    use config::{Config, Environment, File};
    use std::env;
    use std::path::PathBuf;

    pub const DEFAULT_CONFIG_FILE: &str = "octofhir-ingest.toml";

    /// Flat variable names understood for compatibility with container setups.
    const LEGACY_ENV: &[(&str, &str)] = &[
        ("DATA_DIR", "data_dir"),
        ("URL_BASE", "url_base"),
        ("FHIR_SERVER_URL", "fhir_server_url"),
    ];

    pub fn load_config(path: Option<&str>) -> Result<IngestConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if !pathbuf.exists() {
                    return Err(format!("config file not found: {p}"));
                }
                builder = builder.add_source(File::from(pathbuf));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g., OCTOFHIR_INGEST__SERVER__PORT=9001
        builder = builder.add_source(
            Environment::with_prefix("OCTOFHIR_INGEST")
                .try_parsing(true)
                .separator("__"),
        );
        // Legacy flat variables are applied as overrides and win over everything else
        for (var, key) in LEGACY_ENV {
            if let Ok(value) = env::var(var) {
                builder = builder
                    .set_override(*key, value)
                    .map_err(|e| format!("config override error ({var}): {e}"))?;
            }
        }
        if let Ok(value) = env::var("PORT") {
            let port: u16 = value
                .trim()
                .parse()
                .map_err(|_| format!("PORT must be a port number, got '{value}'"))?;
            builder = builder
                .set_override("server.port", i64::from(port))
                .map_err(|e| format!("config override error (PORT): {e}"))?;
        }
        if let Ok(value) = env::var("BLOCKING_PING_FHIR_SERVER") {
            builder = builder
                .set_override("ping_server", value.trim().eq_ignore_ascii_case("true"))
                .map_err(|e| format!("config override error (BLOCKING_PING_FHIR_SERVER): {e}"))?;
        }
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: IngestConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}
