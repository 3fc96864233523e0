use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 50;
pub const DEFAULT_ACCEPTED_SUFFIX: &str = ".pdf";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the analysis API, including the version prefix
    pub api_base_url: String,
    pub poll_interval: Duration,
    /// Largest accepted upload, in bytes
    pub max_upload_bytes: u64,
    /// Required trailing file name match, compared case-insensitively
    pub accepted_suffix: String,
    pub request_timeout: Duration,
    pub download_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
            accepted_suffix: DEFAULT_ACCEPTED_SUFFIX.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            download_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_base_url: env::var("ANALYSIS_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base_url),
            poll_interval: Duration::from_millis(parse_var(
                "ANALYSIS_POLL_INTERVAL_MS",
                DEFAULT_POLL_INTERVAL_MS,
            )),
            max_upload_bytes: upload_limit(parse_var("ANALYSIS_MAX_UPLOAD_MB", DEFAULT_MAX_UPLOAD_MB)),
            accepted_suffix: env::var("ANALYSIS_ACCEPTED_SUFFIX").unwrap_or(defaults.accepted_suffix),
            request_timeout: Duration::from_secs(parse_var(
                "ANALYSIS_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )),
            download_dir: env::var("ANALYSIS_DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.download_dir),
        }
    }

    /// Server root, i.e. the base URL without its `/api/vN` prefix
    pub fn server_root(&self) -> String {
        match self.api_base_url.find("/api/") {
            Some(idx) => self.api_base_url[..idx].to_string(),
            None => self.api_base_url.clone(),
        }
    }
}

fn parse_var(name: &str, default: u64) -> u64 {
    parse_value(name, env::var(name).ok().as_deref(), default)
}

/// Positive number, or `default` when unset or invalid
fn parse_value(name: &str, raw: Option<&str>, default: u64) -> u64 {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse::<u64>() {
        Ok(0) => {
            log::warn!("{} must be greater than zero; using {}", name, default);
            default
        }
        Ok(value) => value,
        Err(_) => {
            log::warn!("{} must be a number, got '{}'; using {}", name, raw, default);
            default
        }
    }
}

fn upload_limit(megabytes: u64) -> u64 {
    megabytes.checked_mul(1024 * 1024).unwrap_or_else(|| {
        log::warn!(
            "ANALYSIS_MAX_UPLOAD_MB={} is too large; using {}",
            megabytes,
            DEFAULT_MAX_UPLOAD_MB
        );
        DEFAULT_MAX_UPLOAD_MB * 1024 * 1024
    })
}
