use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for Sumi-Relay
///
/// Every section is optional; missing keys take their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub pipeline: PipelineConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub storage: StorageConfig,
}

/// HTTP surface configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the HTTP server binds to
    #[serde(rename = "listen-addr")]
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8000".to_string(),
        }
    }
}

/// Pipeline behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum number of tasks in the fetching/fetched window
    #[serde(rename = "max-active")]
    pub max_active: usize,

    /// Period of the extraction scheduler (milliseconds)
    #[serde(rename = "poll-interval-ms")]
    pub poll_interval_ms: u64,

    /// Number of documents parsed concurrently
    #[serde(rename = "extraction-workers")]
    pub extraction_workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_active: 5,
            poll_interval_ms: 5000,
            extraction_workers: 2,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name sent in the User-Agent header
    #[serde(rename = "client-name")]
    pub client_name: String,

    /// Version sent in the User-Agent header
    #[serde(rename = "client-version")]
    pub client_version: String,

    /// Total time allowed for one request (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            client_name: "SumiRelay".to_string(),
            client_version: "1.0".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// On-disk storage configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory downloaded images are written to
    #[serde(rename = "image-dir")]
    pub image_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            image_dir: PathBuf::from("./images"),
        }
    }
}
