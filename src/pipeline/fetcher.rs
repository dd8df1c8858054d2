//! HTTP fetcher implementation
//!
//! This module handles all network and disk I/O for the pipeline stages:
//! - Building the shared HTTP client with the configured user agent
//! - GET requests for page content
//! - GET requests for referenced images
//! - Writing downloaded images under the image directory

use crate::config::UserAgentConfig;
use crate::task::TaskId;
use crate::StageError;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// File name used when an image URL has no usable last path segment
const FALLBACK_IMAGE_NAME: &str = "image";

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use sumi_relay::config::UserAgentConfig;
/// use sumi_relay::pipeline::build_http_client;
///
/// let config = UserAgentConfig::default();
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    // Format: ClientName/Version
    let user_agent = format!("{}/{}", config.client_name, config.client_version);

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches the body of a page
///
/// Transport failures, non-success status codes and undecodable bodies are
/// all reported as [`StageError::Fetch`].
pub async fn fetch_content(client: &Client, url: &Url) -> Result<String, StageError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|e| StageError::Fetch(e.to_string()))?;

    response
        .text()
        .await
        .map_err(|e| StageError::Fetch(e.to_string()))
}

/// Downloads the bytes of an image
pub async fn fetch_image(client: &Client, url: &Url) -> Result<Vec<u8>, StageError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|e| StageError::ImageHttp(e.to_string()))?;

    let bytes = response
        .bytes()
        .await
        .map_err(|e| StageError::ImageHttp(e.to_string()))?;

    Ok(bytes.to_vec())
}

/// Writes image bytes to `<image_dir>/<task id>-<base name>`
///
/// # Returns
///
/// * `Ok(PathBuf)` - Path of the written file
/// * `Err(StageError::ImageIo)` - The file could not be written
pub async fn save_image(
    image_dir: &Path,
    id: &TaskId,
    url: &Url,
    bytes: &[u8],
) -> Result<PathBuf, StageError> {
    let path = image_dir.join(image_file_name(id, url));

    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| StageError::ImageIo(e.to_string()))?;

    Ok(path)
}

/// Downloads an image and saves it, returning the written path
pub async fn download_image(
    client: &Client,
    image_dir: &Path,
    id: &TaskId,
    url: &Url,
) -> Result<PathBuf, StageError> {
    let bytes = fetch_image(client, url).await?;
    tracing::debug!("Task {}: downloaded {} image bytes", id, bytes.len());
    save_image(image_dir, id, url, &bytes).await
}

/// Builds the on-disk file name for a task's image
///
/// The base name is the last non-empty path segment of the image URL,
/// with any character outside `[A-Za-z0-9._-]` replaced by `_`.
pub fn image_file_name(id: &TaskId, url: &Url) -> String {
    let base_name = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(sanitize_file_name)
        .filter(|name| !name.is_empty() && name != "." && name != "..")
        .unwrap_or_else(|| FALLBACK_IMAGE_NAME.to_string());

    format!("{}-{}", id, base_name)
}

fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
