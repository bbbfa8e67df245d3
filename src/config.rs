use std::collections::HashSet;
use std::env;
use std::time::Duration;
use thiserror::Error;

use crate::services::planner::FormatPolicy;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    S3,
    Local,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bucket_source: String,
    pub bucket_target: String,
    /// Public base URL the redirect `Location` is built from.
    pub url: String,
    pub allowed_dimensions: HashSet<String>,
    pub allowed_extensions: HashSet<String>,
    pub format_policy: FormatPolicy,
    pub storage_type: StorageType,
    pub storage_dir: String,
    pub s3_region: String,
    pub s3_endpoint: Option<String>,
    pub s3_access_key: Option<String>,
    pub s3_secret_key: Option<String>,
    pub s3_path_style: bool,
    pub request_timeout: Option<Duration>,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bucket_source = required("BUCKET_SOURCE")?;
        let bucket_target = optional("BUCKET_TARGET").unwrap_or_else(|| bucket_source.clone());

        let format_policy = match optional("OUTPUT_FORMAT") {
            Some(value) => FormatPolicy::from_name(&value).ok_or(ConfigError::Invalid {
                name: "OUTPUT_FORMAT",
                value,
            })?,
            None => FormatPolicy::default(),
        };

        let storage_type = match optional("STORAGE_TYPE").as_deref().map(str::to_lowercase) {
            None => StorageType::S3,
            Some(value) if value == "s3" => StorageType::S3,
            Some(value) if value == "local" => StorageType::Local,
            Some(value) => return Err(ConfigError::Invalid { name: "STORAGE_TYPE", value }),
        };

        let request_timeout = match optional("REQUEST_TIMEOUT_SECS") {
            Some(value) => Some(Duration::from_secs(value.parse().map_err(|_| {
                ConfigError::Invalid {
                    name: "REQUEST_TIMEOUT_SECS",
                    value: value.clone(),
                }
            })?)),
            None => None,
        };

        Ok(Self {
            bucket_source,
            bucket_target,
            url: required("URL")?.trim_end_matches('/').to_string(),
            allowed_dimensions: parse_list(optional("ALLOWED_DIMENSIONS").as_deref()),
            allowed_extensions: parse_extensions(optional("ALLOWED_EXTENSIONS").as_deref()),
            format_policy,
            storage_type,
            storage_dir: optional("STORAGE_DIR").unwrap_or_else(|| "./storage".to_string()),
            s3_region: optional("S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            s3_endpoint: optional("S3_ENDPOINT"),
            s3_access_key: optional("S3_ACCESS_KEY"),
            s3_secret_key: optional("S3_SECRET_KEY"),
            s3_path_style: optional("S3_PATH_STYLE")
                .map(|v| v.to_lowercase() == "true")
                .unwrap_or(false),
            request_timeout,
            port: optional("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

/// Unset and empty variables are treated alike.
fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Comma separated list; whitespace around entries and empty entries are dropped.
pub fn parse_list(raw: Option<&str>) -> HashSet<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Like `parse_list`, lowercased and with an optional leading dot removed.
pub fn parse_extensions(raw: Option<&str>) -> HashSet<String> {
    parse_list(raw)
        .into_iter()
        .map(|ext| ext.trim_start_matches('.').to_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}
