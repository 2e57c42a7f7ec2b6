use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "Cocina";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_TEXT_ENDPOINT: &str = "https://router.huggingface.co/v1/chat/completions";
pub const DEFAULT_TEXT_MODEL: &str = "microsoft/Phi-3-mini-4k-instruct";
pub const DEFAULT_MAX_TOKENS: u32 = 1500;
pub const DEFAULT_IMAGE_ENDPOINT: &str =
    "https://api-inference.huggingface.co/models/ZB-Tech/Text-to-Image";
pub const DEFAULT_MIN_INGREDIENTS: usize = 5;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "info,cocina_lib=debug"
    } else {
        "info"
    }
}

/// Get the application data directory (`<platform data dir>/Cocina`).
/// Falls back to the working directory when the platform has none.
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default location of the recipe database.
pub fn default_database_path() -> PathBuf {
    app_data_dir().join("cocina.db")
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Resolved service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Bearer credential shared by the text and image services.
    pub hf_token: String,
    pub text_endpoint: String,
    pub text_model: String,
    pub max_tokens: u32,
    /// Collect a streamed completion instead of a single response body.
    pub stream_completion: bool,
    pub image_endpoint: String,
    pub images_enabled: bool,
    /// Minimum number of usable ingredients per request.
    pub min_ingredients: usize,
    pub request_timeout_secs: u64,
    pub bind_addr: SocketAddr,
    pub database_path: PathBuf,
    /// Base URL used when building share links (e.g. `https://cocina.example`).
    pub public_base_url: Option<String>,
}

impl AppConfig {
    /// Resolve configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let hf_token = get("HF_TOKEN").ok_or(ConfigError::Missing("HF_TOKEN"))?;

        let min_ingredients = parse_nonzero(
            "COCINA_MIN_INGREDIENTS",
            get("COCINA_MIN_INGREDIENTS"),
            DEFAULT_MIN_INGREDIENTS,
        )?;
        // reqwest treats a zero timeout as "expire immediately".
        let request_timeout_secs = parse_nonzero(
            "COCINA_REQUEST_TIMEOUT_SECS",
            get("COCINA_REQUEST_TIMEOUT_SECS"),
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;

        let bind_addr = match get("COCINA_BIND_ADDR") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                key: "COCINA_BIND_ADDR",
                value: raw,
            })?,
            None => DEFAULT_BIND_ADDR.parse().map_err(|_| ConfigError::Invalid {
                key: "COCINA_BIND_ADDR",
                value: DEFAULT_BIND_ADDR.into(),
            })?,
        };

        Ok(Self {
            hf_token,
            text_endpoint: get("COCINA_TEXT_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_TEXT_ENDPOINT.into()),
            text_model: get("COCINA_TEXT_MODEL").unwrap_or_else(|| DEFAULT_TEXT_MODEL.into()),
            max_tokens: parse_or(
                "COCINA_MAX_TOKENS",
                get("COCINA_MAX_TOKENS"),
                DEFAULT_MAX_TOKENS,
            )?,
            stream_completion: parse_bool(
                "COCINA_STREAM_COMPLETION",
                get("COCINA_STREAM_COMPLETION"),
                false,
            )?,
            image_endpoint: get("COCINA_IMAGE_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_IMAGE_ENDPOINT.into()),
            images_enabled: parse_bool(
                "COCINA_IMAGES_ENABLED",
                get("COCINA_IMAGES_ENABLED"),
                true,
            )?,
            min_ingredients,
            request_timeout_secs,
            bind_addr,
            database_path: get("COCINA_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(default_database_path),
            public_base_url: get("COCINA_PUBLIC_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string()),
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    key: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

/// Like [`parse_or`], but a value of zero is rejected.
fn parse_nonzero<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialEq + Default,
{
    let value = parse_or(key, raw, default)?;
    if value == T::default() {
        return Err(ConfigError::Invalid {
            key,
            value: "0".into(),
        });
    }
    Ok(value)
}

fn parse_bool(key: &'static str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(_) => Err(ConfigError::Invalid {
            key,
            value: raw.unwrap_or_default(),
        }),
    }
}
