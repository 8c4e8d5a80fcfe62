use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;
use std::time::Duration;
use url::Url;

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_STALE_SECS: u64 = 300;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_TECHNICAL_RESULTS_LIMIT: usize = 200;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: Url,
    pub supabase_url: Url,
    pub supabase_anon_key: String,
    pub realtime_url: Url,
    pub http_timeout: Duration,
    pub stale_time: Duration,
    pub max_retries: u32,
    pub technical_results_limit: usize,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    /// Builds a config with defaults for everything but the three origins.
    pub fn new(api_base_url: &str, supabase_url: &str, supabase_anon_key: &str) -> Result<Self> {
        let api_base_url = parse_url("API_BASE_URL", api_base_url)?;
        let supabase_url = parse_url("SUPABASE_URL", supabase_url)?;
        let realtime_url = derive_realtime_url(&supabase_url)?;
        Ok(Self {
            api_base_url,
            supabase_url,
            supabase_anon_key: supabase_anon_key.to_string(),
            realtime_url,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            stale_time: Duration::from_secs(DEFAULT_STALE_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            technical_results_limit: DEFAULT_TECHNICAL_RESULTS_LIMIT,
        })
    }

    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let api_base_url = env::var("API_BASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| Error::Config("API base URL is not configured (API_BASE_URL)".to_string()))?;

        let mut config = Self::new(
            &api_base_url,
            &get_env("SUPABASE_URL")?,
            &get_env("SUPABASE_ANON_KEY")?,
        )?;

        if let Ok(raw) = env::var("REALTIME_URL") {
            config.realtime_url = parse_url("REALTIME_URL", &raw)?;
        }
        config.http_timeout = Duration::from_secs(
            get_env_parse_or("HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?,
        );
        config.stale_time =
            Duration::from_secs(get_env_parse_or("QUERY_STALE_SECS", DEFAULT_STALE_SECS)?);
        config.max_retries = get_env_parse_or("QUERY_MAX_RETRIES", DEFAULT_MAX_RETRIES)?;
        config.technical_results_limit =
            get_env_parse_or("TECHNICAL_RESULTS_LIMIT", DEFAULT_TECHNICAL_RESULTS_LIMIT)?;

        Ok(config)
    }
}

fn parse_url(name: &str, raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))?;
    // Joining relative paths drops the last segment unless the base ends with '/'.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn derive_realtime_url(supabase_url: &Url) -> Result<Url> {
    let mut url = supabase_url.join("realtime/v1/websocket")?;
    let scheme = if supabase_url.scheme() == "https" { "wss" } else { "ws" };
    url.set_scheme(scheme)
        .map_err(|_| Error::Config(format!("Cannot derive realtime URL from {}", supabase_url)))?;
    Ok(url)
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> Result<&'static Config> {
    CONFIG
        .get()
        .ok_or_else(|| Error::Config("Configuration has not been initialized".to_string()))
}
