use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

fn default_max_file_size() -> usize {
    // 10 MB in bytes
    10 * 1024 * 1024
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub max_file_size: usize,
    pub preview_rows: usize,
    pub default_sheet: String,
    pub default_key_column: String,
    pub result_sheet_name: String,
    pub result_file_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            max_file_size: default_max_file_size(),
            preview_rows: 5,
            default_sheet: "Sheet1".to_string(),
            default_key_column: "bronco id".to_string(),
            result_sheet_name: "Non_HRT_Attendees".to_string(),
            result_file_name: "Non_HRT_BBQ_Attendees.xlsx".to_string(),
        }
    }
}

impl Config {
    /// Loads `.env` (if present) and overlays any variables set in the environment.
    pub fn new() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        Ok(Config {
            host: parse_var(&lookup, "HOST", defaults.host)?,
            port: parse_var(&lookup, "PORT", defaults.port)?,
            max_file_size: parse_var(&lookup, "MAX_FILE_SIZE", defaults.max_file_size)?,
            preview_rows: parse_var(&lookup, "PREVIEW_ROWS", defaults.preview_rows)?,
            default_sheet: lookup("DEFAULT_SHEET").unwrap_or(defaults.default_sheet),
            default_key_column: lookup("DEFAULT_KEY_COLUMN").unwrap_or(defaults.default_key_column),
            result_sheet_name: lookup("RESULT_SHEET_NAME").unwrap_or(defaults.result_sheet_name),
            result_file_name: lookup("RESULT_FILE_NAME").unwrap_or(defaults.result_file_name),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Failed to parse {}={:?}", key, raw)),
        None => Ok(default),
    }
}

pub fn load_config() -> Result<Config> {
    let config = Config::new()?;
    tracing::info!(
        "Loaded configuration: addr={}, max_file_size={}B, default_sheet={}, default_key_column={}",
        config.addr(),
        config.max_file_size,
        config.default_sheet,
        config.default_key_column
    );
    Ok(config)
}
