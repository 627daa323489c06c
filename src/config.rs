use std::env;
use std::path::PathBuf;
use thiserror::Error;
use time::UtcOffset;

use crate::aggregator::Downsampling;
use crate::report::ChartSettings;
use crate::utils::parse_utc_offset;

const DEFAULT_CHART_FONT: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
    #[error("{name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub utc_offset: UtcOffset,
    pub downsampling: Downsampling,
    pub chart_font: PathBuf,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        // Load environment variables
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::MissingDatabaseUrl)?;

        let utc_offset = match lookup("UTC_OFFSET") {
            Some(value) => parse_utc_offset(&value).map_err(|reason| ConfigError::Invalid {
                name: "UTC_OFFSET",
                reason,
            })?,
            None => UtcOffset::UTC,
        };

        let downsampling = match lookup("DOWNSAMPLING") {
            Some(value) => value.parse::<Downsampling>().map_err(|reason| ConfigError::Invalid {
                name: "DOWNSAMPLING",
                reason,
            })?,
            None => Downsampling::default(),
        };

        let chart_font = lookup("CHART_FONT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CHART_FONT));

        Ok(AppConfig {
            database_url,
            utc_offset,
            downsampling,
            chart_font,
        })
    }

    pub fn chart_settings(&self) -> ChartSettings {
        ChartSettings {
            utc_offset: self.utc_offset,
            downsampling: self.downsampling,
        }
    }
}
