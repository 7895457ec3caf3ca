use std::env;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::info;
use crate::config::{load_config, Config};
use crate::logging::setup_logger;
use crate::worker::default_period;

/// Loads configuration, starts logging and works out the period to process.
///
/// The configuration file is given by OCTOGRAPH_CONFIG (default octograph.toml),
/// OCTOGRAPH_FROM and OCTOGRAPH_TO (RFC 3339) override the default period.
pub fn init() -> Result<(Config, DateTime<Utc>, DateTime<Utc>)> {
    let config_path = env::var("OCTOGRAPH_CONFIG").unwrap_or("octograph.toml".to_string());
    let config = load_config(&config_path)
        .with_context(|| format!("loading configuration from {}", config_path))?;

    setup_logger(&config.general).context("setting up logging")?;

    info!("octograph version: {}", env!("CARGO_PKG_VERSION"));

    let (default_from, default_to) = default_period(&config.general.time_zone, config.general.days_back, Utc::now());
    let from = period_override("OCTOGRAPH_FROM")?.unwrap_or(default_from);
    let to = period_override("OCTOGRAPH_TO")?.unwrap_or(default_to);
    if from >= to {
        anyhow::bail!("period start {} is not before period end {}", from, to);
    }

    Ok((config, from, to))
}

fn period_override(var: &str) -> Result<Option<DateTime<Utc>>> {
    match env::var(var) {
        Ok(v) => {
            let date_time = DateTime::parse_from_rfc3339(&v)
                .with_context(|| format!("{} is not an RFC 3339 date time: {}", var, v))?;
            Ok(Some(date_time.with_timezone(&Utc)))
        }
        Err(_) => Ok(None),
    }
}
