use std::fs;
use chrono::NaiveTime;
use chrono_tz::Tz;
use log::LevelFilter;
use serde::{Deserialize, Deserializer};
use serde::de::Error;
use crate::errors::ConfigError;
use crate::tariff::LowRateWindow;

const DEFAULT_API_BASE: &str = "https://api.octopus.energy/v1";

#[derive(Deserialize)]
pub struct General {
    pub log_path: String,
    pub log_level: LevelFilter,
    pub log_to_stdout: bool,
    #[serde(default = "default_time_zone")]
    pub time_zone: Tz,
    #[serde(default = "default_days_back")]
    pub days_back: u32,
    pub json_dir: Option<String>,
}

#[derive(Deserialize)]
pub struct InfluxDb {
    pub url: String,
    pub token: String,
    pub bucket: String,
    pub org: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

#[derive(Deserialize)]
pub struct Octopus {
    pub api_key: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Deserialize)]
pub struct Electricity {
    pub mpan: u64,
    pub serial_number: String,
    pub unit_rate_high: f64,
    pub unit_rate_low: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_time_of_day")]
    pub unit_rate_low_start: Option<NaiveTime>,
    #[serde(default, deserialize_with = "deserialize_time_of_day")]
    pub unit_rate_low_end: Option<NaiveTime>,
    pub unit_rate_time_zone: Option<Tz>,
    pub standing_charge: Option<f64>,
    pub standing_charge_url: Option<String>,
    pub agile_rate_url: Option<String>,
    pub agile_standing_charge: Option<f64>,
}

#[derive(Deserialize)]
pub struct Gas {
    pub mprn: u64,
    pub serial_number: String,
    pub unit_rate: f64,
    pub standing_charge: Option<f64>,
    pub standing_charge_url: Option<String>,
    pub meter_type: u8,
    pub volume_correction_factor: Option<f64>,
    pub calorific_value: Option<f64>,
}

#[derive(Deserialize)]
pub struct Config {
    pub general: General,
    pub influxdb: Option<InfluxDb>,
    pub octopus: Octopus,
    pub electricity: Option<Electricity>,
    pub gas: Option<Gas>,
}

/// Where the standing charge for a utility comes from
pub enum StandingCharge<'a> {
    Fixed(f64),
    Url(&'a str),
}

impl Electricity {
    /// Consumption endpoint for the electricity meter
    ///
    /// # Arguments
    ///
    /// * 'api_base' - Octopus API base url
    pub fn url(&self, api_base: &str) -> String {
        format!("{}/electricity-meter-points/{}/meters/{}/consumption/",
                api_base.trim_end_matches('/'), self.mpan, self.serial_number)
    }

    /// Returns the low rate window if one is configured.
    /// Start, end and time zone must be given together.
    pub fn low_rate_window(&self) -> Result<Option<LowRateWindow>, ConfigError> {
        match (self.unit_rate_low_start, self.unit_rate_low_end, self.unit_rate_time_zone) {
            (None, None, None) => Ok(None),
            (Some(start), Some(end), Some(time_zone)) => {
                if start == end {
                    return Err(ConfigError::from("electricity low rate window start and end are equal"));
                }
                Ok(Some(LowRateWindow { start, end, time_zone }))
            }
            _ => Err(ConfigError::from(
                "electricity low rate window needs unit_rate_low_start, unit_rate_low_end and unit_rate_time_zone")),
        }
    }

    pub fn standing_charge(&self) -> Result<StandingCharge<'_>, ConfigError> {
        standing_charge_source("electricity", self.standing_charge, self.standing_charge_url.as_deref())
    }
}

impl Gas {
    /// Consumption endpoint for the gas meter
    ///
    /// # Arguments
    ///
    /// * 'api_base' - Octopus API base url
    pub fn url(&self, api_base: &str) -> String {
        format!("{}/gas-meter-points/{}/meters/{}/consumption/",
                api_base.trim_end_matches('/'), self.mprn, self.serial_number)
    }

    /// Volumetric to kWh conversion factor.
    /// Meter types above 1 (SMETS2) report cubic meters, which are converted using
    /// volume correction factor and calorific value (MJ/m3) divided by 3.6 MJ/kWh.
    pub fn conversion_factor(&self) -> Result<Option<f64>, ConfigError> {
        if self.meter_type <= 1 {
            return Ok(None);
        }
        match (self.volume_correction_factor, self.calorific_value) {
            (Some(vcf), Some(cv)) => Ok(Some(vcf * cv / 3.6)),
            _ => Err(ConfigError::from(
                "gas meter_type above 1 needs volume_correction_factor and calorific_value")),
        }
    }

    pub fn standing_charge(&self) -> Result<StandingCharge<'_>, ConfigError> {
        standing_charge_source("gas", self.standing_charge, self.standing_charge_url.as_deref())
    }
}

/// Loads the configuration file and validates it
///
/// # Arguments
///
/// * 'config_path' - path to the configuration file
pub fn load_config(config_path: &str) -> Result<Config, ConfigError> {
    let toml = fs::read_to_string(config_path)?;
    parse_config(&toml)
}

/// Parses and validates a configuration document
///
/// # Arguments
///
/// * 'toml' - the configuration as a toml string
pub fn parse_config(toml: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(toml)?;
    validate(&config)?;

    Ok(config)
}

/// Checks everything that can be checked before talking to any remote service
///
/// # Arguments
///
/// * 'config' - the deserialized configuration
fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.electricity.is_none() && config.gas.is_none() {
        return Err(ConfigError::from("neither electricity nor gas is configured"));
    }
    if config.influxdb.is_none() && config.general.json_dir.is_none() {
        return Err(ConfigError::from("no output configured, give an influxdb section or general.json_dir"));
    }
    if config.octopus.api_key.trim().is_empty() {
        return Err(ConfigError::from("octopus api_key is empty"));
    }
    if config.octopus.max_pages == 0 {
        return Err(ConfigError::from("octopus max_pages must be at least 1"));
    }
    if let Some(influx) = &config.influxdb {
        if influx.batch_size == 0 {
            return Err(ConfigError::from("influxdb batch_size must be at least 1"));
        }
    }

    if let Some(e) = &config.electricity {
        check_rate("electricity unit_rate_high", e.unit_rate_high)?;
        if let Some(low) = e.unit_rate_low {
            check_rate("electricity unit_rate_low", low)?;
        }
        if e.low_rate_window()?.is_some() && e.unit_rate_low.is_none() {
            return Err(ConfigError::from("electricity low rate window given without unit_rate_low"));
        }
        if let StandingCharge::Fixed(sc) = e.standing_charge()? {
            check_rate("electricity standing_charge", sc)?;
        }
        match (&e.agile_rate_url, e.agile_standing_charge) {
            (Some(_), None) => return Err(ConfigError::from("electricity agile_rate_url given without agile_standing_charge")),
            (_, Some(sc)) => check_rate("electricity agile_standing_charge", sc)?,
            _ => {}
        }
    }

    if let Some(g) = &config.gas {
        check_rate("gas unit_rate", g.unit_rate)?;
        if let StandingCharge::Fixed(sc) = g.standing_charge()? {
            check_rate("gas standing_charge", sc)?;
        }
        if let Some(factor) = g.conversion_factor()? {
            check_rate("gas conversion factor", factor)?;
        }
    }

    Ok(())
}

fn check_rate(name: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::Invalid(format!("{} must be a non-negative number, got {}", name, value)));
    }
    Ok(())
}

fn standing_charge_source<'a>(utility: &str, fixed: Option<f64>, url: Option<&'a str>) -> Result<StandingCharge<'a>, ConfigError> {
    match (fixed, url) {
        (Some(sc), None) => Ok(StandingCharge::Fixed(sc)),
        (None, Some(url)) => Ok(StandingCharge::Url(url)),
        _ => Err(ConfigError::Invalid(
            format!("{} needs exactly one of standing_charge and standing_charge_url", utility))),
    }
}

/// Accepts times of day as either HH:MM or HH:MM:SS
fn deserialize_time_of_day<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
where D: Deserializer<'de> {

    let value: Option<String> = Option::deserialize(deserializer)?;
    value.map(|s| {
        NaiveTime::parse_from_str(&s, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(&s, "%H:%M"))
            .map_err(|e| Error::custom(format!("invalid time of day '{}': {}", s, e)))
    }).transpose()
}

fn default_time_zone() -> Tz { chrono_tz::Europe::London }
fn default_days_back() -> u32 { 7 }
fn default_batch_size() -> usize { 5000 }
fn default_api_base() -> String { DEFAULT_API_BASE.to_string() }
fn default_max_pages() -> usize { 1000 }
fn default_timeout_secs() -> u64 { 30 }
