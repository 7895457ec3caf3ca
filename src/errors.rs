use thiserror::Error;
use crate::manager_octopus::errors::OctopusError;
use crate::tariff::{ActiveRate, Utility};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("ConfigError::Io: {0}")]
    Io(#[from] std::io::Error),
    #[error("ConfigError::Toml: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("ConfigError::Invalid: {0}")]
    Invalid(String),
}
impl From<&str> for ConfigError {
    fn from(e: &str) -> Self { ConfigError::Invalid(e.to_string()) }
}
impl From<String> for ConfigError {
    fn from(e: String) -> Self { ConfigError::Invalid(e) }
}

#[derive(Error, Debug)]
#[error("LoggingError: {0}")]
pub struct LoggingError(pub String);

#[derive(Error, Debug)]
pub enum TariffError {
    #[error("TariffError::RateMismatch: {utility} tariff has no {rate} unit rate")]
    RateMismatch { utility: Utility, rate: ActiveRate },
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("SinkError::Io: {0}")]
    Io(#[from] std::io::Error),
    #[error("SinkError::Document: {0}")]
    Document(#[from] serde_json::Error),
    #[error("SinkError::InfluxDb: {0}")]
    InfluxDb(String),
}
impl From<ureq::Error> for SinkError {
    fn from(e: ureq::Error) -> Self { SinkError::InfluxDb(e.to_string()) }
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Octopus(#[from] OctopusError),
    #[error("{0}")]
    Tariff(#[from] TariffError),
    #[error("{0}")]
    Sink(#[from] SinkError),
}
