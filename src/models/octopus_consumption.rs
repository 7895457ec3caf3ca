use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One half hourly consumption reading as returned by Octopus
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Reading {
    pub consumption: f64,
    pub interval_start: DateTime<Utc>,
    pub interval_end: DateTime<Utc>,
}
