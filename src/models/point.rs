use std::collections::BTreeMap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use crate::tariff::Utility;

pub type Tags = BTreeMap<String, String>;
pub type Fields = BTreeMap<String, f64>;

/// A tagged time series point ready to be written to a sink
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Point {
    pub measurement: Utility,
    pub tags: Tags,
    pub time: DateTime<Utc>,
    pub fields: Fields,
}
