use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A price valid until the end of a period, used both for unit rates and standing charges
#[derive(Deserialize, Clone, Debug)]
pub struct UnitRate {
    pub value_inc_vat: f64,
    pub valid_to: Option<DateTime<Utc>>,
}
