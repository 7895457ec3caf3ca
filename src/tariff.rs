use std::collections::HashMap;
use std::fmt;
use std::fmt::Formatter;
use chrono::{DateTime, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use crate::config::{Electricity, Gas};
use crate::errors::{ConfigError, TariffError};
use crate::models::octopus_rates::UnitRate;

/// Utilities read from Octopus, also used as measurement names
#[derive(Serialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum Utility {
    Electricity,
    Gas,
}

impl fmt::Display for Utility {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Utility::Electricity => write!(f, "electricity"),
            Utility::Gas         => write!(f, "gas"),
        }
    }
}

/// Rate band applying to a reading
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ActiveRate {
    Flat,
    Low,
    High,
}

impl fmt::Display for ActiveRate {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            ActiveRate::Flat => write!(f, "flat"),
            ActiveRate::Low  => write!(f, "low"),
            ActiveRate::High => write!(f, "high"),
        }
    }
}

/// Daily recurring local time interval with a discounted electricity rate.
/// An end not after the start means the window runs past midnight.
#[derive(Clone, Copy, Debug)]
pub struct LowRateWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub time_zone: Tz,
}

impl LowRateWindow {
    /// Absolute start and end of the window that opens on the given local date
    ///
    /// # Arguments
    ///
    /// * 'date' - local calendar date in the window's time zone
    pub fn bounds_on(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let end_date = if self.end <= self.start {
            date.succ_opt().unwrap_or(date)
        } else {
            date
        };

        let start = localize(&self.time_zone, date.and_time(self.start));
        let end = localize(&self.time_zone, end_date.and_time(self.end));

        (start, end)
    }

    /// Whether the instant falls within the window, start inclusive and end exclusive.
    /// The window opening on the previous local day is checked as well since a window
    /// running past midnight covers the early hours of the next day.
    ///
    /// # Arguments
    ///
    /// * 'instant' - the instant to check
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        let date = instant.with_timezone(&self.time_zone).date_naive();

        [date.pred_opt(), Some(date)]
            .into_iter()
            .flatten()
            .map(|d| self.bounds_on(d))
            .any(|(start, end)| start <= instant && instant < end)
    }
}

/// Converts a local date time to an absolute instant.
/// Ambiguous local times resolve to the earliest instant, local times falling in
/// a daylight saving gap are moved forward past the gap.
///
/// # Arguments
///
/// * 'time_zone' - the time zone the local time belongs to
/// * 'local' - the local date time
pub fn localize(time_zone: &Tz, local: NaiveDateTime) -> DateTime<Utc> {
    let resolved = match time_zone.from_local_datetime(&local) {
        LocalResult::Single(t) => t,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => time_zone
            .from_local_datetime(&(local + TimeDelta::hours(1)))
            .earliest()
            .unwrap_or_else(|| time_zone.from_utc_datetime(&local)),
    };

    resolved.with_timezone(&Utc)
}

/// Unit rates, flat for gas and banded for electricity
#[derive(Clone, Debug)]
pub enum UnitRates {
    Flat(f64),
    Banded {
        high: f64,
        low: Option<f64>,
        low_window: Option<LowRateWindow>,
    },
}

/// Agile unit rates keyed by the end of the half hour period they are valid for
#[derive(Clone, Debug, Default)]
pub struct AgileRates {
    pub standing_charge: f64,
    pub unit_rates: HashMap<DateTime<Utc>, f64>,
}

impl AgileRates {
    /// Builds the agile schedule from unit rates as returned by Octopus.
    /// Open ended rates (no valid_to) can't be keyed and are left out.
    ///
    /// # Arguments
    ///
    /// * 'standing_charge' - agile standing charge per day
    /// * 'rates' - unit rates from the agile product
    pub fn new(standing_charge: f64, rates: &[UnitRate]) -> AgileRates {
        let unit_rates = rates
            .iter()
            .filter_map(|r| r.valid_to.map(|valid_to| (valid_to, r.value_inc_vat)))
            .collect::<HashMap<DateTime<Utc>, f64>>();

        AgileRates { standing_charge, unit_rates }
    }

    pub fn unit_rate_at(&self, period_end: DateTime<Utc>) -> Option<f64> {
        self.unit_rates.get(&period_end).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.unit_rates.is_empty()
    }
}

/// Everything needed to price readings of one utility for one run
#[derive(Clone, Debug)]
pub struct TariffConfig {
    pub utility: Utility,
    pub standing_charge: f64,
    pub unit_rates: UnitRates,
    pub conversion_factor: Option<f64>,
    pub agile: Option<AgileRates>,
}

impl TariffConfig {
    /// Builds an electricity tariff
    ///
    /// # Arguments
    ///
    /// * 'config' - electricity configuration
    /// * 'standing_charge' - resolved standing charge per day
    /// * 'agile' - agile overlay, if any
    pub fn electricity(config: &Electricity, standing_charge: f64, agile: Option<AgileRates>) -> Result<TariffConfig, ConfigError> {
        Ok(TariffConfig {
            utility: Utility::Electricity,
            standing_charge,
            unit_rates: UnitRates::Banded {
                high: config.unit_rate_high,
                low: config.unit_rate_low,
                low_window: config.low_rate_window()?,
            },
            conversion_factor: None,
            agile,
        })
    }

    /// Builds a gas tariff
    ///
    /// # Arguments
    ///
    /// * 'config' - gas configuration
    /// * 'standing_charge' - resolved standing charge per day
    pub fn gas(config: &Gas, standing_charge: f64) -> Result<TariffConfig, ConfigError> {
        Ok(TariffConfig {
            utility: Utility::Gas,
            standing_charge,
            unit_rates: UnitRates::Flat(config.unit_rate),
            conversion_factor: config.conversion_factor()?,
            agile: None,
        })
    }

    /// Unit rate for the given rate band
    ///
    /// # Arguments
    ///
    /// * 'rate' - the active rate band
    pub fn unit_rate(&self, rate: ActiveRate) -> Result<f64, TariffError> {
        match (&self.unit_rates, rate) {
            (UnitRates::Flat(r), ActiveRate::Flat) => Ok(*r),
            (UnitRates::Banded { high, .. }, ActiveRate::High) => Ok(*high),
            (UnitRates::Banded { low: Some(low), .. }, ActiveRate::Low) => Ok(*low),
            _ => Err(TariffError::RateMismatch { utility: self.utility, rate }),
        }
    }
}
