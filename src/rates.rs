use crate::models::octopus_consumption::Reading;
use crate::tariff::{ActiveRate, TariffConfig, UnitRates};

/// Determines which rate band applies to a reading.
///
/// Gas is always flat and electricity without a low rate window is always high.
/// With a window, the window is rebuilt for the local calendar day of the reading's
/// interval start, so the absolute instants follow daylight saving changes.
///
/// # Arguments
///
/// * 'reading' - the reading to resolve a rate for
/// * 'tariff' - the tariff of the reading's utility
pub fn resolve_rate(reading: &Reading, tariff: &TariffConfig) -> ActiveRate {
    match &tariff.unit_rates {
        UnitRates::Flat(_) => ActiveRate::Flat,
        UnitRates::Banded { low_window: None, .. } => ActiveRate::High,
        UnitRates::Banded { low_window: Some(window), .. } => {
            if window.contains(reading.interval_start) {
                ActiveRate::Low
            } else {
                ActiveRate::High
            }
        }
    }
}
