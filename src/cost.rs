use log::debug;
use crate::errors::TariffError;
use crate::models::octopus_consumption::Reading;
use crate::models::point::Fields;
use crate::tariff::{ActiveRate, TariffConfig};

/// Half hour periods per day, standing charges are spread evenly over them
pub const PERIODS_PER_DAY: f64 = 48.0;

/// Computes consumption and cost fields for a reading.
///
/// Consumption is converted first if the tariff carries a conversion factor. Agile fields
/// are added when the tariff has a non-empty agile schedule; a period missing from the
/// schedule (typically around daylight saving changes) is priced at the standard rate.
///
/// # Arguments
///
/// * 'reading' - the reading to price
/// * 'rate' - the rate band resolved for the reading
/// * 'tariff' - the tariff of the reading's utility
pub fn calculate_fields(reading: &Reading, rate: ActiveRate, tariff: &TariffConfig) -> Result<Fields, TariffError> {
    let consumption = match tariff.conversion_factor {
        Some(factor) => reading.consumption * factor,
        None => reading.consumption,
    };

    let unit_rate = tariff.unit_rate(rate)?;
    let cost = consumption * unit_rate;

    let mut fields = Fields::new();
    fields.insert("consumption".to_string(), consumption);
    fields.insert("cost".to_string(), cost);
    fields.insert("total_cost".to_string(), cost + tariff.standing_charge / PERIODS_PER_DAY);

    if let Some(agile) = tariff.agile.as_ref().filter(|a| !a.is_empty()) {
        let agile_rate = agile.unit_rate_at(reading.interval_end).unwrap_or_else(|| {
            debug!("no agile rate for period ending {}, using {} rate", reading.interval_end, rate);
            unit_rate
        });
        let agile_cost = consumption * agile_rate;

        fields.insert("agile_rate".to_string(), agile_rate);
        fields.insert("agile_cost".to_string(), agile_cost);
        fields.insert("agile_total_cost".to_string(), agile_cost + agile.standing_charge / PERIODS_PER_DAY);
    }

    Ok(fields)
}
