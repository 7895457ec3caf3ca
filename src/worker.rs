use std::time::Duration;
use chrono::{DateTime, Days, NaiveTime, Utc};
use chrono_tz::Tz;
use log::info;
use crate::config::{Config, Electricity, Gas, StandingCharge};
use crate::cost::calculate_fields;
use crate::dump::JsonDump;
use crate::errors::{TariffError, WorkerError};
use crate::manager_influx::InfluxDb;
use crate::manager_octopus::{Octopus, Transport};
use crate::models::octopus_consumption::Reading;
use crate::models::point::Point;
use crate::rates::resolve_rate;
use crate::records::build_point;
use crate::sink::PointSink;
use crate::tariff::{localize, AgileRates, TariffConfig, Utility};

/// Builds the sinks given by the configuration
///
/// # Arguments
///
/// * 'config' - the configuration
pub fn create_sinks(config: &Config) -> Vec<Box<dyn PointSink>> {
    let mut sinks: Vec<Box<dyn PointSink>> = Vec::new();
    if let Some(influx) = &config.influxdb {
        sinks.push(Box::new(InfluxDb::new(influx, Duration::from_secs(config.octopus.timeout_secs))));
    }
    if let Some(dir) = &config.general.json_dir {
        sinks.push(Box::new(JsonDump::new(dir)));
    }

    sinks
}

/// Returns the period from local midnight a number of days back to local midnight today
///
/// # Arguments
///
/// * 'time_zone' - time zone defining midnight
/// * 'days_back' - number of whole days in the period
/// * 'now' - the current time
pub fn default_period(time_zone: &Tz, days_back: u32, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = now.with_timezone(time_zone).date_naive();
    let first_day = today.checked_sub_days(Days::new(days_back as u64)).unwrap_or(today);

    (localize(time_zone, first_day.and_time(NaiveTime::MIN)), localize(time_zone, today.and_time(NaiveTime::MIN)))
}

/// Runs the whole pipeline, electricity first and then gas.
/// Any error aborts the run, points already written for an earlier utility stay written.
///
/// # Arguments
///
/// * 'config' - the configuration
/// * 'octopus' - Octopus client
/// * 'sinks' - where to write points
/// * 'from' - start of the period
/// * 'to' - end of the period
pub fn run<T: Transport>(
    config: &Config,
    octopus: &Octopus<T>,
    sinks: &[Box<dyn PointSink>],
    from: DateTime<Utc>,
    to: DateTime<Utc>) -> Result<(), WorkerError> {

    info!("processing period {} - {}", from, to);

    if let Some(electricity) = &config.electricity {
        let points = electricity_points(config, electricity, octopus, from, to)?;
        write_points(sinks, &points, Utility::Electricity)?;
    }

    if let Some(gas) = &config.gas {
        let points = gas_points(config, gas, octopus, from, to)?;
        write_points(sinks, &points, Utility::Gas)?;
    }

    Ok(())
}

/// Resolves rate, cost and point for every reading
///
/// # Arguments
///
/// * 'readings' - readings of one utility
/// * 'tariff' - tariff of the same utility
/// * 'time_zone' - time zone for the time of day tag
pub fn transform(readings: &[Reading], tariff: &TariffConfig, time_zone: &Tz) -> Result<Vec<Point>, TariffError> {
    readings
        .iter()
        .map(|r| {
            let rate = resolve_rate(r, tariff);
            let fields = calculate_fields(r, rate, tariff)?;
            Ok(build_point(tariff.utility, r, rate, fields, time_zone))
        })
        .collect()
}

fn electricity_points<T: Transport>(
    config: &Config,
    electricity: &Electricity,
    octopus: &Octopus<T>,
    from: DateTime<Utc>,
    to: DateTime<Utc>) -> Result<Vec<Point>, WorkerError> {

    let readings = octopus.get_consumption(&electricity.url(&config.octopus.api_base), from, to)?;
    info!("fetched {} electricity readings", readings.len());

    let standing_charge = resolve_standing_charge(octopus, electricity.standing_charge()?)?;

    let agile = match (&electricity.agile_rate_url, electricity.agile_standing_charge) {
        (Some(url), Some(agile_standing_charge)) => {
            let rates = octopus.get_unit_rates(url, from, to)?;
            info!("fetched {} agile unit rates", rates.len());
            Some(AgileRates::new(agile_standing_charge, &rates))
        }
        _ => None,
    };

    let tariff = TariffConfig::electricity(electricity, standing_charge, agile)?;

    Ok(transform(&readings, &tariff, &config.general.time_zone)?)
}

fn gas_points<T: Transport>(
    config: &Config,
    gas: &Gas,
    octopus: &Octopus<T>,
    from: DateTime<Utc>,
    to: DateTime<Utc>) -> Result<Vec<Point>, WorkerError> {

    let readings = octopus.get_consumption(&gas.url(&config.octopus.api_base), from, to)?;
    info!("fetched {} gas readings", readings.len());

    let standing_charge = resolve_standing_charge(octopus, gas.standing_charge()?)?;
    let tariff = TariffConfig::gas(gas, standing_charge)?;

    Ok(transform(&readings, &tariff, &config.general.time_zone)?)
}

fn resolve_standing_charge<T: Transport>(octopus: &Octopus<T>, source: StandingCharge<'_>) -> Result<f64, WorkerError> {
    match source {
        StandingCharge::Fixed(sc) => Ok(sc),
        StandingCharge::Url(url) => Ok(octopus.get_standing_charge(url)?),
    }
}

fn write_points(sinks: &[Box<dyn PointSink>], points: &[Point], utility: Utility) -> Result<(), WorkerError> {
    for sink in sinks {
        sink.write(utility, points)?;
    }
    info!("{} {} points written", points.len(), utility);

    Ok(())
}
