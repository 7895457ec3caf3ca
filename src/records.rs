use chrono_tz::Tz;
use crate::models::octopus_consumption::Reading;
use crate::models::point::{Fields, Point, Tags};
use crate::tariff::{ActiveRate, Utility};

/// Builds a time series point from a priced reading.
/// The point is stamped with the end of the reading's interval, and tagged with the
/// active rate and the local clock time of the interval end.
///
/// # Arguments
///
/// * 'utility' - utility the reading belongs to, used as measurement
/// * 'reading' - the reading
/// * 'rate' - the rate band resolved for the reading
/// * 'fields' - fields from the cost calculation
/// * 'time_zone' - time zone for the time of day tag
pub fn build_point(utility: Utility, reading: &Reading, rate: ActiveRate, fields: Fields, time_zone: &Tz) -> Point {
    let mut tags = Tags::new();
    tags.insert("active_rate".to_string(), rate.to_string());
    tags.insert("time_of_day".to_string(),
                reading.interval_end.with_timezone(time_zone).format("%H:%M").to_string());

    Point {
        measurement: utility,
        tags,
        time: reading.interval_end,
        fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeDelta, Utc};
    use chrono_tz::Europe::London;

    fn reading(end: &str) -> Reading {
        let interval_end: DateTime<Utc> = end.parse().unwrap();
        Reading { consumption: 0.25, interval_start: interval_end - TimeDelta::minutes(30), interval_end }
    }

    #[test]
    fn point_carries_tags_time_and_fields() {
        let r = reading("2024-01-15T02:30:00Z");
        let fields = Fields::from([("consumption".to_string(), 0.25), ("cost".to_string(), 2.25)]);

        let point = build_point(Utility::Electricity, &r, ActiveRate::Low, fields.clone(), &London);

        assert_eq!(point.measurement, Utility::Electricity);
        assert_eq!(point.time, r.interval_end);
        assert_eq!(point.fields, fields);
        assert_eq!(point.tags.len(), 2);
        assert_eq!(point.tags["active_rate"], "low");
        assert_eq!(point.tags["time_of_day"], "02:30");
    }

    #[test]
    fn time_of_day_is_local_clock_time() {
        let point = build_point(Utility::Gas, &reading("2024-07-15T02:30:00Z"), ActiveRate::Flat, Fields::new(), &London);

        assert_eq!(point.tags["time_of_day"], "03:30");
        assert_eq!(point.tags["active_rate"], "flat");
    }

    #[test]
    fn point_serializes_with_lowercase_measurement() {
        let point = build_point(Utility::Gas, &reading("2024-01-15T02:30:00Z"), ActiveRate::Flat, Fields::new(), &London);

        let json = serde_json::to_value(&point).unwrap();
        assert_eq!(json["measurement"], "gas");
        assert_eq!(json["time"], "2024-01-15T02:30:00Z");
    }
}
