use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    core::consumption::Consumption,
    quantity::{cost::Pence, energy::KilowattHours},
};

/// Sum of the readings starting on the same calendar day.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAggregate {
    pub day: NaiveDate,
    pub value: KilowattHours,
    pub cost: Pence,
}

/// Aggregate the readings by the day of their start, in each reading's own offset.
///
/// The aggregates are ordered by day.
pub fn aggregate_daily(consumptions: &[Consumption]) -> Vec<DailyAggregate> {
    let mut days = BTreeMap::<NaiveDate, (KilowattHours, Pence)>::new();
    for consumption in consumptions {
        let (value, cost) = days.entry(consumption.interval.day()).or_default();
        *value += consumption.value;
        *cost += consumption.cost;
    }
    days.into_iter().map(|(day, (value, cost))| DailyAggregate { day, value, cost }).collect()
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::{DateTime, TimeDelta};

    use super::*;
    use crate::core::interval::Interval;

    fn reading(start: &str, value: f64, cost: f64) -> Consumption {
        let start = DateTime::parse_from_rfc3339(start).unwrap();
        let mut consumption = Consumption::new(
            Interval::new(start, start + TimeDelta::minutes(30)),
            KilowattHours::from(value),
        );
        consumption.cost = Pence::from(cost);
        consumption
    }

    #[test]
    fn test_aggregate_daily() {
        let aggregates = aggregate_daily(&[
            reading("2025-01-11T09:00:00Z", 1.0, 25.0),
            reading("2025-01-10T09:00:00Z", 0.5, 12.0),
            reading("2025-01-10T23:30:00Z", 0.25, 5.0),
            reading("2025-01-11T10:00:00Z", 2.0, 50.0),
        ]);
        assert_eq!(aggregates.len(), 2);
        assert_eq!(aggregates[0].day, NaiveDate::from_ymd_opt(2025, 1, 10).unwrap());
        assert_abs_diff_eq!(aggregates[0].value.0, 0.75);
        assert_abs_diff_eq!(aggregates[0].cost.0, 17.0);
        assert_abs_diff_eq!(aggregates[1].value.0, 3.0);
        assert_abs_diff_eq!(aggregates[1].cost.0, 75.0);
    }

    #[test]
    fn test_day_follows_reading_offset() {
        let aggregates = aggregate_daily(&[
            reading("2025-06-10T23:30:00+01:00", 1.0, 0.0),
            reading("2025-06-11T00:00:00+01:00", 1.0, 0.0),
        ]);
        assert_eq!(aggregates.len(), 2);
        assert_eq!(aggregates[0].day, NaiveDate::from_ymd_opt(2025, 6, 10).unwrap());
    }

    #[test]
    fn test_empty() {
        assert!(aggregate_daily(&[]).is_empty());
    }
}
