use std::fmt::{Display, Formatter};

use average::Variance;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    core::{consumption::{Consumption, FuelType}, daily::aggregate_daily, weather::WeatherData},
    prelude::*,
    quantity::energy::KilowattHours,
};

/// Fewer distinct days give no statistical basis for the detection.
pub const MIN_DAYS: usize = 7;

/// Days below this fraction of the mean are reported as low usage.
pub const LOW_USAGE_FRACTION: f64 = 0.1;

/// Days above the mean plus this many standard deviations are spike candidates.
pub const SPIKE_SIGMAS: f64 = 2.0;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    LowUsage,
    ConsumptionSpike,
}

impl Display for AnomalyKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LowUsage => write!(f, "low usage"),
            Self::ConsumptionSpike => write!(f, "spike"),
        }
    }
}

/// Statistically unusual day.
#[must_use]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anomaly {
    pub date: NaiveDate,
    pub fuel_type: FuelType,

    #[serde(rename = "type")]
    pub kind: AnomalyKind,

    pub description: String,

    #[serde(rename = "actualValue")]
    pub actual: KilowattHours,

    /// Mean daily value across the window.
    #[serde(rename = "expectedValue")]
    pub expected: KilowattHours,

    pub deviation_percent: f64,

    /// Attached after the detection, absent when the lookup failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<WeatherData>,
}

/// Flag the unusual days of a single fuel type.
///
/// Spikes must also deviate from the mean by more than `threshold_percent`.
/// The order of the returned anomalies follows the days.
#[instrument(skip_all, fields(fuel_type = %fuel_type))]
pub fn detect_anomalies(
    consumptions: &[Consumption],
    fuel_type: FuelType,
    threshold_percent: f64,
) -> Vec<Anomaly> {
    let daily = aggregate_daily(consumptions);
    if daily.len() < MIN_DAYS {
        debug!(n_days = daily.len(), "insufficient data for the anomaly detection");
        return Vec::new();
    }

    let statistics: Variance = daily.iter().map(|aggregate| aggregate.value.0).collect();
    let mean = statistics.mean();
    let std_dev = statistics.population_variance().sqrt();
    debug!(n_days = daily.len(), mean, std_dev, "daily statistics");

    let deviation_percent = |value: f64| (value - mean) / mean * 100.0;
    let mut anomalies = Vec::new();

    for aggregate in daily {
        let value = aggregate.value.0;

        // A low usage day is never a spike candidate:
        if mean > 0.0 && value < LOW_USAGE_FRACTION * mean {
            anomalies.push(Anomaly {
                date: aggregate.day,
                fuel_type,
                kind: AnomalyKind::LowUsage,
                description: format!("Unusually low {fuel_type} usage for this day"),
                actual: aggregate.value,
                expected: KilowattHours::from(mean),
                deviation_percent: deviation_percent(value),
                weather: None,
            });
            continue;
        }

        if std_dev > 0.0 && value > SPIKE_SIGMAS.mul_add(std_dev, mean) {
            let deviation_percent = deviation_percent(value);
            if deviation_percent > threshold_percent {
                info!(date = %aggregate.day, deviation_percent, "consumption spike");
                anomalies.push(Anomaly {
                    date: aggregate.day,
                    fuel_type,
                    kind: AnomalyKind::ConsumptionSpike,
                    description: format!("Unusually high {fuel_type} consumption"),
                    actual: aggregate.value,
                    expected: KilowattHours::from(mean),
                    deviation_percent,
                    weather: None,
                });
            }
        }
    }

    anomalies
}
