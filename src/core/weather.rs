use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    core::{
        anomaly::{Anomaly, AnomalyKind},
        consumption::FuelType,
    },
    prelude::*,
};

/// Daily weather summary.
#[must_use]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherData {
    pub date: NaiveDate,

    /// Celsius.
    pub temp_max: f64,

    /// Celsius.
    pub temp_min: f64,

    /// Celsius.
    pub temp_mean: f64,

    /// Millimetres.
    pub precipitation: f64,

    /// [WMO code](https://open-meteo.com/en/docs#weather_variable_documentation).
    pub weather_code: u32,

    pub weather_desc: String,
}

/// Human-readable description of a WMO weather code.
#[must_use]
pub const fn describe_weather_code(code: u32) -> &'static str {
    match code {
        0 => "Clear sky",
        1..=3 => "Partly cloudy",
        45 | 48 => "Foggy",
        51 | 53 | 55 => "Drizzle",
        61 | 63 | 65 => "Rain",
        71 | 73 | 75 => "Snow",
        77 => "Snow grains",
        80..=82 => "Rain showers",
        85 | 86 => "Snow showers",
        95 => "Thunderstorm",
        96 | 99 => "Thunderstorm with hail",
        _ => "Unknown",
    }
}

/// Temperatures at which a consumption spike is expected rather than anomalous.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SuppressionThresholds {
    /// Gas spikes below this mean temperature are dropped.
    pub gas_cold: f64,

    /// Electricity spikes below this mean temperature may be dropped.
    pub electricity_cold: f64,

    /// Electricity spikes above this mean temperature may be dropped.
    pub electricity_hot: f64,

    /// Electricity spikes deviating by this percentage or more are kept under any weather.
    pub electricity_max_deviation_percent: f64,
}

impl Default for SuppressionThresholds {
    fn default() -> Self {
        Self {
            gas_cold: 10.0,
            electricity_cold: 5.0,
            electricity_hot: 28.0,
            electricity_max_deviation_percent: 100.0,
        }
    }
}

impl SuppressionThresholds {
    /// Whether the anomaly is explained by its attached weather.
    #[must_use]
    pub fn is_expected(&self, anomaly: &Anomaly) -> bool {
        if anomaly.kind != AnomalyKind::ConsumptionSpike {
            return false;
        }
        let Some(weather) = &anomaly.weather else {
            return false;
        };
        match anomaly.fuel_type {
            FuelType::Gas => weather.temp_mean < self.gas_cold,
            FuelType::Electricity => {
                (weather.temp_mean < self.electricity_cold
                    || weather.temp_mean > self.electricity_hot)
                    && anomaly.deviation_percent < self.electricity_max_deviation_percent
            }
            FuelType::Export => false,
        }
    }
}

/// Attach the weather of the anomaly day, where known.
pub fn attach_weather(anomalies: &mut [Anomaly], weather: &BTreeMap<NaiveDate, WeatherData>) {
    for anomaly in anomalies {
        anomaly.weather = weather.get(&anomaly.date).cloned();
    }
}

/// Drop the anomalies explained by the weather.
#[instrument(skip_all)]
pub fn suppress_expected(anomalies: Vec<Anomaly>, thresholds: &SuppressionThresholds) -> Vec<Anomaly> {
    let n_detected = anomalies.len();
    let kept: Vec<_> = anomalies
        .into_iter()
        .filter(|anomaly| {
            let is_expected = thresholds.is_expected(anomaly);
            if is_expected {
                debug!(
                    date = %anomaly.date,
                    fuel_type = %anomaly.fuel_type,
                    deviation_percent = anomaly.deviation_percent,
                    "weather-expected spike",
                );
            }
            !is_expected
        })
        .collect();
    if kept.len() < n_detected {
        info!(n_detected, n_kept = kept.len(), "filtered weather-expected anomalies");
    }
    kept
}
