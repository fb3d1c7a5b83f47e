//! [Open-Meteo historical weather](https://open-meteo.com/en/docs/historical-weather-api) client.

use async_trait::async_trait;
use chrono::NaiveDate;
use itertools::izip;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::{
    api::{WeatherProvider, client},
    core::weather::{WeatherData, describe_weather_code},
    prelude::*,
};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

pub struct Api {
    client: Client,
    location: Location,
}

impl Api {
    pub fn try_new(location: Location) -> Result<Self> {
        Ok(Self { client: client::try_new()?, location })
    }
}

#[async_trait]
impl WeatherProvider for Api {
    #[instrument(skip_all, fields(from = %from, until = %until))]
    async fn get_daily_weather(
        &self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<WeatherData>> {
        let query = ArchiveQuery {
            latitude: self.location.latitude,
            longitude: self.location.longitude,
            start_date: from,
            end_date: until,
            daily: "temperature_2m_max,temperature_2m_min,temperature_2m_mean,precipitation_sum,weather_code",
            timezone: "Europe/London",
        };
        let mut url = Url::parse("https://archive-api.open-meteo.com/v1/archive")?;
        url.set_query(Some(&serde_qs::to_string(&query)?));
        let weather = self
            .client
            .get(url)
            .send()
            .await
            .context("failed to call")?
            .error_for_status()
            .context("request failed")?
            .json::<ArchiveResponse>()
            .await
            .context("failed to deserialize the response")?
            .daily
            .into_weather();
        info!(n_days = weather.len(), "fetched");
        Ok(weather)
    }
}

#[derive(Serialize)]
struct ArchiveQuery {
    latitude: f64,
    longitude: f64,
    start_date: NaiveDate,
    end_date: NaiveDate,
    daily: &'static str,
    timezone: &'static str,
}

#[derive(Deserialize)]
struct ArchiveResponse {
    daily: Daily,
}

/// Column-oriented daily values, `null` where the archive has no data yet.
#[derive(Deserialize)]
struct Daily {
    time: Vec<NaiveDate>,

    #[serde(rename = "temperature_2m_max")]
    temp_max: Vec<Option<f64>>,

    #[serde(rename = "temperature_2m_min")]
    temp_min: Vec<Option<f64>>,

    #[serde(rename = "temperature_2m_mean")]
    temp_mean: Vec<Option<f64>>,

    #[serde(rename = "precipitation_sum")]
    precipitation: Vec<Option<f64>>,

    weather_code: Vec<Option<u32>>,
}

impl Daily {
    /// Skip the days without the mean temperature.
    fn into_weather(self) -> Vec<WeatherData> {
        izip!(
            self.time,
            self.temp_max,
            self.temp_min,
            self.temp_mean,
            self.precipitation,
            self.weather_code,
        )
        .filter_map(|(date, temp_max, temp_min, temp_mean, precipitation, weather_code)| {
            let temp_mean = temp_mean?;
            let weather_code = weather_code.unwrap_or(u32::MAX);
            Some(WeatherData {
                date,
                temp_max: temp_max.unwrap_or(temp_mean),
                temp_min: temp_min.unwrap_or(temp_mean),
                temp_mean,
                precipitation: precipitation.unwrap_or_default(),
                weather_code,
                weather_desc: describe_weather_code(weather_code).to_string(),
            })
        })
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_deserialize_archive_ok() -> Result {
        // language=JSON
        const RESPONSE: &str = r#"
            {
                "latitude": 52.47,
                "longitude": -1.92,
                "timezone": "Europe/London",
                "daily_units": {
                    "time": "iso8601",
                    "temperature_2m_max": "°C"
                },
                "daily": {
                    "time": ["2025-01-09", "2025-01-10", "2025-01-11"],
                    "temperature_2m_max": [3.1, 1.2, null],
                    "temperature_2m_min": [-2.4, -4.0, null],
                    "temperature_2m_mean": [0.4, -1.3, null],
                    "precipitation_sum": [0.0, 1.6, null],
                    "weather_code": [3, 73, null]
                }
            }
        "#;
        let weather = serde_json::from_str::<ArchiveResponse>(RESPONSE)?.daily.into_weather();
        assert_eq!(weather.len(), 2);
        assert_eq!(weather[1].date, NaiveDate::from_ymd_opt(2025, 1, 10).unwrap());
        assert_abs_diff_eq!(weather[1].temp_mean, -1.3);
        assert_abs_diff_eq!(weather[1].precipitation, 1.6);
        assert_eq!(weather[1].weather_desc, "Snow");
        Ok(())
    }

    #[tokio::test]
    #[ignore = "makes the API request"]
    async fn test_get_daily_weather_ok() -> Result {
        let api = Api::try_new(Location { latitude: 52.4862, longitude: -1.8904 })?;
        let from = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let until = NaiveDate::from_ymd_opt(2025, 1, 7).unwrap();
        assert_eq!(api.get_daily_weather(from, until).await?.len(), 7);
        Ok(())
    }
}
