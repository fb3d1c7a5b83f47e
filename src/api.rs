pub mod client;
pub mod octopus;
pub mod open_meteo;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::{
    core::{tariff::TariffRate, weather::WeatherData},
    prelude::*,
};

/// Source of the supplier products and their time-varying unit rates.
#[async_trait]
pub trait TariffProvider: Sync {
    /// Find the product code of the tariff by its display name.
    async fn get_product_code(&self, display_name: &str) -> Result<Option<String>>;

    /// Get the standard unit rates of the product, which are valid in the period.
    async fn get_unit_rates(
        &self,
        product_code: &str,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<TariffRate>>;
}

/// Source of the historical daily weather.
#[async_trait]
pub trait WeatherProvider: Sync {
    /// Get the daily weather for the inclusive date range.
    async fn get_daily_weather(&self, from: NaiveDate, until: NaiveDate)
    -> Result<Vec<WeatherData>>;
}
