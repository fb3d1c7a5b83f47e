use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    api::{TariffProvider, WeatherProvider},
    cache::{Cache, Clock, Payload, SystemClock},
    core::{
        analysis::CollectedData,
        consumption::{Consumption, FuelType},
        pricing::Pricing,
        tariff::{Agreement, TariffRate},
        validity::{Precedence, resolve},
        weather::WeatherData,
    },
    prelude::*,
};

/// Tariff names rarely change.
pub const PRODUCT_CODE_TTL: TimeDelta = TimeDelta::hours(24);

pub const TARIFF_RATES_TTL: TimeDelta = TimeDelta::hours(6);

/// Historical weather does not change once archived.
pub const WEATHER_TTL: TimeDelta = TimeDelta::days(7);

#[derive(Serialize, Deserialize)]
struct ProductCode(String);

impl Payload for ProductCode {
    const TAG: &'static str = "product-code/1";
}

impl Payload for Vec<TariffRate> {
    const TAG: &'static str = "tariff-rates/1";
}

impl Payload for Vec<WeatherData> {
    const TAG: &'static str = "weather/1";
}

/// Enriches the collected readings with prices and weather, consulting the cache before every lookup.
///
/// Lookup failures are logged and never fatal.
pub struct Collector<'a, C = SystemClock> {
    cache: &'a Cache<C>,
    tariffs: &'a dyn TariffProvider,
    weather: Option<&'a dyn WeatherProvider>,
    precedence: Precedence,
}

impl<'a, C: Clock> Collector<'a, C> {
    pub const fn new(
        cache: &'a Cache<C>,
        tariffs: &'a dyn TariffProvider,
        weather: Option<&'a dyn WeatherProvider>,
        precedence: Precedence,
    ) -> Self {
        Self { cache, tariffs, weather, precedence }
    }

    /// Price all the readings, and fetch the weather unless the document already has it.
    #[instrument(skip_all)]
    pub async fn enrich(&self, data: &mut CollectedData) {
        self.price(&mut data.electricity_consumption, &data.electricity_agreements, FuelType::Electricity)
            .await;
        self.price(
            &mut data.electricity_export,
            &data.electricity_export_agreements,
            FuelType::Export,
        )
        .await;
        self.price(&mut data.gas_consumption, &data.gas_agreements, FuelType::Gas).await;

        if data.weather.is_empty()
            && let Some((from, until)) = window(
                data.electricity_consumption.iter().chain(&data.gas_consumption),
            )
        {
            data.weather = self.get_weather(from.date_naive(), until.date_naive()).await;
        }
    }

    /// Price the readings with the time-varying rates when available, and with the agreements otherwise.
    #[instrument(skip_all, fields(fuel_type = %fuel_type))]
    pub async fn price(
        &self,
        consumptions: &mut [Consumption],
        agreements: &[Agreement],
        fuel_type: FuelType,
    ) {
        let Some((from, until)) = window(consumptions.iter()) else {
            return;
        };
        if fuel_type != FuelType::Gas {
            match self.get_time_varying_rates(agreements, from, until).await {
                Ok(rates) if !rates.is_empty() => {
                    let n_priced =
                        Pricing::TimeVarying(&rates).apply(consumptions, self.precedence);
                    info!(n_rates = rates.len(), n_priced, "priced with time-varying rates");
                    return;
                }
                Ok(_) => {
                    warn!("no time-varying rates, falling back to the agreements");
                }
                Err(error) => {
                    warn!("falling back to the agreements: {error:#}");
                }
            }
        }
        let n_priced = Pricing::Agreements(agreements).apply(consumptions, self.precedence);
        info!(n_readings = consumptions.len(), n_priced, "priced with the agreements");
    }

    async fn get_time_varying_rates(
        &self,
        agreements: &[Agreement],
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<TariffRate>> {
        // The agreement in effect at the end of the window names the product:
        let agreement = resolve(agreements, until.fixed_offset(), self.precedence)
            .or_else(|| agreements.last())
            .context("no agreements")?;
        let display_name = agreement.tariff.display_name.as_str();

        let key = format!("product_code_{}", display_name.replace(' ', "_"));
        let ProductCode(product_code) = self
            .cached(&key, PRODUCT_CODE_TTL, || async {
                self.tariffs
                    .get_product_code(display_name)
                    .await?
                    .map(ProductCode)
                    .with_context(|| format!("no product is named `{display_name}`"))
            })
            .await?;

        let key = format!(
            "tariff_rates_{product_code}_{}_{}",
            from.format("%Y-%m-%d"),
            until.format("%Y-%m-%d"),
        );
        self.cached(&key, TARIFF_RATES_TTL, || {
            self.tariffs.get_unit_rates(&product_code, from, until)
        })
        .await
    }

    /// Fetch the daily weather, empty when not available.
    #[instrument(skip_all, fields(from = %from, until = %until))]
    pub async fn get_weather(
        &self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> BTreeMap<NaiveDate, WeatherData> {
        let Some(provider) = self.weather else {
            return BTreeMap::new();
        };
        let key = format!("weather_{from}_{until}");
        match self.cached(&key, WEATHER_TTL, || provider.get_daily_weather(from, until)).await {
            Ok(weather) => weather.into_iter().map(|weather| (weather.date, weather)).collect(),
            Err(error) => {
                warn!("proceeding without the weather: {error:#}");
                BTreeMap::new()
            }
        }
    }

    /// Get the value from the cache, or fetch and cache it.
    ///
    /// Cache failures are logged and degrade to fetching.
    async fn cached<T, F>(&self, key: &str, ttl: TimeDelta, fetch: impl FnOnce() -> F) -> Result<T>
    where
        T: Payload,
        F: Future<Output = Result<T>>,
    {
        match self.cache.get::<T>(key) {
            Ok(Some(value)) => {
                debug!(key, "cache hit");
                return Ok(value);
            }
            Ok(None) => {}
            Err(error) => {
                warn!(key, "cache read failed: {:#}", Error::from(error));
            }
        }
        let value = fetch().await?;
        if let Err(error) = self.cache.set(key, &value, ttl) {
            warn!(key, "failed to cache: {:#}", Error::from(error));
        }
        Ok(value)
    }
}

/// Time span covered by the readings.
fn window<'c>(
    consumptions: impl Iterator<Item = &'c Consumption>,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    consumptions.fold(None, |window, consumption| {
        let start = consumption.interval.start.to_utc();
        let end = consumption.interval.end.to_utc();
        Some(window.map_or((start, end), |(from, until): (DateTime<Utc>, DateTime<Utc>)| {
            (from.min(start), until.max(end))
        }))
    })
}
