use std::collections::BTreeMap;

use bon::Builder;
use chrono::{DateTime, Datelike, Local, NaiveDate, TimeDelta};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    core::{
        anomaly::{Anomaly, detect_anomalies},
        consumption::{Consumption, FuelType},
        insight::{Insight, generate_insights},
        payment::{DAYS_PER_MONTH, PaymentStatus, recommend_payment},
        tariff::{Agreement, TariffChange, detect_tariff_changes},
        weather::{SuppressionThresholds, WeatherData, attach_weather, suppress_expected},
    },
    error::DataError,
    prelude::*,
    quantity::{cost::Pence, energy::KilowattHours},
};

#[must_use]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub number: String,

    /// Pounds, negative means debit.
    #[serde(default)]
    pub balance: f64,
}

/// Everything the collaborators fetched for a single analysis run.
#[must_use]
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectedData {
    pub account: Option<Account>,

    #[serde(default)]
    pub electricity_consumption: Vec<Consumption>,

    #[serde(default)]
    pub electricity_export: Vec<Consumption>,

    #[serde(default)]
    pub gas_consumption: Vec<Consumption>,

    #[serde(default)]
    pub electricity_agreements: Vec<Agreement>,

    #[serde(default)]
    pub electricity_export_agreements: Vec<Agreement>,

    #[serde(default)]
    pub gas_agreements: Vec<Agreement>,

    /// Daily weather keyed by calendar date.
    #[serde(default)]
    pub weather: BTreeMap<NaiveDate, WeatherData>,

    pub fetched_at: DateTime<Local>,
}

#[must_use]
#[derive(Copy, Clone, Debug, Builder)]
pub struct AnalysisSettings {
    /// Days the collected readings span, validated by the caller to be positive.
    #[builder(default = 30)]
    pub period_days: u32,

    /// Minimal deviation of a reported consumption spike, percent.
    #[builder(default = 50.0)]
    pub anomaly_threshold: f64,

    /// Current monthly payment, pounds.
    pub current_direct_debit: Option<f64>,

    #[builder(default)]
    pub thresholds: SuppressionThresholds,
}

/// Analysis document handed over to the report renderers.
///
/// Money is in pounds.
#[must_use]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub generated_at: DateTime<Local>,
    pub analysis_period_start: DateTime<Local>,
    pub analysis_period_end: DateTime<Local>,
    pub analysis_period_days: u32,

    #[serde(default)]
    pub account_number: String,

    pub current_balance: f64,

    pub avg_daily_electricity: KilowattHours,
    pub avg_daily_export: KilowattHours,
    pub avg_daily_gas: KilowattHours,

    pub avg_daily_cost_electricity: f64,
    pub avg_daily_earnings_export: f64,
    pub avg_daily_cost_gas: f64,

    /// Import cost minus export earnings plus gas cost.
    pub avg_daily_cost_total: f64,

    pub projected_monthly_cost: f64,
    pub recommended_direct_debit: f64,
    pub current_direct_debit: Option<f64>,
    pub payment_status: PaymentStatus,

    pub electricity_agreements: Vec<Agreement>,
    pub electricity_export_agreements: Vec<Agreement>,
    pub gas_agreements: Vec<Agreement>,

    pub anomalies: Vec<Anomaly>,
    pub tariff_changes: Vec<TariffChange>,
    pub insights: Vec<Insight>,
}

impl AnalysisResult {
    /// Result with no figures, generated at the given moment.
    pub const fn empty(now: DateTime<Local>) -> Self {
        Self {
            generated_at: now,
            analysis_period_start: now,
            analysis_period_end: now,
            analysis_period_days: 0,
            account_number: String::new(),
            current_balance: 0.0,
            avg_daily_electricity: KilowattHours::ZERO,
            avg_daily_export: KilowattHours::ZERO,
            avg_daily_gas: KilowattHours::ZERO,
            avg_daily_cost_electricity: 0.0,
            avg_daily_earnings_export: 0.0,
            avg_daily_cost_gas: 0.0,
            avg_daily_cost_total: 0.0,
            projected_monthly_cost: 0.0,
            recommended_direct_debit: 0.0,
            current_direct_debit: None,
            payment_status: PaymentStatus::Unknown,
            electricity_agreements: Vec::new(),
            electricity_export_agreements: Vec::new(),
            gas_agreements: Vec::new(),
            anomalies: Vec::new(),
            tariff_changes: Vec::new(),
            insights: Vec::new(),
        }
    }
}

/// Daily averages over the analysis period.
struct DailyAverage {
    value: KilowattHours,

    /// Pounds.
    cost: f64,
}

impl DailyAverage {
    /// Totals are divided by the period length rather than the number of readings.
    fn over(consumptions: &[Consumption], period_days: u32) -> Self {
        let period_days = f64::from(period_days.max(1));
        let value: KilowattHours = consumptions.iter().map(|consumption| consumption.value).sum();
        let cost: Pence = consumptions.iter().map(|consumption| consumption.cost).sum();
        Self { value: value / period_days, cost: cost.to_pounds() / period_days }
    }
}

pub struct Analyser {
    settings: AnalysisSettings,
}

impl Analyser {
    pub const fn new(settings: AnalysisSettings) -> Self {
        Self { settings }
    }

    /// Run the analysis on the already priced readings.
    #[instrument(skip_all)]
    pub fn analyse(
        &self,
        data: &CollectedData,
        now: DateTime<Local>,
    ) -> Result<AnalysisResult, DataError> {
        let account = data.account.as_ref().ok_or(DataError::Missing { data_type: "account" })?;
        info!(account = %account.number, "starting analysis…");

        let mut result = AnalysisResult {
            account_number: account.number.clone(),
            current_balance: account.balance,
            current_direct_debit: self.settings.current_direct_debit,
            electricity_agreements: data.electricity_agreements.clone(),
            electricity_export_agreements: data.electricity_export_agreements.clone(),
            gas_agreements: data.gas_agreements.clone(),
            ..AnalysisResult::empty(now)
        };

        if !data.electricity_consumption.is_empty() || !data.gas_consumption.is_empty() {
            result.analysis_period_days = self.settings.period_days;
            result.analysis_period_start =
                now - TimeDelta::days(i64::from(self.settings.period_days));
        }

        let mut anomalies = Vec::new();

        if !data.electricity_consumption.is_empty() {
            let average = DailyAverage::over(&data.electricity_consumption, self.settings.period_days);
            result.avg_daily_electricity = average.value;
            result.avg_daily_cost_electricity = average.cost;
            anomalies.extend(detect_anomalies(
                &data.electricity_consumption,
                FuelType::Electricity,
                self.settings.anomaly_threshold,
            ));
        }

        if !data.electricity_export.is_empty() {
            let average = DailyAverage::over(&data.electricity_export, self.settings.period_days);
            result.avg_daily_export = average.value;
            result.avg_daily_earnings_export = average.cost;
            info!(
                avg_daily_export = ?average.value,
                avg_daily_earnings = average.cost,
                "analysed export",
            );
        }

        if !data.gas_consumption.is_empty() {
            let average = DailyAverage::over(&data.gas_consumption, self.settings.period_days);
            result.avg_daily_gas = average.value;
            result.avg_daily_cost_gas = average.cost;
            anomalies.extend(detect_anomalies(
                &data.gas_consumption,
                FuelType::Gas,
                self.settings.anomaly_threshold,
            ));
        }

        result.avg_daily_cost_total = result.avg_daily_cost_electricity
            - result.avg_daily_earnings_export
            + result.avg_daily_cost_gas;
        result.projected_monthly_cost = result.avg_daily_cost_total * DAYS_PER_MONTH;
        result.recommended_direct_debit = recommend_payment(result.avg_daily_cost_total, now.month());
        result.payment_status = PaymentStatus::classify(
            result.recommended_direct_debit,
            self.settings.current_direct_debit,
        );

        result.tariff_changes = detect_tariff_changes(&data.electricity_agreements, FuelType::Electricity)
            .into_iter()
            .chain(detect_tariff_changes(&data.gas_agreements, FuelType::Gas))
            .collect();

        attach_weather(&mut anomalies, &data.weather);
        result.anomalies = suppress_expected(anomalies, &self.settings.thresholds)
            .into_iter()
            .sorted_by_key(|anomaly| (anomaly.date, anomaly.fuel_type))
            .collect();

        result.insights = generate_insights(&result, now);

        info!(
            n_anomalies = result.anomalies.len(),
            n_tariff_changes = result.tariff_changes.len(),
            n_insights = result.insights.len(),
            payment_status = %result.payment_status,
            "analysis completed",
        );
        Ok(result)
    }
}
