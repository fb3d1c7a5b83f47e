use std::ops::Range;

use chrono::{DateTime, FixedOffset, Timelike};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    core::{consumption::FuelType, validity::Validity},
    quantity::{Quantity, cost::Pence, rate::PencePerKilowattHour},
};

/// Start hours, in the reading's own offset, billed at the night rate.
pub const OFF_PEAK_HOURS: Range<u32> = 2..5;

/// Smallest unit rate difference worth reporting as a tariff change.
pub const MIN_REPORTED_RATE_CHANGE: PencePerKilowattHour = Quantity(0.1);

/// Named pricing structure.
///
/// Zero rates are «not applicable» rather than «free».
#[must_use]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Tariff {
    pub display_name: String,
    pub full_name: String,

    /// Per day.
    pub standing_charge: Pence,

    pub unit_rate: PencePerKilowattHour,
    pub day_rate: PencePerKilowattHour,
    pub night_rate: PencePerKilowattHour,
    pub off_peak_rate: PencePerKilowattHour,
}

impl Tariff {
    const fn is_flat(&self) -> bool {
        self.day_rate.0 == 0.0 && self.night_rate.0 == 0.0
    }

    /// Unit rate applicable to a reading starting at the given moment.
    pub fn unit_rate_at(&self, at: DateTime<FixedOffset>) -> PencePerKilowattHour {
        if self.is_flat() {
            self.unit_rate
        } else if OFF_PEAK_HOURS.contains(&at.hour()) {
            self.night_rate
        } else {
            self.day_rate
        }
    }
}

/// Binding of a [`Tariff`] to a meter point for a period of time.
#[must_use]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agreement {
    pub valid_from: DateTime<FixedOffset>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_to: Option<DateTime<FixedOffset>>,

    pub tariff: Tariff,
}

impl Validity for Agreement {
    fn valid_from(&self) -> DateTime<FixedOffset> {
        self.valid_from
    }

    fn valid_to(&self) -> Option<DateTime<FixedOffset>> {
        self.valid_to
    }
}

/// Explicitly time-varying unit rate, for example a half-hourly price.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TariffRate {
    pub valid_from: DateTime<FixedOffset>,

    #[serde(default)]
    pub valid_to: Option<DateTime<FixedOffset>>,

    pub value_exc_vat: PencePerKilowattHour,
    pub value_inc_vat: PencePerKilowattHour,
}

impl Validity for TariffRate {
    fn valid_from(&self) -> DateTime<FixedOffset> {
        self.valid_from
    }

    fn valid_to(&self) -> Option<DateTime<FixedOffset>> {
        self.valid_to
    }
}

#[must_use]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TariffChange {
    pub change_date: DateTime<FixedOffset>,
    pub fuel_type: FuelType,
    pub old_tariff_name: String,
    pub new_tariff_name: String,

    /// Positive is an increase.
    pub unit_rate_change: PencePerKilowattHour,

    pub impact_description: String,
}

/// Compare each agreement with its predecessor and report noticeable unit rate changes.
pub fn detect_tariff_changes(agreements: &[Agreement], fuel_type: FuelType) -> Vec<TariffChange> {
    agreements
        .iter()
        .tuple_windows()
        .filter_map(|(previous, current)| {
            let change = current.tariff.unit_rate - previous.tariff.unit_rate;
            (change.abs() > MIN_REPORTED_RATE_CHANGE).then(|| TariffChange {
                change_date: current.valid_from,
                fuel_type,
                old_tariff_name: previous.tariff.display_name.clone(),
                new_tariff_name: current.tariff.display_name.clone(),
                unit_rate_change: change,
                impact_description: format!(
                    "Unit rate {} by {:.2}p/kWh",
                    if change.0 < 0.0 { "decreased" } else { "increased" },
                    change.abs().0,
                ),
            })
        })
        .collect()
}
