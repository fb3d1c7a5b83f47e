use crate::{
    core::{
        consumption::Consumption,
        tariff::{Agreement, TariffRate},
        validity::{Precedence, resolve},
    },
    quantity::rate::PencePerKilowattHour,
};

/// Source of unit rates for pricing the readings.
///
/// Choosing between the variants is up to the caller: time-varying rates are preferred when available.
#[derive(Copy, Clone)]
pub enum Pricing<'a> {
    TimeVarying(&'a [TariffRate]),
    Agreements(&'a [Agreement]),
}

impl Pricing<'_> {
    /// Unit rate applicable to the reading, if any.
    fn rate_for(self, consumption: &Consumption, precedence: Precedence) -> Option<PencePerKilowattHour> {
        let at = consumption.interval.start;
        match self {
            Self::TimeVarying(rates) => {
                resolve(rates, at, precedence).map(|rate| rate.value_inc_vat)
            }
            Self::Agreements(agreements) => {
                resolve(agreements, at, precedence).map(|agreement| agreement.tariff.unit_rate_at(at))
            }
        }
    }

    /// Set the cost of every reading which has a resolvable rate.
    ///
    /// Readings without one keep their current cost.
    ///
    /// # Returns
    ///
    /// Number of priced readings.
    pub fn apply(self, consumptions: &mut [Consumption], precedence: Precedence) -> usize {
        let mut n_priced = 0;
        for consumption in consumptions {
            if let Some(rate) = self.rate_for(consumption, precedence) {
                consumption.cost = consumption.value * rate;
                n_priced += 1;
            }
        }
        n_priced
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::{DateTime, FixedOffset, TimeDelta};

    use super::*;
    use crate::{
        core::{interval::Interval, tariff::Tariff},
        quantity::{cost::Pence, energy::KilowattHours},
    };

    fn at(rfc3339: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap()
    }

    fn half_hour(start: &str, value: f64) -> Consumption {
        let start = at(start);
        Consumption::new(
            Interval::new(start, start + TimeDelta::minutes(30)),
            KilowattHours::from(value),
        )
    }

    fn rate(from: &str, to: &str, value_inc_vat: f64) -> TariffRate {
        TariffRate {
            valid_from: at(from),
            valid_to: Some(at(to)),
            value_exc_vat: PencePerKilowattHour::from(value_inc_vat / 1.05),
            value_inc_vat: PencePerKilowattHour::from(value_inc_vat),
        }
    }

    #[test]
    fn test_time_varying_rates() {
        let rates = [
            rate("2025-01-10T10:00:00Z", "2025-01-10T10:29:59Z", 20.0),
            rate("2025-01-10T10:30:00Z", "2025-01-10T10:59:59Z", 30.0),
        ];
        let mut consumptions = [
            half_hour("2025-01-10T10:00:00Z", 1.0),
            half_hour("2025-01-10T10:30:00Z", 0.5),
            half_hour("2025-01-10T11:00:00Z", 2.0),
        ];
        let n_priced = Pricing::TimeVarying(&rates).apply(&mut consumptions, Precedence::default());
        assert_eq!(n_priced, 2);
        assert_abs_diff_eq!(consumptions[0].cost.0, 20.0);
        assert_abs_diff_eq!(consumptions[1].cost.0, 15.0);
        assert_abs_diff_eq!(consumptions[2].cost.0, 0.0);
        assert_abs_diff_eq!(consumptions[2].value.0, 2.0);
    }

    #[test]
    fn test_agreements_day_night() {
        let agreements = [Agreement {
            valid_from: at("2025-01-01T00:00:00Z"),
            valid_to: None,
            tariff: Tariff {
                day_rate: PencePerKilowattHour::from(30.0),
                night_rate: PencePerKilowattHour::from(10.0),
                ..Tariff::default()
            },
        }];
        let mut consumptions =
            [half_hour("2025-01-10T02:30:00Z", 2.0), half_hour("2025-01-10T12:00:00Z", 2.0)];
        let n_priced = Pricing::Agreements(&agreements).apply(&mut consumptions, Precedence::default());
        assert_eq!(n_priced, 2);
        assert_abs_diff_eq!(consumptions[0].cost.0, 20.0);
        assert_abs_diff_eq!(consumptions[1].cost.0, 60.0);
    }

    #[test]
    fn test_unresolved_keeps_previous_cost() {
        let mut consumptions = [half_hour("2025-01-10T02:30:00Z", 2.0)];
        consumptions[0].cost = Pence::from(7.0);
        assert_eq!(Pricing::Agreements(&[]).apply(&mut consumptions, Precedence::default()), 0);
        assert_abs_diff_eq!(consumptions[0].cost.0, 7.0);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let rates = [rate("2025-01-10T00:00:00Z", "2025-01-11T00:00:00Z", 24.5)];
        let mut consumptions = [
            half_hour("2025-01-10T08:00:00Z", 0.3),
            half_hour("2025-01-10T08:30:00Z", 0.7),
        ];
        Pricing::TimeVarying(&rates).apply(&mut consumptions, Precedence::default());
        let first = consumptions;
        Pricing::TimeVarying(&rates).apply(&mut consumptions, Precedence::default());
        assert_eq!(first, consumptions);
    }
}
