use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{
    core::interval::Interval,
    quantity::{cost::Pence, energy::KilowattHours},
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuelType {
    Electricity,

    /// Electricity exported to the grid, for example from solar panels or a battery.
    Export,

    Gas,
}

impl Display for FuelType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Electricity => write!(f, "electricity"),
            Self::Export => write!(f, "export"),
            Self::Gas => write!(f, "gas"),
        }
    }
}

/// Single meter reading.
///
/// Everything but the cost is immutable once read from the source.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Consumption {
    #[serde(flatten)]
    pub interval: Interval,

    pub value: KilowattHours,

    /// Populated by the pricing, zero until then.
    #[serde(default)]
    pub cost: Pence,
}

impl Consumption {
    pub const fn new(interval: Interval, value: KilowattHours) -> Self {
        Self { interval, value, cost: Pence::ZERO }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_deserialize_ok() -> crate::prelude::Result {
        // language=JSON
        const READING: &str = r#"
            {
                "startAt": "2025-01-10T10:00:00+00:00",
                "endAt": "2025-01-10T10:30:00+00:00",
                "value": 0.412
            }
        "#;
        let consumption = serde_json::from_str::<Consumption>(READING)?;
        assert_abs_diff_eq!(consumption.value.0, 0.412);
        assert_abs_diff_eq!(consumption.cost.0, 0.0);
        assert_eq!(consumption.interval.start.to_rfc3339(), "2025-01-10T10:00:00+00:00");
        Ok(())
    }
}
