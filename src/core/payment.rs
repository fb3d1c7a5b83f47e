use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Days in the «standard» month.
pub const DAYS_PER_MONTH: f64 = 30.0;

/// Headroom on top of the seasonally-adjusted estimate.
pub const BUFFER: f64 = 1.10;

/// Payments are rounded to this granularity.
pub const ROUNDING_STEP: f64 = 5.0;

/// Payments closer than this to the recommendation are balanced.
pub const BALANCED_TOLERANCE: f64 = 5.0;

/// Expected usage multiplier for the calendar month (1-12).
#[must_use]
pub const fn seasonal_multiplier(month: u32) -> f64 {
    match month {
        11 | 12 | 1 | 2 => 1.40,
        3 | 4 | 9 | 10 => 1.20,
        _ => 1.00,
    }
}

/// Recommended monthly payment, in the same currency unit as the daily cost.
#[must_use]
pub fn recommend_payment(avg_daily_cost: f64, month: u32) -> f64 {
    let base_monthly = avg_daily_cost * DAYS_PER_MONTH;
    let annual_estimate = base_monthly * 12.0 * seasonal_multiplier(month);
    let recommended = annual_estimate / 12.0 * BUFFER;
    (recommended / ROUNDING_STEP).round() * ROUNDING_STEP
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Balanced,
    Underpaying,
    Overpaying,
    Unknown,
}

impl PaymentStatus {
    /// Compare the current payment with the recommendation.
    ///
    /// Zero current payment means «not known».
    #[must_use]
    pub fn classify(recommended: f64, current: Option<f64>) -> Self {
        match current {
            None => Self::Unknown,
            Some(current) if current == 0.0 => Self::Unknown,
            Some(current) if (recommended - current).abs() < BALANCED_TOLERANCE => Self::Balanced,
            Some(current) if recommended > current => Self::Underpaying,
            Some(_) => Self::Overpaying,
        }
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Balanced => write!(f, "Balanced"),
            Self::Underpaying => write!(f, "Underpaying"),
            Self::Overpaying => write!(f, "Overpaying"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}
