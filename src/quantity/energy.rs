use std::{
    fmt::{Debug, Display, Formatter},
    ops::Mul,
};

use crate::quantity::{Quantity, cost::Pence, rate::PencePerKilowattHour};

pub type KilowattHours = Quantity<f64, 1, 1, 0>;

impl Display for KilowattHours {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2} kWh", self.0)
    }
}

impl Debug for KilowattHours {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}kWh", self.0)
    }
}

impl Mul<PencePerKilowattHour> for KilowattHours {
    type Output = Pence;

    fn mul(self, rhs: PencePerKilowattHour) -> Self::Output {
        Pence::from(self.0 * rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_mul_rate() {
        let cost = KilowattHours::from(1.5) * PencePerKilowattHour::from(24.5);
        assert_abs_diff_eq!(cost.0, 36.75);
    }
}
