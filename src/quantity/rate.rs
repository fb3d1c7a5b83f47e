use std::fmt::{Debug, Display, Formatter};

use crate::quantity::Quantity;

/// Pence per kilowatt-hour.
pub type PencePerKilowattHour = Quantity<f64, -1, -1, 1>;

impl Display for PencePerKilowattHour {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}p/kWh", self.0)
    }
}

impl Debug for PencePerKilowattHour {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}p/kWh", self.0)
    }
}
