use std::fmt::{Debug, Display, Formatter};

use crate::quantity::Quantity;

/// Cost in the minor currency unit (pence).
pub type Pence = Quantity<f64, 0, 0, 1>;

impl Pence {
    /// Convert into the major currency unit (pounds).
    #[must_use]
    pub fn to_pounds(self) -> f64 {
        self.0 / 100.0
    }
}

impl Display for Pence {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "£{:.2}", self.to_pounds())
    }
}

impl Debug for Pence {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}p", self.0)
    }
}
