pub mod analysis;
pub mod anomaly;
pub mod consumption;
pub mod daily;
pub mod insight;
pub mod interval;
pub mod payment;
pub mod pricing;
pub mod tariff;
pub mod validity;
pub mod weather;
