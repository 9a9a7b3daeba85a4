use crate::domain::tracking_code::DEFAULT_PREFIX;
use crate::error::{Result, ShippingError};
use std::time::Duration;

/// Runtime settings shared by the application services.
#[derive(Debug, Clone, PartialEq)]
pub struct PortalConfig {
    /// Probability that the simulated gateway approves a charge.
    pub payment_success_rate: f64,
    /// ISO currency code stamped on payments.
    pub currency: String,
    /// Artificial delay added to every store call.
    pub latency: Duration,
    pub tracking_prefix: String,
    /// First sequence number handed to the tracking code generator.
    pub tracking_start: u64,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            payment_success_rate: 0.95,
            currency: "USD".to_string(),
            latency: Duration::ZERO,
            tracking_prefix: DEFAULT_PREFIX.to_string(),
            tracking_start: 1,
        }
    }
}

impl PortalConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.payment_success_rate) {
            return Err(ShippingError::ValidationError(format!(
                "payment success rate must be within 0..=1, got {}",
                self.payment_success_rate
            )));
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ShippingError::ValidationError(format!(
                "currency must be a three letter ISO code, got {:?}",
                self.currency
            )));
        }
        if self.tracking_prefix.is_empty()
            || !self.tracking_prefix.chars().all(|c| c.is_ascii_uppercase())
        {
            return Err(ShippingError::ValidationError(format!(
                "tracking prefix must be uppercase letters, got {:?}",
                self.tracking_prefix
            )));
        }
        Ok(())
    }
}
