use super::money::Money;
use crate::error::ShippingError;
use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Floor applied to every quote, whatever the tier or weight.
pub const MINIMUM_CHARGE: Money = Money(dec!(10));
/// Charge per kilogram on top of the tier's base rate.
pub const RATE_PER_KG: Decimal = dec!(2);

/// Shipping speed class. Drives both the price and the delivery estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceTier {
    Standard,
    Express,
    Overnight,
}

impl ServiceTier {
    pub const ALL: [ServiceTier; 3] = [Self::Standard, Self::Express, Self::Overnight];

    pub fn base_rate(self) -> Money {
        match self {
            Self::Standard => Money(dec!(5)),
            Self::Express => Money(dec!(8)),
            Self::Overnight => Money(dec!(15)),
        }
    }

    pub fn lead_days(self) -> u64 {
        match self {
            Self::Standard => 5,
            Self::Express => 2,
            Self::Overnight => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Express => "express",
            Self::Overnight => "overnight",
        }
    }
}

impl fmt::Display for ServiceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceTier {
    type Err = ShippingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tier| tier.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ShippingError::ValidationError(format!("Unknown service tier: {s}")))
    }
}

/// Price of a shipment: `max(base_rate + weight * 2, 10)`.
pub fn quote(tier: ServiceTier, weight: Decimal) -> Money {
    (tier.base_rate() + Money(weight * RATE_PER_KG)).max(MINIMUM_CHARGE)
}

/// Delivery estimate for a shipment created on `created`.
pub fn estimate_delivery(tier: ServiceTier, created: NaiveDate) -> NaiveDate {
    created
        .checked_add_days(Days::new(tier.lead_days()))
        .unwrap_or(NaiveDate::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    Pending,
    PickedUp,
    InTransit,
    OutForDelivery,
    Delivered,
    Exception,
    Cancelled,
}

impl ShipmentStatus {
    pub const ALL: [ShipmentStatus; 7] = [
        Self::Pending,
        Self::PickedUp,
        Self::InTransit,
        Self::OutForDelivery,
        Self::Delivered,
        Self::Exception,
        Self::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PickedUp => "picked_up",
            Self::InTransit => "in_transit",
            Self::OutForDelivery => "out_for_delivery",
            Self::Delivered => "delivered",
            Self::Exception => "exception",
            Self::Cancelled => "cancelled",
        }
    }

    /// Human wording, e.g. "out for delivery".
    pub fn label(self) -> String {
        self.as_str().replace('_', " ")
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Legal successors. `Exception` and `Cancelled` are reachable from every
    /// non-terminal state; terminal states have none.
    pub fn successors(self) -> &'static [ShipmentStatus] {
        use ShipmentStatus::*;
        match self {
            Pending => &[PickedUp, Exception, Cancelled],
            PickedUp => &[InTransit, Exception, Cancelled],
            InTransit => &[OutForDelivery, Delivered, Exception, Cancelled],
            OutForDelivery => &[Delivered, InTransit, Exception, Cancelled],
            Exception => &[PickedUp, InTransit, OutForDelivery, Cancelled],
            Delivered | Cancelled => &[],
        }
    }

    pub fn can_transition_to(self, next: ShipmentStatus) -> bool {
        self.successors().contains(&next)
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShipmentStatus {
    type Err = ShippingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| ShippingError::ValidationError(format!("Unknown shipment status: {s}")))
    }
}

/// Input for creating a shipment.
#[derive(Debug, Clone, PartialEq)]
pub struct NewShipment {
    pub customer_id: Uuid,
    pub sender_name: String,
    pub sender_address: String,
    pub recipient_name: String,
    pub recipient_address: String,
    pub weight: Decimal,
    pub service: ServiceTier,
}

impl NewShipment {
    pub fn validate(&self) -> Result<(), ShippingError> {
        let required = [
            ("sender name", &self.sender_name),
            ("sender address", &self.sender_address),
            ("recipient name", &self.recipient_name),
            ("recipient address", &self.recipient_address),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(ShippingError::ValidationError(format!(
                "{field} is required"
            )));
        }
        if self.weight <= Decimal::ZERO {
            return Err(ShippingError::ValidationError(
                "Weight must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: Uuid,
    /// Customer-facing identifier. Never reassigned.
    pub tracking_code: String,
    pub customer_id: Uuid,
    pub sender_name: String,
    pub sender_address: String,
    pub recipient_name: String,
    pub recipient_address: String,
    pub weight: Decimal,
    pub service: ServiceTier,
    pub status: ShipmentStatus,
    pub estimated_delivery: NaiveDate,
    pub actual_delivery: Option<DateTime<Utc>>,
    pub shipping_cost: Money,
    pub total_cost: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Set once the checkout payment has been approved.
    pub paid_at: Option<DateTime<Utc>>,
}

impl Shipment {
    /// Builds a pending shipment from validated details.
    pub fn new(details: NewShipment, tracking_code: String, now: DateTime<Utc>) -> Self {
        let cost = quote(details.service, details.weight);
        Self {
            id: Uuid::new_v4(),
            tracking_code,
            customer_id: details.customer_id,
            sender_name: details.sender_name,
            sender_address: details.sender_address,
            recipient_name: details.recipient_name,
            recipient_address: details.recipient_address,
            weight: details.weight,
            service: details.service,
            status: ShipmentStatus::Pending,
            estimated_delivery: estimate_delivery(details.service, now.date_naive()),
            actual_delivery: None,
            shipping_cost: cost,
            total_cost: cost,
            created_at: now,
            updated_at: None,
            paid_at: None,
        }
    }

    pub fn is_paid(&self) -> bool {
        self.paid_at.is_some()
    }

    /// Overwrites the status without consulting the transition table.
    pub fn apply_status(&mut self, status: ShipmentStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = Some(now);
        if status == ShipmentStatus::Delivered {
            self.actual_delivery = Some(now);
        }
    }

    /// Moves to `status` if the transition table allows it.
    pub fn transition(
        &mut self,
        status: ShipmentStatus,
        now: DateTime<Utc>,
    ) -> Result<(), ShippingError> {
        if !self.status.can_transition_to(status) {
            return Err(ShippingError::InvalidTransition {
                from: self.status.to_string(),
                to: status.to_string(),
            });
        }
        self.apply_status(status, now);
        Ok(())
    }
}
