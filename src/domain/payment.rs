use super::money::Money;
use crate::error::ShippingError;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Minimum number of digits accepted for a card number.
pub const MIN_CARD_DIGITS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardBrand {
    Visa,
    Mastercard,
}

impl CardBrand {
    /// Brand from the leading digit: `4` is Visa, anything else Mastercard.
    pub fn from_number(digits: &str) -> Self {
        if digits.starts_with('4') {
            Self::Visa
        } else {
            Self::Mastercard
        }
    }
}

impl fmt::Display for CardBrand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Visa => f.write_str("Visa"),
            Self::Mastercard => f.write_str("Mastercard"),
        }
    }
}

/// Card as typed by the customer. Only `last4`, brand and expiry are ever stored.
#[derive(Debug, Clone)]
pub struct CardDetails {
    pub number: String,
    pub expiry_month: u32,
    pub expiry_year: i32,
    pub cvc: String,
    pub name: String,
}

impl CardDetails {
    /// Card number with separators stripped.
    ///
    /// Fails with `InvalidCardNumber` for non-digit characters or fewer than 16 digits.
    pub fn digits(&self) -> Result<String, ShippingError> {
        let digits: String = self
            .number
            .chars()
            .filter(|c| !matches!(c, ' ' | '-'))
            .collect();
        if digits.len() < MIN_CARD_DIGITS || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(ShippingError::InvalidCardNumber);
        }
        Ok(digits)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: String,
    pub owner: Uuid,
    pub brand: CardBrand,
    pub last4: String,
    pub expiry_month: u32,
    pub expiry_year: i32,
    pub is_default: bool,
}

impl PaymentMethod {
    /// "Visa ending in 4242".
    pub fn description(&self) -> String {
        format!("{} ending in {}", self.brand, self.last4)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 5] = [
        Self::Pending,
        Self::Processing,
        Self::Completed,
        Self::Failed,
        Self::Refunded,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ShippingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ShippingError::ValidationError(format!("Unknown payment status: {s}")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub shipment_id: Uuid,
    pub customer_id: Uuid,
    pub amount: Money,
    pub currency: String,
    pub status: PaymentStatus,
    pub method: String,
    pub transaction_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What the caller gets back from a successful authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub payment_id: String,
    pub transaction_id: String,
}

/// Prefixed identifier with ten random digits, e.g. `pay_0123456789`.
pub fn random_id(prefix: &str) -> String {
    let mut rng = rand::rng();
    let digits: String = (0..10)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect();
    format!("{prefix}_{digits}")
}
