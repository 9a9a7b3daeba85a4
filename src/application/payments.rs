use crate::domain::money::{Amount, Money};
use crate::domain::payment::{
    CardBrand, CardDetails, Payment, PaymentMethod, PaymentReceipt, PaymentStatus, random_id,
};
use crate::domain::ports::{PaymentMethodStoreRef, PaymentStoreRef};
use crate::error::{Result, ShippingError};
use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Reason shown to the customer for every simulated decline.
pub const DECLINE_MESSAGE: &str =
    "Payment failed. Please try again or use a different payment method.";

/// Gateway verdict for a single charge attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayDecision {
    Approved { transaction_id: String },
    Declined { reason: String },
}

/// Whatever actually moves the money.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Attempts one charge. `Err` means the gateway itself failed, not a decline.
    async fn charge(&self, amount: Amount, method: &PaymentMethod) -> Result<GatewayDecision>;
}

/// Stand-in gateway that approves a fixed share of charges at random.
pub struct SimulatedGateway {
    success_rate: f64,
    rng: Mutex<StdRng>,
}

impl SimulatedGateway {
    /// Approves with probability `success_rate`, clamped to `[0, 1]`.
    pub fn new(success_rate: f64) -> Self {
        Self::with_rng(success_rate, StdRng::from_os_rng())
    }

    /// Deterministic gateway for reproducible runs.
    pub fn seeded(success_rate: f64, seed: u64) -> Self {
        Self::with_rng(success_rate, StdRng::seed_from_u64(seed))
    }

    fn with_rng(success_rate: f64, rng: StdRng) -> Self {
        Self {
            success_rate: success_rate.clamp(0.0, 1.0),
            rng: Mutex::new(rng),
        }
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn charge(&self, _amount: Amount, _method: &PaymentMethod) -> Result<GatewayDecision> {
        let approved = self.rng.lock().await.random_bool(self.success_rate);
        Ok(if approved {
            GatewayDecision::Approved {
                transaction_id: random_id("txn"),
            }
        } else {
            GatewayDecision::Declined {
                reason: DECLINE_MESSAGE.to_string(),
            }
        })
    }
}

/// Shared gateway handle.
pub type PaymentGatewayRef = Arc<dyn PaymentGateway>;

/// Saved cards and the charge flow.
pub struct PaymentProcessor {
    payments: PaymentStoreRef,
    methods: PaymentMethodStoreRef,
    gateway: PaymentGatewayRef,
    currency: String,
}

impl PaymentProcessor {
    /// Creates a processor over the payment and card stores.
    ///
    /// # Arguments
    ///
    /// * `payments` - Where completed payments are recorded.
    /// * `methods` - Saved cards.
    /// * `gateway` - Decides whether each charge goes through.
    /// * `currency` - ISO code stamped on every payment.
    pub fn new(
        payments: PaymentStoreRef,
        methods: PaymentMethodStoreRef,
        gateway: PaymentGatewayRef,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            payments,
            methods,
            gateway,
            currency: currency.into(),
        }
    }

    /// Charges `amount` to a saved card for a shipment.
    ///
    /// An approved charge is recorded as a completed payment straight away. A decline
    /// records nothing and comes back as `PaymentDeclined`; the caller may simply retry.
    #[instrument(skip(self, amount), fields(amount = %amount))]
    pub async fn authorize(
        &self,
        amount: Money,
        payment_method_id: &str,
        shipment_id: Uuid,
    ) -> Result<PaymentReceipt> {
        let amount = Amount::try_from(amount)?;
        let method = self
            .methods
            .get(payment_method_id)
            .await?
            .ok_or_else(|| ShippingError::not_found("Payment method", payment_method_id))?;

        let transaction_id = match self.gateway.charge(amount, &method).await? {
            GatewayDecision::Approved { transaction_id } => transaction_id,
            GatewayDecision::Declined { reason } => {
                warn!(%reason, "charge declined");
                return Err(ShippingError::PaymentDeclined(reason));
            }
        };

        let now = Utc::now();
        let payment = Payment {
            id: random_id("pay"),
            shipment_id,
            customer_id: method.owner,
            amount: amount.into(),
            currency: self.currency.clone(),
            status: PaymentStatus::Completed,
            method: method.description(),
            transaction_id,
            created_at: now,
            updated_at: now,
        };
        let receipt = PaymentReceipt {
            payment_id: payment.id.clone(),
            transaction_id: payment.transaction_id.clone(),
        };
        self.payments.store(payment).await?;

        info!(payment_id = %receipt.payment_id, "charge approved");
        Ok(receipt)
    }

    /// Saves a card for `owner`. The first card an owner saves becomes the default.
    #[instrument(skip(self, card))]
    pub async fn add_method(&self, owner: Uuid, card: CardDetails) -> Result<PaymentMethod> {
        let digits = card.digits()?;
        if !(1..=12).contains(&card.expiry_month) {
            return Err(ShippingError::ValidationError(format!(
                "Invalid expiry month: {}",
                card.expiry_month
            )));
        }

        let existing = self.methods.list_for_owner(owner).await?;
        let method = PaymentMethod {
            id: random_id("pm"),
            owner,
            brand: CardBrand::from_number(&digits),
            last4: digits[digits.len() - 4..].to_string(),
            expiry_month: card.expiry_month,
            expiry_year: card.expiry_year,
            is_default: existing.is_empty(),
        };
        self.methods.store(method.clone()).await?;

        info!(method_id = %method.id, brand = %method.brand, "saved payment method");
        Ok(method)
    }

    /// Makes `method_id` the owner's only default card.
    pub async fn set_default_method(&self, owner: Uuid, method_id: &str) -> Result<PaymentMethod> {
        let methods = self.methods.list_for_owner(owner).await?;
        if !methods.iter().any(|m| m.id == method_id) {
            return Err(ShippingError::not_found("Payment method", method_id));
        }

        let mut chosen = None;
        for mut method in methods {
            let is_default = method.id == method_id;
            if method.is_default != is_default {
                method.is_default = is_default;
                self.methods.store(method.clone()).await?;
            }
            if is_default {
                chosen = Some(method);
            }
        }
        chosen.ok_or_else(|| ShippingError::not_found("Payment method", method_id))
    }

    /// Saved cards in the order they were added.
    pub async fn list_methods(&self, user_id: Uuid) -> Result<Vec<PaymentMethod>> {
        self.methods.list_for_owner(user_id).await
    }

    /// The owner's default card, or their first one if none is flagged.
    pub async fn default_method(&self, user_id: Uuid) -> Result<Option<PaymentMethod>> {
        let methods = self.methods.list_for_owner(user_id).await?;
        let default = methods.iter().position(|m| m.is_default).unwrap_or(0);
        Ok(methods.into_iter().nth(default))
    }

    /// A customer's payments, newest first.
    pub async fn list_payments(&self, user_id: Uuid) -> Result<Vec<Payment>> {
        let mut payments = self.payments.list_for_customer(user_id).await?;
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(payments)
    }

    /// Every payment, newest first.
    pub async fn list_all_payments(&self) -> Result<Vec<Payment>> {
        let mut payments = self.payments.all().await?;
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(payments)
    }
}
