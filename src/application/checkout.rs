use super::payments::PaymentProcessor;
use super::registry::ShipmentRegistry;
use crate::domain::payment::PaymentReceipt;
use crate::domain::shipment::{NewShipment, Shipment};
use crate::error::Result;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// The activated shipment and the payment that paid for it.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutReceipt {
    pub shipment: Shipment,
    pub payment: PaymentReceipt,
}

/// Create, charge, activate.
pub struct Checkout {
    registry: Arc<ShipmentRegistry>,
    payments: Arc<PaymentProcessor>,
}

impl Checkout {
    /// Wires checkout to the registry and processor it coordinates.
    pub fn new(registry: Arc<ShipmentRegistry>, payments: Arc<PaymentProcessor>) -> Self {
        Self { registry, payments }
    }

    /// Creates the shipment and charges its total to `payment_method_id`.
    ///
    /// A declined charge leaves the shipment stored but unpaid, so it can be paid later
    /// through [`Checkout::pay`].
    #[instrument(skip(self, details))]
    pub async fn checkout(
        &self,
        details: NewShipment,
        payment_method_id: &str,
    ) -> Result<CheckoutReceipt> {
        let shipment = self.registry.create(details).await?;
        self.settle(shipment.id, payment_method_id).await
    }

    /// Charges an existing unpaid shipment.
    ///
    /// The paid check, the charge and the activation all run under the shipment's
    /// lock, so concurrent calls for one shipment charge it at most once.
    #[instrument(skip(self))]
    pub async fn pay(&self, shipment_id: Uuid, payment_method_id: &str) -> Result<CheckoutReceipt> {
        self.settle(shipment_id, payment_method_id).await
    }

    async fn settle(&self, shipment_id: Uuid, payment_method_id: &str) -> Result<CheckoutReceipt> {
        let payments = &self.payments;
        let (shipment, payment) = self
            .registry
            .settle(shipment_id, None, move |shipment| async move {
                payments
                    .authorize(shipment.total_cost, payment_method_id, shipment.id)
                    .await
                    .inspect_err(|e| {
                        warn!(
                            tracking_code = %shipment.tracking_code,
                            error = %e,
                            "shipment left unpaid"
                        );
                    })
            })
            .await?;

        info!(
            tracking_code = %shipment.tracking_code,
            payment_id = %payment.payment_id,
            "checkout complete"
        );
        Ok(CheckoutReceipt { shipment, payment })
    }
}
