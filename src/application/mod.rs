//! Application layer: the services the portal's pages call into.
//!
//! Each service owns the stores it needs through the `Arc` handles in [`Stores`], so they
//! can be built independently in tests. [`Portal`] wires the whole set from one
//! [`PortalConfig`].

pub mod checkout;
pub mod identity;
pub mod payments;
pub mod registry;
pub mod search;

use crate::config::PortalConfig;
use crate::domain::ports::{SessionStoreRef, Stores};
use crate::domain::tracking_code::TrackingCodeGenerator;
use crate::error::Result;
use checkout::Checkout;
use identity::IdentityService;
use payments::{PaymentGatewayRef, PaymentProcessor, SimulatedGateway};
use registry::ShipmentRegistry;
use search::QueryService;
use std::sync::Arc;

/// Every service the portal exposes, sharing one set of stores.
pub struct Portal {
    pub identity: IdentityService,
    pub registry: Arc<ShipmentRegistry>,
    pub payments: Arc<PaymentProcessor>,
    pub checkout: Checkout,
    pub query: QueryService,
}

impl Portal {
    /// Builds every service over `stores` with the simulated payment gateway.
    pub fn new(stores: Stores, sessions: SessionStoreRef, config: &PortalConfig) -> Result<Self> {
        let gateway = Arc::new(SimulatedGateway::new(config.payment_success_rate));
        Self::with_gateway(stores, sessions, gateway, config)
    }

    /// Like [`Portal::new`] but charging through `gateway`.
    ///
    /// Fails with a validation error when `config` is out of range.
    pub fn with_gateway(
        stores: Stores,
        sessions: SessionStoreRef,
        gateway: PaymentGatewayRef,
        config: &PortalConfig,
    ) -> Result<Self> {
        config.validate()?;

        let codes = TrackingCodeGenerator::new(&config.tracking_prefix, config.tracking_start);
        let registry = Arc::new(ShipmentRegistry::new(
            stores.shipments.clone(),
            stores.tracking.clone(),
            codes,
        ));
        let payments = Arc::new(PaymentProcessor::new(
            stores.payments.clone(),
            stores.methods.clone(),
            gateway,
            config.currency.clone(),
        ));

        Ok(Self {
            identity: IdentityService::new(stores.users.clone(), sessions),
            checkout: Checkout::new(registry.clone(), payments.clone()),
            query: QueryService::new(stores),
            registry,
            payments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shipment::ShipmentStatus;
    use crate::error::ShippingError;
    use crate::infrastructure::in_memory::InMemorySessionStore;
    use crate::infrastructure::seed;

    #[tokio::test]
    async fn test_portal_tracks_seeded_shipment() {
        let stores = Stores::in_memory();
        seed::seed_if_empty(&stores).await.unwrap();
        let portal = Portal::new(
            stores,
            Arc::new(InMemorySessionStore::new()),
            &PortalConfig::default(),
        )
        .unwrap();

        let report = portal.registry.track("SA123456789").await.unwrap().unwrap();
        assert_eq!(report.shipment.status, ShipmentStatus::InTransit);
        assert!(!report.events.is_empty());
        assert!(report.events[0].event_time >= report.events[report.events.len() - 1].event_time);
    }

    #[test]
    fn test_portal_rejects_invalid_config() {
        let config = PortalConfig {
            payment_success_rate: 1.5,
            ..Default::default()
        };
        let result = Portal::new(
            Stores::in_memory(),
            Arc::new(InMemorySessionStore::new()),
            &config,
        );
        assert!(matches!(result, Err(ShippingError::ValidationError(_))));
    }
}
