use crate::domain::ports::{ShipmentStoreRef, TrackingLedgerRef};
use crate::domain::shipment::{NewShipment, Shipment, ShipmentStatus};
use crate::domain::tracking::{TrackingEvent, newest_first};
use crate::domain::tracking_code::TrackingCodeGenerator;
use crate::error::{Result, ShippingError};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// What the public tracking page shows for a code.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingReport {
    pub shipment: Shipment,
    /// Newest first.
    pub events: Vec<TrackingEvent>,
}

/// How a status change is checked against the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Checked,
    Override,
}

/// Owns shipment records and writes their tracking history.
///
/// Every mutation of an existing shipment runs under that shipment's lock, so the
/// status field and the ledger entry describing it are written as one step. Lock
/// entries live only while someone holds or waits on them.
pub struct ShipmentRegistry {
    shipments: ShipmentStoreRef,
    ledger: TrackingLedgerRef,
    codes: TrackingCodeGenerator,
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl ShipmentRegistry {
    /// Creates a registry over the given stores.
    ///
    /// # Arguments
    ///
    /// * `shipments` - The store holding shipment records.
    /// * `ledger` - The append-only tracking event log.
    /// * `codes` - Source of candidate tracking codes.
    pub fn new(
        shipments: ShipmentStoreRef,
        ledger: TrackingLedgerRef,
        codes: TrackingCodeGenerator,
    ) -> Self {
        Self {
            shipments,
            ledger,
            codes,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Runs `work` while holding the lock for shipment `id`.
    async fn with_lock<T, F, Fut>(&self, id: Uuid, work: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let lock = self.locks.lock().await.entry(id).or_default().clone();
        let result = {
            let _guard = lock.lock().await;
            work().await
        };

        // Entries are only cloned under the map lock, so a count of two (map plus
        // `lock`) means nobody else is holding or waiting.
        let mut locks = self.locks.lock().await;
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&id);
        }
        result
    }

    /// Next generated code that no stored shipment already carries.
    async fn unused_tracking_code(&self) -> Result<String> {
        loop {
            let code = self.codes.next_code()?;
            if self.shipments.find_by_tracking_code(&code).await?.is_none() {
                return Ok(code);
            }
            debug!(%code, "tracking code taken, skipping");
        }
    }

    /// Prices and stores a new pending shipment.
    #[instrument(skip(self, details), fields(customer_id = %details.customer_id, service = %details.service))]
    pub async fn create(&self, details: NewShipment) -> Result<Shipment> {
        details.validate()?;
        let code = self.unused_tracking_code().await?;
        let shipment = Shipment::new(details, code, Utc::now());
        self.shipments.store(shipment.clone()).await?;

        info!(
            shipment_id = %shipment.id,
            tracking_code = %shipment.tracking_code,
            cost = %shipment.total_cost,
            "created shipment"
        );
        Ok(shipment)
    }

    /// Moves a shipment to `status` and records the change in the ledger.
    ///
    /// Fails with `InvalidTransition` when the transition table does not allow the move.
    pub async fn update_status(
        &self,
        id: Uuid,
        status: ShipmentStatus,
        location: Option<&str>,
    ) -> Result<Shipment> {
        self.change_status(id, status, location, Transition::Checked)
            .await
    }

    /// Admin override: like `update_status` without consulting the transition table.
    pub async fn override_status(
        &self,
        id: Uuid,
        status: ShipmentStatus,
        location: Option<&str>,
    ) -> Result<Shipment> {
        self.change_status(id, status, location, Transition::Override)
            .await
    }

    #[instrument(skip(self))]
    async fn change_status(
        &self,
        id: Uuid,
        status: ShipmentStatus,
        location: Option<&str>,
        mode: Transition,
    ) -> Result<Shipment> {
        self.with_lock(id, move || async move {
            let mut shipment = self.get(id).await?;
            let previous = shipment.status;
            let now = Utc::now();
            match mode {
                Transition::Checked => shipment.transition(status, now)?,
                Transition::Override => shipment.apply_status(status, now),
            }

            // Ledger first: a failed append must leave the stored status untouched.
            self.ledger
                .append(TrackingEvent::status_change(id, status, location, now))
                .await?;
            self.shipments.store(shipment.clone()).await?;

            info!(%previous, %status, ?mode, "shipment status changed");
            Ok(shipment)
        })
        .await
    }

    /// Marks the shipment paid and writes its first ledger entry.
    pub async fn mark_paid(&self, id: Uuid, location: Option<&str>) -> Result<Shipment> {
        let (shipment, ()) = self.settle(id, location, |_| async { Ok(()) }).await?;
        Ok(shipment)
    }

    /// Collects payment for an unpaid shipment and activates it, all under the
    /// shipment's lock.
    ///
    /// `charge` sees the shipment as stored and runs only if it is still unpaid. When
    /// `charge` fails nothing is written.
    ///
    /// # Arguments
    ///
    /// * `id` - The shipment to settle.
    /// * `location` - Location recorded on the initial ledger entry.
    /// * `charge` - Takes the payment; its output is returned alongside the shipment.
    #[instrument(skip(self, charge))]
    pub async fn settle<T, F, Fut>(
        &self,
        id: Uuid,
        location: Option<&str>,
        charge: F,
    ) -> Result<(Shipment, T)>
    where
        F: FnOnce(Shipment) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.with_lock(id, move || async move {
            let mut shipment = self.get(id).await?;
            if shipment.is_paid() {
                return Err(ShippingError::ValidationError(format!(
                    "Shipment {} is already paid",
                    shipment.tracking_code
                )));
            }
            let receipt = charge(shipment.clone()).await?;

            let now = Utc::now();
            shipment.paid_at = Some(now);
            shipment.updated_at = Some(now);
            self.ledger
                .append(TrackingEvent::new(
                    id,
                    shipment.status,
                    "Shipment created, awaiting pickup",
                    location,
                    now,
                ))
                .await?;
            self.shipments.store(shipment.clone()).await?;

            info!(tracking_code = %shipment.tracking_code, "shipment paid");
            Ok((shipment, receipt))
        })
        .await
    }

    pub async fn get(&self, id: Uuid) -> Result<Shipment> {
        self.shipments
            .get(id)
            .await?
            .ok_or_else(|| ShippingError::not_found("Shipment", id))
    }

    pub async fn find(&self, tracking_code: &str) -> Result<Option<Shipment>> {
        self.shipments
            .find_by_tracking_code(tracking_code.trim())
            .await
    }

    /// A customer's shipments, newest first.
    pub async fn list_for(&self, customer_id: Uuid) -> Result<Vec<Shipment>> {
        let mut shipments = self.shipments.list_for_customer(customer_id).await?;
        shipments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(shipments)
    }

    /// Every shipment, newest first.
    pub async fn list_all(&self) -> Result<Vec<Shipment>> {
        let mut shipments = self.shipments.all().await?;
        shipments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(shipments)
    }

    /// Ledger entries for a shipment, newest first.
    pub async fn events_for(&self, id: Uuid) -> Result<Vec<TrackingEvent>> {
        let mut events = self.ledger.events_for(id).await?;
        newest_first(&mut events);
        Ok(events)
    }

    pub async fn track(&self, tracking_code: &str) -> Result<Option<TrackingReport>> {
        let Some(shipment) = self.find(tracking_code).await? else {
            return Ok(None);
        };
        let events = self.events_for(shipment.id).await?;
        Ok(Some(TrackingReport { shipment, events }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Money;
    use crate::domain::ports::Stores;
    use crate::domain::shipment::ServiceTier;
    use crate::infrastructure::seed;
    use chrono::Days;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    async fn registry() -> (ShipmentRegistry, Stores) {
        let stores = Stores::in_memory();
        seed::seed_if_empty(&stores).await.unwrap();
        let registry = ShipmentRegistry::new(
            stores.shipments.clone(),
            stores.tracking.clone(),
            TrackingCodeGenerator::default(),
        );
        (registry, stores)
    }

    fn details(weight: Decimal, service: ServiceTier) -> NewShipment {
        NewShipment {
            customer_id: seed::JOHN_ID,
            sender_name: "John Doe".to_string(),
            sender_address: "123 Business St, New York, NY 10001".to_string(),
            recipient_name: "Grace Hopper".to_string(),
            recipient_address: "1 Navy Way, Arlington, VA 22202".to_string(),
            weight,
            service,
        }
    }

    #[tokio::test]
    async fn test_create_express_scenario() {
        let (registry, _) = registry().await;
        let shipment = registry
            .create(details(dec!(5.5), ServiceTier::Express))
            .await
            .unwrap();

        assert_eq!(shipment.total_cost, Money(dec!(19)));
        assert_eq!(shipment.shipping_cost, shipment.total_cost);
        assert_eq!(shipment.status, ShipmentStatus::Pending);
        assert_eq!(
            shipment.estimated_delivery,
            shipment.created_at.date_naive() + Days::new(2)
        );
        assert!(registry.events_for(shipment.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_estimated_delivery_per_tier() {
        let (registry, _) = registry().await;
        for (tier, days) in [
            (ServiceTier::Overnight, 1),
            (ServiceTier::Express, 2),
            (ServiceTier::Standard, 5),
        ] {
            let shipment = registry.create(details(dec!(0.2), tier)).await.unwrap();
            assert_eq!(
                shipment.estimated_delivery,
                shipment.created_at.date_naive() + Days::new(days)
            );
            assert!(shipment.total_cost >= Money(dec!(10)));
        }
    }

    #[tokio::test]
    async fn test_tracking_codes_are_unique_and_checked() {
        let stores = Stores::in_memory();
        let registry = ShipmentRegistry::new(
            stores.shipments.clone(),
            stores.tracking.clone(),
            TrackingCodeGenerator::default(),
        );
        // Occupy the first code so the generator has to skip it.
        let squatter = Shipment::new(
            details(dec!(1), ServiceTier::Standard),
            "SA000000018".to_string(),
            Utc::now(),
        );
        stores.shipments.store(squatter).await.unwrap();

        let mut codes = Vec::new();
        for _ in 0..20 {
            let shipment = registry
                .create(details(dec!(1), ServiceTier::Standard))
                .await
                .unwrap();
            codes.push(shipment.tracking_code);
        }
        assert!(!codes.contains(&"SA000000018".to_string()));
        let mut unique = codes.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), codes.len());
    }

    #[tokio::test]
    async fn test_update_status_appends_exactly_one_event() {
        let (registry, _) = registry().await;
        let before = registry.events_for(seed::IN_TRANSIT_SHIPMENT).await.unwrap();

        let updated = registry
            .update_status(
                seed::IN_TRANSIT_SHIPMENT,
                ShipmentStatus::OutForDelivery,
                Some("Los Angeles, CA"),
            )
            .await
            .unwrap();

        let after = registry.events_for(seed::IN_TRANSIT_SHIPMENT).await.unwrap();
        assert_eq!(after.len(), before.len() + 1);
        assert_eq!(updated.id, seed::IN_TRANSIT_SHIPMENT);
        assert_eq!(updated.tracking_code, "SA123456789");
        assert_eq!(updated.status, ShipmentStatus::OutForDelivery);
        assert!(updated.updated_at.is_some());

        let newest = &after[0];
        assert_eq!(newest.status, ShipmentStatus::OutForDelivery);
        assert_eq!(newest.location, "Los Angeles, CA");
        assert_eq!(newest.description, "Status updated to out for delivery");
    }

    #[tokio::test]
    async fn test_update_status_unknown_id() {
        let (registry, stores) = registry().await;
        let missing = Uuid::new_v4();
        let result = registry
            .update_status(missing, ShipmentStatus::PickedUp, None)
            .await;
        assert!(matches!(result, Err(ShippingError::NotFound { .. })));
        assert!(stores.tracking.events_for(missing).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_illegal_transition_rejected_without_event() {
        let (registry, _) = registry().await;
        let before = registry.events_for(seed::DELIVERED_SHIPMENT).await.unwrap();

        let result = registry
            .update_status(seed::DELIVERED_SHIPMENT, ShipmentStatus::InTransit, None)
            .await;
        assert!(matches!(result, Err(ShippingError::InvalidTransition { .. })));

        let after = registry.events_for(seed::DELIVERED_SHIPMENT).await.unwrap();
        assert_eq!(after.len(), before.len());
        assert_eq!(
            registry.get(seed::DELIVERED_SHIPMENT).await.unwrap().status,
            ShipmentStatus::Delivered
        );
    }

    #[tokio::test]
    async fn test_override_bypasses_table() {
        let (registry, _) = registry().await;
        let shipment = registry
            .override_status(seed::DELIVERED_SHIPMENT, ShipmentStatus::Exception, None)
            .await
            .unwrap();
        assert_eq!(shipment.status, ShipmentStatus::Exception);
        assert_eq!(
            registry.events_for(seed::DELIVERED_SHIPMENT).await.unwrap()[0].location,
            "Processing Center"
        );
    }

    #[tokio::test]
    async fn test_mark_paid_writes_initial_event_once() {
        let (registry, _) = registry().await;
        let shipment = registry
            .create(details(dec!(3), ServiceTier::Overnight))
            .await
            .unwrap();

        let paid = registry.mark_paid(shipment.id, None).await.unwrap();
        assert!(paid.is_paid());
        assert_eq!(registry.events_for(shipment.id).await.unwrap().len(), 1);

        assert!(registry.mark_paid(shipment.id, None).await.is_err());
        assert_eq!(registry.events_for(shipment.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_track_seeded_shipment() {
        let (registry, _) = registry().await;
        let report = registry.track(" SA123456789 ").await.unwrap().unwrap();
        assert_eq!(report.shipment.status, ShipmentStatus::InTransit);
        assert!(!report.events.is_empty());
        assert!(
            report
                .events
                .windows(2)
                .all(|w| w[0].event_time >= w[1].event_time)
        );

        assert!(registry.track("SA000000000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_updates_are_serialized() {
        let (registry, _) = registry().await;
        let registry = Arc::new(registry);
        let shipment = registry
            .create(details(dec!(1), ServiceTier::Standard))
            .await
            .unwrap();

        let id = shipment.id;

        // Only one of the racing writers can take the pending -> picked_up edge.
        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry
                    .update_status(id, ShipmentStatus::PickedUp, None)
                    .await
                    .is_ok()
            }));
        }
        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(registry.events_for(id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_lists_are_newest_first() {
        let (registry, _) = registry().await;
        let all = registry.list_all().await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].created_at >= w[1].created_at));
        assert_eq!(all[0].tracking_code, "SA456789123");

        assert_eq!(registry.list_for(seed::JOHN_ID).await.unwrap().len(), 3);
        assert!(registry.list_for(seed::JANE_ID).await.unwrap().is_empty());
    }

    struct BrokenLedger;

    #[async_trait::async_trait]
    impl crate::domain::ports::TrackingLedger for BrokenLedger {
        async fn append(&self, _event: TrackingEvent) -> Result<()> {
            Err(ShippingError::InternalError("ledger offline".into()))
        }

        async fn events_for(&self, _shipment_id: Uuid) -> Result<Vec<TrackingEvent>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_failed_append_leaves_status_unchanged() {
        let stores = Stores::in_memory();
        seed::seed_if_empty(&stores).await.unwrap();
        let registry = ShipmentRegistry::new(
            stores.shipments.clone(),
            Arc::new(BrokenLedger),
            TrackingCodeGenerator::default(),
        );

        let result = registry
            .update_status(seed::PENDING_SHIPMENT, ShipmentStatus::PickedUp, None)
            .await;
        assert!(matches!(result, Err(ShippingError::InternalError(_))));
        assert_eq!(
            registry.get(seed::PENDING_SHIPMENT).await.unwrap().status,
            ShipmentStatus::Pending
        );

        assert!(registry.mark_paid(seed::PENDING_SHIPMENT, None).await.is_err());
        assert!(!registry.get(seed::PENDING_SHIPMENT).await.unwrap().is_paid());
    }

    #[tokio::test]
    async fn test_failed_charge_writes_nothing() {
        let (registry, _) = registry().await;
        let result: Result<(Shipment, ())> = registry
            .settle(seed::PENDING_SHIPMENT, None, |_| async {
                Err(ShippingError::PaymentDeclined("no".to_string()))
            })
            .await;
        assert!(matches!(result, Err(ShippingError::PaymentDeclined(_))));
        assert!(!registry.get(seed::PENDING_SHIPMENT).await.unwrap().is_paid());
        assert!(
            registry
                .events_for(seed::PENDING_SHIPMENT)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_lock_entries_released_after_use() {
        let (registry, _) = registry().await;
        let registry = Arc::new(registry);
        let shipment = registry
            .create(details(dec!(1), ServiceTier::Standard))
            .await
            .unwrap();
        let id = shipment.id;

        let mut handles = Vec::new();
        for status in [ShipmentStatus::PickedUp, ShipmentStatus::Exception] {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let _ = registry.update_status(id, status, None).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        registry.mark_paid(id, None).await.unwrap();
        let _ = registry
            .update_status(Uuid::new_v4(), ShipmentStatus::PickedUp, None)
            .await;

        assert!(registry.locks.lock().await.is_empty());
    }
}
