use rust_decimal_macros::dec;
use shipdesk::application::Portal;
use shipdesk::application::payments::SimulatedGateway;
use shipdesk::config::PortalConfig;
use shipdesk::domain::ports::{SessionStoreRef, ShipmentStoreRef, Stores, TrackingLedgerRef};
use shipdesk::domain::shipment::{NewShipment, ServiceTier, Shipment, ShipmentStatus};
use shipdesk::domain::tracking::TrackingEvent;
use shipdesk::infrastructure::in_memory::{
    InMemorySessionStore, InMemoryShipmentStore, InMemoryTrackingLedger,
};
use shipdesk::infrastructure::seed::{self, CUSTOMER_EMAIL, CUSTOMER_PASSWORD, DEFAULT_METHOD_ID};
use std::sync::Arc;
use std::time::Duration;

fn parcel(customer_id: uuid::Uuid) -> NewShipment {
    NewShipment {
        customer_id,
        sender_name: "John Doe".to_string(),
        sender_address: "123 Business St, New York, NY 10001".to_string(),
        recipient_name: "Dana Green".to_string(),
        recipient_address: "77 Lake Shore Dr, Chicago, IL 60611".to_string(),
        weight: dec!(1.2),
        service: ServiceTier::Overnight,
    }
}

#[tokio::test]
async fn test_stores_as_trait_objects() {
    let shipment_store: ShipmentStoreRef = Arc::new(InMemoryShipmentStore::new());
    let ledger: TrackingLedgerRef = Arc::new(InMemoryTrackingLedger::new());

    let shipment = Shipment::new(
        parcel(uuid::Uuid::new_v4()),
        "SA000000018".to_string(),
        chrono::Utc::now(),
    );
    let id = shipment.id;

    // Verify Send + Sync by spawning tasks
    let store_handle = tokio::spawn(async move {
        shipment_store.store(shipment).await.unwrap();
        shipment_store
            .find_by_tracking_code("SA000000018")
            .await
            .unwrap()
            .unwrap()
    });

    let ledger_handle = tokio::spawn(async move {
        let now = chrono::Utc::now();
        ledger
            .append(TrackingEvent::status_change(id, ShipmentStatus::PickedUp, None, now))
            .await
            .unwrap();
        ledger.events_for(id).await.unwrap()
    });

    let retrieved = store_handle.await.unwrap();
    assert_eq!(retrieved.id, id);

    let events = ledger_handle.await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].location, "Processing Center");
}

#[tokio::test]
async fn test_customer_journey_through_portal() {
    let stores = Stores::in_memory_with_latency(Duration::from_millis(1));
    seed::seed_if_empty(&stores).await.unwrap();
    let sessions: SessionStoreRef = Arc::new(InMemorySessionStore::new());
    let portal = Portal::with_gateway(
        stores,
        sessions,
        Arc::new(SimulatedGateway::new(1.0)),
        &PortalConfig::default(),
    )
    .unwrap();

    let session = portal
        .identity
        .authenticate(CUSTOMER_EMAIL, CUSTOMER_PASSWORD)
        .await
        .unwrap();
    let receipt = portal
        .checkout
        .checkout(parcel(session.user.id), DEFAULT_METHOD_ID)
        .await
        .unwrap();
    let created = receipt.shipment;
    assert_eq!(created.total_cost.to_string(), "17.40");

    let report = portal
        .registry
        .track(&created.tracking_code)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.events.len(), 1);

    for status in [
        ShipmentStatus::PickedUp,
        ShipmentStatus::InTransit,
        ShipmentStatus::OutForDelivery,
        ShipmentStatus::Delivered,
    ] {
        portal
            .registry
            .update_status(created.id, status, Some("Chicago, IL"))
            .await
            .unwrap();
    }

    let report = portal
        .registry
        .track(&created.tracking_code)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.shipment.status, ShipmentStatus::Delivered);
    assert!(report.shipment.actual_delivery.is_some());
    assert_eq!(report.shipment.tracking_code, created.tracking_code);
    assert_eq!(report.events.len(), 5);
    assert_eq!(report.events[0].status, ShipmentStatus::Delivered);

    let stats = portal.query.admin_stats().await.unwrap();
    assert_eq!(stats.total_shipments, 4);
    assert_eq!(stats.delivered, 2);
}
