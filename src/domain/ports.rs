use super::payment::{Payment, PaymentMethod};
use super::shipment::Shipment;
use super::tracking::TrackingEvent;
use super::user::UserRecord;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn store(&self, record: UserRecord) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<UserRecord>>;
    /// Lookup by already-normalized email.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>>;
    async fn all(&self) -> Result<Vec<UserRecord>>;
}

#[async_trait]
pub trait ShipmentStore: Send + Sync {
    async fn store(&self, shipment: Shipment) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<Shipment>>;
    async fn find_by_tracking_code(&self, code: &str) -> Result<Option<Shipment>>;
    async fn list_for_customer(&self, customer_id: Uuid) -> Result<Vec<Shipment>>;
    async fn all(&self) -> Result<Vec<Shipment>>;
}

/// Append-only event log keyed by shipment.
#[async_trait]
pub trait TrackingLedger: Send + Sync {
    async fn append(&self, event: TrackingEvent) -> Result<()>;
    /// Events in no particular order.
    async fn events_for(&self, shipment_id: Uuid) -> Result<Vec<TrackingEvent>>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn store(&self, payment: Payment) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<Payment>>;
    async fn list_for_customer(&self, customer_id: Uuid) -> Result<Vec<Payment>>;
    async fn all(&self) -> Result<Vec<Payment>>;
}

#[async_trait]
pub trait PaymentMethodStore: Send + Sync {
    async fn store(&self, method: PaymentMethod) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<PaymentMethod>>;
    async fn list_for_owner(&self, owner: Uuid) -> Result<Vec<PaymentMethod>>;
}

/// Scoped storage for the single persisted session document.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> Result<Option<String>>;
    async fn save(&self, raw: &str) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

/// Shared handles to each port.
pub type UserStoreRef = Arc<dyn UserStore>;
pub type ShipmentStoreRef = Arc<dyn ShipmentStore>;
pub type TrackingLedgerRef = Arc<dyn TrackingLedger>;
pub type PaymentStoreRef = Arc<dyn PaymentStore>;
pub type PaymentMethodStoreRef = Arc<dyn PaymentMethodStore>;
pub type SessionStoreRef = Arc<dyn SessionStore>;

/// One handle per repository, shared by the application services.
#[derive(Clone)]
pub struct Stores {
    pub users: UserStoreRef,
    pub shipments: ShipmentStoreRef,
    pub tracking: TrackingLedgerRef,
    pub payments: PaymentStoreRef,
    pub methods: PaymentMethodStoreRef,
}
