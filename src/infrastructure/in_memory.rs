use crate::domain::payment::{Payment, PaymentMethod};
use crate::domain::ports::{
    PaymentMethodStore, PaymentStore, SessionStore, ShipmentStore, Stores, TrackingLedger,
    UserStore,
};
use crate::domain::shipment::Shipment;
use crate::domain::tracking::TrackingEvent;
use crate::domain::user::UserRecord;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Artificial delay applied before every store call, standing in for a network hop.
#[derive(Debug, Default, Clone, Copy)]
struct Latency(Duration);

impl Latency {
    async fn pause(self) {
        if !self.0.is_zero() {
            tokio::time::sleep(self.0).await;
        }
    }
}

/// A thread-safe in-memory store for users.
#[derive(Default, Clone)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<Uuid, UserRecord>>>,
    latency: Latency,
}

impl InMemoryUserStore {
    /// Creates a new, empty in-memory user store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn store(&self, record: UserRecord) -> Result<()> {
        self.latency.pause().await;
        let mut users = self.users.write().await;
        users.insert(record.user.id, record);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<UserRecord>> {
        self.latency.pause().await;
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        self.latency.pause().await;
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|r| r.user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn all(&self) -> Result<Vec<UserRecord>> {
        self.latency.pause().await;
        let users = self.users.read().await;
        Ok(users.values().cloned().collect())
    }
}

/// A thread-safe in-memory store for shipments.
///
/// Keeps a secondary index from tracking code to id so lookups from the public
/// tracking page do not scan.
#[derive(Default, Clone)]
pub struct InMemoryShipmentStore {
    inner: Arc<RwLock<ShipmentTables>>,
    latency: Latency,
}

#[derive(Default)]
struct ShipmentTables {
    by_id: HashMap<Uuid, Shipment>,
    by_code: HashMap<String, Uuid>,
}

impl InMemoryShipmentStore {
    /// Creates a new, empty in-memory shipment store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ShipmentStore for InMemoryShipmentStore {
    async fn store(&self, shipment: Shipment) -> Result<()> {
        self.latency.pause().await;
        let mut tables = self.inner.write().await;
        tables
            .by_code
            .insert(shipment.tracking_code.clone(), shipment.id);
        tables.by_id.insert(shipment.id, shipment);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Shipment>> {
        self.latency.pause().await;
        let tables = self.inner.read().await;
        Ok(tables.by_id.get(&id).cloned())
    }

    async fn find_by_tracking_code(&self, code: &str) -> Result<Option<Shipment>> {
        self.latency.pause().await;
        let tables = self.inner.read().await;
        Ok(tables
            .by_code
            .get(code)
            .and_then(|id| tables.by_id.get(id))
            .cloned())
    }

    async fn list_for_customer(&self, customer_id: Uuid) -> Result<Vec<Shipment>> {
        self.latency.pause().await;
        let tables = self.inner.read().await;
        Ok(tables
            .by_id
            .values()
            .filter(|s| s.customer_id == customer_id)
            .cloned()
            .collect())
    }

    async fn all(&self) -> Result<Vec<Shipment>> {
        self.latency.pause().await;
        let tables = self.inner.read().await;
        Ok(tables.by_id.values().cloned().collect())
    }
}

/// Append-only in-memory tracking ledger.
#[derive(Default, Clone)]
pub struct InMemoryTrackingLedger {
    events: Arc<RwLock<HashMap<Uuid, Vec<TrackingEvent>>>>,
    latency: Latency,
}

impl InMemoryTrackingLedger {
    /// Creates a new, empty in-memory tracking ledger.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TrackingLedger for InMemoryTrackingLedger {
    async fn append(&self, event: TrackingEvent) -> Result<()> {
        self.latency.pause().await;
        let mut events = self.events.write().await;
        events.entry(event.shipment_id).or_default().push(event);
        Ok(())
    }

    async fn events_for(&self, shipment_id: Uuid) -> Result<Vec<TrackingEvent>> {
        self.latency.pause().await;
        let events = self.events.read().await;
        Ok(events.get(&shipment_id).cloned().unwrap_or_default())
    }
}

/// A thread-safe in-memory store for completed payments.
#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    payments: Arc<RwLock<HashMap<String, Payment>>>,
    latency: Latency,
}

impl InMemoryPaymentStore {
    /// Creates a new, empty in-memory payment store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn store(&self, payment: Payment) -> Result<()> {
        self.latency.pause().await;
        let mut payments = self.payments.write().await;
        payments.insert(payment.id.clone(), payment);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Payment>> {
        self.latency.pause().await;
        let payments = self.payments.read().await;
        Ok(payments.get(id).cloned())
    }

    async fn list_for_customer(&self, customer_id: Uuid) -> Result<Vec<Payment>> {
        self.latency.pause().await;
        let payments = self.payments.read().await;
        Ok(payments
            .values()
            .filter(|p| p.customer_id == customer_id)
            .cloned()
            .collect())
    }

    async fn all(&self) -> Result<Vec<Payment>> {
        self.latency.pause().await;
        let payments = self.payments.read().await;
        Ok(payments.values().cloned().collect())
    }
}

/// Saved cards, kept in insertion order.
#[derive(Default, Clone)]
pub struct InMemoryPaymentMethodStore {
    methods: Arc<RwLock<Vec<PaymentMethod>>>,
    latency: Latency,
}

impl InMemoryPaymentMethodStore {
    /// Creates a new, empty in-memory card store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentMethodStore for InMemoryPaymentMethodStore {
    async fn store(&self, method: PaymentMethod) -> Result<()> {
        self.latency.pause().await;
        let mut methods = self.methods.write().await;
        match methods.iter_mut().find(|m| m.id == method.id) {
            Some(existing) => *existing = method,
            None => methods.push(method),
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<PaymentMethod>> {
        self.latency.pause().await;
        let methods = self.methods.read().await;
        Ok(methods.iter().find(|m| m.id == id).cloned())
    }

    async fn list_for_owner(&self, owner: Uuid) -> Result<Vec<PaymentMethod>> {
        self.latency.pause().await;
        let methods = self.methods.read().await;
        Ok(methods.iter().filter(|m| m.owner == owner).cloned().collect())
    }
}

/// Session slot that lives as long as the process.
#[derive(Default, Clone)]
pub struct InMemorySessionStore {
    slot: Arc<RwLock<Option<String>>>,
}

impl InMemorySessionStore {
    /// Creates a new, empty in-memory session slot.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self) -> Result<Option<String>> {
        Ok(self.slot.read().await.clone())
    }

    async fn save(&self, raw: &str) -> Result<()> {
        *self.slot.write().await = Some(raw.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.slot.write().await = None;
        Ok(())
    }
}

impl Stores {
    /// Fresh, empty in-memory repositories.
    pub fn in_memory() -> Self {
        Self::in_memory_with_latency(Duration::ZERO)
    }

    /// In-memory repositories that sleep for `latency` on every call.
    pub fn in_memory_with_latency(latency: Duration) -> Self {
        let latency = Latency(latency);
        Self {
            users: Arc::new(InMemoryUserStore {
                latency,
                ..Default::default()
            }),
            shipments: Arc::new(InMemoryShipmentStore {
                latency,
                ..Default::default()
            }),
            tracking: Arc::new(InMemoryTrackingLedger {
                latency,
                ..Default::default()
            }),
            payments: Arc::new(InMemoryPaymentStore {
                latency,
                ..Default::default()
            }),
            methods: Arc::new(InMemoryPaymentMethodStore {
                latency,
                ..Default::default()
            }),
        }
    }
}
