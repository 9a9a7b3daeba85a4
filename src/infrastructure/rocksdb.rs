use crate::domain::payment::{Payment, PaymentMethod};
use crate::domain::ports::{
    PaymentMethodStore, PaymentStore, ShipmentStore, Stores, TrackingLedger, UserStore,
};
use crate::domain::shipment::Shipment;
use crate::domain::tracking::TrackingEvent;
use crate::domain::user::UserRecord;
use crate::error::{Result, ShippingError};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Column Family for user records.
pub const CF_USERS: &str = "users";
/// Column Family for shipments, keyed by shipment id.
pub const CF_SHIPMENTS: &str = "shipments";
/// Column Family for tracking events, keyed by shipment id then event id.
pub const CF_TRACKING: &str = "tracking";
/// Column Family for payments, keyed by payment id.
pub const CF_PAYMENTS: &str = "payments";
/// Column Family for saved payment methods.
pub const CF_PAYMENT_METHODS: &str = "payment_methods";

const COLUMN_FAMILIES: [&str; 5] = [
    CF_USERS,
    CF_SHIPMENTS,
    CF_TRACKING,
    CF_PAYMENTS,
    CF_PAYMENT_METHODS,
];

/// A persistent store implementation using RocksDB.
///
/// Every entity lives in its own Column Family as a JSON value. Secondary lookups
/// (email, tracking code, owner) scan the family, which is fine at portal scale.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating any
    /// missing column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()));

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Exposes this database through every repository port.
    pub fn stores(self) -> Stores {
        let shared = Arc::new(self);
        Stores {
            users: shared.clone(),
            shipments: shared.clone(),
            tracking: shared.clone(),
            payments: shared.clone(),
            methods: shared,
        }
    }

    fn cf(&self, name: &'static str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            ShippingError::InternalError(Box::new(std::io::Error::other(format!(
                "{name} column family not found"
            ))))
        })
    }

    fn put_json<T: Serialize>(&self, family: &'static str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(family)?;
        let bytes = serde_json::to_vec(value)?;
        self.db.put_cf(cf, key, bytes)?;
        Ok(())
    }

    fn get_json<T: DeserializeOwned>(&self, family: &'static str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(family)?;
        match self.db.get_pinned_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Decodes every value whose key starts with `prefix` (all values for an empty prefix).
    fn scan_json<T: DeserializeOwned>(&self, family: &'static str, prefix: &[u8]) -> Result<Vec<T>> {
        let cf = self.cf(family)?;
        let mut values = Vec::new();
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward));

        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            values.push(serde_json::from_slice(&value)?);
        }

        Ok(values)
    }
}

fn tracking_key(event: &TrackingEvent) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(event.shipment_id.as_bytes());
    key.extend_from_slice(event.id.as_bytes());
    key
}

#[async_trait]
impl UserStore for RocksDBStore {
    async fn store(&self, record: UserRecord) -> Result<()> {
        self.put_json(CF_USERS, record.user.id.as_bytes(), &record)
    }

    async fn get(&self, id: Uuid) -> Result<Option<UserRecord>> {
        self.get_json(CF_USERS, id.as_bytes())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let users: Vec<UserRecord> = self.scan_json(CF_USERS, &[])?;
        Ok(users
            .into_iter()
            .find(|r| r.user.email.eq_ignore_ascii_case(email)))
    }

    async fn all(&self) -> Result<Vec<UserRecord>> {
        self.scan_json(CF_USERS, &[])
    }
}

#[async_trait]
impl ShipmentStore for RocksDBStore {
    async fn store(&self, shipment: Shipment) -> Result<()> {
        self.put_json(CF_SHIPMENTS, shipment.id.as_bytes(), &shipment)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Shipment>> {
        self.get_json(CF_SHIPMENTS, id.as_bytes())
    }

    async fn find_by_tracking_code(&self, code: &str) -> Result<Option<Shipment>> {
        let shipments: Vec<Shipment> = self.scan_json(CF_SHIPMENTS, &[])?;
        Ok(shipments.into_iter().find(|s| s.tracking_code == code))
    }

    async fn list_for_customer(&self, customer_id: Uuid) -> Result<Vec<Shipment>> {
        let shipments: Vec<Shipment> = self.scan_json(CF_SHIPMENTS, &[])?;
        Ok(shipments
            .into_iter()
            .filter(|s| s.customer_id == customer_id)
            .collect())
    }

    async fn all(&self) -> Result<Vec<Shipment>> {
        self.scan_json(CF_SHIPMENTS, &[])
    }
}

#[async_trait]
impl TrackingLedger for RocksDBStore {
    async fn append(&self, event: TrackingEvent) -> Result<()> {
        self.put_json(CF_TRACKING, &tracking_key(&event), &event)
    }

    async fn events_for(&self, shipment_id: Uuid) -> Result<Vec<TrackingEvent>> {
        self.scan_json(CF_TRACKING, shipment_id.as_bytes())
    }
}

#[async_trait]
impl PaymentStore for RocksDBStore {
    async fn store(&self, payment: Payment) -> Result<()> {
        self.put_json(CF_PAYMENTS, payment.id.as_bytes(), &payment)
    }

    async fn get(&self, id: &str) -> Result<Option<Payment>> {
        self.get_json(CF_PAYMENTS, id.as_bytes())
    }

    async fn list_for_customer(&self, customer_id: Uuid) -> Result<Vec<Payment>> {
        let payments: Vec<Payment> = self.scan_json(CF_PAYMENTS, &[])?;
        Ok(payments
            .into_iter()
            .filter(|p| p.customer_id == customer_id)
            .collect())
    }

    async fn all(&self) -> Result<Vec<Payment>> {
        self.scan_json(CF_PAYMENTS, &[])
    }
}

#[async_trait]
impl PaymentMethodStore for RocksDBStore {
    async fn store(&self, method: PaymentMethod) -> Result<()> {
        self.put_json(CF_PAYMENT_METHODS, method.id.as_bytes(), &method)
    }

    async fn get(&self, id: &str) -> Result<Option<PaymentMethod>> {
        self.get_json(CF_PAYMENT_METHODS, id.as_bytes())
    }

    async fn list_for_owner(&self, owner: Uuid) -> Result<Vec<PaymentMethod>> {
        let methods: Vec<PaymentMethod> = self.scan_json(CF_PAYMENT_METHODS, &[])?;
        Ok(methods.into_iter().filter(|m| m.owner == owner).collect())
    }
}
