//! Demo data the portal ships with: two sign-in accounts, three customers, three
//! shipments with their tracking history, saved cards and past payments.

use crate::domain::money::Money;
use crate::domain::password::hash_password;
use crate::domain::payment::{CardBrand, Payment, PaymentMethod, PaymentStatus};
use crate::domain::ports::Stores;
use crate::domain::shipment::{ServiceTier, Shipment, ShipmentStatus};
use crate::domain::tracking::TrackingEvent;
use crate::domain::user::{Role, User, UserRecord};
use crate::error::{Result, ShippingError};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

/// Fixed ids so seeded rows are identical across runs.
pub const ADMIN_ID: Uuid = Uuid::from_u128(0x550e8400_e29b_41d4_a716_446655440000);
pub const JOHN_ID: Uuid = Uuid::from_u128(0x550e8400_e29b_41d4_a716_446655440001);
pub const JANE_ID: Uuid = Uuid::from_u128(0x550e8400_e29b_41d4_a716_446655440006);
pub const BOB_ID: Uuid = Uuid::from_u128(0x550e8400_e29b_41d4_a716_446655440007);

pub const IN_TRANSIT_SHIPMENT: Uuid = Uuid::from_u128(0x550e8400_e29b_41d4_a716_446655440003);
pub const DELIVERED_SHIPMENT: Uuid = Uuid::from_u128(0x550e8400_e29b_41d4_a716_446655440004);
pub const PENDING_SHIPMENT: Uuid = Uuid::from_u128(0x550e8400_e29b_41d4_a716_446655440005);

/// Sign-in credentials for the two demo accounts.
pub const ADMIN_EMAIL: &str = "admin@shippingagency.com";
pub const ADMIN_PASSWORD: &str = "admin123";
pub const CUSTOMER_EMAIL: &str = "customer@example.com";
pub const CUSTOMER_PASSWORD: &str = "customer123";

/// John Doe's default Visa card.
pub const DEFAULT_METHOD_ID: &str = "pm_1234567890";

fn at(rfc3339: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(rfc3339)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| ShippingError::InternalError(Box::new(e)))
}

fn day(iso: &str) -> Result<NaiveDate> {
    iso.parse()
        .map_err(|e: chrono::ParseError| ShippingError::InternalError(Box::new(e)))
}

fn user(
    id: Uuid,
    email: &str,
    first_name: &str,
    last_name: &str,
    role: Role,
    created_at: &str,
    password: Option<&str>,
) -> Result<UserRecord> {
    Ok(UserRecord {
        user: User {
            id,
            email: email.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            role,
            created_at: at(created_at)?,
        },
        password_hash: password.map(hash_password).transpose()?,
    })
}

/// Admin, John Doe and two password-less customers.
pub fn users() -> Result<Vec<UserRecord>> {
    Ok(vec![
        user(
            ADMIN_ID,
            ADMIN_EMAIL,
            "Admin",
            "User",
            Role::Admin,
            "2024-10-01T09:00:00Z",
            Some(ADMIN_PASSWORD),
        )?,
        user(
            JOHN_ID,
            CUSTOMER_EMAIL,
            "John",
            "Doe",
            Role::Customer,
            "2024-11-15T10:00:00Z",
            Some(CUSTOMER_PASSWORD),
        )?,
        user(
            JANE_ID,
            "jane.smith@company.com",
            "Jane",
            "Smith",
            Role::Customer,
            "2024-10-20T14:30:00Z",
            None,
        )?,
        user(
            BOB_ID,
            "bob.wilson@startup.io",
            "Bob",
            "Wilson",
            Role::Customer,
            "2024-12-01T08:45:00Z",
            None,
        )?,
    ])
}

#[allow(clippy::too_many_arguments)]
fn shipment(
    id: Uuid,
    tracking_code: &str,
    recipient_name: &str,
    recipient_address: &str,
    weight: Decimal,
    service: ServiceTier,
    status: ShipmentStatus,
    estimated_delivery: &str,
    cost: Decimal,
    created_at: &str,
) -> Result<Shipment> {
    let created_at = at(created_at)?;
    Ok(Shipment {
        id,
        tracking_code: tracking_code.to_string(),
        customer_id: JOHN_ID,
        sender_name: "John Doe".to_string(),
        sender_address: "123 Business St, New York, NY 10001".to_string(),
        recipient_name: recipient_name.to_string(),
        recipient_address: recipient_address.to_string(),
        weight,
        service,
        status,
        estimated_delivery: day(estimated_delivery)?,
        actual_delivery: None,
        shipping_cost: Money(cost),
        total_cost: Money(cost),
        created_at,
        updated_at: None,
        paid_at: None,
    })
}

/// One shipment per lifecycle stage, all owned by John Doe.
pub fn shipments() -> Result<Vec<Shipment>> {
    let mut in_transit = shipment(
        IN_TRANSIT_SHIPMENT,
        "SA123456789",
        "Jane Smith",
        "456 Residential Ave, Los Angeles, CA 90210",
        dec!(5.5),
        ServiceTier::Express,
        ShipmentStatus::InTransit,
        "2024-12-15",
        dec!(25.99),
        "2024-12-10T10:00:00Z",
    )?;
    in_transit.paid_at = Some(at("2024-12-10T10:01:00Z")?);

    let mut delivered = shipment(
        DELIVERED_SHIPMENT,
        "SA987654321",
        "Bob Johnson",
        "789 Corporate Blvd, Chicago, IL 60601",
        dec!(2.3),
        ServiceTier::Standard,
        ShipmentStatus::Delivered,
        "2024-12-08",
        dec!(12.5),
        "2024-12-05T09:15:00Z",
    )?;
    delivered.paid_at = Some(at("2024-12-05T09:16:00Z")?);
    delivered.actual_delivery = Some(at("2024-12-08T14:30:00Z")?);

    let pending = shipment(
        PENDING_SHIPMENT,
        "SA456789123",
        "Alice Brown",
        "321 Main St, Miami, FL 33101",
        dec!(8.7),
        ServiceTier::Overnight,
        ShipmentStatus::Pending,
        "2024-12-12",
        dec!(45.0),
        "2024-12-11T16:45:00Z",
    )?;

    Ok(vec![in_transit, delivered, pending])
}

fn event(
    n: u128,
    shipment_id: Uuid,
    status: ShipmentStatus,
    description: &str,
    location: &str,
    event_time: &str,
) -> Result<TrackingEvent> {
    Ok(TrackingEvent {
        id: Uuid::from_u128(n),
        shipment_id,
        status,
        description: description.to_string(),
        location: location.to_string(),
        event_time: at(event_time)?,
    })
}

pub fn tracking_events() -> Result<Vec<TrackingEvent>> {
    Ok(vec![
        event(
            1,
            IN_TRANSIT_SHIPMENT,
            ShipmentStatus::PickedUp,
            "Package picked up from sender",
            "New York, NY",
            "2024-12-10T11:00:00Z",
        )?,
        event(
            2,
            IN_TRANSIT_SHIPMENT,
            ShipmentStatus::InTransit,
            "Package in transit to destination",
            "Chicago, IL",
            "2024-12-11T08:30:00Z",
        )?,
        event(
            3,
            DELIVERED_SHIPMENT,
            ShipmentStatus::PickedUp,
            "Package picked up from sender",
            "New York, NY",
            "2024-12-05T10:00:00Z",
        )?,
        event(
            4,
            DELIVERED_SHIPMENT,
            ShipmentStatus::Delivered,
            "Package delivered successfully",
            "Chicago, IL",
            "2024-12-08T14:30:00Z",
        )?,
    ])
}

/// A default Visa and a spare Mastercard.
pub fn payment_methods() -> Vec<PaymentMethod> {
    vec![
        PaymentMethod {
            id: DEFAULT_METHOD_ID.to_string(),
            owner: JOHN_ID,
            brand: CardBrand::Visa,
            last4: "4242".to_string(),
            expiry_month: 12,
            expiry_year: 2025,
            is_default: true,
        },
        PaymentMethod {
            id: "pm_0987654321".to_string(),
            owner: JOHN_ID,
            brand: CardBrand::Mastercard,
            last4: "0005".to_string(),
            expiry_month: 8,
            expiry_year: 2026,
            is_default: false,
        },
    ]
}

/// Completed payments for the two shipments already on the move.
pub fn payments() -> Result<Vec<Payment>> {
    let payment = |id: &str, shipment_id, amount, txn: &str, created: &str, updated: &str| {
        Ok::<_, ShippingError>(Payment {
            id: id.to_string(),
            shipment_id,
            customer_id: JOHN_ID,
            amount: Money(amount),
            currency: "USD".to_string(),
            status: PaymentStatus::Completed,
            method: "Visa ending in 4242".to_string(),
            transaction_id: txn.to_string(),
            created_at: at(created)?,
            updated_at: at(updated)?,
        })
    };
    Ok(vec![
        payment(
            "pay_1234567890",
            IN_TRANSIT_SHIPMENT,
            dec!(25.99),
            "txn_1234567890",
            "2024-12-10T10:00:00Z",
            "2024-12-10T10:01:00Z",
        )?,
        payment(
            "pay_0987654321",
            DELIVERED_SHIPMENT,
            dec!(12.5),
            "txn_0987654321",
            "2024-12-05T09:15:00Z",
            "2024-12-05T09:16:00Z",
        )?,
    ])
}

/// Loads the demo data unless the user table already has rows.
///
/// Returns whether anything was written.
pub async fn seed_if_empty(stores: &Stores) -> Result<bool> {
    if !stores.users.all().await?.is_empty() {
        return Ok(false);
    }

    for record in users()? {
        stores.users.store(record).await?;
    }
    for shipment in shipments()? {
        stores.shipments.store(shipment).await?;
    }
    for event in tracking_events()? {
        stores.tracking.append(event).await?;
    }
    for method in payment_methods() {
        stores.methods.store(method).await?;
    }
    for payment in payments()? {
        stores.payments.store(payment).await?;
    }

    tracing::info!("seeded demo portal data");
    Ok(true)
}
