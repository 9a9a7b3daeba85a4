//! Read-only views behind the admin dashboard and the customer lists.
//!
//! The filter functions are pure: they never reorder their input, and an empty or
//! whitespace-only query lets every row through.

use crate::domain::money::Money;
use crate::domain::payment::{Payment, PaymentStatus};
use crate::domain::ports::Stores;
use crate::domain::shipment::{Shipment, ShipmentStatus};
use crate::domain::user::{CustomerSummary, Role};
use crate::error::Result;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// Whose shipments a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Customer(Uuid),
    All,
}

/// Headline numbers for the admin dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminStats {
    pub total_shipments: usize,
    pub total_revenue: Money,
    pub total_customers: usize,
    pub pending: usize,
    pub in_transit: usize,
    pub delivered: usize,
}

/// Lowercased query, or `None` when it is blank. Surrounding whitespace is kept and
/// takes part in the match.
fn needle(query: &str) -> Option<String> {
    (!query.trim().is_empty()).then(|| query.to_lowercase())
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// Matches tracking code, sender name and recipient name.
pub fn search_shipments<'a>(
    shipments: &'a [Shipment],
    query: &str,
    status: Option<ShipmentStatus>,
) -> Vec<&'a Shipment> {
    let needle = needle(query);
    shipments
        .iter()
        .filter(|s| status.is_none_or(|status| s.status == status))
        .filter(|s| {
            needle.as_deref().is_none_or(|n| {
                contains(&s.tracking_code, n)
                    || contains(&s.sender_name, n)
                    || contains(&s.recipient_name, n)
            })
        })
        .collect()
}

/// Matches email, first name and last name.
pub fn search_customers<'a>(
    customers: &'a [CustomerSummary],
    query: &str,
) -> Vec<&'a CustomerSummary> {
    let Some(needle) = needle(query) else {
        return customers.iter().collect();
    };
    customers
        .iter()
        .filter(|c| {
            contains(&c.email, &needle)
                || contains(&c.first_name, &needle)
                || contains(&c.last_name, &needle)
        })
        .collect()
}

/// Keeps payments of one status, or all of them for `None`.
pub fn filter_payments(payments: &[Payment], status: Option<PaymentStatus>) -> Vec<&Payment> {
    payments
        .iter()
        .filter(|p| status.is_none_or(|status| p.status == status))
        .collect()
}

/// Facade over the stores for listing and dashboard figures.
pub struct QueryService {
    stores: Stores,
}

impl QueryService {
    /// Creates a facade reading from `stores`.
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Shipments in scope, newest first, narrowed by text and status.
    pub async fn shipments(
        &self,
        query: &str,
        status: Option<ShipmentStatus>,
        scope: Scope,
    ) -> Result<Vec<Shipment>> {
        let mut shipments = match scope {
            Scope::Customer(id) => self.stores.shipments.list_for_customer(id).await?,
            Scope::All => self.stores.shipments.all().await?,
        };
        shipments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(search_shipments(&shipments, query, status)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Customer accounts in join order with their shipment and spend totals.
    pub async fn customers(&self, query: &str) -> Result<Vec<CustomerSummary>> {
        let shipments = self.stores.shipments.all().await?;
        let payments = self.stores.payments.all().await?;

        let mut spent: HashMap<Uuid, Money> = HashMap::new();
        for payment in payments.iter().filter(|p| p.status == PaymentStatus::Completed) {
            *spent.entry(payment.customer_id).or_default() += payment.amount;
        }

        let mut customers: Vec<CustomerSummary> = self
            .stores
            .users
            .all()
            .await?
            .into_iter()
            .map(|record| record.user)
            .filter(|user| user.role == Role::Customer)
            .map(|user| {
                let own: Vec<&Shipment> =
                    shipments.iter().filter(|s| s.customer_id == user.id).collect();
                CustomerSummary {
                    id: user.id,
                    total_shipments: own.len(),
                    total_spent: spent.get(&user.id).copied().unwrap_or_default(),
                    last_shipment: own.iter().map(|s| s.created_at).max(),
                    email: user.email,
                    first_name: user.first_name,
                    last_name: user.last_name,
                    joined: user.created_at,
                }
            })
            .collect();
        customers.sort_by(|a, b| a.joined.cmp(&b.joined));

        Ok(search_customers(&customers, query)
            .into_iter()
            .cloned()
            .collect())
    }

    /// All payments, newest first, optionally of one status.
    pub async fn payments(&self, status: Option<PaymentStatus>) -> Result<Vec<Payment>> {
        let mut payments = self.stores.payments.all().await?;
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(filter_payments(&payments, status)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Dashboard figures. Revenue counts completed payments only.
    pub async fn admin_stats(&self) -> Result<AdminStats> {
        let shipments = self.stores.shipments.all().await?;
        let payments = self.stores.payments.all().await?;
        let users = self.stores.users.all().await?;

        let count = |status: ShipmentStatus| {
            shipments.iter().filter(|s| s.status == status).count()
        };
        Ok(AdminStats {
            total_shipments: shipments.len(),
            total_revenue: payments
                .iter()
                .filter(|p| p.status == PaymentStatus::Completed)
                .map(|p| p.amount)
                .sum(),
            total_customers: users
                .iter()
                .filter(|r| r.user.role == Role::Customer)
                .count(),
            pending: count(ShipmentStatus::Pending),
            in_transit: count(ShipmentStatus::InTransit),
            delivered: count(ShipmentStatus::Delivered),
        })
    }
}
