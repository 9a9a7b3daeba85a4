use crate::domain::payment::{Payment, PaymentMethod};
use crate::domain::shipment::Shipment;
use crate::domain::tracking::TrackingEvent;
use crate::domain::user::CustomerSummary;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct ShipmentRow<'a> {
    tracking_code: &'a str,
    sender: &'a str,
    recipient: &'a str,
    service: &'a str,
    weight: String,
    status: &'a str,
    total_cost: String,
    paid: bool,
    estimated_delivery: String,
    created_at: String,
}

#[derive(Serialize)]
struct EventRow<'a> {
    event_time: String,
    status: &'a str,
    description: &'a str,
    location: &'a str,
}

#[derive(Serialize)]
struct PaymentRow<'a> {
    id: &'a str,
    shipment: String,
    amount: String,
    currency: &'a str,
    status: &'a str,
    method: &'a str,
    transaction_id: &'a str,
    created_at: String,
}

#[derive(Serialize)]
struct CustomerRow<'a> {
    email: &'a str,
    name: String,
    joined: String,
    total_shipments: usize,
    total_spent: String,
    last_shipment: Option<String>,
}

#[derive(Serialize)]
struct MethodRow<'a> {
    id: &'a str,
    card: String,
    expires: String,
    default: bool,
}

/// Writes list views as CSV, one header row per call.
///
/// Money is rendered with two decimals and timestamps in RFC 3339.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    /// Wraps `sink`; nothing is written until a `write_*` call.
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new().from_writer(sink),
        }
    }

    /// One row per shipment with cost, paid flag and estimate.
    pub fn write_shipments(&mut self, shipments: &[Shipment]) -> Result<()> {
        for s in shipments {
            self.writer.serialize(ShipmentRow {
                tracking_code: &s.tracking_code,
                sender: &s.sender_name,
                recipient: &s.recipient_name,
                service: s.service.as_str(),
                weight: s.weight.to_string(),
                status: s.status.as_str(),
                total_cost: s.total_cost.to_string(),
                paid: s.is_paid(),
                estimated_delivery: s.estimated_delivery.to_string(),
                created_at: s.created_at.to_rfc3339(),
            })?;
        }
        self.flush()
    }

    /// Tracking history in the order given.
    pub fn write_events(&mut self, events: &[TrackingEvent]) -> Result<()> {
        for e in events {
            self.writer.serialize(EventRow {
                event_time: e.event_time.to_rfc3339(),
                status: e.status.as_str(),
                description: &e.description,
                location: &e.location,
            })?;
        }
        self.flush()
    }

    pub fn write_payments(&mut self, payments: &[Payment]) -> Result<()> {
        for p in payments {
            self.writer.serialize(PaymentRow {
                id: &p.id,
                shipment: p.shipment_id.to_string(),
                amount: p.amount.to_string(),
                currency: &p.currency,
                status: p.status.as_str(),
                method: &p.method,
                transaction_id: &p.transaction_id,
                created_at: p.created_at.to_rfc3339(),
            })?;
        }
        self.flush()
    }

    /// Customers with their totals. `last_shipment` is empty when there is none.
    pub fn write_customers(&mut self, customers: &[CustomerSummary]) -> Result<()> {
        for c in customers {
            self.writer.serialize(CustomerRow {
                email: &c.email,
                name: format!("{} {}", c.first_name, c.last_name),
                joined: c.joined.to_rfc3339(),
                total_shipments: c.total_shipments,
                total_spent: c.total_spent.to_string(),
                last_shipment: c.last_shipment.map(|t| t.to_rfc3339()),
            })?;
        }
        self.flush()
    }

    pub fn write_methods(&mut self, methods: &[PaymentMethod]) -> Result<()> {
        for m in methods {
            self.writer.serialize(MethodRow {
                id: &m.id,
                card: m.description(),
                expires: format!("{:02}/{}", m.expiry_month, m.expiry_year),
                default: m.is_default,
            })?;
        }
        self.flush()
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
