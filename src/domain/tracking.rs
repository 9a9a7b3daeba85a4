use super::shipment::ShipmentStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Location recorded when a status change does not name one.
pub const DEFAULT_LOCATION: &str = "Processing Center";

/// Immutable record of a shipment status change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub id: Uuid,
    pub shipment_id: Uuid,
    pub status: ShipmentStatus,
    pub description: String,
    pub location: String,
    pub event_time: DateTime<Utc>,
}

impl TrackingEvent {
    pub fn new(
        shipment_id: Uuid,
        status: ShipmentStatus,
        description: impl Into<String>,
        location: Option<&str>,
        event_time: DateTime<Utc>,
    ) -> Self {
        let location = location
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_LOCATION);
        Self {
            id: Uuid::new_v4(),
            shipment_id,
            status,
            description: description.into(),
            location: location.to_string(),
            event_time,
        }
    }

    /// Event emitted by a registry status update.
    pub fn status_change(
        shipment_id: Uuid,
        status: ShipmentStatus,
        location: Option<&str>,
        event_time: DateTime<Utc>,
    ) -> Self {
        Self::new(
            shipment_id,
            status,
            format!("Status updated to {}", status.label()),
            location,
            event_time,
        )
    }
}

/// Sorts events newest first, the order the tracking view presents them in.
pub fn newest_first(events: &mut [TrackingEvent]) {
    events.sort_by(|a, b| b.event_time.cmp(&a.event_time));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_status_change_description_and_location() {
        let now = Utc::now();
        let event =
            TrackingEvent::status_change(Uuid::new_v4(), ShipmentStatus::OutForDelivery, None, now);
        assert_eq!(event.description, "Status updated to out for delivery");
        assert_eq!(event.location, DEFAULT_LOCATION);

        let event = TrackingEvent::status_change(
            Uuid::new_v4(),
            ShipmentStatus::InTransit,
            Some("Chicago, IL"),
            now,
        );
        assert_eq!(event.location, "Chicago, IL");

        let blank = TrackingEvent::status_change(Uuid::new_v4(), ShipmentStatus::InTransit, Some(" "), now);
        assert_eq!(blank.location, DEFAULT_LOCATION);
    }

    #[test]
    fn test_newest_first() {
        let shipment = Uuid::new_v4();
        let early = Utc.with_ymd_and_hms(2024, 12, 10, 11, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 12, 11, 8, 30, 0).unwrap();
        let mut events = vec![
            TrackingEvent::status_change(shipment, ShipmentStatus::PickedUp, None, early),
            TrackingEvent::status_change(shipment, ShipmentStatus::InTransit, None, late),
        ];
        newest_first(&mut events);
        assert_eq!(events[0].status, ShipmentStatus::InTransit);
        assert_eq!(events[1].status, ShipmentStatus::PickedUp);
    }
}
