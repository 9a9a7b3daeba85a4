//! Domain types and the repository ports the application layer is written against.

pub mod money;
pub mod password;
pub mod payment;
pub mod ports;
pub mod session;
pub mod shipment;
pub mod tracking;
pub mod tracking_code;
pub mod user;
