use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShippingError {
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("An account already exists for {0}")]
    EmailTaken(String),
    #[error("This action requires the {0} role")]
    Forbidden(String),
    #[error("Not signed in")]
    NotSignedIn,
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("Cannot move shipment from {from} to {to}")]
    InvalidTransition { from: String, to: String },
    #[error("Invalid card number")]
    InvalidCardNumber,
    #[error("{0}")]
    PaymentDeclined(String),
    #[error("Tracking code space exhausted")]
    TrackingCodeExhausted,
    #[error("Stored session is unreadable: {0}")]
    CorruptSession(String),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDbError(#[from] rocksdb::Error),
}

impl ShippingError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<serde_json::Error> for ShippingError {
    fn from(e: serde_json::Error) -> Self {
        Self::InternalError(Box::new(e))
    }
}

pub type Result<T> = std::result::Result<T, ShippingError>;
