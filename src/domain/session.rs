use super::user::User;
use crate::error::ShippingError;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const SESSION_VERSION: u32 = 1;

/// Everything persisted about the signed-in user, as one versioned document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub version: u32,
    pub user: User,
    pub token: String,
}

impl SessionState {
    pub fn new(user: User, token: String) -> Self {
        Self {
            version: SESSION_VERSION,
            user,
            token,
        }
    }

    pub fn encode(&self) -> Result<String, ShippingError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses and validates a persisted session.
    pub fn decode(raw: &str) -> Result<Self, ShippingError> {
        let state: SessionState = serde_json::from_str(raw)
            .map_err(|e| ShippingError::CorruptSession(e.to_string()))?;
        if state.version != SESSION_VERSION {
            return Err(ShippingError::CorruptSession(format!(
                "unsupported version {}",
                state.version
            )));
        }
        if state.token.is_empty() {
            return Err(ShippingError::CorruptSession("empty token".to_string()));
        }
        Ok(state)
    }
}

/// 32 random bytes, hex encoded.
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
