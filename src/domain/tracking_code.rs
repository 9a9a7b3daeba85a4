//! Checksum-bearing sequential tracking codes.
//!
//! A code is a two-letter prefix, an eight digit sequence number and one Luhn check
//! digit, e.g. `SA000000018`. The registry asks for the next candidate and checks it
//! against its store before assigning it.

use crate::error::ShippingError;
use std::sync::atomic::{AtomicU64, Ordering};

pub const DEFAULT_PREFIX: &str = "SA";
const SEQUENCE_DIGITS: usize = 8;
const MAX_SEQUENCE: u64 = 99_999_999;

/// Luhn check digit for a string of ASCII digits.
pub fn luhn_check_digit(payload: &str) -> u8 {
    let sum: u32 = payload
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let d = u32::from(b - b'0');
            if i % 2 == 0 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    ((10 - (sum % 10)) % 10) as u8
}

#[derive(Debug)]
pub struct TrackingCodeGenerator {
    prefix: String,
    next: AtomicU64,
}

impl TrackingCodeGenerator {
    pub fn new(prefix: impl Into<String>, start: u64) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(start.max(1)),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Next code in sequence. Callers are responsible for the collision check.
    pub fn next_code(&self) -> Result<String, ShippingError> {
        let seq = self.next.fetch_add(1, Ordering::Relaxed);
        if seq > MAX_SEQUENCE {
            return Err(ShippingError::TrackingCodeExhausted);
        }
        let payload = format!("{seq:0width$}", width = SEQUENCE_DIGITS);
        let check = luhn_check_digit(&payload);
        Ok(format!("{}{payload}{check}", self.prefix))
    }

    /// True if `code` carries this generator's prefix and a valid check digit.
    pub fn is_well_formed(&self, code: &str) -> bool {
        let Some(digits) = code.strip_prefix(self.prefix.as_str()) else {
            return false;
        };
        if digits.len() != SEQUENCE_DIGITS + 1 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        let (payload, check) = digits.split_at(SEQUENCE_DIGITS);
        check.as_bytes()[0] - b'0' == luhn_check_digit(payload)
    }
}

impl Default for TrackingCodeGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX, 1)
    }
}
