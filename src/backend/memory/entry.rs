//! Cache Entry Module
//!
//! Defines the structure for individual primary-store entries with TTL
//! support.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::value::CacheValue;

// == Cache Entry ==
/// A single primary-store entry with value and expiry metadata.
#[derive(Debug, Clone)]
pub struct Entry {
    /// The stored value
    pub value: CacheValue,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl Entry {
    /// Creates a new entry expiring `ttl` after now, or never for `None`.
    pub fn new(value: CacheValue, ttl: Option<Duration>) -> Self {
        let now = current_timestamp_ms();
        let expires_at = ttl.map(|d| now + d.as_millis() as u64);

        Self {
            value,
            created_at: now,
            expires_at,
        }
    }

    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is expired once the current time is
    /// greater than or equal to its expiration instant.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => current_timestamp_ms() >= expires,
            None => false,
        }
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}

/// Converts an optional TTL into an absolute expiration instant.
pub fn deadline_ms(ttl: Option<Duration>) -> Option<u64> {
    ttl.map(|d| current_timestamp_ms() + d.as_millis() as u64)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_entry_creation_no_ttl() {
        let entry = Entry::new(CacheValue::from("test_value"), None);

        assert_eq!(entry.value, CacheValue::from("test_value"));
        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_creation_with_ttl() {
        let entry = Entry::new(CacheValue::from(1i64), Some(Duration::from_secs(60)));

        assert!(entry.expires_at.is_some());
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_expiration() {
        let entry = Entry::new(CacheValue::from("v"), Some(Duration::from_millis(50)));

        assert!(!entry.is_expired());
        sleep(Duration::from_millis(80));
        assert!(entry.is_expired());
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = current_timestamp_ms();
        let entry = Entry {
            value: CacheValue::from("test"),
            created_at: now,
            expires_at: Some(now), // Expires exactly at creation time
        };

        assert!(entry.is_expired(), "Entry should be expired at boundary");
    }

    #[test]
    fn test_deadline_ms() {
        assert!(deadline_ms(None).is_none());
        let deadline = deadline_ms(Some(Duration::from_secs(10))).unwrap();
        assert!(deadline > current_timestamp_ms());
    }
}
