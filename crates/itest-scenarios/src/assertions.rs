//! Assertion helpers returning [`HarnessError::Assertion`]

use std::fmt::Debug;
use std::time::Duration;

use chrono::{DateTime, Utc};
use itest_client::{HarnessError, Result};

/// `field` must equal `expected`
pub fn ensure_eq<T: PartialEq + Debug>(field: &str, expected: T, actual: T) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(HarnessError::assertion(format!(
            "{}: expected {:?}, got {:?}",
            field, expected, actual
        )))
    }
}

pub fn ensure(condition: bool, message: impl Into<String>) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(HarnessError::assertion(message))
    }
}

/// `field` must be present and not blank
pub fn ensure_non_empty(field: &str, value: Option<&str>) -> Result<()> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(HarnessError::assertion(format!(
            "{}: expected a non-empty value, got {:?}",
            field, value
        ))),
    }
}

/// `timestamp` must be no older than `within`
pub fn ensure_recent(field: &str, timestamp: DateTime<Utc>, within: Duration) -> Result<()> {
    let age = Utc::now() - timestamp;
    let limit = chrono::Duration::from_std(within)
        .map_err(|e| HarnessError::assertion(format!("{}: invalid window: {}", field, e)))?;

    if age <= limit {
        Ok(())
    } else {
        Err(HarnessError::assertion(format!(
            "{}: {} is {} ms old, limit {} ms",
            field,
            timestamp.to_rfc3339(),
            age.num_milliseconds(),
            limit.num_milliseconds()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_eq() {
        assert!(ensure_eq("Priority", 10, 10).is_ok());

        let err = ensure_eq("Priority", 10, 30).unwrap_err();
        assert_eq!(err.to_string(), "assertion failed: Priority: expected 10, got 30");
        assert_eq!(err.kind(), "assertion");
    }

    #[test]
    fn test_ensure_non_empty() {
        assert!(ensure_non_empty("Id", Some("abc")).is_ok());
        assert!(ensure_non_empty("Id", Some("  ")).is_err());
        assert!(ensure_non_empty("Id", None).is_err());
    }

    #[test]
    fn test_ensure_recent() {
        let now = Utc::now();
        assert!(ensure_recent("Created", now, Duration::from_secs(3)).is_ok());

        let old = now - chrono::Duration::seconds(10);
        assert!(ensure_recent("Created", old, Duration::from_secs(3)).is_err());
    }
}
