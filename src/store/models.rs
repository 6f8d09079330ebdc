// apikeys — Key record models
//
// SECURITY: The `value` field is private and wiped from memory on drop.
// It is never included in Debug output, log messages, or serialized summaries.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::StoreError;

/// Number of leading characters kept visible by `ApiKey::masked_value()`.
const MASK_VISIBLE_CHARS: usize = 4;

/// Secrets shorter than this are masked completely.
const MASK_MIN_LEN: usize = 12;

/// Which column of a key record an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyField {
    Name,
    Value,
}

impl fmt::Display for KeyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyField::Name => f.write_str("name"),
            KeyField::Value => f.write_str("value"),
        }
    }
}

/// A stored API key record.
/// The secret is private — access only via `value()`.
#[derive(Clone)]
pub struct ApiKey {
    pub id: i64,
    pub name: String,
    value: Zeroizing<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl ApiKey {
    pub fn new(
        id: i64,
        name: String,
        value: String,
        active: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            value: Zeroizing::new(value),
            active,
            created_at,
        }
    }

    /// Access the raw secret value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The first few characters of the secret followed by an ellipsis.
    /// Short secrets show nothing.
    pub fn masked_value(&self) -> String {
        if self.value.chars().count() < MASK_MIN_LEN {
            return "****".to_string();
        }
        let visible: String = self.value.chars().take(MASK_VISIBLE_CHARS).collect();
        format!("{}…", visible)
    }

    /// A serializable view of this record that never carries the secret.
    pub fn summary(&self) -> ApiKeySummary {
        ApiKeySummary {
            id: self.id,
            name: self.name.clone(),
            masked_value: self.masked_value(),
            active: self.active,
            created_at: self.created_at,
        }
    }
}

/// Custom Debug implementation that NEVER reveals the secret.
impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .field("active", &self.active)
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.id, self.name)?;
        if self.active {
            f.write_str(" (active)")?;
        }
        Ok(())
    }
}

/// Listing view of a key, used for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeySummary {
    pub id: i64,
    pub name: String,
    pub masked_value: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for creating or rewriting a key.
pub struct NewApiKey {
    pub name: String,
    pub value: Zeroizing<String>,
}

impl NewApiKey {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Zeroizing::new(value.into()),
        }
    }

    /// Reject blank names or values. Whitespace-only counts as blank.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.name.trim().is_empty() {
            return Err(StoreError::InvalidInput {
                field: KeyField::Name,
            });
        }
        if self.value.trim().is_empty() {
            return Err(StoreError::InvalidInput {
                field: KeyField::Value,
            });
        }
        Ok(())
    }
}

/// Diagnostic counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyStats {
    pub total: u64,
    pub active: u64,
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(value: &str) -> ApiKey {
        ApiKey::new(1, "prod".to_string(), value.to_string(), true, Utc::now())
    }

    #[test]
    fn test_debug_redacts_value() {
        let key = sample("sk-live-0123456789");
        let debug_output = format!("{:?}", key);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("sk-live-0123456789"));
    }

    #[test]
    fn test_display_shows_name_and_active_marker() {
        let key = sample("sk-live-0123456789");
        assert_eq!(key.to_string(), "[1] prod (active)");
    }

    #[test]
    fn test_masked_value_keeps_prefix_only() {
        assert_eq!(sample("sk-live-0123456789").masked_value(), "sk-l…");
        assert_eq!(sample("abcdefghijkl").masked_value(), "abcd…");
        assert_eq!(sample("abc").masked_value(), "****");
    }

    #[test]
    fn test_masked_value_hides_short_secrets_entirely() {
        for value in ["abcde", "abcdef", "abcdefg", "abcdefgh", "abcdefghijk"] {
            let masked = sample(value).masked_value();
            assert_eq!(masked, "****", "{}-char secret leaked", value.len());
        }
    }

    #[test]
    fn test_summary_json_has_no_secret() {
        let json = serde_json::to_string(&sample("sk-live-0123456789").summary()).unwrap();
        assert!(!json.contains("sk-live-0123456789"));
        assert!(json.contains("\"masked_value\""));
    }

    #[test]
    fn test_validate_rejects_blank_fields() {
        let err = NewApiKey::new("  ", "key").validate().unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidInput {
                field: KeyField::Name
            }
        ));

        let err = NewApiKey::new("prod", "\t\n").validate().unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidInput {
                field: KeyField::Value
            }
        ));

        assert!(NewApiKey::new("prod", "key1").validate().is_ok());
    }
}
