//! Registry record for one dial

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::DialConfig;
use crate::dial::{DialType, DialValue};

/// Stored record for a registered dial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialRegistration {
    pub id: String,
    #[serde(rename = "type")]
    pub dial_type: DialType,
    /// Config from the most recent registration call
    pub config: DialConfig,
    pub current_value: DialValue,
    /// Set by value changes and resets, never by registration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl DialRegistration {
    pub fn new(id: impl Into<String>, config: DialConfig, current_value: DialValue) -> Self {
        Self {
            id: id.into(),
            dial_type: config.dial_type(),
            config,
            current_value,
            updated_at: None,
        }
    }

    /// True if the current value differs from the declared default
    pub fn is_overridden(&self) -> bool {
        self.current_value != self.config.default_value()
    }

    pub fn group(&self) -> Option<&str> {
        self.config.group()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BooleanConfig;

    #[test]
    fn test_registration_serialization() {
        let reg = DialRegistration::new(
            "show-grid",
            BooleanConfig::new("Show grid", true).into(),
            DialValue::Bool(false),
        );
        let json = serde_json::to_string(&reg).unwrap();
        assert!(json.contains("\"type\":\"boolean\""));
        assert!(json.contains("\"currentValue\":false"));
        assert!(!json.contains("updatedAt"));

        let back: DialRegistration = serde_json::from_str(&json).unwrap();
        assert_eq!(back, reg);
        assert!(back.is_overridden());
    }
}
