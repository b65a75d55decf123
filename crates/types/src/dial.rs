//! Dial type tags and the values they carry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of a dial. Determines which [`DialValue`] shape it accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialType {
    /// Free-form color string (e.g., "#ff0000", "var(--accent)")
    Color,
    /// Free-form spacing string (e.g., "8px", "1rem")
    Spacing,
    /// One of a fixed set of string options
    Variant,
    /// On/off switch
    Boolean,
    /// Floating point number, optionally bounded
    Number,
}

impl DialType {
    pub const ALL: [DialType; 5] = [
        DialType::Color,
        DialType::Spacing,
        DialType::Variant,
        DialType::Boolean,
        DialType::Number,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DialType::Color => "color",
            DialType::Spacing => "spacing",
            DialType::Variant => "variant",
            DialType::Boolean => "boolean",
            DialType::Number => "number",
        }
    }

    /// Returns true if `value` has the shape this type stores
    pub fn accepts(&self, value: &DialValue) -> bool {
        matches!(
            (self, value),
            (DialType::Color | DialType::Spacing | DialType::Variant, DialValue::Text(_))
                | (DialType::Boolean, DialValue::Bool(_))
                | (DialType::Number, DialValue::Number(_))
        )
    }
}

impl fmt::Display for DialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for DialType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DialType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown dial type: {}", s))
    }
}

/// Current or default value of a dial.
///
/// Serializes as a bare JSON scalar. Which [`DialType`] a `Text` value
/// belongs to is carried by the registration, not by the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DialValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl DialValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DialValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DialValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DialValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Name of the value's shape, for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            DialValue::Bool(_) => "boolean",
            DialValue::Number(_) => "number",
            DialValue::Text(_) => "string",
        }
    }

    /// Parse user input (e.g., a command-line argument) for a dial of `dial_type`.
    ///
    /// Returns None when the text cannot represent that type.
    pub fn parse(dial_type: DialType, raw: &str) -> Option<Self> {
        match dial_type {
            DialType::Color | DialType::Spacing | DialType::Variant => {
                Some(DialValue::Text(raw.to_string()))
            }
            DialType::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "on" | "yes" | "1" => Some(DialValue::Bool(true)),
                "false" | "off" | "no" | "0" => Some(DialValue::Bool(false)),
                _ => None,
            },
            DialType::Number => raw.trim().parse::<f64>().ok().map(DialValue::Number),
        }
    }
}

impl fmt::Display for DialValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DialValue::Bool(b) => write!(f, "{}", b),
            DialValue::Number(n) => write!(f, "{}", n),
            DialValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for DialValue {
    fn from(value: bool) -> Self {
        DialValue::Bool(value)
    }
}

impl From<f64> for DialValue {
    fn from(value: f64) -> Self {
        DialValue::Number(value)
    }
}

impl From<i32> for DialValue {
    fn from(value: i32) -> Self {
        DialValue::Number(value as f64)
    }
}

impl From<&str> for DialValue {
    fn from(value: &str) -> Self {
        DialValue::Text(value.to_string())
    }
}

impl From<String> for DialValue {
    fn from(value: String) -> Self {
        DialValue::Text(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dial_type_string_forms() {
        for ty in DialType::ALL {
            let json = serde_json::to_string(&ty).unwrap();
            assert_eq!(json, format!("\"{}\"", ty.as_str()));
            assert_eq!(ty.as_str().parse::<DialType>().unwrap(), ty);
        }
        assert!("slider".parse::<DialType>().is_err());
    }

    #[test]
    fn test_accepts_matches_shape() {
        assert!(DialType::Color.accepts(&"#fff".into()));
        assert!(DialType::Variant.accepts(&"dark".into()));
        assert!(DialType::Boolean.accepts(&true.into()));
        assert!(DialType::Number.accepts(&3.5.into()));
        assert!(!DialType::Number.accepts(&"3.5".into()));
        assert!(!DialType::Spacing.accepts(&false.into()));
    }

    #[test]
    fn test_value_serializes_as_scalar() {
        assert_eq!(serde_json::to_string(&DialValue::Bool(true)).unwrap(), "true");
        assert_eq!(serde_json::to_string(&DialValue::from("8px")).unwrap(), "\"8px\"");

        let n: DialValue = serde_json::from_str("10").unwrap();
        assert_eq!(n, DialValue::Number(10.0));
        let t: DialValue = serde_json::from_str("\"light\"").unwrap();
        assert_eq!(t, DialValue::Text("light".into()));
    }

    #[test]
    fn test_number_precision_survives_json() {
        let original = DialValue::Number(0.1 + 0.2);
        let json = serde_json::to_string(&original).unwrap();
        let back: DialValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn test_parse_user_input() {
        assert_eq!(DialValue::parse(DialType::Boolean, "on"), Some(DialValue::Bool(true)));
        assert_eq!(DialValue::parse(DialType::Boolean, "maybe"), None);
        assert_eq!(DialValue::parse(DialType::Number, " 12.5 "), Some(DialValue::Number(12.5)));
        assert_eq!(DialValue::parse(DialType::Number, "twelve"), None);
        assert_eq!(
            DialValue::parse(DialType::Color, "#000"),
            Some(DialValue::Text("#000".into()))
        );
    }
}
