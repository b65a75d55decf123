//! Dial declaration types.
//!
//! A [`DialConfig`] is what a call site supplies when it declares a dial: a
//! display label, the default value and presentation hints. The registry
//! enforces only variant options and number bounds; everything else is for
//! the binding layer that renders the control.

use serde::{Deserialize, Serialize};

use crate::dial::{DialType, DialValue};

/// Color dial configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorConfig {
    pub label: String,
    pub default: String,
    /// Suggested swatches; not enforced
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl ColorConfig {
    pub fn new(label: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            default: default.into(),
            options: Vec::new(),
            description: None,
            group: None,
        }
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Spacing dial configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpacingConfig {
    pub label: String,
    pub default: String,
    /// Suggested steps of the spacing scale; not enforced
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl SpacingConfig {
    pub fn new(label: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            default: default.into(),
            options: Vec::new(),
            unit: None,
            description: None,
            group: None,
        }
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

/// Variant dial configuration. `default` must be one of `options`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantConfig {
    pub label: String,
    pub default: String,
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl VariantConfig {
    pub fn new<I, S>(label: impl Into<String>, default: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            label: label.into(),
            default: default.into(),
            options: options.into_iter().map(Into::into).collect(),
            description: None,
            group: None,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Boolean dial configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BooleanConfig {
    pub label: String,
    pub default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl BooleanConfig {
    pub fn new(label: impl Into<String>, default: bool) -> Self {
        Self {
            label: label.into(),
            default,
            description: None,
            group: None,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

/// Number dial configuration. `min`/`max` are enforced, `step` is a hint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberConfig {
    pub label: String,
    pub default: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl NumberConfig {
    pub fn new(label: impl Into<String>, default: f64) -> Self {
        Self {
            label: label.into(),
            default,
            min: None,
            max: None,
            step: None,
            unit: None,
            description: None,
            group: None,
        }
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn with_step(mut self, step: f64) -> Self {
        self.step = Some(step);
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

/// Declaration of a dial, tagged by its type.
///
/// Serialized with a `"type"` field, e.g.
/// `{"type":"variant","label":"Theme","default":"dark","options":["dark","light"]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DialConfig {
    Color(ColorConfig),
    Spacing(SpacingConfig),
    Variant(VariantConfig),
    Boolean(BooleanConfig),
    Number(NumberConfig),
}

impl DialConfig {
    pub fn dial_type(&self) -> DialType {
        match self {
            DialConfig::Color(_) => DialType::Color,
            DialConfig::Spacing(_) => DialType::Spacing,
            DialConfig::Variant(_) => DialType::Variant,
            DialConfig::Boolean(_) => DialType::Boolean,
            DialConfig::Number(_) => DialType::Number,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            DialConfig::Color(c) => &c.label,
            DialConfig::Spacing(c) => &c.label,
            DialConfig::Variant(c) => &c.label,
            DialConfig::Boolean(c) => &c.label,
            DialConfig::Number(c) => &c.label,
        }
    }

    pub fn group(&self) -> Option<&str> {
        match self {
            DialConfig::Color(c) => c.group.as_deref(),
            DialConfig::Spacing(c) => c.group.as_deref(),
            DialConfig::Variant(c) => c.group.as_deref(),
            DialConfig::Boolean(c) => c.group.as_deref(),
            DialConfig::Number(c) => c.group.as_deref(),
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            DialConfig::Color(c) => c.description.as_deref(),
            DialConfig::Spacing(c) => c.description.as_deref(),
            DialConfig::Variant(c) => c.description.as_deref(),
            DialConfig::Boolean(c) => c.description.as_deref(),
            DialConfig::Number(c) => c.description.as_deref(),
        }
    }

    /// The declared default as a value
    pub fn default_value(&self) -> DialValue {
        match self {
            DialConfig::Color(c) => DialValue::Text(c.default.clone()),
            DialConfig::Spacing(c) => DialValue::Text(c.default.clone()),
            DialConfig::Variant(c) => DialValue::Text(c.default.clone()),
            DialConfig::Boolean(c) => DialValue::Bool(c.default),
            DialConfig::Number(c) => DialValue::Number(c.default),
        }
    }
}

impl From<ColorConfig> for DialConfig {
    fn from(config: ColorConfig) -> Self {
        DialConfig::Color(config)
    }
}

impl From<SpacingConfig> for DialConfig {
    fn from(config: SpacingConfig) -> Self {
        DialConfig::Spacing(config)
    }
}

impl From<VariantConfig> for DialConfig {
    fn from(config: VariantConfig) -> Self {
        DialConfig::Variant(config)
    }
}

impl From<BooleanConfig> for DialConfig {
    fn from(config: BooleanConfig) -> Self {
        DialConfig::Boolean(config)
    }
}

impl From<NumberConfig> for DialConfig {
    fn from(config: NumberConfig) -> Self {
        DialConfig::Number(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serialization_is_tagged() {
        let config: DialConfig = VariantConfig::new("Theme", "dark", ["dark", "light"]).into();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"type\":\"variant\""));

        let deserialized: DialConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, config);
        assert_eq!(deserialized.dial_type(), DialType::Variant);
    }

    #[test]
    fn test_optional_hints_default_when_absent() {
        let json = r#"{"type":"number","label":"Gap","default":4}"#;
        let config: DialConfig = serde_json::from_str(json).unwrap();
        match config {
            DialConfig::Number(n) => {
                assert_eq!(n.default, 4.0);
                assert!(n.min.is_none());
                assert!(n.group.is_none());
            }
            other => panic!("expected number config, got {:?}", other),
        }
    }

    #[test]
    fn test_accessors() {
        let config: DialConfig = NumberConfig::new("Radius", 8.0)
            .with_range(0.0, 32.0)
            .with_group("Card")
            .into();
        assert_eq!(config.label(), "Radius");
        assert_eq!(config.group(), Some("Card"));
        assert_eq!(config.default_value(), DialValue::Number(8.0));
    }
}
