//! Declaration and value checks, dispatched on the dial's type tag

use dials_types::{DialConfig, DialType, DialValue, NumberConfig};

use crate::error::DialError;

/// Check a declaration before it is registered
pub fn validate_config(id: &str, dial_type: DialType, config: &DialConfig) -> Result<(), DialError> {
    if id.trim().is_empty() {
        return Err(DialError::invalid_config(id, "id must not be empty"));
    }
    if config.dial_type() != dial_type {
        return Err(DialError::invalid_config(
            id,
            format!("declared as {} but config is for {}", dial_type, config.dial_type()),
        ));
    }
    if config.label().trim().is_empty() {
        return Err(DialError::invalid_config(id, "label must not be empty"));
    }

    match config {
        DialConfig::Color(_) | DialConfig::Spacing(_) | DialConfig::Boolean(_) => Ok(()),
        DialConfig::Variant(variant) => {
            if variant.options.is_empty() {
                return Err(DialError::invalid_config(id, "variant dials need at least one option"));
            }
            if !variant.options.contains(&variant.default) {
                return Err(DialError::invalid_config(
                    id,
                    format!("default '{}' is not one of {:?}", variant.default, variant.options),
                ));
            }
            Ok(())
        }
        DialConfig::Number(number) => validate_number_config(id, number),
    }
}

fn validate_number_config(id: &str, number: &NumberConfig) -> Result<(), DialError> {
    if !number.default.is_finite() {
        return Err(DialError::invalid_config(id, "default must be a finite number"));
    }
    for (name, bound) in [("min", number.min), ("max", number.max)] {
        if matches!(bound, Some(b) if !b.is_finite()) {
            return Err(DialError::invalid_config(id, format!("{} must be finite", name)));
        }
    }
    if let (Some(min), Some(max)) = (number.min, number.max) {
        if min > max {
            return Err(DialError::invalid_config(
                id,
                format!("min {} is greater than max {}", min, max),
            ));
        }
    }
    if !within_bounds(number.default, number.min, number.max) {
        return Err(DialError::invalid_config(
            id,
            format!("default {} is outside min/max", number.default),
        ));
    }
    if let Some(step) = number.step {
        if !step.is_finite() || step <= 0.0 {
            return Err(DialError::invalid_config(id, "step must be a positive number"));
        }
    }
    Ok(())
}

/// Check a value against the dial's current config.
///
/// Never clamps or coerces: a value is either accepted as-is or rejected.
pub fn validate_value(id: &str, config: &DialConfig, value: &DialValue) -> Result<(), DialError> {
    let dial_type = config.dial_type();
    if !dial_type.accepts(value) {
        return Err(DialError::TypeMismatch {
            id: id.to_string(),
            expected: dial_type,
            found: value.kind(),
        });
    }

    match (config, value) {
        (DialConfig::Variant(variant), DialValue::Text(text)) => {
            if variant.options.iter().any(|o| o == text) {
                Ok(())
            } else {
                Err(DialError::InvalidOption {
                    id: id.to_string(),
                    value: text.clone(),
                    options: variant.options.clone(),
                })
            }
        }
        (DialConfig::Number(number), DialValue::Number(n)) => {
            if n.is_finite() && within_bounds(*n, number.min, number.max) {
                Ok(())
            } else {
                Err(DialError::ValueOutOfRange {
                    id: id.to_string(),
                    value: *n,
                    min: number.min,
                    max: number.max,
                })
            }
        }
        // Color and spacing strings are free-form
        _ => Ok(()),
    }
}

fn within_bounds(value: f64, min: Option<f64>, max: Option<f64>) -> bool {
    min.map_or(true, |min| value >= min) && max.map_or(true, |max| value <= max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dials_types::{BooleanConfig, ColorConfig, VariantConfig};

    fn theme() -> DialConfig {
        VariantConfig::new("Theme", "dark", ["dark", "light"]).into()
    }

    #[test]
    fn test_valid_configs_pass() {
        assert!(validate_config("theme", DialType::Variant, &theme()).is_ok());
        let color: DialConfig = ColorConfig::new("Accent", "#09f").into();
        assert!(validate_config("accent", DialType::Color, &color).is_ok());
        let gap: DialConfig = NumberConfig::new("Gap", 10.0).with_range(0.0, 20.0).with_step(1.0).into();
        assert!(validate_config("gap", DialType::Number, &gap).is_ok());
    }

    #[test]
    fn test_empty_id_and_label_rejected() {
        assert!(matches!(
            validate_config("", DialType::Variant, &theme()),
            Err(DialError::InvalidConfig { .. })
        ));
        let unlabeled: DialConfig = BooleanConfig::new("  ", true).into();
        assert!(matches!(
            validate_config("flag", DialType::Boolean, &unlabeled),
            Err(DialError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_declared_type_must_match_config() {
        let err = validate_config("theme", DialType::Color, &theme()).unwrap_err();
        assert!(matches!(err, DialError::InvalidConfig { .. }));
    }

    #[test]
    fn test_variant_default_must_be_an_option() {
        let bad: DialConfig = VariantConfig::new("Theme", "sepia", ["dark", "light"]).into();
        assert!(validate_config("theme", DialType::Variant, &bad).is_err());

        let empty: DialConfig = VariantConfig::new("Theme", "dark", Vec::<String>::new()).into();
        assert!(validate_config("theme", DialType::Variant, &empty).is_err());
    }

    #[test]
    fn test_number_config_bounds() {
        let inverted: DialConfig = NumberConfig::new("N", 5.0).with_range(10.0, 0.0).into();
        assert!(validate_config("n", DialType::Number, &inverted).is_err());

        let outside: DialConfig = NumberConfig::new("N", 50.0).with_range(0.0, 20.0).into();
        assert!(validate_config("n", DialType::Number, &outside).is_err());

        let nan: DialConfig = NumberConfig::new("N", f64::NAN).into();
        assert!(validate_config("n", DialType::Number, &nan).is_err());

        let zero_step: DialConfig = NumberConfig::new("N", 1.0).with_step(0.0).into();
        assert!(validate_config("n", DialType::Number, &zero_step).is_err());
    }

    #[test]
    fn test_value_checks() {
        let number: DialConfig = NumberConfig::new("N", 10.0).with_range(0.0, 20.0).into();
        assert!(validate_value("n", &number, &DialValue::Number(20.0)).is_ok());
        assert!(matches!(
            validate_value("n", &number, &DialValue::Number(99.0)),
            Err(DialError::ValueOutOfRange { value, .. }) if value == 99.0
        ));
        assert!(matches!(
            validate_value("n", &number, &DialValue::Number(f64::INFINITY)),
            Err(DialError::ValueOutOfRange { .. })
        ));
        assert!(matches!(
            validate_value("n", &number, &DialValue::from("10")),
            Err(DialError::TypeMismatch { expected: DialType::Number, .. })
        ));

        assert!(validate_value("theme", &theme(), &DialValue::from("light")).is_ok());
        assert!(matches!(
            validate_value("theme", &theme(), &DialValue::from("sepia")),
            Err(DialError::InvalidOption { .. })
        ));

        let color: DialConfig = ColorConfig::new("Accent", "#09f").with_options(["#09f"]).into();
        assert!(validate_value("accent", &color, &DialValue::from("rebeccapurple")).is_ok());
    }
}
