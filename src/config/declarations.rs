//! Dial declarations read from a JSON file
//!
//! The file is an object of dial id to tagged config:
//!
//! ```json
//! { "accent": { "type": "color", "label": "Accent", "default": "#3b82f6" } }
//! ```

use anyhow::{Context, Result};
use dials_types::DialConfig;
use log::{info, warn};
use std::collections::BTreeMap;
use std::path::Path;

use crate::core::DialRegistry;
use crate::error::DialError;

/// Read a declarations file
pub fn load_declarations(path: &Path) -> Result<BTreeMap<String, DialConfig>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read declarations from {:?}", path))?;
    let declarations: BTreeMap<String, DialConfig> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid declarations in {:?}", path))?;
    info!("Loaded {} dial declarations from {:?}", declarations.len(), path);
    Ok(declarations)
}

/// Register every declaration, in id order.
///
/// A declaration that is rejected does not stop the rest; the rejections
/// are returned with their ids.
pub fn register_declarations(
    registry: &DialRegistry,
    declarations: &BTreeMap<String, DialConfig>,
) -> Vec<(String, DialError)> {
    let mut rejected = Vec::new();
    for (id, config) in declarations {
        if let Err(e) = registry.register(id, config.dial_type(), config.clone()) {
            warn!("Skipping declaration '{}': {}", id, e);
            rejected.push((id.clone(), e));
        }
    }
    rejected
}

#[cfg(test)]
mod tests {
    use super::*;
    use dials_types::{DialType, DialValue};

    const DECLARATIONS: &str = r##"{
        "accent": { "type": "color", "label": "Accent", "default": "#3b82f6", "group": "Theme" },
        "density": { "type": "variant", "label": "Density", "default": "cozy",
                     "options": ["compact", "cozy", "roomy"] },
        "columns": { "type": "number", "label": "Columns", "default": 3, "min": 1, "max": 6 },
        "broken": { "type": "number", "label": "Broken", "default": 10, "min": 0, "max": 5 }
    }"##;

    #[test]
    fn test_load_and_register() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dials.json");
        std::fs::write(&path, DECLARATIONS).unwrap();

        let declarations = load_declarations(&path).unwrap();
        assert_eq!(declarations.len(), 4);
        assert_eq!(declarations["density"].dial_type(), DialType::Variant);

        let registry = DialRegistry::new();
        let rejected = register_declarations(&registry, &declarations);
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].0, "broken");
        assert!(matches!(rejected[0].1, DialError::InvalidConfig { .. }));

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get_value("columns"), Some(DialValue::Number(3.0)));
        assert_eq!(registry.get_value("accent"), Some(DialValue::from("#3b82f6")));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = load_declarations(Path::new("/nonexistent/dials.json")).unwrap_err();
        assert!(err.to_string().contains("dials.json"));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dials.json");
        std::fs::write(&path, r#"{ "x": { "type": "slider", "label": "X", "default": 1 } }"#)
            .unwrap();
        assert!(load_declarations(&path).is_err());
    }
}
