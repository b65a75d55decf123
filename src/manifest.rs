//! Design-token manifest
//!
//! Read-only source of option lists for call sites that want to offer the
//! project's colors or spacing scale instead of hardcoding them. The
//! registry itself never reads the manifest.
//!
//! Accessors take `Option<&Manifest>` and return an empty list when the
//! manifest or the section is missing, so a call site can write
//! `get_colors(load_manifest(None).as_deref(), Some("brand"))` unconditionally.

use anyhow::{Context, Result};
use log::{info, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Manifest file read when no path is given
pub const DEFAULT_MANIFEST_PATH: &str = "design-manifest.json";

/// First manifest loaded successfully in this process
static MANIFEST_CACHE: Lazy<RwLock<Option<Arc<Manifest>>>> = Lazy::new(|| RwLock::new(None));

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Color tokens by category, e.g. "brand", "neutral"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spacing: Option<SpacingTokens>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typography: Option<TypographyTokens>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radii: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadows: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpacingTokens {
    /// Literal values such as "4px"
    #[serde(default)]
    pub scale: Vec<String>,
    /// The same scale as CSS variable names
    #[serde(default)]
    pub variables: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypographyTokens {
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub families: Vec<String>,
    #[serde(default)]
    pub weights: Vec<String>,
}

/// Section of [`TypographyTokens`] to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypographyKind {
    Sizes,
    Families,
    Weights,
}

impl Manifest {
    /// Read and parse a manifest, bypassing the cache
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {:?}", path))?;
        let manifest = serde_json::from_str(&content)
            .with_context(|| format!("Invalid manifest {:?}", path))?;
        Ok(manifest)
    }
}

/// Manifest for this process.
///
/// The first successful load is cached and returned for every later call,
/// whatever path they pass. Missing or malformed files yield `None` and are
/// retried next time.
pub fn load_manifest(path: Option<&Path>) -> Option<Arc<Manifest>> {
    if let Ok(cache) = MANIFEST_CACHE.read() {
        if let Some(manifest) = cache.as_ref() {
            return Some(manifest.clone());
        }
    }

    let path = path.unwrap_or_else(|| Path::new(DEFAULT_MANIFEST_PATH));
    let manifest = match Manifest::from_path(path) {
        Ok(manifest) => Arc::new(manifest),
        Err(e) => {
            warn!("Design manifest unavailable: {:#}", e);
            return None;
        }
    };
    info!("Loaded design manifest from {:?}", path);

    match MANIFEST_CACHE.write() {
        // Another thread may have won the race; keep its copy
        Ok(mut cache) => Some(cache.get_or_insert(manifest).clone()),
        Err(_) => Some(manifest),
    }
}

/// Colors of one category, or of every category in name order
pub fn get_colors(manifest: Option<&Manifest>, category: Option<&str>) -> Vec<String> {
    let Some(colors) = manifest.and_then(|m| m.colors.as_ref()) else {
        return Vec::new();
    };
    match category {
        Some(category) => colors.get(category).cloned().unwrap_or_default(),
        None => colors.values().flatten().cloned().collect(),
    }
}

/// Spacing scale as literal values, or as variable names
pub fn get_spacing(manifest: Option<&Manifest>, use_variables: bool) -> Vec<String> {
    manifest
        .and_then(|m| m.spacing.as_ref())
        .map(|spacing| {
            if use_variables {
                spacing.variables.clone()
            } else {
                spacing.scale.clone()
            }
        })
        .unwrap_or_default()
}

pub fn get_typography(manifest: Option<&Manifest>, kind: TypographyKind) -> Vec<String> {
    manifest
        .and_then(|m| m.typography.as_ref())
        .map(|typography| match kind {
            TypographyKind::Sizes => typography.sizes.clone(),
            TypographyKind::Families => typography.families.clone(),
            TypographyKind::Weights => typography.weights.clone(),
        })
        .unwrap_or_default()
}

pub fn get_radii(manifest: Option<&Manifest>) -> Vec<String> {
    manifest.and_then(|m| m.radii.clone()).unwrap_or_default()
}

pub fn get_shadows(manifest: Option<&Manifest>) -> Vec<String> {
    manifest.and_then(|m| m.shadows.clone()).unwrap_or_default()
}
