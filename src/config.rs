use crate::platform::{PlatformKey, PlatformKeySpace};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReconcilerConfig {
    /// Label shown for the Default key in panels and tool output.
    #[serde(default = "ReconcilerConfig::default_label")]
    pub default_label: String,
    /// Explicit platform list. Empty means "whatever the store reports".
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default = "ReconcilerConfig::default_skip_unchanged_writes")]
    pub skip_unchanged_writes: bool,
}

impl ReconcilerConfig {
    fn default_label() -> String {
        "Default".to_string()
    }

    const fn default_skip_unchanged_writes() -> bool {
        true
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read reconciler config {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse reconciler config {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::warn!("Reconciler config load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn platform_space(&self) -> Option<PlatformKeySpace> {
        if self.platforms.is_empty() {
            None
        } else {
            Some(PlatformKeySpace::from_names(self.platforms.iter().cloned()))
        }
    }

    pub fn label<'a>(&'a self, key: &'a PlatformKey) -> &'a str {
        match key {
            PlatformKey::Default => &self.default_label,
            PlatformKey::Platform(name) => name,
        }
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            default_label: Self::default_label(),
            platforms: Vec::new(),
            skip_unchanged_writes: Self::default_skip_unchanged_writes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let cfg: ReconcilerConfig = serde_json::from_str("{}").expect("parse empty config");
        assert_eq!(cfg, ReconcilerConfig::default());
        assert!(cfg.platform_space().is_none());
    }

    #[test]
    fn explicit_platforms_build_a_key_space() {
        let cfg: ReconcilerConfig =
            serde_json::from_str(r#"{ "default_label": "All Platforms", "platforms": ["Android", "iOS"] }"#)
                .expect("parse config");
        let space = cfg.platform_space().expect("explicit platforms");
        assert_eq!(space.len(), 3);
        assert_eq!(cfg.label(&PlatformKey::Default), "All Platforms");
        assert_eq!(cfg.label(&PlatformKey::named("iOS")), "iOS");
    }

    #[test]
    fn unreadable_config_falls_back() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("reconciler.json");
        fs::write(&path, "{ not json").expect("write config");
        assert!(ReconcilerConfig::load(&path).is_err());
        assert_eq!(ReconcilerConfig::load_or_default(&path), ReconcilerConfig::default());
    }
}
