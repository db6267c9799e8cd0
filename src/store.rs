use crate::platform::PlatformKey;
use crate::record::{RecordSchema, SettingsRecord};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(String);

impl TargetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TargetId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TargetId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("target '{0}' is not in the store")]
    UnknownTarget(TargetId),
    #[error("platform '{0}' cannot hold overrides in this store")]
    UnknownPlatform(PlatformKey),
    #[error("store rejected record for '{target}': {reason}")]
    Rejected { target: TargetId, reason: String },
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Storage seam for per-asset import settings. Reads happen while a session
/// is built, writes only while it is applied.
pub trait TargetStore {
    fn platform_keys(&self) -> Vec<PlatformKey>;

    fn default_record(&self, target: &TargetId) -> Result<SettingsRecord, StoreError>;

    fn set_default_record(&mut self, target: &TargetId, record: SettingsRecord) -> Result<(), StoreError>;

    fn override_record(
        &self,
        target: &TargetId,
        platform: &PlatformKey,
    ) -> Result<Option<SettingsRecord>, StoreError>;

    fn set_override(
        &mut self,
        target: &TargetId,
        platform: &PlatformKey,
        record: SettingsRecord,
    ) -> Result<(), StoreError>;

    fn clear_override(&mut self, target: &TargetId, platform: &PlatformKey) -> Result<(), StoreError>;
}

/// Override slot of one target for one platform. An absent entry still
/// carries a record: a copy of the target's default, used for display only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideEntry {
    pub present: bool,
    pub record: SettingsRecord,
}

/// Session-local copy of one asset's settings across every platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub id: TargetId,
    pub default_record: SettingsRecord,
    pub overrides: BTreeMap<PlatformKey, OverrideEntry>,
}

impl Target {
    pub fn read<'a, S>(
        store: &S,
        id: &TargetId,
        platforms: impl IntoIterator<Item = &'a PlatformKey>,
    ) -> Result<Self, (PlatformKey, StoreError)>
    where
        S: TargetStore + ?Sized,
    {
        let default_record = store.default_record(id).map_err(|err| (PlatformKey::Default, err))?;
        let mut overrides = BTreeMap::new();
        for platform in platforms.into_iter().filter(|key| !key.is_default()) {
            let stored = store.override_record(id, platform).map_err(|err| (platform.clone(), err))?;
            let entry = match stored {
                Some(record) => OverrideEntry { present: true, record },
                None => OverrideEntry { present: false, record: default_record.clone() },
            };
            overrides.insert(platform.clone(), entry);
        }
        Ok(Self { id: id.clone(), default_record, overrides })
    }

    pub fn is_overridden(&self, platform: &PlatformKey) -> bool {
        !platform.is_default() && self.overrides.get(platform).is_some_and(|entry| entry.present)
    }

    /// Record the target would import with on `platform`.
    pub fn effective(&self, platform: &PlatformKey) -> &SettingsRecord {
        match self.overrides.get(platform) {
            Some(entry) if entry.present => &entry.record,
            _ => &self.default_record,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTarget {
    pub id: TargetId,
    pub default: SettingsRecord,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub overrides: BTreeMap<PlatformKey, SettingsRecord>,
}

/// In-memory store that doubles as the JSON import-settings manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryStore {
    schema: RecordSchema,
    #[serde(default)]
    platforms: Vec<PlatformKey>,
    #[serde(default)]
    targets: Vec<StoredTarget>,
}

impl MemoryStore {
    pub fn new(schema: RecordSchema, platforms: impl IntoIterator<Item = PlatformKey>) -> Self {
        let mut store = Self { schema, platforms: Vec::new(), targets: Vec::new() };
        for platform in platforms {
            if !platform.is_default() && !store.platforms.contains(&platform) {
                store.platforms.push(platform);
            }
        }
        store
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    pub fn targets(&self) -> &[StoredTarget] {
        &self.targets
    }

    pub fn target_ids(&self) -> Vec<TargetId> {
        self.targets.iter().map(|target| target.id.clone()).collect()
    }

    pub fn target(&self, id: &TargetId) -> Option<&StoredTarget> {
        self.targets.iter().find(|target| &target.id == id)
    }

    /// Adds a target with schema defaults. Re-adding an existing id resets it.
    pub fn insert_target(&mut self, id: impl Into<TargetId>) -> &mut StoredTarget {
        let id = id.into();
        let default = SettingsRecord::from_schema(&self.schema);
        let index = match self.targets.iter().position(|target| target.id == id) {
            Some(index) => {
                self.targets[index] = StoredTarget { id, default, overrides: BTreeMap::new() };
                index
            }
            None => {
                self.targets.push(StoredTarget { id, default, overrides: BTreeMap::new() });
                self.targets.len() - 1
            }
        };
        &mut self.targets[index]
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("Reading import manifest {}", path.display()))?;
        let store = serde_json::from_slice::<MemoryStore>(&bytes)
            .with_context(|| format!("Parsing import manifest {}", path.display()))?;
        store.validate().with_context(|| format!("Validating import manifest {}", path.display()))?;
        Ok(store)
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Creating manifest directory {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json.as_bytes()).with_context(|| format!("Writing import manifest {}", path.display()))?;
        Ok(())
    }

    fn validate(&self) -> Result<(), StoreError> {
        for target in &self.targets {
            self.check_record(&target.id, &target.default)?;
            for (platform, record) in &target.overrides {
                self.check_platform(platform)?;
                self.check_record(&target.id, record)?;
            }
        }
        Ok(())
    }

    fn check_record(&self, target: &TargetId, record: &SettingsRecord) -> Result<(), StoreError> {
        if record.conforms_to(&self.schema) {
            Ok(())
        } else {
            Err(StoreError::Rejected {
                target: target.clone(),
                reason: format!("record does not match the '{}' schema", self.schema.name()),
            })
        }
    }

    fn check_platform(&self, platform: &PlatformKey) -> Result<(), StoreError> {
        if platform.is_default() || !self.platforms.contains(platform) {
            return Err(StoreError::UnknownPlatform(platform.clone()));
        }
        Ok(())
    }

    fn stored(&self, id: &TargetId) -> Result<&StoredTarget, StoreError> {
        self.target(id).ok_or_else(|| StoreError::UnknownTarget(id.clone()))
    }

    fn stored_mut(&mut self, id: &TargetId) -> Result<&mut StoredTarget, StoreError> {
        self.targets
            .iter_mut()
            .find(|target| &target.id == id)
            .ok_or_else(|| StoreError::UnknownTarget(id.clone()))
    }
}

impl TargetStore for MemoryStore {
    fn platform_keys(&self) -> Vec<PlatformKey> {
        std::iter::once(PlatformKey::Default).chain(self.platforms.iter().cloned()).collect()
    }

    fn default_record(&self, target: &TargetId) -> Result<SettingsRecord, StoreError> {
        Ok(self.stored(target)?.default.clone())
    }

    fn set_default_record(&mut self, target: &TargetId, record: SettingsRecord) -> Result<(), StoreError> {
        self.check_record(target, &record)?;
        self.stored_mut(target)?.default = record;
        Ok(())
    }

    fn override_record(
        &self,
        target: &TargetId,
        platform: &PlatformKey,
    ) -> Result<Option<SettingsRecord>, StoreError> {
        self.check_platform(platform)?;
        Ok(self.stored(target)?.overrides.get(platform).cloned())
    }

    fn set_override(
        &mut self,
        target: &TargetId,
        platform: &PlatformKey,
        record: SettingsRecord,
    ) -> Result<(), StoreError> {
        self.check_platform(platform)?;
        self.check_record(target, &record)?;
        self.stored_mut(target)?.overrides.insert(platform.clone(), record);
        Ok(())
    }

    fn clear_override(&mut self, target: &TargetId, platform: &PlatformKey) -> Result<(), StoreError> {
        self.check_platform(platform)?;
        self.stored_mut(target)?.overrides.remove(platform);
        Ok(())
    }
}
