#![allow(dead_code)]

use kestrel_import_settings::store::StoreError;
use kestrel_import_settings::{MemoryStore, PlatformKey, RecordSchema, SettingsRecord, TargetId, TargetStore, Value};

pub fn mobile() -> PlatformKey {
    PlatformKey::named("Mobile")
}

pub fn desktop() -> PlatformKey {
    PlatformKey::named("Desktop")
}

pub fn texture_schema() -> RecordSchema {
    RecordSchema::new("texture")
        .with_field("max_size", Value::Int(2048))
        .with_field("format", Value::Enum(0))
        .with_field("mipmaps", Value::Bool(true))
}

/// Store with targets `a`, `b`, `c` on schema defaults and no overrides.
pub fn texture_store() -> MemoryStore {
    let mut store = MemoryStore::new(texture_schema(), [mobile(), desktop()]);
    for id in ["a", "b", "c"] {
        store.insert_target(id);
    }
    store
}

pub fn ids(names: &[&str]) -> Vec<TargetId> {
    names.iter().map(|name| TargetId::from(*name)).collect()
}

pub fn record_with(store: &MemoryStore, field: &str, value: Value) -> SettingsRecord {
    SettingsRecord::from_schema(store.schema()).with(field, value).expect("fixture field")
}

pub fn stored_value(store: &MemoryStore, target: &str, platform: &PlatformKey, field: &str) -> Option<Value> {
    let id = TargetId::from(target);
    let record = if platform.is_default() {
        Some(store.default_record(&id).expect("default record"))
    } else {
        store.override_record(&id, platform).expect("override record")
    };
    record.and_then(|record| record.get(&field.into()).cloned())
}

/// Wraps a [`MemoryStore`] and fails reads or writes for one target.
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_reads_for: Option<TargetId>,
    pub fail_writes_for: Option<TargetId>,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self { inner, fail_reads_for: None, fail_writes_for: None }
    }

    fn check_read(&self, target: &TargetId) -> Result<(), StoreError> {
        if self.fail_reads_for.as_ref() == Some(target) {
            return Err(StoreError::Backend(format!("{target} is locked")));
        }
        Ok(())
    }

    fn check_write(&self, target: &TargetId) -> Result<(), StoreError> {
        if self.fail_writes_for.as_ref() == Some(target) {
            return Err(StoreError::Backend(format!("{target} is read-only")));
        }
        Ok(())
    }
}

impl TargetStore for FlakyStore {
    fn platform_keys(&self) -> Vec<PlatformKey> {
        self.inner.platform_keys()
    }

    fn default_record(&self, target: &TargetId) -> Result<SettingsRecord, StoreError> {
        self.check_read(target)?;
        self.inner.default_record(target)
    }

    fn set_default_record(&mut self, target: &TargetId, record: SettingsRecord) -> Result<(), StoreError> {
        self.check_write(target)?;
        self.inner.set_default_record(target, record)
    }

    fn override_record(
        &self,
        target: &TargetId,
        platform: &PlatformKey,
    ) -> Result<Option<SettingsRecord>, StoreError> {
        self.check_read(target)?;
        self.inner.override_record(target, platform)
    }

    fn set_override(
        &mut self,
        target: &TargetId,
        platform: &PlatformKey,
        record: SettingsRecord,
    ) -> Result<(), StoreError> {
        self.check_write(target)?;
        self.inner.set_override(target, platform, record)
    }

    fn clear_override(&mut self, target: &TargetId, platform: &PlatformKey) -> Result<(), StoreError> {
        self.check_write(target)?;
        self.inner.clear_override(target, platform)
    }
}
