use crate::error::ReconcileError;
use crate::platform::PlatformKey;
use crate::record::{FieldId, SettingsRecord, Value};
use crate::store::Target;
use std::borrow::Cow;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverrideState {
    Off,
    On,
    Mixed,
}

impl OverrideState {
    pub fn label(self) -> &'static str {
        match self {
            OverrideState::Off => "off",
            OverrideState::On => "on",
            OverrideState::Mixed => "mixed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ViewLayer {
    representative: SettingsRecord,
    different: BTreeSet<FieldId>,
}

impl ViewLayer {
    /// Diffs `rest` against `first`, which becomes the representative.
    fn diff<'a>(first: &SettingsRecord, rest: impl IntoIterator<Item = &'a SettingsRecord>) -> Self {
        let representative = first.clone();
        let mut different = BTreeSet::new();
        for record in rest {
            different.extend(record.diff(&representative).cloned());
        }
        Self { representative, different }
    }
}

/// Merged settings of one platform across the selected targets.
///
/// `shown` is what callers read and edit. Sync either mirrors the Default view
/// into it or re-diffs the records this platform would hold after Apply, so it
/// never loses information about the selection itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateView {
    platform: PlatformKey,
    shown: ViewLayer,
    pending: BTreeSet<FieldId>,
    overridden_is_different: bool,
    first_overridden: bool,
    forced_override: Option<bool>,
}

impl AggregateView {
    pub(crate) fn build(platform: &PlatformKey, first: &Target, rest: &[Target]) -> Self {
        let shown = ViewLayer::diff(first.effective(platform), rest.iter().map(|target| target.effective(platform)));
        let first_overridden = first.is_overridden(platform);
        let overridden_is_different = !platform.is_default()
            && rest.iter().any(|target| target.is_overridden(platform) != first_overridden);
        Self {
            platform: platform.clone(),
            shown,
            pending: BTreeSet::new(),
            overridden_is_different,
            first_overridden,
            forced_override: None,
        }
    }

    pub fn platform(&self) -> &PlatformKey {
        &self.platform
    }

    pub fn is_default(&self) -> bool {
        self.platform.is_default()
    }

    pub fn representative(&self) -> &SettingsRecord {
        &self.shown.representative
    }

    pub fn value(&self, field: &FieldId) -> Option<&Value> {
        self.shown.representative.get(field)
    }

    pub fn is_mixed(&self, field: &FieldId) -> bool {
        self.shown.different.contains(field)
    }

    pub fn is_pending(&self, field: &FieldId) -> bool {
        self.pending.contains(field)
    }

    pub fn mixed_fields(&self) -> impl Iterator<Item = &FieldId> {
        self.shown.different.iter()
    }

    pub fn pending_fields(&self) -> impl Iterator<Item = &FieldId> {
        self.pending.iter()
    }

    pub fn overridden_is_different(&self) -> bool {
        self.overridden_is_different
    }

    pub fn forced_override(&self) -> Option<bool> {
        self.forced_override
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.pending.is_empty() || self.forced_override.is_some()
    }

    /// Override flag as the UI should show it. The Default platform always
    /// reports `On`: its record is what every target imports with.
    pub fn override_state(&self) -> OverrideState {
        if self.is_default() {
            return OverrideState::On;
        }
        match self.forced_override {
            Some(true) => OverrideState::On,
            Some(false) => OverrideState::Off,
            None if self.overridden_is_different => OverrideState::Mixed,
            None if self.first_overridden => OverrideState::On,
            None => OverrideState::Off,
        }
    }

    /// True when the shown values mirror the Default view instead of this
    /// platform's own records.
    pub fn inherits_default(&self) -> bool {
        self.override_state() != OverrideState::On
    }

    /// Declares one value for every selected target. On non-Default platforms
    /// the override must be on for the whole selection first.
    pub fn edit_field(&mut self, field: &FieldId, value: Value) -> Result<(), ReconcileError> {
        let state = self.override_state();
        if state != OverrideState::On {
            tracing::warn!(
                platform = %self.platform,
                field = %field,
                state = state.label(),
                "ignoring edit on a platform whose override is not enabled for every target"
            );
            return Err(ReconcileError::OverrideNotUniform { platform: self.platform.clone(), state });
        }
        self.shown
            .representative
            .set(field, value)
            .map_err(|source| ReconcileError::Record { platform: self.platform.clone(), source })?;
        self.shown.different.remove(field);
        self.pending.insert(field.clone());
        Ok(())
    }

    pub fn set_override_for_all(&mut self, enabled: bool) -> Result<(), ReconcileError> {
        if self.is_default() {
            return Err(ReconcileError::OverrideOnDefault);
        }
        self.forced_override = Some(enabled);
        self.overridden_is_different = false;
        Ok(())
    }

    /// Refreshes every non-pending field, either from the Default view or from
    /// the override records `targets` would hold after Apply. Running it twice
    /// changes nothing.
    pub(crate) fn sync(&mut self, default_view: &AggregateView, targets: &[Target]) {
        if self.is_default() {
            return;
        }
        if self.inherits_default() {
            self.refresh_from(&default_view.shown);
            return;
        }
        let records: Vec<Cow<'_, SettingsRecord>> =
            targets.iter().map(|target| resolved_override(target, &self.platform, default_view)).collect();
        if let Some((first, rest)) = records.split_first() {
            let layer = ViewLayer::diff(first, rest.iter().map(|record| &**record));
            self.refresh_from(&layer);
        }
    }

    fn refresh_from(&mut self, source: &ViewLayer) {
        let Self { shown, pending, .. } = self;
        for (field, _) in source.representative.fields().filter(|(field, _)| !pending.contains(*field)) {
            shown.representative.copy_field_from(&source.representative, field);
            if source.different.contains(field) {
                shown.different.insert(field.clone());
            } else {
                shown.different.remove(field);
            }
        }
    }

    /// Writes this view's committed edits into `record`. Only explicit edits
    /// qualify: a field that was never edited either already holds the shown
    /// value on every target or is mixed.
    pub(crate) fn commit_into(&self, record: &mut SettingsRecord) {
        for field in self.pending.iter().filter(|field| !self.shown.different.contains(*field)) {
            record.copy_field_from(&self.shown.representative, field);
        }
    }
}

/// `target`'s Default record once the Default view's edits are committed.
pub(crate) fn committed_default(target: &Target, default_view: &AggregateView) -> SettingsRecord {
    let mut record = target.default_record.clone();
    default_view.commit_into(&mut record);
    record
}

/// Override record `target` holds for `platform` before this view's own edits
/// land: the stored override, or the committed Default it would be created from.
pub(crate) fn resolved_override<'a>(
    target: &'a Target,
    platform: &PlatformKey,
    default_view: &AggregateView,
) -> Cow<'a, SettingsRecord> {
    match target.overrides.get(platform).filter(|entry| entry.present) {
        Some(entry) => Cow::Borrowed(&entry.record),
        None => Cow::Owned(committed_default(target, default_view)),
    }
}
