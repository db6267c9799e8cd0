use crate::config::ReconcilerConfig;
use crate::error::{ApplyError, ReconcileError};
use crate::platform::{PlatformKey, PlatformKeySpace};
use crate::record::{FieldId, RecordSchema, SettingsRecord, Value};
use crate::store::{OverrideEntry, Target, TargetId, TargetStore};
use crate::view::{committed_default, resolved_override, AggregateView, OverrideState};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Built,
    Synced,
    Applied,
}

impl SessionState {
    pub fn is_built(self) -> bool {
        !matches!(self, SessionState::Uninitialized)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    SetDefault,
    SetOverride { created: bool },
    ClearOverride,
}

impl WriteOp {
    pub fn label(self) -> &'static str {
        match self {
            WriteOp::SetDefault => "set default",
            WriteOp::SetOverride { created: true } => "create override",
            WriteOp::SetOverride { created: false } => "update override",
            WriteOp::ClearOverride => "clear override",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedWrite {
    pub target: TargetId,
    pub platform: PlatformKey,
    pub op: WriteOp,
}

impl fmt::Display for AppliedWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' on {}", self.op.label(), self.target, self.platform)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub writes: Vec<AppliedWrite>,
    pub skipped_unchanged: usize,
}

impl ApplyReport {
    pub fn targets_touched(&self) -> BTreeSet<&TargetId> {
        self.writes.iter().map(|write| &write.target).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

enum PlannedAction {
    SetDefault(SettingsRecord),
    SetOverride { record: SettingsRecord, created: bool },
    ClearOverride,
}

struct PlannedWrite {
    target: usize,
    platform: PlatformKey,
    action: PlannedAction,
}

impl PlannedWrite {
    fn op(&self) -> WriteOp {
        match &self.action {
            PlannedAction::SetDefault(_) => WriteOp::SetDefault,
            PlannedAction::SetOverride { created, .. } => WriteOp::SetOverride { created: *created },
            PlannedAction::ClearOverride => WriteOp::ClearOverride,
        }
    }
}

/// Editing session over the import settings of a multi-selection.
///
/// The session reads every target once in [`Reconciler::build`], lets the
/// caller edit one [`AggregateView`] per platform, and writes back in
/// [`Reconciler::apply`]. Only explicitly edited fields and override toggles
/// reach the store; values that disagree across the selection and were never
/// edited survive a commit unchanged.
pub struct Reconciler {
    schema: RecordSchema,
    config: ReconcilerConfig,
    state: SessionState,
    platforms: PlatformKeySpace,
    targets: Vec<Target>,
    views: Vec<AggregateView>,
}

impl Reconciler {
    pub fn new(schema: RecordSchema, config: ReconcilerConfig) -> Self {
        Self {
            schema,
            config,
            state: SessionState::Uninitialized,
            platforms: PlatformKeySpace::default(),
            targets: Vec::new(),
            views: Vec::new(),
        }
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn platforms(&self) -> &PlatformKeySpace {
        &self.platforms
    }

    /// Session snapshot of the selected targets, in selection order.
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// Platforms configured explicitly, or else the ones the store reports.
    pub fn platform_space<S>(&self, store: &S) -> PlatformKeySpace
    where
        S: TargetStore + ?Sized,
    {
        self.config.platform_space().unwrap_or_else(|| PlatformKeySpace::new(store.platform_keys()))
    }

    pub fn build<S>(
        &mut self,
        store: &S,
        selection: &[TargetId],
        platforms: &PlatformKeySpace,
    ) -> Result<(), ReconcileError>
    where
        S: TargetStore + ?Sized,
    {
        self.state = SessionState::Uninitialized;
        self.targets.clear();
        self.views.clear();

        if selection.is_empty() {
            return Err(ReconcileError::EmptySelection);
        }
        let mut seen = BTreeSet::new();
        for id in selection {
            if !seen.insert(id) {
                return Err(ReconcileError::DuplicateTarget(id.clone()));
            }
        }

        let mut targets = Vec::with_capacity(selection.len());
        for id in selection {
            let target = Target::read(store, id, platforms.platforms()).map_err(|(platform, source)| {
                ReconcileError::Read { target: id.clone(), platform, source }
            })?;
            self.check_shape(&target)?;
            targets.push(target);
        }

        tracing::debug!(
            schema = self.schema.name(),
            targets = targets.len(),
            platforms = platforms.len(),
            "built import settings session"
        );
        self.platforms = platforms.clone();
        self.targets = targets;
        self.rebuild_views();
        self.state = SessionState::Built;
        Ok(())
    }

    fn check_shape(&self, target: &Target) -> Result<(), ReconcileError> {
        let mismatch = |platform: &PlatformKey| ReconcileError::SchemaMismatch {
            target: target.id.clone(),
            platform: platform.clone(),
            schema: self.schema.name().to_string(),
        };
        if !target.default_record.conforms_to(&self.schema) {
            return Err(mismatch(&PlatformKey::Default));
        }
        for (platform, entry) in &target.overrides {
            if entry.present && !entry.record.conforms_to(&self.schema) {
                return Err(mismatch(platform));
            }
        }
        Ok(())
    }

    fn ensure_built(&self) -> Result<(), ReconcileError> {
        if self.state.is_built() {
            Ok(())
        } else {
            Err(ReconcileError::NotBuilt)
        }
    }

    /// Refreshes inheritance from the Default view on every other platform.
    pub fn sync(&mut self) -> Result<(), ReconcileError> {
        self.ensure_built()?;
        if let Some((default_view, rest)) = self.views.split_first_mut() {
            for view in rest {
                view.sync(default_view, &self.targets);
            }
        }
        self.state = SessionState::Synced;
        Ok(())
    }

    /// Drops every pending edit and toggle and rebuilds the views from the
    /// session snapshot.
    pub fn discard(&mut self) -> Result<(), ReconcileError> {
        self.ensure_built()?;
        self.rebuild_views();
        self.state = SessionState::Built;
        tracing::debug!(schema = self.schema.name(), "discarded pending import settings edits");
        Ok(())
    }

    /// One view per platform key, Default first. A built session always holds
    /// at least one target.
    fn rebuild_views(&mut self) {
        self.views = match self.targets.split_first() {
            Some((first, rest)) => {
                self.platforms.keys().iter().map(|platform| AggregateView::build(platform, first, rest)).collect()
            }
            None => Vec::new(),
        };
    }

    pub fn views(&self) -> impl Iterator<Item = &AggregateView> {
        self.views.iter()
    }

    pub fn view(&self, platform: &PlatformKey) -> Option<&AggregateView> {
        self.views.iter().find(|view| view.platform() == platform)
    }

    /// Raw access for callers batching edits. Call [`Reconciler::sync`] after
    /// touching the Default view or an override flag.
    pub fn view_mut(&mut self, platform: &PlatformKey) -> Option<&mut AggregateView> {
        self.views.iter_mut().find(|view| view.platform() == platform)
    }

    fn built_view_mut(&mut self, platform: &PlatformKey) -> Result<&mut AggregateView, ReconcileError> {
        self.ensure_built()?;
        self.view_mut(platform).ok_or_else(|| ReconcileError::UnknownPlatform(platform.clone()))
    }

    pub fn override_state(&self, platform: &PlatformKey) -> Result<OverrideState, ReconcileError> {
        self.ensure_built()?;
        self.view(platform)
            .map(AggregateView::override_state)
            .ok_or_else(|| ReconcileError::UnknownPlatform(platform.clone()))
    }

    pub fn edit_field(
        &mut self,
        platform: &PlatformKey,
        field: impl Into<FieldId>,
        value: Value,
    ) -> Result<(), ReconcileError> {
        let field = field.into();
        self.built_view_mut(platform)?.edit_field(&field, value)?;
        if platform.is_default() {
            self.sync()?;
        }
        Ok(())
    }

    pub fn set_override_for_all(&mut self, platform: &PlatformKey, enabled: bool) -> Result<(), ReconcileError> {
        self.built_view_mut(platform)?.set_override_for_all(enabled)?;
        self.sync()
    }

    pub fn has_pending_changes(&self) -> bool {
        self.views.iter().any(AggregateView::has_pending_changes)
    }

    /// Commits the session. Default goes first so that overrides created in
    /// the same commit start from the updated Default record.
    ///
    /// Writes run in a fixed order (Default, then platforms in key-space order,
    /// targets in selection order). The first store failure stops the commit;
    /// writes already made stay made and are listed in the error, and pending
    /// edits are kept so the caller can retry.
    pub fn apply<S>(&mut self, store: &mut S) -> Result<ApplyReport, ApplyError>
    where
        S: TargetStore + ?Sized,
    {
        if !self.state.is_built() {
            return Err(ApplyError::NotBuilt);
        }
        let (plan, skipped_unchanged) = self.plan_writes();
        let attempted = plan.len();
        let mut writes = Vec::with_capacity(attempted);

        for planned in plan {
            let target_id = self.targets[planned.target].id.clone();
            let write = AppliedWrite {
                target: target_id.clone(),
                platform: planned.platform.clone(),
                op: planned.op(),
            };
            let result = match &planned.action {
                PlannedAction::SetDefault(record) => store.set_default_record(&target_id, record.clone()),
                PlannedAction::SetOverride { record, .. } => {
                    store.set_override(&target_id, &planned.platform, record.clone())
                }
                PlannedAction::ClearOverride => store.clear_override(&target_id, &planned.platform),
            };
            if let Err(source) = result {
                tracing::warn!(
                    target_id = %write.target,
                    platform = %write.platform,
                    committed = writes.len(),
                    attempted,
                    error = %source,
                    "import settings commit stopped"
                );
                return Err(ApplyError::Write { completed: writes, failed: write, attempted, source });
            }
            self.record_write(planned);
            writes.push(write);
        }

        self.rebuild_views();
        self.state = SessionState::Applied;
        tracing::info!(
            schema = self.schema.name(),
            writes = writes.len(),
            skipped_unchanged,
            "applied import settings"
        );
        Ok(ApplyReport { writes, skipped_unchanged })
    }

    fn plan_writes(&self) -> (Vec<PlannedWrite>, usize) {
        let skip_unchanged = self.config.skip_unchanged_writes;
        let mut plan = Vec::new();
        let mut skipped = 0;
        let Some((default_view, platform_views)) = self.views.split_first() else {
            return (plan, skipped);
        };

        for (index, target) in self.targets.iter().enumerate() {
            let record = committed_default(target, default_view);
            if skip_unchanged && record == target.default_record {
                skipped += 1;
            } else {
                plan.push(PlannedWrite {
                    target: index,
                    platform: PlatformKey::Default,
                    action: PlannedAction::SetDefault(record),
                });
            }
        }

        for view in platform_views {
            let platform = view.platform();
            for (index, target) in self.targets.iter().enumerate() {
                let was_present = target.is_overridden(platform);
                let present = view.forced_override().unwrap_or(was_present);
                match (was_present, present) {
                    (true, false) => plan.push(PlannedWrite {
                        target: index,
                        platform: platform.clone(),
                        action: PlannedAction::ClearOverride,
                    }),
                    (false, false) => {}
                    (_, true) => {
                        let mut record = resolved_override(target, platform, default_view).into_owned();
                        view.commit_into(&mut record);
                        let unchanged = was_present && target.effective(platform) == &record;
                        if skip_unchanged && unchanged {
                            skipped += 1;
                        } else {
                            plan.push(PlannedWrite {
                                target: index,
                                platform: platform.clone(),
                                action: PlannedAction::SetOverride { record, created: !was_present },
                            });
                        }
                    }
                }
            }
        }
        (plan, skipped)
    }

    fn record_write(&mut self, planned: PlannedWrite) {
        let target = &mut self.targets[planned.target];
        match planned.action {
            PlannedAction::SetDefault(record) => {
                for entry in target.overrides.values_mut().filter(|entry| !entry.present) {
                    entry.record = record.clone();
                }
                target.default_record = record;
            }
            PlannedAction::SetOverride { record, .. } => {
                target.overrides.insert(planned.platform, OverrideEntry { present: true, record });
            }
            PlannedAction::ClearOverride => {
                let record = target.default_record.clone();
                target.overrides.insert(planned.platform, OverrideEntry { present: false, record });
            }
        }
    }
}
