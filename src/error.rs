use crate::platform::PlatformKey;
use crate::reconciler::AppliedWrite;
use crate::record::RecordError;
use crate::store::{StoreError, TargetId};
use crate::view::OverrideState;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("no selection has been built")]
    NotBuilt,

    #[error("selection is empty")]
    EmptySelection,

    #[error("target '{0}' appears more than once in the selection")]
    DuplicateTarget(TargetId),

    #[error("platform '{0}' is not part of this session")]
    UnknownPlatform(PlatformKey),

    #[error("platform '{platform}' override is {} across the selection; enable it for all targets before editing", .state.label())]
    OverrideNotUniform { platform: PlatformKey, state: OverrideState },

    #[error("the Default platform has no override flag")]
    OverrideOnDefault,

    #[error("edit on platform '{platform}' rejected: {source}")]
    Record {
        platform: PlatformKey,
        #[source]
        source: RecordError,
    },

    #[error("reading '{target}' for platform '{platform}' failed: {source}")]
    Read {
        target: TargetId,
        platform: PlatformKey,
        #[source]
        source: StoreError,
    },

    #[error("record of '{target}' for platform '{platform}' does not match the '{schema}' schema")]
    SchemaMismatch { target: TargetId, platform: PlatformKey, schema: String },
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ApplyError {
    #[error("apply requested before a selection was built")]
    NotBuilt,

    /// Writes before `failed` reached the store; nothing after it was attempted.
    #[error("{} of {} writes committed; {failed} failed: {source}", .completed.len(), .attempted)]
    Write {
        completed: Vec<AppliedWrite>,
        failed: AppliedWrite,
        attempted: usize,
        #[source]
        source: StoreError,
    },
}

impl ApplyError {
    pub fn completed(&self) -> &[AppliedWrite] {
        match self {
            ApplyError::NotBuilt => &[],
            ApplyError::Write { completed, .. } => completed,
        }
    }
}
