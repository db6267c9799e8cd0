pub mod cli;
pub mod config;
pub mod error;
pub mod platform;
pub mod presets;
pub mod reconciler;
pub mod record;
pub mod store;
pub mod view;

pub use config::ReconcilerConfig;
pub use error::{ApplyError, ReconcileError};
pub use platform::{PlatformKey, PlatformKeySpace};
pub use reconciler::{AppliedWrite, ApplyReport, Reconciler, SessionState, WriteOp};
pub use record::{FieldId, FieldKind, RecordSchema, SettingsRecord, Value};
pub use store::{MemoryStore, OverrideEntry, Target, TargetId, TargetStore};
pub use view::{AggregateView, OverrideState};
