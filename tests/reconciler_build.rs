mod support;

use kestrel_import_settings::store::StoreError;
use kestrel_import_settings::{
    FieldId, MemoryStore, OverrideState, PlatformKey, ReconcileError, Reconciler, ReconcilerConfig, RecordSchema,
    SessionState, TargetStore, Value,
};
use std::collections::BTreeSet;
use support::{desktop, ids, mobile, record_with, texture_store, FlakyStore};

fn build<S: TargetStore>(store: &S, selection: &[&str]) -> Reconciler {
    let mut reconciler = Reconciler::new(support::texture_schema(), ReconcilerConfig::default());
    let space = reconciler.platform_space(store);
    reconciler.build(store, &ids(selection), &space).expect("build session");
    reconciler
}

fn mixed(reconciler: &Reconciler, platform: &PlatformKey) -> BTreeSet<String> {
    let view = reconciler.view(platform).expect("view for platform");
    view.mixed_fields().map(|field| field.as_str().to_string()).collect()
}

#[test]
fn uniform_selection_has_no_mixed_fields() {
    let store = texture_store();
    let reconciler = build(&store, &["a", "b", "c"]);
    for view in reconciler.views() {
        assert_eq!(view.mixed_fields().count(), 0, "{} should be uniform", view.platform());
        assert_eq!(view.pending_fields().count(), 0);
    }
    assert_eq!(reconciler.override_state(&mobile()), Ok(OverrideState::Off));
}

#[test]
fn diff_covers_exactly_the_disagreeing_fields() {
    let mut store = texture_store();
    store.set_default_record(&"b".into(), record_with(&store, "format", Value::Enum(4))).unwrap();
    let mobile_record = record_with(&store, "mipmaps", Value::Bool(false));
    for id in ["a", "b", "c"] {
        store.set_override(&id.into(), &mobile(), mobile_record.clone()).unwrap();
    }

    let reconciler = build(&store, &["a", "b", "c"]);
    assert_eq!(mixed(&reconciler, &PlatformKey::Default), BTreeSet::from(["format".to_string()]));
    assert!(mixed(&reconciler, &mobile()).is_empty(), "every target overrides Mobile identically");
    assert_eq!(reconciler.override_state(&mobile()), Ok(OverrideState::On));
    // Desktop inherits each target's own default, so the Default divergence shows there too.
    assert_eq!(mixed(&reconciler, &desktop()), BTreeSet::from(["format".to_string()]));
}

#[test]
fn inherited_values_take_part_in_the_diff() {
    let mut store = texture_store();
    let small = record_with(&store, "max_size", Value::Int(512));
    store.set_override(&"a".into(), &mobile(), small.clone()).unwrap();
    store.set_override(&"b".into(), &mobile(), small).unwrap();

    let reconciler = build(&store, &["a", "b", "c"]);
    let view = reconciler.view(&mobile()).unwrap();
    assert!(view.is_mixed(&FieldId::from("max_size")));
    assert_eq!(view.value(&"max_size".into()), Some(&Value::Int(512)), "first target wins");
    assert!(view.overridden_is_different());
    assert_eq!(view.override_state(), OverrideState::Mixed);
}

#[test]
fn single_target_selection_is_never_mixed() {
    let mut store = texture_store();
    store.set_override(&"c".into(), &mobile(), record_with(&store, "format", Value::Enum(9))).unwrap();
    let reconciler = build(&store, &["c"]);
    assert!(reconciler.views().all(|view| view.mixed_fields().count() == 0));
    assert_eq!(reconciler.override_state(&mobile()), Ok(OverrideState::On));
}

#[test]
fn read_failure_fails_the_whole_build() {
    let mut store = FlakyStore::new(texture_store());
    store.fail_reads_for = Some("b".into());
    let mut reconciler = Reconciler::new(support::texture_schema(), ReconcilerConfig::default());
    let space = reconciler.platform_space(&store);
    let err = reconciler.build(&store, &ids(&["a", "b"]), &space).unwrap_err();
    assert!(matches!(
        err,
        ReconcileError::Read { ref target, platform: PlatformKey::Default, source: StoreError::Backend(_) }
            if target.as_str() == "b"
    ));
    assert_eq!(reconciler.state(), SessionState::Uninitialized);
    assert_eq!(reconciler.views().count(), 0);
}

#[test]
fn records_from_a_different_schema_are_rejected() {
    let other = RecordSchema::new("audio").with_field("quality", Value::Float(0.5));
    let mut store = MemoryStore::new(other, [mobile()]);
    store.insert_target("a");
    let mut reconciler = Reconciler::new(support::texture_schema(), ReconcilerConfig::default());
    let space = reconciler.platform_space(&store);
    let err = reconciler.build(&store, &ids(&["a"]), &space).unwrap_err();
    assert!(matches!(err, ReconcileError::SchemaMismatch { platform: PlatformKey::Default, .. }));
}

#[test]
fn empty_selection_is_a_usage_error() {
    let store = texture_store();
    let mut reconciler = Reconciler::new(support::texture_schema(), ReconcilerConfig::default());
    let space = reconciler.platform_space(&store);
    assert_eq!(reconciler.build(&store, &[], &space), Err(ReconcileError::EmptySelection));
}

#[test]
fn configured_platforms_limit_the_session() {
    let store = texture_store();
    let config = ReconcilerConfig { platforms: vec!["Mobile".to_string()], ..ReconcilerConfig::default() };
    let mut reconciler = Reconciler::new(support::texture_schema(), config);
    let space = reconciler.platform_space(&store);
    reconciler.build(&store, &ids(&["a", "b"]), &space).expect("build");
    let platforms: Vec<_> = reconciler.views().map(|view| view.platform().clone()).collect();
    assert_eq!(platforms, vec![PlatformKey::Default, mobile()]);
    assert!(reconciler.view(&desktop()).is_none());
}
