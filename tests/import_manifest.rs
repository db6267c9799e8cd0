mod support;

use kestrel_import_settings::cli::{run, ToolArgs};
use kestrel_import_settings::{MemoryStore, PlatformKey, TargetStore, Value};
use support::{mobile, record_with, stored_value, texture_store};
use tempfile::tempdir;

fn tool(manifest: &std::path::Path, args: &[&str]) -> anyhow::Result<String> {
    let manifest = manifest.to_string_lossy().to_string();
    let mut argv = vec!["import_settings_tool".to_string(), manifest];
    argv.extend(args.iter().map(|arg| arg.to_string()));
    run(&ToolArgs::parse(argv)?)
}

#[test]
fn manifest_roundtrip_preserves_overrides() {
    let mut store = texture_store();
    store.set_override(&"b".into(), &mobile(), record_with(&store, "max_size", Value::Int(256))).unwrap();

    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("settings/textures.json");
    store.save_to_path(&path).expect("save manifest");
    let loaded = MemoryStore::load_from_path(&path).expect("load manifest");
    assert_eq!(loaded, store);
    assert_eq!(loaded.platform_keys(), vec![PlatformKey::Default, mobile(), PlatformKey::named("Desktop")]);
}

#[test]
fn manifest_with_foreign_records_is_rejected() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("broken.json");
    let json = r#"{
        "schema": { "name": "texture", "fields": [ { "id": "max_size", "kind": "int", "default": { "kind": "int", "value": 2048 } } ] },
        "platforms": ["Mobile"],
        "targets": [ { "id": "a", "default": { "max_size": { "kind": "bool", "value": true } } } ]
    }"#;
    std::fs::write(&path, json).expect("write manifest");
    let err = MemoryStore::load_from_path(&path).unwrap_err();
    assert!(format!("{err:#}").contains("does not match"), "unexpected error: {err:#}");
}

#[test]
fn tool_edits_a_manifest_end_to_end() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("textures.json");

    tool(&path, &["init", "--preset", "texture", "--assets", "hero.png,tree.png", "--platforms", "Android,iOS"])
        .expect("init manifest");

    let out = tool(
        &path,
        &["set", "--platform", "Android", "--override", "on", "--field", "max_size=512", "--targets", "hero.png"],
    )
    .expect("override hero on Android");
    assert!(out.contains("create override 'hero.png' on Android"), "unexpected output: {out}");
    assert!(out.ends_with("applied 1 writes across 1 assets (1 unchanged)\n"), "unexpected output: {out}");

    let store = MemoryStore::load_from_path(&path).expect("load manifest");
    let android = PlatformKey::named("Android");
    assert_eq!(stored_value(&store, "hero.png", &android, "max_size"), Some(Value::Int(512)));
    assert_eq!(stored_value(&store, "tree.png", &android, "max_size"), None);

    let shown = tool(&path, &["show", "--platform", "Android"]).expect("show Android");
    assert!(shown.starts_with("[Android] override: mixed"), "unexpected output: {shown}");
    assert!(shown.contains("max_size = 2048"), "mixed overrides display the Default values: {shown}");

    let err = tool(&path, &["set", "--platform", "Android", "--field", "max_size=64"]).unwrap_err();
    assert!(format!("{err:#}").contains("enable it for all targets"), "unexpected error: {err:#}");

    tool(&path, &["set", "--field", "max_size=1024"]).expect("edit default");
    let shown = tool(&path, &["show", "--platform", "Default"]).expect("show Default");
    assert!(shown.contains("max_size = 1024"), "unexpected output: {shown}");
    let store = MemoryStore::load_from_path(&path).expect("reload manifest");
    assert_eq!(stored_value(&store, "hero.png", &android, "max_size"), Some(Value::Int(512)));
}

#[test]
fn tool_marks_mixed_fields() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("textures.json");
    let mut store = texture_store();
    store.set_default_record(&"c".into(), record_with(&store, "format", Value::Enum(3))).unwrap();
    store.save_to_path(&path).expect("save manifest");

    let shown = tool(&path, &["show", "--platform", "Default"]).expect("show Default");
    assert!(shown.contains("format = —"), "unexpected output: {shown}");
    assert!(shown.contains("mipmaps = true"), "unexpected output: {shown}");
}
