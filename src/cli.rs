use crate::config::ReconcilerConfig;
use crate::platform::{PlatformKey, PlatformKeySpace};
use crate::presets::ImportPreset;
use crate::reconciler::Reconciler;
use crate::record::{FieldId, Value};
use crate::store::{MemoryStore, TargetId};
use crate::view::AggregateView;
use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::PathBuf;

const USAGE: &str = "usage: import_settings_tool <manifest.json> [--config <file>] <init|show|set> [options]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCommand {
    Init { preset: ImportPreset, assets: Vec<TargetId>, platforms: Vec<String> },
    Show { platform: Option<PlatformKey> },
    Set(SetCommand),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SetCommand {
    pub platform: Option<PlatformKey>,
    pub override_flag: Option<bool>,
    pub fields: Vec<(FieldId, String)>,
    pub targets: Vec<TargetId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolArgs {
    pub manifest: PathBuf,
    pub config: Option<PathBuf>,
    pub command: ToolCommand,
}

impl ToolArgs {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut iter = args.into_iter().map(|arg| arg.as_ref().to_string());
        let _ = iter.next(); // skip program name if present
        let manifest = iter.next().map(PathBuf::from).ok_or_else(|| anyhow!("Missing manifest path. {USAGE}"))?;
        let mut config = None;
        let mut command_name = None;
        let mut rest = Vec::new();
        while let Some(arg) = iter.next() {
            if command_name.is_none() && arg == "--config" {
                let value = iter.next().ok_or_else(|| anyhow!("Expected a value after '--config'"))?;
                config = Some(PathBuf::from(value));
            } else if command_name.is_none() {
                command_name = Some(arg);
            } else {
                rest.push(arg);
            }
        }
        let command_name = command_name.ok_or_else(|| anyhow!("Missing command. {USAGE}"))?;
        let command = match command_name.as_str() {
            "init" => parse_init(rest)?,
            "show" => parse_show(rest)?,
            "set" => parse_set(rest)?,
            other => bail!("Unknown command '{other}'. Supported commands: init, show, set."),
        };
        Ok(Self { manifest, config, command })
    }
}

fn flag_pairs(args: Vec<String>) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    let mut iter = args.into_iter();
    while let Some(flag) = iter.next() {
        let Some(key) = flag.strip_prefix("--") else {
            bail!("Unexpected argument '{flag}'. Options take the form --name <value>.");
        };
        let value = iter.next().ok_or_else(|| anyhow!("Expected a value after '{flag}'"))?;
        pairs.push((key.to_string(), value));
    }
    Ok(pairs)
}

fn split_list(value: &str) -> impl Iterator<Item = String> + '_ {
    value.split(',').map(str::trim).filter(|item| !item.is_empty()).map(str::to_string)
}

fn parse_init(args: Vec<String>) -> Result<ToolCommand> {
    let mut preset = None;
    let mut assets = Vec::new();
    let mut platforms = Vec::new();
    for (key, value) in flag_pairs(args)? {
        match key.as_str() {
            "preset" => {
                preset = Some(
                    ImportPreset::from_name(&value)
                        .ok_or_else(|| anyhow!("Unknown preset '{value}'. Use texture, audio, video or plugin."))?,
                );
            }
            "assets" => assets.extend(split_list(&value).map(TargetId::from)),
            "platforms" => platforms.extend(split_list(&value)),
            _ => bail!("Unknown flag '--{key}'. Supported flags: --preset, --assets, --platforms."),
        }
    }
    let preset = preset.ok_or_else(|| anyhow!("init requires --preset"))?;
    Ok(ToolCommand::Init { preset, assets, platforms })
}

fn parse_show(args: Vec<String>) -> Result<ToolCommand> {
    let mut platform = None;
    for (key, value) in flag_pairs(args)? {
        match key.as_str() {
            "platform" => platform = Some(PlatformKey::named(value)),
            _ => bail!("Unknown flag '--{key}'. Supported flags: --platform."),
        }
    }
    Ok(ToolCommand::Show { platform })
}

fn parse_set(args: Vec<String>) -> Result<ToolCommand> {
    let mut command = SetCommand::default();
    for (key, value) in flag_pairs(args)? {
        match key.as_str() {
            "platform" => command.platform = Some(PlatformKey::named(value)),
            "override" => command.override_flag = Some(parse_bool_flag("override", &value)?),
            "field" => {
                let (name, literal) = value
                    .split_once('=')
                    .ok_or_else(|| anyhow!("Invalid --field '{value}'. Use --field name=value."))?;
                command.fields.push((FieldId::new(name.trim()), literal.trim().to_string()));
            }
            "targets" => command.targets.extend(split_list(&value).map(TargetId::from)),
            _ => bail!("Unknown flag '--{key}'. Supported flags: --platform, --override, --field, --targets."),
        }
    }
    if command.override_flag.is_none() && command.fields.is_empty() {
        bail!("set needs at least one --override or --field");
    }
    Ok(ToolCommand::Set(command))
}

fn parse_bool_flag(flag: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        other => bail!("Invalid {flag} value '{other}'. Use on/off or true/false."),
    }
}

/// Runs one tool invocation and returns the text to print.
pub fn run(args: &ToolArgs) -> Result<String> {
    let config = args.config.as_ref().map(ReconcilerConfig::load_or_default).unwrap_or_default();
    match &args.command {
        ToolCommand::Init { preset, assets, platforms } => {
            let keys = PlatformKeySpace::from_names(platforms.iter().cloned());
            let mut store = MemoryStore::new(preset.schema(), keys.platforms().cloned());
            for asset in assets {
                store.insert_target(asset.clone());
            }
            store.save_to_path(&args.manifest)?;
            Ok(format!(
                "wrote {} manifest with {} assets and {} platforms to {}\n",
                preset.name(),
                assets.len(),
                keys.platforms().count(),
                args.manifest.display()
            ))
        }
        ToolCommand::Show { platform } => {
            let store = MemoryStore::load_from_path(&args.manifest)?;
            let reconciler = open_session(&store, config, &[])?;
            let mut out = String::new();
            for view in reconciler.views() {
                if platform.as_ref().is_some_and(|wanted| wanted != view.platform()) {
                    continue;
                }
                out.push_str(&render_view(view, reconciler.config()));
            }
            if out.is_empty() {
                if let Some(platform) = platform {
                    bail!("Platform '{platform}' is not part of {}", args.manifest.display());
                }
            }
            Ok(out)
        }
        ToolCommand::Set(command) => {
            let mut store = MemoryStore::load_from_path(&args.manifest)?;
            let mut reconciler = open_session(&store, config, &command.targets)?;
            let platform = command.platform.clone().unwrap_or(PlatformKey::Default);
            if let Some(enabled) = command.override_flag {
                reconciler
                    .set_override_for_all(&platform, enabled)
                    .with_context(|| format!("Toggling override on {platform}"))?;
            }
            for (field, literal) in &command.fields {
                let kind = reconciler
                    .schema()
                    .kind_of(field)
                    .ok_or_else(|| anyhow!("Field '{field}' is not part of the '{}' schema", store.schema().name()))?;
                let value = Value::parse(kind, literal)?;
                reconciler
                    .edit_field(&platform, field.clone(), value)
                    .with_context(|| format!("Editing '{field}' on {platform}"))?;
            }
            let report = reconciler.apply(&mut store)?;
            store.save_to_path(&args.manifest)?;
            let mut out: String = report.writes.iter().map(|write| format!("{write}\n")).collect();
            out.push_str(&format!(
                "applied {} writes across {} assets ({} unchanged)\n",
                report.writes.len(),
                report.targets_touched().len(),
                report.skipped_unchanged
            ));
            Ok(out)
        }
    }
}

fn open_session(store: &MemoryStore, config: ReconcilerConfig, targets: &[TargetId]) -> Result<Reconciler> {
    let mut reconciler = Reconciler::new(store.schema().clone(), config);
    let selection = if targets.is_empty() { store.target_ids() } else { targets.to_vec() };
    let space = reconciler.platform_space(store);
    reconciler.build(store, &selection, &space)?;
    reconciler.sync()?;
    Ok(reconciler)
}

pub fn render_view(view: &AggregateView, config: &ReconcilerConfig) -> String {
    let label = config.label(view.platform());
    let mut out = if view.is_default() {
        format!("[{label}]\n")
    } else {
        format!("[{label}] override: {}\n", view.override_state().label())
    };
    for (field, value) in view.representative().fields() {
        if view.is_mixed(field) {
            out.push_str(&format!("  {field} = —\n"));
        } else {
            out.push_str(&format!("  {field} = {value}\n"));
        }
    }
    out
}
