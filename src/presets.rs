use crate::record::{RecordSchema, Value};

/// Field sets of the importer panels that carry per-platform overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportPreset {
    Texture,
    Audio,
    Video,
    Plugin,
}

impl ImportPreset {
    pub const ALL: [ImportPreset; 4] =
        [ImportPreset::Texture, ImportPreset::Audio, ImportPreset::Video, ImportPreset::Plugin];

    pub fn name(self) -> &'static str {
        match self {
            ImportPreset::Texture => "texture",
            ImportPreset::Audio => "audio",
            ImportPreset::Video => "video",
            ImportPreset::Plugin => "plugin",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|preset| preset.name().eq_ignore_ascii_case(name))
    }

    pub fn schema(self) -> RecordSchema {
        match self {
            ImportPreset::Texture => texture_schema(),
            ImportPreset::Audio => audio_schema(),
            ImportPreset::Video => video_schema(),
            ImportPreset::Plugin => plugin_schema(),
        }
    }
}

pub fn texture_schema() -> RecordSchema {
    RecordSchema::new("texture")
        .with_field("max_size", Value::Int(2048))
        .with_field("resize_algorithm", Value::Enum(0))
        .with_field("format", Value::Enum(0))
        .with_field("compression", Value::Enum(1))
        .with_field("crunched", Value::Bool(false))
        .with_field("compression_quality", Value::Int(50))
        .with_field("allows_alpha_splitting", Value::Bool(false))
}

pub fn audio_schema() -> RecordSchema {
    RecordSchema::new("audio")
        .with_field("load_type", Value::Enum(0))
        .with_field("compression_format", Value::Enum(1))
        .with_field("quality", Value::Float(1.0))
        .with_field("sample_rate_setting", Value::Enum(0))
        .with_field("sample_rate_override", Value::Int(44_100))
        .with_field("preload_audio_data", Value::Bool(true))
}

pub fn video_schema() -> RecordSchema {
    RecordSchema::new("video")
        .with_field("enable_transcode", Value::Bool(false))
        .with_field("codec", Value::Enum(0))
        .with_field("resize_mode", Value::Enum(0))
        .with_field("custom_width", Value::Int(1280))
        .with_field("custom_height", Value::Int(720))
        .with_field("bitrate_mode", Value::Enum(1))
        .with_field("spatial_quality", Value::Enum(1))
}

pub fn plugin_schema() -> RecordSchema {
    RecordSchema::new("plugin")
        .with_field("compatible", Value::Bool(false))
        .with_field("cpu", Value::Enum(0))
        .with_field("os", Value::Enum(0))
        .with_field("placeholder", Value::Blob(None))
}
