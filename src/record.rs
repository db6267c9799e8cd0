use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(String);

impl FieldId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FieldId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for FieldId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Int,
    Float,
    Bool,
    Enum,
    Blob,
}

impl FieldKind {
    pub fn label(self) -> &'static str {
        match self {
            FieldKind::Int => "int",
            FieldKind::Float => "float",
            FieldKind::Bool => "bool",
            FieldKind::Enum => "enum",
            FieldKind::Blob => "blob",
        }
    }
}

/// A single setting value. Floats compare by bit pattern so that a stored
/// value either survives a commit exactly or is reported as changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Enum(u32),
    Blob(Option<String>),
}

impl Value {
    pub fn kind(&self) -> FieldKind {
        match self {
            Value::Int(_) => FieldKind::Int,
            Value::Float(_) => FieldKind::Float,
            Value::Bool(_) => FieldKind::Bool,
            Value::Enum(_) => FieldKind::Enum,
            Value::Blob(_) => FieldKind::Blob,
        }
    }

    pub fn parse(kind: FieldKind, text: &str) -> Result<Self, RecordError> {
        let text = text.trim();
        let invalid = || RecordError::InvalidLiteral { kind, literal: text.to_string() };
        match kind {
            FieldKind::Int => text.parse::<i64>().map(Value::Int).map_err(|_| invalid()),
            FieldKind::Float => text.parse::<f64>().map(Value::Float).map_err(|_| invalid()),
            FieldKind::Bool => match text.to_ascii_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => Ok(Value::Bool(true)),
                "0" | "false" | "off" | "no" => Ok(Value::Bool(false)),
                _ => Err(invalid()),
            },
            FieldKind::Enum => text.parse::<u32>().map(Value::Enum).map_err(|_| invalid()),
            FieldKind::Blob => {
                if text.is_empty() || text == "none" {
                    Ok(Value::Blob(None))
                } else {
                    Ok(Value::Blob(Some(text.to_string())))
                }
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Enum(a), Value::Enum(b)) => a == b,
            (Value::Blob(a), Value::Blob(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Enum(v) => write!(f, "#{v}"),
            Value::Blob(Some(reference)) => f.write_str(reference),
            Value::Blob(None) => f.write_str("none"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("unknown field '{0}'")]
    UnknownField(FieldId),
    #[error("field '{field}' holds {expected} values, got {actual}")]
    KindMismatch { field: FieldId, expected: &'static str, actual: &'static str },
    #[error("'{literal}' is not a valid {} literal", .kind.label())]
    InvalidLiteral { kind: FieldKind, literal: String },
    #[error("schema declares field '{0}' twice")]
    DuplicateField(FieldId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub id: FieldId,
    pub kind: FieldKind,
    pub default: Value,
}

/// Ordered field set shared by every record of one asset type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SchemaDef")]
pub struct RecordSchema {
    name: String,
    fields: Vec<FieldSpec>,
}

#[derive(Deserialize)]
struct SchemaDef {
    name: String,
    fields: Vec<FieldSpec>,
}

impl TryFrom<SchemaDef> for RecordSchema {
    type Error = RecordError;

    fn try_from(def: SchemaDef) -> Result<Self, Self::Error> {
        RecordSchema::from_fields(def.name, def.fields)
    }
}

impl RecordSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), fields: Vec::new() }
    }

    pub fn with_field(mut self, id: impl Into<FieldId>, default: Value) -> Self {
        let id = id.into();
        let kind = default.kind();
        self.fields.retain(|spec| spec.id != id);
        self.fields.push(FieldSpec { id, kind, default });
        self
    }

    pub fn from_fields(name: impl Into<String>, fields: Vec<FieldSpec>) -> Result<Self, RecordError> {
        let mut seen = std::collections::BTreeSet::new();
        for spec in &fields {
            if !seen.insert(spec.id.clone()) {
                return Err(RecordError::DuplicateField(spec.id.clone()));
            }
            if spec.default.kind() != spec.kind {
                return Err(RecordError::KindMismatch {
                    field: spec.id.clone(),
                    expected: spec.kind.label(),
                    actual: spec.default.kind().label(),
                });
            }
        }
        Ok(Self { name: name.into(), fields })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field_ids(&self) -> impl Iterator<Item = &FieldId> {
        self.fields.iter().map(|spec| &spec.id)
    }

    pub fn field(&self, id: &FieldId) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| &spec.id == id)
    }

    pub fn kind_of(&self, id: &FieldId) -> Option<FieldKind> {
        self.field(id).map(|spec| spec.kind)
    }
}

/// A total map from the schema's fields to values. Its shape is fixed at
/// construction; only values change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingsRecord {
    values: BTreeMap<FieldId, Value>,
}

impl SettingsRecord {
    pub fn from_schema(schema: &RecordSchema) -> Self {
        let values = schema.fields().iter().map(|spec| (spec.id.clone(), spec.default.clone())).collect();
        Self { values }
    }

    pub fn get(&self, field: &FieldId) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn set(&mut self, field: &FieldId, value: Value) -> Result<(), RecordError> {
        let slot = self.values.get_mut(field).ok_or_else(|| RecordError::UnknownField(field.clone()))?;
        if slot.kind() != value.kind() {
            return Err(RecordError::KindMismatch {
                field: field.clone(),
                expected: slot.kind().label(),
                actual: value.kind().label(),
            });
        }
        *slot = value;
        Ok(())
    }

    /// Copies one field from a record of the same shape. Returns false when
    /// either record lacks the field.
    pub(crate) fn copy_field_from(&mut self, source: &SettingsRecord, field: &FieldId) -> bool {
        match (self.values.get_mut(field), source.values.get(field)) {
            (Some(slot), Some(value)) if slot.kind() == value.kind() => {
                *slot = value.clone();
                true
            }
            _ => false,
        }
    }

    /// Builder-style `set` for call sites that construct fixtures from a schema.
    pub fn with(mut self, field: impl Into<FieldId>, value: Value) -> Result<Self, RecordError> {
        self.set(&field.into(), value)?;
        Ok(self)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&FieldId, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn conforms_to(&self, schema: &RecordSchema) -> bool {
        self.values.len() == schema.fields().len()
            && schema
                .fields()
                .iter()
                .all(|spec| self.values.get(&spec.id).is_some_and(|value| value.kind() == spec.kind))
    }

    /// Fields whose values differ between the two records.
    pub fn diff<'a>(&'a self, other: &'a SettingsRecord) -> impl Iterator<Item = &'a FieldId> + 'a {
        self.values.iter().filter(move |(id, value)| other.values.get(*id) != Some(*value)).map(|(id, _)| id)
    }
}
