// src/models/core.rs
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::{TaxonomyError, TaxonomyResult};

/// A single row as exchanged with the entity store: column name -> JSON value.
pub type Record = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityStatus {
    #[default]
    Active,
    Inactive,
    Deprecated,
    Development,
}

/// Autonomy level of an agent. 1 is a department head, 5 a thin tool/API wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum TierLevel {
    Master = 1,
    Expert = 2,
    Specialist = 3,
    Worker = 4,
    Tool = 5,
}

impl TierLevel {
    pub fn as_i64(self) -> i64 {
        self as i64
    }

    pub fn label(self) -> &'static str {
        match self {
            TierLevel::Master => "master",
            TierLevel::Expert => "expert",
            TierLevel::Specialist => "specialist",
            TierLevel::Worker => "worker",
            TierLevel::Tool => "tool",
        }
    }
}

impl TryFrom<i64> for TierLevel {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(TierLevel::Master),
            2 => Ok(TierLevel::Expert),
            3 => Ok(TierLevel::Specialist),
            4 => Ok(TierLevel::Worker),
            5 => Ok(TierLevel::Tool),
            other => Err(format!("tier {} outside 1..=5", other)),
        }
    }
}

impl From<TierLevel> for i64 {
    fn from(tier: TierLevel) -> i64 {
        tier.as_i64()
    }
}

impl fmt::Display for TierLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_i64(), self.label())
    }
}

/// An agent as read from the store. Only the columns the engine reasons about are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub business_function: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub department: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    /// Raw stored tier; may be out of range in legacy rows. Use [`Entity::tier_level`].
    #[serde(default)]
    pub tier: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tools: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: EntityStatus,
}

impl Entity {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            display_name: name.clone(),
            name,
            description: None,
            business_function: None,
            department: None,
            role: None,
            tier: None,
            tools: Vec::new(),
            status: EntityStatus::Active,
        }
    }

    pub fn from_record(record: &Record) -> TaxonomyResult<Self> {
        serde_json::from_value(Value::Object(record.clone())).map_err(|e| {
            let id = record
                .get("id")
                .map(|v| v.to_string())
                .unwrap_or_else(|| "<no id>".to_string());
            TaxonomyError::MalformedRecord(format!("entity {}: {}", id, e))
        })
    }

    /// The validated tier, `None` when missing or outside 1..=5.
    pub fn tier_level(&self) -> Option<TierLevel> {
        self.tier.and_then(|t| TierLevel::try_from(t).ok())
    }

    /// Human label used in audit output.
    pub fn label(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

/// A stored row that did not parse as an [`Entity`]. Jobs report it instead of
/// dropping it.
#[derive(Debug, Clone, PartialEq)]
pub struct UnreadableRow {
    pub record: Record,
    pub reason: String,
}

impl UnreadableRow {
    pub fn id(&self) -> String {
        self.text("id").unwrap_or_else(|| "<no id>".to_string())
    }

    pub fn label(&self) -> String {
        self.text("display_name")
            .or_else(|| self.text("name"))
            .unwrap_or_else(|| self.id())
    }

    /// Name and display name exactly as stored, enough for duplicate grouping.
    pub fn duplicate_candidate(&self) -> Entity {
        let mut entity = Entity::new(self.id(), self.text("name").unwrap_or_default());
        entity.display_name = self.text("display_name").unwrap_or_default();
        entity
    }

    fn text(&self, column: &str) -> Option<String> {
        match self.record.get(column)? {
            Value::Null => None,
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Agent snapshot as loaded from the store, parse failures included.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedEntities {
    pub entities: Vec<Entity>,
    pub unreadable: Vec<UnreadableRow>,
}

impl LoadedEntities {
    pub fn from_records(records: &[Record]) -> Self {
        let mut loaded = Self::default();
        for record in records {
            match Entity::from_record(record) {
                Ok(entity) => loaded.entities.push(entity),
                Err(e) => loaded.unreadable.push(UnreadableRow {
                    record: record.clone(),
                    reason: e.to_string(),
                }),
            }
        }
        loaded
    }

    /// Every stored row, readable or not.
    pub fn len(&self) -> usize {
        self.entities.len() + self.unreadable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Readable entities followed by stand-ins for unreadable rows, so a row with a bad
    /// status still takes part in name collision checks.
    pub fn duplicate_candidates(&self) -> Vec<Entity> {
        self.entities
            .iter()
            .cloned()
            .chain(self.unreadable.iter().map(UnreadableRow::duplicate_candidate))
            .collect()
    }
}

/// Taxonomy references may be integer foreign keys; they are kept as strings.
fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number reference, got {}",
            other
        ))),
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
