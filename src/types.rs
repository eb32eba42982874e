//! Core types for ordered taxonomies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The three taxonomies whose display order is user-controlled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Category,
    Priority,
    Status,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::Category, EntityKind::Priority, EntityKind::Status];

    /// Store collection holding records of this kind.
    pub fn collection(&self) -> &'static str {
        match self {
            EntityKind::Category => "categories",
            EntityKind::Priority => "priorities",
            EntityKind::Status => "statuses",
        }
    }

    /// Singular noun used in messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Category => "category",
            EntityKind::Priority => "priority",
            EntityKind::Status => "status",
        }
    }

    /// Whether records carry a machine-readable `value` slug that must be unique.
    pub fn has_value(&self) -> bool {
        matches!(self, EntityKind::Priority | EntityKind::Status)
    }

    pub fn has_description(&self) -> bool {
        matches!(self, EntityKind::Category)
    }

    pub fn has_completion_flag(&self) -> bool {
        matches!(self, EntityKind::Status)
    }

    pub fn from_collection(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.collection() == name)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "category" | "categories" => Ok(EntityKind::Category),
            "priority" | "priorities" => Ok(EntityKind::Priority),
            "status" | "statuses" => Ok(EntityKind::Status),
            other => Err(format!("unknown entity kind: {}", other)),
        }
    }
}

/// A record of an ordered collection (category, priority or status).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedEntity {
    pub id: String,
    pub name: String,
    /// Category only.
    pub description: Option<String>,
    /// Priority and status only.
    pub value: Option<String>,
    pub order: u32,
    pub color: Option<String>,
    pub icon_name: Option<String>,
    /// Status only.
    #[serde(default)]
    pub is_completion_status: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Input for creating a record. `order: None` means append at the end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEntity {
    pub name: String,
    pub value: Option<String>,
    pub description: Option<String>,
    pub order: Option<u32>,
    pub color: Option<String>,
    pub icon_name: Option<String>,
    #[serde(default)]
    pub is_completion_status: bool,
}

impl NewEntity {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_order(mut self, order: u32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn completion(mut self) -> Self {
        self.is_completion_status = true;
        self
    }
}

/// Field-level partial update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityPatch {
    pub name: Option<String>,
    pub value: Option<String>,
    pub description: Option<String>,
    pub order: Option<u32>,
    pub color: Option<String>,
    pub icon_name: Option<String>,
    pub is_completion_status: Option<bool>,
}

impl EntityPatch {
    pub fn is_empty(&self) -> bool {
        self == &EntityPatch::default()
    }

    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }
}

/// One entry of a batch reorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAssignment {
    pub id: String,
    pub order: u32,
}

impl OrderAssignment {
    pub fn new(id: impl Into<String>, order: u32) -> Self {
        Self {
            id: id.into(),
            order,
        }
    }
}

/// Direction of a discrete move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveDirection {
    Up,
    Down,
}

impl MoveDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoveDirection::Up => "up",
            MoveDirection::Down => "down",
        }
    }
}

impl fmt::Display for MoveDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MoveDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "up" => Ok(MoveDirection::Up),
            "down" => Ok(MoveDirection::Down),
            other => Err(format!("unknown direction: {}", other)),
        }
    }
}

/// Derive a value slug from a display name: lowercase, whitespace runs become `-`.
pub fn slugify(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}
