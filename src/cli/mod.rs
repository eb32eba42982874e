//! CLI command definitions for taskflow.
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use crate::format::OutputFormat;
use crate::types::{EntityKind, EntityPatch, MoveDirection, NewEntity};
use clap::{Args, Parser, Subcommand};

/// Ordered task taxonomies: categories, priorities and statuses
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t, global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List a collection in display order
    List {
        /// categories, priorities or statuses
        kind: EntityKind,

        /// Case-insensitive filter on name, description and value
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Add a record at the end of a collection
    Add {
        kind: EntityKind,

        #[command(flatten)]
        fields: EntityFields,
    },

    /// Change fields of a record
    Update {
        kind: EntityKind,
        id: String,

        #[command(flatten)]
        fields: EntityFields,
    },

    /// Delete a record
    Remove { kind: EntityKind, id: String },

    /// Move a record one step up or down
    Move {
        kind: EntityKind,
        id: String,
        direction: MoveDirection,
    },

    /// Populate empty collections with default priorities and statuses
    Seed,

    /// Completion and priority statistics for a set of tasks
    Stats {
        /// Status name of each task (repeatable)
        #[arg(short, long = "status")]
        statuses: Vec<String>,

        /// Priority name of each task (repeatable)
        #[arg(short, long = "priority")]
        priorities: Vec<String>,
    },
}

/// Record fields shared by `add` and `update`.
#[derive(Args, Debug, Clone, Default)]
pub struct EntityFields {
    #[arg(long)]
    pub name: Option<String>,

    /// Machine-readable slug (priorities and statuses; derived from the name if omitted)
    #[arg(long)]
    pub value: Option<String>,

    /// Categories only
    #[arg(long)]
    pub description: Option<String>,

    /// Explicit order (default: after the last record)
    #[arg(long)]
    pub order: Option<u32>,

    #[arg(long)]
    pub color: Option<String>,

    #[arg(long = "icon")]
    pub icon_name: Option<String>,

    /// Mark a status as the completion status
    #[arg(long, overrides_with = "no_completion")]
    pub completion: bool,

    /// Clear the completion flag (update only)
    #[arg(long, overrides_with = "completion")]
    pub no_completion: bool,
}

impl EntityFields {
    /// `None` when neither switch was given.
    fn completion_flag(&self) -> Option<bool> {
        match (self.completion, self.no_completion) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }

    pub fn into_new(self) -> NewEntity {
        let is_completion_status = self.completion;
        NewEntity {
            name: self.name.unwrap_or_default(),
            value: self.value,
            description: self.description,
            order: self.order,
            color: self.color,
            icon_name: self.icon_name,
            is_completion_status,
        }
    }

    pub fn into_patch(self) -> EntityPatch {
        let is_completion_status = self.completion_flag();
        EntityPatch {
            name: self.name,
            value: self.value,
            description: self.description,
            order: self.order,
            color: self.color,
            icon_name: self.icon_name,
            is_completion_status,
        }
    }
}
