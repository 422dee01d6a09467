//! Event state entity - The singleton row holding the current event stage.
//!
//! The stage gates every public action: nominations are only accepted during
//! `NOMINATIONS`, votes only during `VOTING`. The row is created lazily and is
//! never deleted.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Phase of the event controlling which public action is permitted.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStage {
    /// Event is being prepared; no public action is allowed
    #[sea_orm(string_value = "SETUP")]
    Setup,
    /// Members may submit nominations
    #[sea_orm(string_value = "NOMINATIONS")]
    Nominations,
    /// Members may vote for finalists
    #[sea_orm(string_value = "VOTING")]
    Voting,
    /// Event is over
    #[sea_orm(string_value = "CLOSED")]
    Closed,
}

impl EventStage {
    /// Wire name of the stage, as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Setup => "SETUP",
            Self::Nominations => "NOMINATIONS",
            Self::Voting => "VOTING",
            Self::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for EventStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SETUP" => Ok(Self::Setup),
            "NOMINATIONS" => Ok(Self::Nominations),
            "VOTING" => Ok(Self::Voting),
            "CLOSED" => Ok(Self::Closed),
            other => Err(format!("Unknown event stage: {other}")),
        }
    }
}

/// Event state database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "event_state")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Current stage of the event
    pub state: EventStage,
    /// Whether clients should show the winners page
    pub winners_visible: bool,
    /// When the stage was last changed
    pub updated_at: DateTimeUtc,
}

/// `EventState` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
