//! Category entity - An award category members nominate and vote in.
//!
//! Categories are ordered by `order` for display. A category may carry a
//! published winner; `winner_announced` is only ever true while
//! `winner_candidate_id` is set.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Category database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    /// Unique identifier for the category
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Display name (e.g., "Best Commander")
    pub name: String,
    /// One-paragraph description shown to members
    pub short_description: String,
    /// Display position, ascending
    pub order: i32,
    /// Inactive categories are hidden from ballots
    pub is_active: bool,
    /// Published winner, if any
    pub winner_candidate_id: Option<i32>,
    /// Whether the winner is visible to public views
    pub winner_announced: bool,
    /// When the category was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Category and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One category has many nominations
    #[sea_orm(has_many = "super::nomination::Entity")]
    Nominations,
    /// One category has many votes
    #[sea_orm(has_many = "super::vote::Entity")]
    Votes,
    /// One category has many finalist entries
    #[sea_orm(has_many = "super::category_candidate::Entity")]
    Finalists,
    /// The published winner
    #[sea_orm(
        belongs_to = "super::candidate::Entity",
        from = "Column::WinnerCandidateId",
        to = "super::candidate::Column::Id",
        on_delete = "SetNull"
    )]
    WinnerCandidate,
}

impl Related<super::nomination::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Nominations.def()
    }
}

impl Related<super::vote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Votes.def()
    }
}

impl Related<super::category_candidate::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Finalists.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
