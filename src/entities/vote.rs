//! Vote entity - One member's vote for a finalist in a category.
//!
//! Votes are append-only facts and are only recorded for candidates in the
//! category's finalist set at the time of voting.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Vote database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "votes")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Category the vote was cast in
    pub category_id: i32,
    /// Candidate receiving the vote
    pub candidate_id: i32,
    /// When the vote was recorded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Vote and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each vote belongs to one category
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_delete = "Cascade"
    )]
    Category,
    /// Each vote belongs to one candidate
    #[sea_orm(
        belongs_to = "super::candidate::Entity",
        from = "Column::CandidateId",
        to = "super::candidate::Column::Id",
        on_delete = "Cascade"
    )]
    Candidate,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::candidate::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Candidate.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
