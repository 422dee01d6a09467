//! Nomination entity - One member's nomination of a candidate in a category.
//!
//! Nominations are append-only facts. The same candidate may be nominated any
//! number of times; admins review them aggregated by count.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Nomination database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "nominations")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Category the nomination was cast in
    pub category_id: i32,
    /// Candidate receiving the nomination
    pub candidate_id: i32,
    /// When the nomination was recorded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Nomination and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each nomination belongs to one category
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_delete = "Cascade"
    )]
    Category,
    /// Each nomination belongs to one candidate
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
