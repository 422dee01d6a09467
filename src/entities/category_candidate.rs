//! Finalist entity - Join table between categories and the candidates
//! selected to receive votes in them.
//!
//! The composite primary key keeps each `(category, candidate)` pair unique;
//! `position` preserves the order in which the admin selected them.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Finalist database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "category_candidates")]
pub struct Model {
    /// Category the candidate is a finalist in
    #[sea_orm(primary_key, auto_increment = false)]
    pub category_id: i32,
    /// The selected candidate
    #[sea_orm(primary_key, auto_increment = false)]
    pub candidate_id: i32,
    /// Position within the category's finalist list, starting at 0
    pub position: i32,
    /// When the selection was made
    pub created_at: DateTimeUtc,
}

/// Defines relationships between a finalist entry and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each entry belongs to one category
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_delete = "Cascade"
    )]
    Category,
    /// Each entry belongs to one candidate
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
