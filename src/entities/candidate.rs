//! Candidate entity - A member who can be nominated and voted for.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Candidate database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "candidates")]
pub struct Model {
    /// Unique identifier for the candidate
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Name shown on ballots, unique across candidates
    #[sea_orm(unique)]
    pub display_name: String,
    /// Public URL of the stored profile image
    pub profile_image_url: Option<String>,
    /// Inactive candidates cannot be nominated or voted for
    pub is_active: bool,
    /// When the candidate was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Candidate and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One candidate has many nominations
    #[sea_orm(has_many = "super::nomination::Entity")]
    Nominations,
    /// One candidate has many votes
    #[sea_orm(has_many = "super::vote::Entity")]
    Votes,
    /// One candidate can be a finalist in many categories
    #[sea_orm(has_many = "super::category_candidate::Entity")]
    Finalists,
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
