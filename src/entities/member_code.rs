//! Member code entity - Single-use token gating one nomination and one vote.
//!
//! The `used_in_*` flags only ever move from false to true.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Member code database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "member_codes")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Upper-cased code handed to a member
    #[sea_orm(unique)]
    pub code: String,
    /// Set once the code has submitted nominations
    pub used_in_nomination: bool,
    /// Set once the code has submitted votes
    pub used_in_voting: bool,
    /// When the code was imported
    pub created_at: DateTimeUtc,
}

/// `MemberCode` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
