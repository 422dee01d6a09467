//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod candidate;
pub mod category;
pub mod category_candidate;
pub mod event_state;
pub mod member_code;
pub mod nomination;
pub mod vote;

// Re-export specific types to avoid conflicts
pub use candidate::{Column as CandidateColumn, Entity as Candidate, Model as CandidateModel};
pub use category::{Column as CategoryColumn, Entity as Category, Model as CategoryModel};
pub use category_candidate::{
    Column as CategoryCandidateColumn, Entity as CategoryCandidate,
    Model as CategoryCandidateModel,
};
pub use event_state::{
    Column as EventStateColumn, Entity as EventState, EventStage, Model as EventStateModel,
};
pub use member_code::{Column as MemberCodeColumn, Entity as MemberCode, Model as MemberCodeModel};
pub use nomination::{Column as NominationColumn, Entity as Nomination, Model as NominationModel};
pub use vote::{Column as VoteColumn, Entity as Vote, Model as VoteModel};
