//! Core business logic - framework-agnostic event, ballot and results operations
//!
//! Everything here takes a database connection and plain values and returns structured
//! data; the HTTP layer in [`crate::api`] only parses requests and serializes results.

/// Candidate management
pub mod candidates;
/// Category management and listings
pub mod categories;
/// Member code import, validation and censored listing
pub mod codes;
/// Event stage gate
pub mod event;
/// Finalist selection per category
pub mod finalists;
/// Candidate image storage
pub mod images;
/// Candidate import from spreadsheets and archives
pub mod import;
/// Nomination and vote tallies
pub mod results;
/// Nomination and vote submission
pub mod submission;
/// Winner publication and public winner views
pub mod winners;
