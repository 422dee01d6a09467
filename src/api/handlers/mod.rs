/// Admin candidate management and import
pub mod candidates;
/// Admin category management and finalist selection
pub mod categories;
/// Admin member code management
pub mod codes;
/// Admin login and event stage
pub mod event;
/// Member-facing endpoints
pub mod public;
/// Admin tallies and winners
pub mod results;
