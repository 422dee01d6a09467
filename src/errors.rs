use crate::core::event::StageAction;
use crate::entities::EventStage;
use axum::extract::{
    multipart::MultipartError,
    rejection::{JsonRejection, QueryRejection},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{message}")]
    Validation { message: String },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{entity} {id} does not exist")]
    NotFound { entity: &'static str, id: String },

    #[error("Cannot {action} while the event is in the {stage} stage")]
    WrongStage {
        action: StageAction,
        stage: EventStage,
    },

    #[error("The code does not exist. Check that it was typed correctly.")]
    UnknownCode,

    #[error("This code was already used to {action}. Each code can only be used once.")]
    CodeAlreadyUsed { action: StageAction },

    #[error("Every category must be completed: got {submitted} of {expected} active categories")]
    IncompleteBallot { submitted: usize, expected: usize },

    #[error("{missing} active categories are missing from the ballot")]
    MissingCategories { missing: usize },

    #[error("Category {category_id} appears more than once in the ballot")]
    DuplicateCategory { category_id: i32 },

    #[error("Category {category_id} is not valid or is inactive")]
    InvalidCategory { category_id: i32 },

    #[error("Candidate {candidate_id} is not valid or is inactive")]
    InvalidCandidate { candidate_id: i32 },

    #[error("Candidate {candidate_id} is not a finalist in category {category_id}")]
    NotAFinalist { category_id: i32, candidate_id: i32 },

    #[error("At most {max} finalists can be selected per category")]
    TooManyFinalists { max: usize },

    #[error("A candidate named {name:?} already exists")]
    DuplicateCandidate { name: String },

    #[error("A winner must be set before it can be announced")]
    WinnerNotSet,

    #[error("Import failed: {message}")]
    Import { message: String },

    #[error("Invalid upload: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Invalid JSON body: {0}")]
    Json(#[from] JsonRejection),

    #[error("Invalid query string: {0}")]
    Query(#[from] QueryRejection),
}

impl Error {
    /// Shorthand for a [`Error::Validation`] with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for a [`Error::NotFound`] keyed by a numeric id.
    pub fn not_found(entity: &'static str, id: i32) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
