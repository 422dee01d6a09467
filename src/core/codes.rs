//! Member code business logic - Import, lookup, validation and censored listing.
//!
//! Codes are stored trimmed and upper-cased, and every lookup normalizes its input the
//! same way, so members can type codes in any case.

use crate::{
    core::event::{self, StageAction},
    entities::{EventStage, MemberCode, member_code},
    errors::{Error, Result},
};
use sea_orm::{PaginatorTrait, QueryOrder, Set, prelude::*, sea_query::OnConflict};
use serde::Serialize;
use std::{collections::HashSet, fmt};
use tracing::info;

// SQLite caps bound parameters per statement; four columns per row stays well below it.
const INSERT_CHUNK_SIZE: usize = 500;

/// Outcome of a bulk code import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeImport {
    /// Codes actually inserted (new codes)
    pub imported: u64,
    /// Distinct valid codes in the request
    pub total: usize,
}

/// A code as shown in admin listings, with its middle portion masked.
#[derive(Debug, Clone, Serialize)]
pub struct CensoredCode {
    /// Code id
    pub id: i32,
    /// Masked code text
    pub code: String,
    /// Whether the code already nominated
    pub used_in_nomination: bool,
    /// Whether the code already voted
    pub used_in_voting: bool,
    /// Import time
    pub created_at: DateTimeUtc,
}

/// Usage counters over all codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeStats {
    /// Number of codes
    pub total: u64,
    /// Codes that submitted nominations
    pub used_in_nomination: u64,
    /// Codes that submitted votes
    pub used_in_voting: u64,
    /// Codes used for neither action
    pub unused: u64,
}

/// Why a code cannot be used right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeRejection {
    /// No such code
    UnknownCode,
    /// The event is still in `SETUP`
    NotStarted,
    /// The code already performed the current stage's action
    AlreadyUsed(StageAction),
    /// The event is `CLOSED`
    EventClosed,
}

impl fmt::Display for CodeRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCode => {
                f.write_str("The code does not exist. Check that it was typed correctly.")
            }
            Self::NotStarted => f.write_str(
                "The event has not started yet. Please wait for nominations to open.",
            ),
            Self::AlreadyUsed(action) => write!(
                f,
                "This code was already used to {action}. Each code can only be used once."
            ),
            Self::EventClosed => {
                f.write_str("The event is over. Nominations and votes are no longer accepted.")
            }
        }
    }
}

/// Result of checking a code against the current stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeValidation {
    /// The code can perform the action of `stage`
    Valid {
        /// Current event stage
        stage: EventStage,
    },
    /// The code cannot be used now
    Rejected(CodeRejection),
}

/// Normalizes user input into the stored code form.
#[must_use]
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Masks the middle of a code, revealing the first 30% and the last 20% of its
/// characters (both rounded down).
#[must_use]
pub fn censor_code(code: &str) -> String {
    let chars: Vec<char> = code.chars().collect();
    let len = chars.len();
    let visible_start = len * 3 / 10;
    let visible_end = len * 2 / 10;
    let hidden = len - visible_start - visible_end;

    let mut censored = String::with_capacity(code.len());
    censored.extend(&chars[..visible_start]);
    censored.extend(std::iter::repeat_n('*', hidden));
    censored.extend(&chars[len - visible_end..]);
    censored
}

/// Finds a code, normalizing the input first.
///
/// This function is used wherever members type a code, so surrounding whitespace and
/// letter case never cause a lookup to fail.
pub async fn find_code<C>(db: &C, raw: &str) -> Result<Option<member_code::Model>>
where
    C: ConnectionTrait,
{
    MemberCode::find()
        .filter(member_code::Column::Code.eq(normalize_code(raw)))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Bulk-inserts codes. Blank entries are dropped, duplicates (within the request or
/// already stored) are skipped.
pub async fn import_codes<S: AsRef<str>>(
    db: &DatabaseConnection,
    codes: &[S],
) -> Result<CodeImport> {
    let mut seen = HashSet::new();
    let normalized: Vec<String> = codes
        .iter()
        .map(|c| normalize_code(c.as_ref()))
        .filter(|c| !c.is_empty())
        .filter(|c| seen.insert(c.clone()))
        .collect();

    if normalized.is_empty() {
        return Err(Error::validation("No valid codes to import"));
    }

    let now = chrono::Utc::now();
    let mut imported = 0;
    for chunk in normalized.chunks(INSERT_CHUNK_SIZE) {
        let models = chunk.iter().map(|code| member_code::ActiveModel {
            code: Set(code.clone()),
            used_in_nomination: Set(false),
            used_in_voting: Set(false),
            created_at: Set(now),
            ..Default::default()
        });
        imported += MemberCode::insert_many(models)
            .on_conflict(
                OnConflict::column(member_code::Column::Code)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;
    }

    info!(imported, total = normalized.len(), "Imported member codes");
    Ok(CodeImport {
        imported,
        total: normalized.len(),
    })
}

/// Lists all codes in code order with their middle portion masked.
pub async fn list_censored_codes(db: &DatabaseConnection) -> Result<Vec<CensoredCode>> {
    let codes = MemberCode::find()
        .order_by_asc(member_code::Column::Code)
        .all(db)
        .await?;

    Ok(codes
        .into_iter()
        .map(|c| CensoredCode {
            id: c.id,
            code: censor_code(&c.code),
            used_in_nomination: c.used_in_nomination,
            used_in_voting: c.used_in_voting,
            created_at: c.created_at,
        })
        .collect())
}

/// Counts codes by usage.
///
/// A code used for both nominating and voting is counted in both columns, so the
/// columns do not add up to `total`.
pub async fn code_stats(db: &DatabaseConnection) -> Result<CodeStats> {
    let total = MemberCode::find().count(db).await?;
    let used_in_nomination = MemberCode::find()
        .filter(member_code::Column::UsedInNomination.eq(true))
        .count(db)
        .await?;
    let used_in_voting = MemberCode::find()
        .filter(member_code::Column::UsedInVoting.eq(true))
        .count(db)
        .await?;
    let unused = MemberCode::find()
        .filter(member_code::Column::UsedInNomination.eq(false))
        .filter(member_code::Column::UsedInVoting.eq(false))
        .count(db)
        .await?;

    Ok(CodeStats {
        total,
        used_in_nomination,
        used_in_voting,
        unused,
    })
}

/// Checks whether a code could act in the current stage. Never mutates anything.
///
/// This function is used by clients before showing a ballot. An unknown code is
/// reported as such in every stage; a known code is then judged against the stage.
pub async fn validate_code(db: &DatabaseConnection, raw: &str) -> Result<CodeValidation> {
    if raw.trim().is_empty() {
        return Err(Error::validation("A code is required"));
    }

    let Some(code) = find_code(db, raw).await? else {
        return Ok(CodeValidation::Rejected(CodeRejection::UnknownCode));
    };

    let stage = event::current_stage(db).await?;
    let rejection = match stage {
        EventStage::Setup => Some(CodeRejection::NotStarted),
        EventStage::Closed => Some(CodeRejection::EventClosed),
        EventStage::Nominations if code.used_in_nomination => {
            Some(CodeRejection::AlreadyUsed(StageAction::Nominate))
        }
        EventStage::Voting if code.used_in_voting => {
            Some(CodeRejection::AlreadyUsed(StageAction::Vote))
        }
        EventStage::Nominations | EventStage::Voting => None,
    };

    Ok(rejection.map_or(CodeValidation::Valid { stage }, CodeValidation::Rejected))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[test]
    fn test_censor_code_reveals_thirty_and_twenty_percent() {
        // 13 chars: 3 leading, 2 trailing, 8 masked
        assert_eq!(censor_code("CONDOR0012345"), "CON********45");
        // 9 chars: 2 leading, 1 trailing
        assert_eq!(censor_code("CONDOR001"), "CO******1");
        // Too short to reveal anything
        assert_eq!(censor_code("AB"), "**");
        assert_eq!(censor_code(""), "");
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  condor001 \n"), "CONDOR001");
    }

    #[tokio::test]
    async fn test_import_codes_requires_valid_codes() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let result = import_codes(&db, &["", "   "]).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_import_codes_normalizes_and_skips_duplicates() -> Result<()> {
        let db = setup_test_db().await?;

        let first = import_codes(&db, &["condor001", " CONDOR002 ", "Condor001", ""]).await?;
        assert_eq!(first.total, 2);
        assert_eq!(first.imported, 2);

        let second = import_codes(&db, &["CONDOR002", "CONDOR003"]).await?;
        assert_eq!(second.total, 2);
        assert_eq!(second.imported, 1);

        let stored = MemberCode::find()
            .order_by_asc(member_code::Column::Code)
            .all(&db)
            .await?;
        let codes: Vec<_> = stored.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, vec!["CONDOR001", "CONDOR002", "CONDOR003"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_censored_codes() -> Result<()> {
        let db = setup_test_db().await?;
        import_codes(&db, &["CONDOR0012345"]).await?;

        let listed = list_censored_codes(&db).await?;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].code, "CON********45");
        assert!(!listed[0].used_in_nomination);

        // Full code is still stored
        assert!(find_code(&db, "condor0012345").await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_code_stats() -> Result<()> {
        let db = setup_test_db().await?;
        import_codes(&db, &["A1", "A2", "A3"]).await?;
        mark_code_used(&db, "A1", StageAction::Nominate).await?;
        mark_code_used(&db, "A2", StageAction::Nominate).await?;
        mark_code_used(&db, "A2", StageAction::Vote).await?;

        let stats = code_stats(&db).await?;
        assert_eq!(
            stats,
            CodeStats {
                total: 3,
                used_in_nomination: 2,
                used_in_voting: 1,
                unused: 1,
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_validate_code_per_stage() -> Result<()> {
        let db = setup_test_db().await?;
        import_codes(&db, &["CONDOR001"]).await?;

        assert_eq!(
            validate_code(&db, "nope").await?,
            CodeValidation::Rejected(CodeRejection::UnknownCode)
        );
        assert_eq!(
            validate_code(&db, "condor001").await?,
            CodeValidation::Rejected(CodeRejection::NotStarted)
        );

        event::set_event_state(&db, EventStage::Nominations, None).await?;
        assert_eq!(
            validate_code(&db, "CONDOR001").await?,
            CodeValidation::Valid {
                stage: EventStage::Nominations
            }
        );

        mark_code_used(&db, "CONDOR001", StageAction::Nominate).await?;
        assert_eq!(
            validate_code(&db, "CONDOR001").await?,
            CodeValidation::Rejected(CodeRejection::AlreadyUsed(StageAction::Nominate))
        );

        // Nominating does not consume the vote
        event::set_event_state(&db, EventStage::Voting, None).await?;
        assert_eq!(
            validate_code(&db, "CONDOR001").await?,
            CodeValidation::Valid {
                stage: EventStage::Voting
            }
        );

        event::set_event_state(&db, EventStage::Closed, None).await?;
        assert_eq!(
            validate_code(&db, "CONDOR001").await?,
            CodeValidation::Rejected(CodeRejection::EventClosed)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_validate_code_requires_input() -> Result<()> {
        let db = setup_test_db().await?;
        assert!(matches!(
            validate_code(&db, "  ").await,
            Err(Error::Validation { .. })
        ));
        Ok(())
    }
}
