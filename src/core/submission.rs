//! Nomination and vote submission.
//!
//! Both flows share one pipeline: every check runs inside a single transaction before
//! anything is written, then the code is consumed with a conditional update
//! (`used_in_x = false` in the filter) and the ballot rows are inserted. If another
//! request consumed the code first the update touches no row and the whole
//! transaction is rolled back, so a code can never be spent twice.

use crate::{
    core::{
        categories, codes,
        event::{self, StageAction},
        finalists,
    },
    entities::{Candidate, MemberCode, Nomination, Vote, member_code, nomination, vote},
    errors::{Error, Result},
};
use sea_orm::{DatabaseTransaction, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, info};

/// One `(category, candidate)` choice on a ballot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct BallotEntry {
    /// Category being answered
    pub category_id: i32,
    /// Chosen candidate
    pub candidate_id: i32,
}

/// A nomination ballot: a single choice, or one choice for every active category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ballot {
    /// One category only
    Single(BallotEntry),
    /// Every active category exactly once
    Full(Vec<BallotEntry>),
}

impl Ballot {
    fn entries(&self) -> &[BallotEntry] {
        match self {
            Self::Single(entry) => std::slice::from_ref(entry),
            Self::Full(entries) => entries,
        }
    }
}

/// Records nominations for `code`. Returns the number of nominations stored.
pub async fn submit_nominations(
    db: &DatabaseConnection,
    code: &str,
    ballot: Ballot,
) -> Result<usize> {
    let require_all = matches!(ballot, Ballot::Full(_));
    submit(db, code, StageAction::Nominate, ballot.entries(), require_all).await
}

/// Records one vote per active category for `code`. Every choice must be a finalist.
/// Returns the number of votes stored.
pub async fn submit_votes(
    db: &DatabaseConnection,
    code: &str,
    entries: &[BallotEntry],
) -> Result<usize> {
    submit(db, code, StageAction::Vote, entries, true).await
}

async fn submit(
    db: &DatabaseConnection,
    raw_code: &str,
    action: StageAction,
    entries: &[BallotEntry],
    require_all: bool,
) -> Result<usize> {
    if raw_code.trim().is_empty() {
        return Err(Error::validation("A code is required"));
    }

    let txn = db.begin().await?;

    let stage = event::current_stage(&txn).await?;
    event::ensure_stage(stage, action)?;

    let code = codes::find_code(&txn, raw_code)
        .await?
        .ok_or(Error::UnknownCode)?;
    let already_used = match action {
        StageAction::Nominate => code.used_in_nomination,
        StageAction::Vote => code.used_in_voting,
    };
    if already_used {
        return Err(Error::CodeAlreadyUsed { action });
    }

    if entries.is_empty() {
        return Err(Error::validation("The ballot is empty"));
    }
    if require_all {
        check_covers_active_categories(&txn, entries).await?;
    }
    for entry in entries {
        check_entry(&txn, entry, action).await?;
    }

    consume_code(&txn, code.id, action).await?;
    insert_entries(&txn, entries, action).await?;
    txn.commit().await?;

    info!(%action, count = entries.len(), "Recorded ballot");
    Ok(entries.len())
}

async fn check_covers_active_categories(
    txn: &DatabaseTransaction,
    entries: &[BallotEntry],
) -> Result<()> {
    let active: HashSet<i32> = categories::list_categories(txn, true)
        .await?
        .into_iter()
        .map(|c| c.id)
        .collect();

    if entries.len() != active.len() {
        return Err(Error::IncompleteBallot {
            submitted: entries.len(),
            expected: active.len(),
        });
    }

    let mut seen = HashSet::with_capacity(entries.len());
    for entry in entries {
        if !seen.insert(entry.category_id) {
            return Err(Error::DuplicateCategory {
                category_id: entry.category_id,
            });
        }
    }

    let missing = active.difference(&seen).count();
    if missing > 0 {
        return Err(Error::MissingCategories { missing });
    }
    Ok(())
}

async fn check_entry(
    txn: &DatabaseTransaction,
    entry: &BallotEntry,
    action: StageAction,
) -> Result<()> {
    let category_ok = categories::get_category(txn, entry.category_id)
        .await?
        .is_some_and(|c| c.is_active);
    if !category_ok {
        return Err(Error::InvalidCategory {
            category_id: entry.category_id,
        });
    }

    let candidate_ok = Candidate::find_by_id(entry.candidate_id)
        .one(txn)
        .await?
        .is_some_and(|c| c.is_active);
    if !candidate_ok {
        return Err(Error::InvalidCandidate {
            candidate_id: entry.candidate_id,
        });
    }

    if action == StageAction::Vote
        && !finalists::is_finalist(txn, entry.category_id, entry.candidate_id).await?
    {
        return Err(Error::NotAFinalist {
            category_id: entry.category_id,
            candidate_id: entry.candidate_id,
        });
    }
    Ok(())
}

async fn consume_code(txn: &DatabaseTransaction, code_id: i32, action: StageAction) -> Result<()> {
    let flag = match action {
        StageAction::Nominate => member_code::Column::UsedInNomination,
        StageAction::Vote => member_code::Column::UsedInVoting,
    };

    let result = MemberCode::update_many()
        .col_expr(flag, Expr::value(true))
        .filter(member_code::Column::Id.eq(code_id))
        .filter(flag.eq(false))
        .exec(txn)
        .await?;

    if result.rows_affected == 0 {
        debug!(code_id, %action, "Code consumed by a concurrent request");
        return Err(Error::CodeAlreadyUsed { action });
    }
    Ok(())
}

async fn insert_entries(
    txn: &DatabaseTransaction,
    entries: &[BallotEntry],
    action: StageAction,
) -> Result<()> {
    let now = chrono::Utc::now();
    match action {
        StageAction::Nominate => {
            let rows = entries.iter().map(|e| nomination::ActiveModel {
                category_id: Set(e.category_id),
                candidate_id: Set(e.candidate_id),
                created_at: Set(now),
                ..Default::default()
            });
            Nomination::insert_many(rows).exec_without_returning(txn).await?;
        }
        StageAction::Vote => {
            let rows = entries.iter().map(|e| vote::ActiveModel {
                category_id: Set(e.category_id),
                candidate_id: Set(e.candidate_id),
                created_at: Set(now),
                ..Default::default()
            });
            Vote::insert_many(rows).exec_without_returning(txn).await?;
        }
    }
    Ok(())
}
