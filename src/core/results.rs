//! Results aggregation - Read-only tallies of nominations and votes.
//!
//! Counting happens in memory over the fact tables, grouping by
//! `(category, candidate)` and keeping the earliest timestamp of each group.

use crate::{
    core::{categories, finalists},
    entities::{Candidate, Nomination, Vote, candidate, category, nomination, vote},
    errors::Result,
};
use sea_orm::{DatabaseConnection, QueryOrder, prelude::*};
use serde::Serialize;
use std::{
    cmp::{Ordering, Reverse},
    collections::HashMap,
};

/// Nominations received by one candidate in one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NominationTally {
    /// Category id
    pub category_id: i32,
    /// Category name
    pub category_name: String,
    /// Candidate id
    pub candidate_id: i32,
    /// Candidate display name
    pub candidate_name: String,
    /// Number of nominations
    pub count: u64,
    /// Time of the earliest nomination in this group
    pub first_nomination: DateTimeUtc,
}

/// Votes received by one candidate in one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteTally {
    /// Category id
    pub category_id: i32,
    /// Category name
    pub category_name: String,
    /// Candidate id
    pub candidate_id: i32,
    /// Candidate display name
    pub candidate_name: String,
    /// Number of votes
    pub count: u64,
    /// Time of the earliest vote in this group
    pub first_vote: DateTimeUtc,
    /// Published winner of the category, if any
    pub winner_candidate_id: Option<i32>,
    /// Whether the category winner is announced
    pub winner_announced: bool,
}

/// A finalist with its vote count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateVotes {
    /// Candidate id
    pub candidate_id: i32,
    /// Candidate display name
    pub candidate_name: String,
    /// Candidate image, if any
    pub profile_image_url: Option<String>,
    /// Votes in this category
    pub votes: u64,
}

/// Vote results of one active category.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryResult {
    /// Category id
    pub category_id: i32,
    /// Category name
    pub category_name: String,
    /// Category description
    pub category_description: String,
    /// Finalists, most votes first
    pub candidates: Vec<CandidateVotes>,
    /// Published winner, if any
    pub winner_candidate_id: Option<i32>,
    /// Whether the winner is announced
    pub winner_announced: bool,
    /// Finalist currently ahead, see [`implicit_winner`]
    pub leading_candidate_id: Option<i32>,
}

/// The finalist with the most votes; ties go to the lowest candidate id. `None` when
/// nobody has received a vote.
#[must_use]
pub fn implicit_winner(candidates: &[CandidateVotes]) -> Option<&CandidateVotes> {
    candidates
        .iter()
        .filter(|c| c.votes > 0)
        .max_by_key(|c| (c.votes, Reverse(c.candidate_id)))
}

// Most counted first, then category and candidate id for a stable listing.
fn by_count_desc(a: (u64, i32, i32), b: (u64, i32, i32)) -> Ordering {
    b.0.cmp(&a.0)
        .then(a.1.cmp(&b.1))
        .then(a.2.cmp(&b.2))
}

struct Group {
    category_id: i32,
    candidate_id: i32,
    count: u64,
    first: DateTimeUtc,
}

fn group_facts(facts: impl IntoIterator<Item = (i32, i32, DateTimeUtc)>) -> Vec<Group> {
    let mut groups: HashMap<(i32, i32), Group> = HashMap::new();
    for (category_id, candidate_id, created_at) in facts {
        groups
            .entry((category_id, candidate_id))
            .and_modify(|g| {
                g.count += 1;
                g.first = g.first.min(created_at);
            })
            .or_insert(Group {
                category_id,
                candidate_id,
                count: 1,
                first: created_at,
            });
    }

    let mut grouped: Vec<Group> = groups.into_values().collect();
    grouped.sort_by(|a, b| {
        by_count_desc(
            (a.count, a.category_id, a.candidate_id),
            (b.count, b.category_id, b.candidate_id),
        )
    });
    grouped
}

async fn lookup_tables(
    db: &DatabaseConnection,
) -> Result<(HashMap<i32, category::Model>, HashMap<i32, candidate::Model>)> {
    let categories = categories::list_categories(db, false)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();
    let candidates = Candidate::find()
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();
    Ok((categories, candidates))
}

/// Nominations grouped by category and candidate, most nominated first.
///
/// This function is used when picking finalists. Each group carries the time of its
/// first nomination; equal counts are ordered by category, then candidate.
pub async fn nomination_tallies(
    db: &DatabaseConnection,
    category_id: Option<i32>,
) -> Result<Vec<NominationTally>> {
    let mut query = Nomination::find();
    if let Some(category_id) = category_id {
        query = query.filter(nomination::Column::CategoryId.eq(category_id));
    }
    let nominations = query.all(db).await?;
    let (categories, candidates) = lookup_tables(db).await?;

    Ok(group_facts(
        nominations
            .into_iter()
            .map(|n| (n.category_id, n.candidate_id, n.created_at)),
    )
    .into_iter()
    .filter_map(|g| {
        let category = categories.get(&g.category_id)?;
        let candidate = candidates.get(&g.candidate_id)?;
        Some(NominationTally {
            category_id: g.category_id,
            category_name: category.name.clone(),
            candidate_id: g.candidate_id,
            candidate_name: candidate.display_name.clone(),
            count: g.count,
            first_nomination: g.first,
        })
    })
    .collect())
}

/// Votes grouped by category and candidate, most voted first.
///
/// With `only_selected`, votes for candidates that are no longer finalists of their
/// category are left out.
pub async fn vote_tallies(
    db: &DatabaseConnection,
    category_id: Option<i32>,
    only_selected: bool,
) -> Result<Vec<VoteTally>> {
    let mut query = Vote::find();
    if let Some(category_id) = category_id {
        query = query.filter(vote::Column::CategoryId.eq(category_id));
    }
    let votes = query.all(db).await?;
    let (categories, candidates) = lookup_tables(db).await?;

    let selected = if only_selected {
        Some(finalists::finalists_by_category(db, false).await?)
    } else {
        None
    };
    let is_selected = |category_id: i32, candidate_id: i32| {
        selected.as_ref().is_none_or(|all| {
            all.get(&category_id)
                .is_some_and(|list| list.iter().any(|f| f.candidate_id == candidate_id))
        })
    };

    Ok(group_facts(
        votes
            .into_iter()
            .filter(|v| is_selected(v.category_id, v.candidate_id))
            .map(|v| (v.category_id, v.candidate_id, v.created_at)),
    )
    .into_iter()
    .filter_map(|g| {
        let category = categories.get(&g.category_id)?;
        let candidate = candidates.get(&g.candidate_id)?;
        Some(VoteTally {
            category_id: g.category_id,
            category_name: category.name.clone(),
            candidate_id: g.candidate_id,
            candidate_name: candidate.display_name.clone(),
            count: g.count,
            first_vote: g.first,
            winner_candidate_id: category.winner_candidate_id,
            winner_announced: category.winner_announced,
        })
    })
    .collect())
}

/// Vote counts keyed by `(category_id, candidate_id)`.
///
/// This function is shared by the results, winners and presentation views.
pub async fn vote_counts(db: &DatabaseConnection) -> Result<HashMap<(i32, i32), u64>> {
    let votes = Vote::find()
        .order_by_asc(vote::Column::Id)
        .all(db)
        .await?;
    let mut counts = HashMap::new();
    for v in votes {
        *counts.entry((v.category_id, v.candidate_id)).or_insert(0) += 1;
    }
    Ok(counts)
}

/// Per active category: every finalist with its votes (most first), the published
/// winner and the finalist currently leading.
pub async fn category_results(db: &DatabaseConnection) -> Result<Vec<CategoryResult>> {
    let categories = categories::list_categories(db, true).await?;
    let mut finalists = finalists::finalists_by_category(db, false).await?;
    let counts = vote_counts(db).await?;

    Ok(categories
        .into_iter()
        .map(|category| {
            let mut candidates: Vec<CandidateVotes> = finalists
                .remove(&category.id)
                .unwrap_or_default()
                .into_iter()
                .map(|f| CandidateVotes {
                    votes: counts
                        .get(&(category.id, f.candidate_id))
                        .copied()
                        .unwrap_or(0),
                    candidate_id: f.candidate_id,
                    candidate_name: f.candidate_name,
                    profile_image_url: f.profile_image_url,
                })
                .collect();
            candidates.sort_by(|a, b| {
                b.votes
                    .cmp(&a.votes)
                    .then(a.candidate_id.cmp(&b.candidate_id))
            });
            let leading_candidate_id = implicit_winner(&candidates).map(|c| c.candidate_id);

            CategoryResult {
                category_id: category.id,
                category_name: category.name,
                category_description: category.short_description,
                candidates,
                winner_candidate_id: category.winner_candidate_id,
                winner_announced: category.winner_announced,
                leading_candidate_id,
            }
        })
        .collect())
}
