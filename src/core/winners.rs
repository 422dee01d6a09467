//! Winner publication and the public views of published winners.
//!
//! A category's winner is only visible to members once it is both set and announced.
//! Clearing the winner always withdraws the announcement.

use crate::{
    core::{
        categories,
        finalists::{self, FinalistSummary},
        results,
    },
    entities::{Candidate, candidate, category},
    errors::{Error, Result},
};
use sea_orm::{Set, prelude::*};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

/// Change to a category's winner fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WinnerChange {
    /// Category being changed
    pub category_id: i32,
    /// `None` keeps the current winner, `Some(None)` clears it
    pub candidate_id: Option<Option<i32>>,
    /// `None` keeps the current announcement flag
    pub announce: Option<bool>,
}

/// A published winner as shown to members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnouncedWinner {
    /// Category id
    pub category_id: i32,
    /// Category name
    pub category_name: String,
    /// Category description
    pub category_description: String,
    /// Winning candidate id
    pub candidate_id: i32,
    /// Winning candidate name
    pub candidate_name: String,
    /// Winning candidate image
    pub profile_image_url: Option<String>,
    /// Votes the winner received in this category
    pub votes: u64,
}

/// One slide of the awards presentation: the finalists of a category and its winner.
#[derive(Debug, Clone, Serialize)]
pub struct PresentationCategory {
    /// Category id
    pub category_id: i32,
    /// Category name
    pub category_name: String,
    /// Category description
    pub category_description: String,
    /// Finalists in selection order
    pub nominees: Vec<FinalistSummary>,
    /// The announced winner
    pub winner: AnnouncedWinner,
}

/// Sets, clears or announces a category winner.
///
/// # Errors
/// * [`Error::NotFound`] if the category or the candidate does not exist
/// * [`Error::WinnerNotSet`] if the change would announce a category without a winner
pub async fn publish_winner(
    db: &DatabaseConnection,
    change: WinnerChange,
) -> Result<category::Model> {
    let existing = categories::get_category(db, change.category_id)
        .await?
        .ok_or_else(|| Error::not_found("Category", change.category_id))?;

    let winner = match change.candidate_id {
        None => existing.winner_candidate_id,
        Some(None) => None,
        Some(Some(candidate_id)) => {
            Candidate::find_by_id(candidate_id)
                .one(db)
                .await?
                .ok_or_else(|| Error::not_found("Candidate", candidate_id))?;
            Some(candidate_id)
        }
    };

    if winner.is_none() && change.announce == Some(true) {
        return Err(Error::WinnerNotSet);
    }
    let announced = winner.is_some() && change.announce.unwrap_or(existing.winner_announced);

    let mut active: category::ActiveModel = existing.into();
    active.winner_candidate_id = Set(winner);
    active.winner_announced = Set(announced);
    let updated = active.update(db).await?;

    info!(
        category_id = updated.id,
        winner = ?updated.winner_candidate_id,
        announced = updated.winner_announced,
        "Updated category winner"
    );
    Ok(updated)
}

async fn announced_with_candidates(
    db: &DatabaseConnection,
) -> Result<Vec<(category::Model, candidate::Model)>> {
    let categories = categories::list_categories(db, true).await?;
    let mut announced = Vec::new();
    for category in categories {
        if !category.winner_announced {
            continue;
        }
        let Some(winner_id) = category.winner_candidate_id else {
            continue;
        };
        if let Some(winner) = Candidate::find_by_id(winner_id).one(db).await? {
            announced.push((category, winner));
        }
    }
    Ok(announced)
}

fn to_announced(
    category: &category::Model,
    winner: candidate::Model,
    counts: &HashMap<(i32, i32), u64>,
) -> AnnouncedWinner {
    AnnouncedWinner {
        category_id: category.id,
        category_name: category.name.clone(),
        category_description: category.short_description.clone(),
        votes: counts.get(&(category.id, winner.id)).copied().unwrap_or(0),
        candidate_id: winner.id,
        candidate_name: winner.display_name,
        profile_image_url: winner.profile_image_url,
    }
}

/// Announced winners of active categories, in category order.
///
/// This function is used by the public winners page. Categories whose winner is set
/// but not announced are left out, as are inactive categories.
pub async fn announced_winners(db: &DatabaseConnection) -> Result<Vec<AnnouncedWinner>> {
    let announced = announced_with_candidates(db).await?;
    let counts = results::vote_counts(db).await?;

    Ok(announced
        .into_iter()
        .map(|(category, winner)| to_announced(&category, winner, &counts))
        .collect())
}

/// Presentation feed: every announced category with its finalists and winner.
pub async fn presentation_data(db: &DatabaseConnection) -> Result<Vec<PresentationCategory>> {
    let announced = announced_with_candidates(db).await?;
    let counts = results::vote_counts(db).await?;
    let mut finalists = finalists::finalists_by_category(db, false).await?;

    Ok(announced
        .into_iter()
        .map(|(category, winner)| PresentationCategory {
            nominees: finalists.remove(&category.id).unwrap_or_default(),
            winner: to_announced(&category, winner, &counts),
            category_id: category.id,
            category_name: category.name,
            category_description: category.short_description,
        })
        .collect())
}
