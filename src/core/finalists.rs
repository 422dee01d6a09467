//! Finalist selection - Which candidates may receive votes in each category.
//!
//! Selection replaces the whole set for a category: prior entries are deleted and the
//! new list inserted inside one transaction, so readers never see a mix of the old and
//! new sets. Repeated candidate ids collapse to their first occurrence.

use crate::{
    entities::{Candidate, CategoryCandidate, candidate, category_candidate},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::info;

/// A finalist as shown on ballots and admin pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalistSummary {
    /// Candidate id
    #[serde(rename = "id")]
    pub candidate_id: i32,
    /// Candidate display name
    #[serde(rename = "display_name")]
    pub candidate_name: String,
    /// Candidate image, if any
    pub profile_image_url: Option<String>,
}

impl From<candidate::Model> for FinalistSummary {
    fn from(candidate: candidate::Model) -> Self {
        Self {
            candidate_id: candidate.id,
            candidate_name: candidate.display_name,
            profile_image_url: candidate.profile_image_url,
        }
    }
}

/// The finalists of one category.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryFinalists {
    /// Category id
    pub category_id: i32,
    /// Category name
    pub category_name: String,
    /// Finalists in selection order
    pub candidates: Vec<FinalistSummary>,
}

/// Replaces the finalist set of a category.
///
/// # Arguments
/// * `category_id` - Category whose finalists are replaced
/// * `candidate_ids` - New finalists, in display order; duplicates are dropped
/// * `max` - Largest allowed set
///
/// # Returns
/// The number of finalists stored
pub async fn select_finalists(
    db: &DatabaseConnection,
    category_id: i32,
    candidate_ids: &[i32],
    max: usize,
) -> Result<usize> {
    let mut seen = HashSet::new();
    let unique: Vec<i32> = candidate_ids
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect();

    if unique.len() > max {
        return Err(Error::TooManyFinalists { max });
    }

    let txn = db.begin().await?;

    if crate::core::categories::get_category(&txn, category_id)
        .await?
        .is_none()
    {
        return Err(Error::not_found("Category", category_id));
    }

    for candidate_id in &unique {
        if Candidate::find_by_id(*candidate_id).one(&txn).await?.is_none() {
            return Err(Error::InvalidCandidate {
                candidate_id: *candidate_id,
            });
        }
    }

    CategoryCandidate::delete_many()
        .filter(category_candidate::Column::CategoryId.eq(category_id))
        .exec(&txn)
        .await?;

    if !unique.is_empty() {
        let now = chrono::Utc::now();
        let rows = unique
            .iter()
            .zip(0..)
            .map(|(candidate_id, position)| category_candidate::ActiveModel {
                category_id: Set(category_id),
                candidate_id: Set(*candidate_id),
                position: Set(position),
                created_at: Set(now),
            });
        CategoryCandidate::insert_many(rows)
            .exec_without_returning(&txn)
            .await?;
    }

    txn.commit().await?;
    info!(category_id, selected = unique.len(), "Replaced category finalists");
    Ok(unique.len())
}

/// Whether `candidate_id` is currently a finalist in `category_id`.
///
/// This function is used by vote submission for every ballot entry, inside the ballot's
/// transaction.
pub async fn is_finalist<C>(db: &C, category_id: i32, candidate_id: i32) -> Result<bool>
where
    C: ConnectionTrait,
{
    Ok(CategoryCandidate::find_by_id((category_id, candidate_id))
        .one(db)
        .await?
        .is_some())
}

/// Finalists of every category keyed by category id, each list in selection order.
///
/// With `active_only`, inactive candidates are left out.
pub async fn finalists_by_category<C>(
    db: &C,
    active_only: bool,
) -> Result<HashMap<i32, Vec<FinalistSummary>>>
where
    C: ConnectionTrait,
{
    let rows = CategoryCandidate::find()
        .find_also_related(Candidate)
        .order_by_asc(category_candidate::Column::CategoryId)
        .order_by_asc(category_candidate::Column::Position)
        .all(db)
        .await?;

    let mut grouped: HashMap<i32, Vec<FinalistSummary>> = HashMap::new();
    for (entry, candidate) in rows {
        let Some(candidate) = candidate else { continue };
        if active_only && !candidate.is_active {
            continue;
        }
        grouped
            .entry(entry.category_id)
            .or_default()
            .push(candidate.into());
    }
    Ok(grouped)
}

/// Finalists grouped by category for every category, in category display order.
pub async fn list_selected_candidates(db: &DatabaseConnection) -> Result<Vec<CategoryFinalists>> {
    let categories = crate::core::categories::list_categories(db, false).await?;
    let mut grouped = finalists_by_category(db, false).await?;

    Ok(categories
        .into_iter()
        .map(|category| CategoryFinalists {
            category_id: category.id,
            category_name: category.name,
            candidates: grouped.remove(&category.id).unwrap_or_default(),
        })
        .collect())
}
