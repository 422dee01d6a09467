//! Candidate business logic - Handles all candidate-related operations.
//!
//! Display names are unique; every write path checks for an existing candidate with the
//! same (trimmed) name before touching the database. Deleting a candidate removes
//! everything that references it and withdraws it as a winner.

use crate::{
    core::images::ImageStore,
    entities::{
        Candidate, Category, CategoryCandidate, Nomination, Vote, candidate, category,
        category_candidate, nomination, vote,
    },
    errors::{Error, Result},
};
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::Serialize;
use tracing::info;

/// Partial update of a candidate; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct CandidateChanges {
    /// New display name
    pub display_name: Option<String>,
    /// New active flag
    pub is_active: Option<bool>,
}

/// Candidate fields exposed to members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicCandidate {
    /// Candidate id
    pub id: i32,
    /// Display name
    pub display_name: String,
    /// Image URL, if any
    pub profile_image_url: Option<String>,
}

/// Reference to a category a candidate is a finalist in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryRef {
    /// Category id
    pub id: i32,
    /// Category name
    pub name: String,
}

/// Admin view of a candidate with activity counts.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateOverview {
    /// The candidate itself
    #[serde(flatten)]
    pub candidate: candidate::Model,
    /// Votes received across categories
    pub vote_count: u64,
    /// Nominations received across categories
    pub nomination_count: u64,
    /// Categories in which the candidate is a finalist
    pub finalist_in: Vec<CategoryRef>,
}

fn clean_name(display_name: &str) -> Result<String> {
    let name = display_name.trim();
    if name.is_empty() {
        return Err(Error::validation("A candidate name is required"));
    }
    Ok(name.to_string())
}

/// Finds a candidate by id.
pub async fn get_candidate<C>(db: &C, candidate_id: i32) -> Result<Option<candidate::Model>>
where
    C: ConnectionTrait,
{
    Candidate::find_by_id(candidate_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a candidate by exact (trimmed) display name.
///
/// This function backs the uniqueness checks on create and rename, and the bulk import,
/// which matches spreadsheet rows to existing candidates by name.
pub async fn get_candidate_by_name<C>(db: &C, display_name: &str) -> Result<Option<candidate::Model>>
where
    C: ConnectionTrait,
{
    Candidate::find()
        .filter(candidate::Column::DisplayName.eq(display_name.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a candidate. Fails with [`Error::DuplicateCandidate`] if the name is taken.
pub async fn create_candidate(
    db: &DatabaseConnection,
    display_name: &str,
    is_active: Option<bool>,
) -> Result<candidate::Model> {
    let name = clean_name(display_name)?;
    if get_candidate_by_name(db, &name).await?.is_some() {
        return Err(Error::DuplicateCandidate { name });
    }

    let candidate = candidate::ActiveModel {
        display_name: Set(name),
        profile_image_url: Set(None),
        is_active: Set(is_active.unwrap_or(true)),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let created = candidate.insert(db).await?;
    info!(candidate_id = created.id, name = %created.display_name, "Created candidate");
    Ok(created)
}

/// Inserts a candidate or, if the name exists, updates its active flag.
///
/// Returns the stored candidate and whether it was newly created.
pub async fn upsert_candidate(
    db: &DatabaseConnection,
    display_name: &str,
    is_active: bool,
) -> Result<(candidate::Model, bool)> {
    let name = clean_name(display_name)?;

    if let Some(existing) = get_candidate_by_name(db, &name).await? {
        if existing.is_active == is_active {
            return Ok((existing, false));
        }
        let mut active: candidate::ActiveModel = existing.into();
        active.is_active = Set(is_active);
        return Ok((active.update(db).await?, false));
    }

    let created = candidate::ActiveModel {
        display_name: Set(name),
        profile_image_url: Set(None),
        is_active: Set(is_active),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok((created, true))
}

/// Applies a partial update. A blank name is ignored; a name already used by another
/// candidate is rejected.
pub async fn update_candidate(
    db: &DatabaseConnection,
    candidate_id: i32,
    changes: CandidateChanges,
) -> Result<candidate::Model> {
    let existing = get_candidate(db, candidate_id)
        .await?
        .ok_or_else(|| Error::not_found("Candidate", candidate_id))?;

    let new_name = changes
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty() && *n != existing.display_name)
        .map(ToString::to_string);

    if let Some(name) = &new_name {
        if get_candidate_by_name(db, name).await?.is_some() {
            return Err(Error::DuplicateCandidate { name: name.clone() });
        }
    }

    let mut active: candidate::ActiveModel = existing.into();
    if let Some(name) = new_name {
        active.display_name = Set(name);
    }
    if let Some(is_active) = changes.is_active {
        active.is_active = Set(is_active);
    }

    active.update(db).await.map_err(Into::into)
}

/// Replaces a candidate's image URL.
///
/// Returns the updated candidate and the URL it replaced, so the caller can delete the
/// superseded file.
pub async fn set_profile_image(
    db: &DatabaseConnection,
    candidate_id: i32,
    url: Option<String>,
) -> Result<(candidate::Model, Option<String>)> {
    let existing = get_candidate(db, candidate_id)
        .await?
        .ok_or_else(|| Error::not_found("Candidate", candidate_id))?;
    let previous = existing.profile_image_url.clone();

    let mut active: candidate::ActiveModel = existing.into();
    active.profile_image_url = Set(url);
    let updated = active.update(db).await?;

    let previous = previous.filter(|p| Some(p) != updated.profile_image_url.as_ref());
    Ok((updated, previous))
}

/// Stores an uploaded image and makes it the candidate's profile image.
///
/// This function is used by both the candidate form and the bulk import. The previous
/// image file is deleted once the new URL is saved. If the candidate cannot be
/// updated, the file just written is deleted again so no orphan is left behind.
///
/// # Errors
/// * [`Error::Validation`] for an empty image or unsupported extension
/// * [`Error::NotFound`] if the candidate does not exist
pub async fn store_profile_image(
    db: &DatabaseConnection,
    store: &ImageStore,
    candidate_id: i32,
    image: &[u8],
    extension: &str,
) -> Result<candidate::Model> {
    let url = store.save(image, extension).await?;
    match set_profile_image(db, candidate_id, Some(url.clone())).await {
        Ok((candidate, previous)) => {
            if let Some(previous) = previous {
                store.remove(&previous).await;
            }
            Ok(candidate)
        }
        Err(e) => {
            store.remove(&url).await;
            Err(e)
        }
    }
}

/// Deletes a candidate with its nominations, votes and finalist entries, and clears it
/// as winner of any category (which also withdraws the announcement).
///
/// Returns the deleted candidate so the caller can remove its image.
pub async fn delete_candidate(
    db: &DatabaseConnection,
    candidate_id: i32,
) -> Result<candidate::Model> {
    let txn = db.begin().await?;

    let candidate = get_candidate(&txn, candidate_id)
        .await?
        .ok_or_else(|| Error::not_found("Candidate", candidate_id))?;

    Nomination::delete_many()
        .filter(nomination::Column::CandidateId.eq(candidate_id))
        .exec(&txn)
        .await?;
    Vote::delete_many()
        .filter(vote::Column::CandidateId.eq(candidate_id))
        .exec(&txn)
        .await?;
    CategoryCandidate::delete_many()
        .filter(category_candidate::Column::CandidateId.eq(candidate_id))
        .exec(&txn)
        .await?;
    Category::update_many()
        .col_expr(
            category::Column::WinnerCandidateId,
            Expr::value(Option::<i32>::None),
        )
        .col_expr(category::Column::WinnerAnnounced, Expr::value(false))
        .filter(category::Column::WinnerCandidateId.eq(candidate_id))
        .exec(&txn)
        .await?;
    candidate.clone().delete(&txn).await?;

    txn.commit().await?;
    info!(candidate_id, "Deleted candidate");
    Ok(candidate)
}

/// Active candidates ordered by name, as offered on nomination ballots.
///
/// This function is used by the public candidate list. Only the fields members need
/// are returned; activity counts stay in the admin overview.
pub async fn list_active_candidates(db: &DatabaseConnection) -> Result<Vec<PublicCandidate>> {
    let candidates = Candidate::find()
        .filter(candidate::Column::IsActive.eq(true))
        .order_by_asc(candidate::Column::DisplayName)
        .all(db)
        .await?;

    Ok(candidates
        .into_iter()
        .map(|c| PublicCandidate {
            id: c.id,
            display_name: c.display_name,
            profile_image_url: c.profile_image_url,
        })
        .collect())
}

/// All candidates ordered by name with vote/nomination counts and finalist categories.
///
/// This function is used by the admin candidate table. Inactive candidates are included
/// so they can be re-enabled.
pub async fn list_candidate_overviews(db: &DatabaseConnection) -> Result<Vec<CandidateOverview>> {
    let candidates = Candidate::find()
        .order_by_asc(candidate::Column::DisplayName)
        .all(db)
        .await?;

    let mut overviews = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let vote_count = Vote::find()
            .filter(vote::Column::CandidateId.eq(candidate.id))
            .count(db)
            .await?;
        let nomination_count = Nomination::find()
            .filter(nomination::Column::CandidateId.eq(candidate.id))
            .count(db)
            .await?;
        let finalist_in = CategoryCandidate::find()
            .filter(category_candidate::Column::CandidateId.eq(candidate.id))
            .find_also_related(Category)
            .all(db)
            .await?
            .into_iter()
            .filter_map(|(_, category)| category)
            .map(|category| CategoryRef {
                id: category.id,
                name: category.name,
            })
            .collect();

        overviews.push(CandidateOverview {
            candidate,
            vote_count,
            nomination_count,
            finalist_in,
        });
    }

    Ok(overviews)
}
