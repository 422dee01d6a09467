//! Category business logic - Handles all category-related operations.
//!
//! Provides creation, partial updates, deletion and the listings used by the public
//! ballot and the admin console. Deleting a category removes its nominations, votes
//! and finalist entries in the same transaction.

use crate::{
    core::finalists::{self, FinalistSummary},
    entities::{
        Category, CategoryCandidate, Nomination, Vote, category, category_candidate, nomination,
        vote,
    },
    errors::{Error, Result},
};
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::info;

/// Fields for a new category. Unset optional fields take their defaults
/// (`order` 0, active).
#[derive(Debug, Clone, Default)]
pub struct NewCategory {
    /// Display name, required
    pub name: String,
    /// Description, required
    pub short_description: String,
    /// Display position
    pub order: Option<i32>,
    /// Whether the category appears on ballots
    pub is_active: Option<bool>,
}

/// Partial update of a category; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct CategoryChanges {
    /// New display name
    pub name: Option<String>,
    /// New description
    pub short_description: Option<String>,
    /// New display position
    pub order: Option<i32>,
    /// New active flag
    pub is_active: Option<bool>,
}

/// Admin view of a category with related row counts.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryOverview {
    /// The category itself
    #[serde(flatten)]
    pub category: category::Model,
    /// Nominations received
    pub nomination_count: u64,
    /// Finalists selected
    pub finalist_count: u64,
    /// Votes received
    pub vote_count: u64,
}

/// Public view of a category, optionally with its active finalists.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryListing {
    /// The category itself
    #[serde(flatten)]
    pub category: category::Model,
    /// Active finalists, present when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<FinalistSummary>>,
}

/// Creates a category after checking that name and description are present.
///
/// This function trims both fields, defaults `order` to 0 and `is_active` to true, and
/// starts the category without a winner.
pub async fn create_category(db: &DatabaseConnection, new: NewCategory) -> Result<category::Model> {
    let name = new.name.trim();
    let description = new.short_description.trim();
    if name.is_empty() || description.is_empty() {
        return Err(Error::validation("Name and description are required"));
    }

    let category = category::ActiveModel {
        name: Set(name.to_string()),
        short_description: Set(description.to_string()),
        order: Set(new.order.unwrap_or(0)),
        is_active: Set(new.is_active.unwrap_or(true)),
        winner_candidate_id: Set(None),
        winner_announced: Set(false),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let created = category.insert(db).await?;
    info!(category_id = created.id, name = %created.name, "Created category");
    Ok(created)
}

/// Finds a category by id.
pub async fn get_category<C>(db: &C, category_id: i32) -> Result<Option<category::Model>>
where
    C: ConnectionTrait,
{
    Category::find_by_id(category_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a category by exact name.
pub async fn get_category_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<category::Model>> {
    Category::find()
        .filter(category::Column::Name.eq(name.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Applies a partial update. Blank names or descriptions are ignored rather than
/// stored.
pub async fn update_category(
    db: &DatabaseConnection,
    category_id: i32,
    changes: CategoryChanges,
) -> Result<category::Model> {
    let existing = get_category(db, category_id)
        .await?
        .ok_or_else(|| Error::not_found("Category", category_id))?;

    let mut active: category::ActiveModel = existing.into();
    if let Some(name) = changes.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        active.name = Set(name.to_string());
    }
    if let Some(description) = changes
        .short_description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
    {
        active.short_description = Set(description.to_string());
    }
    if let Some(order) = changes.order {
        active.order = Set(order);
    }
    if let Some(is_active) = changes.is_active {
        active.is_active = Set(is_active);
    }

    active.update(db).await.map_err(Into::into)
}

/// Deletes a category together with its nominations, votes and finalists.
///
/// Everything runs in one transaction, so a failure part way leaves the category and
/// all of its rows in place.
pub async fn delete_category(db: &DatabaseConnection, category_id: i32) -> Result<()> {
    let txn = db.begin().await?;

    let category = get_category(&txn, category_id)
        .await?
        .ok_or_else(|| Error::not_found("Category", category_id))?;

    Nomination::delete_many()
        .filter(nomination::Column::CategoryId.eq(category_id))
        .exec(&txn)
        .await?;
    Vote::delete_many()
        .filter(vote::Column::CategoryId.eq(category_id))
        .exec(&txn)
        .await?;
    CategoryCandidate::delete_many()
        .filter(category_candidate::Column::CategoryId.eq(category_id))
        .exec(&txn)
        .await?;
    category.delete(&txn).await?;

    txn.commit().await?;
    info!(category_id, "Deleted category");
    Ok(())
}

/// Lists categories in display order, optionally only the active ones.
///
/// This function is generic over the connection so ballot checks can run it inside
/// their transaction. Ties in `order` fall back to the id.
pub async fn list_categories<C>(db: &C, active_only: bool) -> Result<Vec<category::Model>>
where
    C: ConnectionTrait,
{
    let mut query = Category::find();
    if active_only {
        query = query.filter(category::Column::IsActive.eq(true));
    }
    query
        .order_by_asc(category::Column::Order)
        .order_by_asc(category::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Public category listing. With `with_candidates`, each category carries its active
/// finalists in selection order.
pub async fn list_public_categories(
    db: &DatabaseConnection,
    active_only: bool,
    with_candidates: bool,
) -> Result<Vec<CategoryListing>> {
    let categories = list_categories(db, active_only).await?;
    let mut finalists_by_category = if with_candidates {
        Some(finalists::finalists_by_category(db, true).await?)
    } else {
        None
    };

    Ok(categories
        .into_iter()
        .map(|category| {
            let candidates = finalists_by_category
                .as_mut()
                .map(|all| all.remove(&category.id).unwrap_or_default());
            CategoryListing {
                category,
                candidates,
            }
        })
        .collect())
}

/// Admin category listing with nomination, finalist and vote counts.
pub async fn list_category_overviews(db: &DatabaseConnection) -> Result<Vec<CategoryOverview>> {
    let categories = list_categories(db, false).await?;
    let mut overviews = Vec::with_capacity(categories.len());

    for category in categories {
        let nomination_count = Nomination::find()
            .filter(nomination::Column::CategoryId.eq(category.id))
            .count(db)
            .await?;
        let finalist_count = CategoryCandidate::find()
            .filter(category_candidate::Column::CategoryId.eq(category.id))
            .count(db)
            .await?;
        let vote_count = Vote::find()
            .filter(vote::Column::CategoryId.eq(category.id))
            .count(db)
            .await?;

        overviews.push(CategoryOverview {
            category,
            nomination_count,
            finalist_count,
            vote_count,
        });
    }

    Ok(overviews)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_create_category_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = create_category(
            &db,
            NewCategory {
                name: "  ".to_string(),
                short_description: "desc".to_string(),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let result = create_category(
            &db,
            NewCategory {
                name: "Best Officer".to_string(),
                short_description: String::new(),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_category_defaults() -> Result<()> {
        let db = setup_test_db().await?;
        let category = create_category(
            &db,
            NewCategory {
                name: " Best Officer ".to_string(),
                short_description: "Clear communication".to_string(),
                ..Default::default()
            },
        )
        .await?;

        assert_eq!(category.name, "Best Officer");
        assert_eq!(category.order, 0);
        assert!(category.is_active);
        assert!(category.winner_candidate_id.is_none());
        assert!(!category.winner_announced);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_category_partial() -> Result<()> {
        let db = setup_test_db().await?;
        let category = create_test_category(&db, "Best MG", 1).await?;

        let updated = update_category(
            &db,
            category.id,
            CategoryChanges {
                name: Some(String::new()),
                order: Some(7),
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await?;

        assert_eq!(updated.name, "Best MG");
        assert_eq!(updated.order, 7);
        assert!(!updated.is_active);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_missing_category() -> Result<()> {
        let db = setup_test_db().await?;
        let result = update_category(&db, 999, CategoryChanges::default()).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_categories_ordering_and_filter() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_category(&db, "Third", 3).await?;
        create_test_category(&db, "First", 1).await?;
        let hidden = create_test_category(&db, "Second", 2).await?;
        update_category(
            &db,
            hidden.id,
            CategoryChanges {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await?;

        let all = list_categories(&db, false).await?;
        let names: Vec<_> = all.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["First", "Second", "Third"]);

        let active = list_categories(&db, true).await?;
        let names: Vec<_> = active.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["First", "Third"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_category_cascades() -> Result<()> {
        let db = setup_test_db().await?;
        let category = create_test_category(&db, "Best AT", 1).await?;
        let other = create_test_category(&db, "Best Recon", 2).await?;
        let candidate = create_test_candidate(&db, "Alice").await?;

        insert_test_nomination(&db, category.id, candidate.id).await?;
        insert_test_nomination(&db, other.id, candidate.id).await?;
        finalists::select_finalists(&db, category.id, &[candidate.id], 5).await?;
        insert_test_vote(&db, category.id, candidate.id).await?;

        delete_category(&db, category.id).await?;

        assert!(get_category(&db, category.id).await?.is_none());
        assert_eq!(Nomination::find().count(&db).await?, 1);
        assert_eq!(Vote::find().count(&db).await?, 0);
        assert_eq!(CategoryCandidate::find().count(&db).await?, 0);

        let again = delete_category(&db, category.id).await;
        assert!(matches!(again, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_public_listing_with_candidates() -> Result<()> {
        let db = setup_test_db().await?;
        let category = create_test_category(&db, "Best Tanker", 1).await?;
        let empty = create_test_category(&db, "Best Artillery", 2).await?;
        let alice = create_test_candidate(&db, "Alice").await?;
        let bob = create_test_candidate(&db, "Bob").await?;
        finalists::select_finalists(&db, category.id, &[bob.id, alice.id], 5).await?;

        let listing = list_public_categories(&db, true, true).await?;
        assert_eq!(listing.len(), 2);
        let names: Vec<_> = listing[0]
            .candidates
            .as_ref()
            .unwrap()
            .iter()
            .map(|c| c.candidate_name.as_str())
            .collect();
        assert_eq!(names, vec!["Bob", "Alice"]);
        assert_eq!(listing[1].category.id, empty.id);
        assert!(listing[1].candidates.as_ref().unwrap().is_empty());

        let plain = list_public_categories(&db, true, false).await?;
        assert!(plain[0].candidates.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_category_overview_counts() -> Result<()> {
        let db = setup_test_db().await?;
        let category = create_test_category(&db, "Killer", 1).await?;
        let candidate = create_test_candidate(&db, "Alice").await?;
        insert_test_nomination(&db, category.id, candidate.id).await?;
        insert_test_nomination(&db, category.id, candidate.id).await?;
        finalists::select_finalists(&db, category.id, &[candidate.id], 5).await?;
        insert_test_vote(&db, category.id, candidate.id).await?;

        let overviews = list_category_overviews(&db).await?;
        assert_eq!(overviews.len(), 1);
        assert_eq!(overviews[0].nomination_count, 2);
        assert_eq!(overviews[0].finalist_count, 1);
        assert_eq!(overviews[0].vote_count, 1);
        Ok(())
    }
}
