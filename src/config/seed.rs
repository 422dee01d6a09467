//! Startup seed data loaded from config.toml
//!
//! The seed file lists the award categories and, optionally, member codes to create on
//! startup. Seeding is idempotent: categories are matched by name and codes by value, so
//! existing rows (and any admin edits to them) are left alone.

use crate::{
    core::{
        categories::{self, NewCategory},
        codes,
        event,
    },
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Contents of the seed file
#[derive(Debug, Default, Deserialize)]
pub struct SeedConfig {
    /// Categories to create
    #[serde(default)]
    pub categories: Vec<SeedCategory>,
    /// Member codes to create
    #[serde(default)]
    pub codes: Vec<String>,
}

/// A category definition in the seed file
#[derive(Debug, Clone, Deserialize)]
pub struct SeedCategory {
    /// Category name, used to detect existing categories
    pub name: String,
    /// Short description shown on ballots
    pub short_description: String,
    /// Display position
    #[serde(default)]
    pub order: i32,
    /// Whether the category starts active
    #[serde(default = "default_true")]
    pub is_active: bool,
}

const fn default_true() -> bool {
    true
}

/// What a seeding run created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedOutcome {
    /// Categories created
    pub categories_created: usize,
    /// Codes created
    pub codes_created: u64,
}

/// Loads the seed file at `path`.
///
/// # Returns
/// * `Ok(None)` - The file does not exist
/// * `Ok(Some(SeedConfig))` - Successfully parsed seed data
///
/// # Errors
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_seed<P: AsRef<Path>>(path: P) -> Result<Option<SeedConfig>> {
    let path = path.as_ref();
    if !path.exists() {
        debug!(path = %path.display(), "No seed file found");
        return Ok(None);
    }

    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read seed file {}: {e}", path.display()),
    })?;

    toml::from_str(&contents)
        .map(Some)
        .map_err(|e| Error::Config {
            message: format!("Failed to parse seed file {}: {e}", path.display()),
        })
}

/// Creates the event state, missing categories and missing codes.
pub async fn apply_seed(db: &DatabaseConnection, seed: &SeedConfig) -> Result<SeedOutcome> {
    event::get_event_state(db).await?;

    let mut outcome = SeedOutcome::default();
    for category in &seed.categories {
        if categories::get_category_by_name(db, &category.name)
            .await?
            .is_some()
        {
            debug!(name = %category.name, "Category already exists, skipping");
            continue;
        }

        categories::create_category(
            db,
            NewCategory {
                name: category.name.clone(),
                short_description: category.short_description.clone(),
                order: Some(category.order),
                is_active: Some(category.is_active),
            },
        )
        .await?;
        outcome.categories_created += 1;
    }

    if seed.codes.iter().any(|c| !c.trim().is_empty()) {
        outcome.codes_created = codes::import_codes(db, &seed.codes).await?.imported;
    }

    info!(
        categories = outcome.categories_created,
        codes = outcome.codes_created,
        "Applied seed data"
    );
    Ok(outcome)
}
