//! Shared test utilities for `BallotBox`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    config::AppConfig,
    core::{
        candidates,
        categories::{self, NewCategory},
        codes,
        event::StageAction,
    },
    entities::{self, MemberCode, member_code},
    errors::{Error, Result},
};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, prelude::*};
use std::{
    io::{Cursor, Write},
    path::PathBuf,
};
use zip::{ZipWriter, write::SimpleFileOptions};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates an active test category.
///
/// # Defaults
/// * `short_description`: "Description of {name}"
pub async fn create_test_category(
    db: &DatabaseConnection,
    name: &str,
    order: i32,
) -> Result<entities::category::Model> {
    categories::create_category(
        db,
        NewCategory {
            name: name.to_string(),
            short_description: format!("Description of {name}"),
            order: Some(order),
            is_active: Some(true),
        },
    )
    .await
}

/// Creates an active test candidate without an image.
pub async fn create_test_candidate(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::candidate::Model> {
    candidates::create_candidate(db, name, Some(true)).await
}

/// Inserts a nomination row directly, bypassing stage and code checks.
pub async fn insert_test_nomination(
    db: &DatabaseConnection,
    category_id: i32,
    candidate_id: i32,
) -> Result<entities::nomination::Model> {
    entities::nomination::ActiveModel {
        category_id: Set(category_id),
        candidate_id: Set(candidate_id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Inserts a vote row directly, bypassing stage, code and finalist checks.
pub async fn insert_test_vote(
    db: &DatabaseConnection,
    category_id: i32,
    candidate_id: i32,
) -> Result<entities::vote::Model> {
    entities::vote::ActiveModel {
        category_id: Set(category_id),
        candidate_id: Set(candidate_id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Flags an existing code as used for `action`.
pub async fn mark_code_used(db: &DatabaseConnection, code: &str, action: StageAction) -> Result<()> {
    let column = match action {
        StageAction::Nominate => member_code::Column::UsedInNomination,
        StageAction::Vote => member_code::Column::UsedInVoting,
    };
    let result = MemberCode::update_many()
        .col_expr(column, sea_orm::sea_query::Expr::value(true))
        .filter(member_code::Column::Code.eq(codes::normalize_code(code)))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::UnknownCode);
    }
    Ok(())
}

/// A fresh, not yet created directory under the system temp dir.
pub fn temp_upload_dir() -> PathBuf {
    std::env::temp_dir().join(format!("ballot-box-test-{}", uuid::Uuid::new_v4()))
}

/// Configuration for router tests: known admin credentials and a private upload dir.
pub fn test_config() -> AppConfig {
    AppConfig {
        admin_user: "admin".to_string(),
        admin_password: "secret".to_string(),
        upload_dir: temp_upload_dir(),
        database_url: "sqlite::memory:".to_string(),
        ..AppConfig::default()
    }
}

/// Builds an in-memory ZIP archive from `(path, bytes)` entries.
#[allow(clippy::unwrap_used)]
pub fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(bytes).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn inline_cell(reference: &str, value: &str) -> String {
    format!(r#"<c r="{reference}" t="inlineStr"><is><t>{value}</t></is></c>"#)
}

/// Builds the smallest xlsx workbook calamine accepts: one sheet of inline strings,
/// up to three columns.
pub fn build_xlsx(rows: &[&[&str]]) -> Vec<u8> {
    let sheet_rows: String = rows
        .iter()
        .zip(1..)
        .map(|(cells, number)| {
            let cells: String = cells
                .iter()
                .zip(['A', 'B', 'C'])
                .map(|(value, column)| inline_cell(&format!("{column}{number}"), value))
                .collect();
            format!(r#"<row r="{number}">{cells}</row>"#)
        })
        .collect();

    let content_types = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;
    let root_rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;
    let workbook = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#;
    let workbook_rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;
    let sheet = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{sheet_rows}</sheetData></worksheet>"#
    );

    build_zip(&[
        ("[Content_Types].xml", content_types.as_bytes()),
        ("_rels/.rels", root_rels.as_bytes()),
        ("xl/workbook.xml", workbook.as_bytes()),
        ("xl/_rels/workbook.xml.rels", workbook_rels.as_bytes()),
        ("xl/worksheets/sheet1.xml", sheet.as_bytes()),
    ])
}
