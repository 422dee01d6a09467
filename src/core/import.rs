//! Candidate import from a spreadsheet, or from a ZIP archive holding a spreadsheet and
//! candidate images.
//!
//! The first worksheet is read with a header row. Columns are recognised through
//! ordered alias lists, so both the English and the Spanish templates work:
//!
//! | Field          | Accepted headers (case-insensitive)                              |
//! |----------------|------------------------------------------------------------------|
//! | `display_name` | `display_name`, `nombre`, `nombre del candidato`, `miembro`, `name` |
//! | `is_active`    | `is_active`, `activo`, `active`                                  |
//!
//! In an archive, every image whose file stem equals a candidate name (ignoring case
//! and an optional `"<marker> | "` prefix on the name) is stored and linked to that
//! candidate. Problems with single rows are reported back and never abort the batch.

use crate::{
    core::{
        candidates,
        images::{self, ImageStore},
    },
    errors::{Error, Result},
};
use calamine::{Data, Reader, open_workbook_auto_from_rs};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::{
    collections::HashMap,
    io::{Cursor, Read},
    path::Path,
};
use tracing::{info, warn};
use zip::ZipArchive;

const DISPLAY_NAME_HEADERS: &[&str] = &[
    "display_name",
    "nombre",
    "nombre del candidato",
    "miembro",
    "name",
];
const IS_ACTIVE_HEADERS: &[&str] = &["is_active", "activo", "active"];
const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "ods"];
const FALSE_WORDS: &[&str] = &["false", "0", "no", "n", "inactive", "inactivo"];

/// A candidate row read from the spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRow {
    /// Spreadsheet row number (1-based, header is row 1)
    pub row: usize,
    /// Trimmed display name
    pub display_name: String,
    /// Active flag, `true` when the cell is empty
    pub is_active: bool,
}

/// Rows read from a sheet together with the rows that could not be read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSheet {
    /// Valid rows in sheet order
    pub rows: Vec<ImportRow>,
    /// One message per rejected row
    pub errors: Vec<String>,
}

/// Spreadsheet and images pulled out of an archive.
#[derive(Debug, Default)]
pub struct ArchiveContents {
    /// First spreadsheet found, with its file name
    pub spreadsheet: Option<(String, Vec<u8>)>,
    /// Image bytes and extension keyed by lower-cased file stem
    pub images: HashMap<String, (Vec<u8>, String)>,
}

/// Summary returned to the admin after an import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Candidates created or updated
    pub imported: usize,
    /// Valid rows found in the sheet
    pub total: usize,
    /// Images stored and linked
    pub images_linked: usize,
    /// Per-row problems
    pub errors: Vec<String>,
}

fn find_column(header: &[String], aliases: &[&str]) -> Option<usize> {
    aliases
        .iter()
        .find_map(|alias| header.iter().position(|h| h == alias))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn cell_flag(cell: Option<&Data>) -> bool {
    match cell {
        Some(Data::Bool(b)) => *b,
        Some(Data::Int(i)) => *i != 0,
        Some(Data::Float(f)) => *f != 0.0,
        Some(Data::String(s)) => {
            let value = s.trim().to_lowercase();
            !FALSE_WORDS.contains(&value.as_str())
        }
        _ => true,
    }
}

/// Reads candidate rows from a sheet whose first row is the header.
///
/// Fails only when there is no header or no display name column; everything else is
/// collected per row.
pub fn parse_rows<'a, I>(rows: I) -> Result<ParsedSheet>
where
    I: IntoIterator<Item = &'a [Data]>,
{
    let mut rows = rows.into_iter();
    let header: Vec<String> = rows
        .next()
        .ok_or_else(|| Error::Import {
            message: "The spreadsheet is empty".to_string(),
        })?
        .iter()
        .map(|cell| cell_text(cell).to_lowercase())
        .collect();

    let name_col = find_column(&header, DISPLAY_NAME_HEADERS).ok_or_else(|| Error::Import {
        message: format!(
            "No candidate name column found; expected one of: {}",
            DISPLAY_NAME_HEADERS.join(", ")
        ),
    })?;
    let active_col = find_column(&header, IS_ACTIVE_HEADERS);

    let mut parsed = ParsedSheet::default();
    for (index, cells) in rows.enumerate() {
        let row = index + 2;
        if cells.iter().all(|c| cell_text(c).is_empty()) {
            continue;
        }

        let display_name = cells.get(name_col).map(cell_text).unwrap_or_default();
        if display_name.is_empty() {
            parsed
                .errors
                .push(format!("Row {row}: missing candidate name"));
            continue;
        }

        parsed.rows.push(ImportRow {
            row,
            display_name,
            is_active: cell_flag(active_col.and_then(|col| cells.get(col))),
        });
    }
    Ok(parsed)
}

/// Parses the first worksheet of an xlsx, xls or ods file.
pub fn parse_spreadsheet(bytes: Vec<u8>) -> Result<ParsedSheet> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| Error::Import {
        message: format!("Could not read the spreadsheet: {e}"),
    })?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::Import {
            message: "The spreadsheet has no worksheets".to_string(),
        })?
        .map_err(|e| Error::Import {
            message: format!("Could not read the first worksheet: {e}"),
        })?;

    parse_rows(range.rows())
}

fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

/// Whether `filename` names a ZIP archive.
#[must_use]
pub fn is_archive(filename: &str) -> bool {
    extension_of(filename).as_deref() == Some("zip")
}

/// Whether `filename` names a supported spreadsheet.
#[must_use]
pub fn is_spreadsheet(filename: &str) -> bool {
    extension_of(filename).is_some_and(|e| SPREADSHEET_EXTENSIONS.contains(&e.as_str()))
}

/// Extracts the first spreadsheet and every supported image from a ZIP archive.
///
/// Directories and macOS resource forks (`__MACOSX/`) are skipped. The entries that
/// are kept may decompress to at most `max_bytes` in total; the sizes recorded in the
/// archive are checked up front, and reads are capped as well since those headers can
/// understate the real size.
///
/// # Errors
/// * [`Error::Import`] if the archive cannot be opened or its kept entries exceed
///   `max_bytes` once decompressed
pub fn read_archive(bytes: Vec<u8>, max_bytes: usize) -> Result<ArchiveContents> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(|e| Error::Import {
        message: format!("Could not open the archive: {e}"),
    })?;

    let mut contents = ArchiveContents::default();
    let mut remaining = max_bytes;
    for index in 0..archive.len() {
        let mut file = archive.by_index(index).map_err(|e| Error::Import {
            message: format!("Could not read archive entry {index}: {e}"),
        })?;
        if file.is_dir() {
            continue;
        }
        let declared = file.size();
        let path = file.name().to_string();
        if path.starts_with("__MACOSX/") || path.contains("/__MACOSX/") {
            continue;
        }
        let Some(file_name) = path.rsplit('/').next().map(ToString::to_string) else {
            continue;
        };
        if file_name.starts_with('.') {
            continue;
        }

        if is_spreadsheet(&file_name) {
            if contents.spreadsheet.is_none() {
                let buf = read_entry(&mut file, declared, &path, &mut remaining, max_bytes)?;
                contents.spreadsheet = Some((file_name, buf));
            }
        } else if let Some(extension) = images::image_extension(&file_name) {
            let Some(stem) = Path::new(&file_name).file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let key = stem.trim().to_lowercase();
            let buf = read_entry(&mut file, declared, &path, &mut remaining, max_bytes)?;
            contents.images.insert(key, (buf, extension));
        }
    }
    Ok(contents)
}

fn read_entry(
    file: &mut impl Read,
    declared: u64,
    path: &str,
    remaining: &mut usize,
    max_bytes: usize,
) -> Result<Vec<u8>> {
    let too_large = || Error::Import {
        message: format!(
            "The archive expands beyond the {max_bytes} byte limit (at {path})"
        ),
    };

    let declared = usize::try_from(declared).unwrap_or(usize::MAX);
    if declared > *remaining {
        return Err(too_large());
    }

    let mut buf = Vec::with_capacity(declared);
    let cap = u64::try_from(*remaining).unwrap_or(u64::MAX).saturating_add(1);
    file.by_ref().take(cap).read_to_end(&mut buf)?;
    if buf.len() > *remaining {
        return Err(too_large());
    }

    *remaining -= buf.len();
    Ok(buf)
}

/// Image lookup key for a candidate name: an optional `"<marker> | "` prefix is
/// dropped, then the rest is trimmed and lower-cased.
#[must_use]
pub fn match_key(display_name: &str) -> String {
    display_name
        .split_once(" | ")
        .map_or(display_name, |(_, name)| name)
        .trim()
        .to_lowercase()
}

/// Imports candidates from an uploaded spreadsheet or archive.
///
/// Candidates are upserted by display name. In archive mode each candidate with a
/// matching image gets it stored and linked, replacing (and deleting) any earlier image.
///
/// This function is used by the admin bulk import. `max_bytes` bounds how much an
/// archive may expand to in memory; plain spreadsheets are already bounded by the
/// request body limit.
///
/// # Errors
/// * [`Error::Validation`] for an empty upload or an unsupported file type
/// * [`Error::Import`] if the file cannot be read or yields no candidate rows
pub async fn import_candidates(
    db: &DatabaseConnection,
    store: &ImageStore,
    filename: &str,
    bytes: Vec<u8>,
    max_bytes: usize,
) -> Result<ImportReport> {
    if bytes.is_empty() {
        return Err(Error::validation("The uploaded file is empty"));
    }

    let (sheet, images) = if is_archive(filename) {
        let contents = read_archive(bytes, max_bytes)?;
        let (_, spreadsheet) = contents.spreadsheet.ok_or_else(|| Error::Import {
            message: "The archive does not contain a spreadsheet (.xlsx, .xls or .ods)"
                .to_string(),
        })?;
        (parse_spreadsheet(spreadsheet)?, Some(contents.images))
    } else if is_spreadsheet(filename) {
        (parse_spreadsheet(bytes)?, None)
    } else {
        return Err(Error::validation(
            "Unsupported file type; upload a .xlsx, .xls, .ods or .zip file",
        ));
    };

    let mut report = ImportReport {
        total: sheet.rows.len(),
        errors: sheet.errors,
        ..Default::default()
    };
    if sheet.rows.is_empty() {
        return Err(Error::Import {
            message: format!(
                "No candidates could be read from the file ({} rows rejected)",
                report.errors.len()
            ),
        });
    }

    for row in &sheet.rows {
        let candidate = match candidates::upsert_candidate(db, &row.display_name, row.is_active)
            .await
        {
            Ok((candidate, _)) => candidate,
            Err(e) => {
                warn!(row = row.row, name = %row.display_name, "Candidate import failed: {e}");
                report
                    .errors
                    .push(format!("Row {}: could not save {}: {e}", row.row, row.display_name));
                continue;
            }
        };
        report.imported += 1;

        let Some(images) = &images else { continue };
        let Some((image, extension)) = images.get(&match_key(&row.display_name)) else {
            report.errors.push(format!(
                "Row {}: no image found for {}",
                row.row, row.display_name
            ));
            continue;
        };

        match candidates::store_profile_image(db, store, candidate.id, image, extension).await {
            Ok(_) => report.images_linked += 1,
            Err(e) => report.errors.push(format!(
                "Row {}: could not store the image for {}: {e}",
                row.row, row.display_name
            )),
        }
    }

    info!(
        imported = report.imported,
        total = report.total,
        images_linked = report.images_linked,
        errors = report.errors.len(),
        "Imported candidates"
    );
    Ok(report)
}
