//! Candidate image storage on the local filesystem.
//!
//! Images are written under generated names so uploads never collide or overwrite
//! each other; the stored URL is the public path the HTTP layer serves the directory
//! under.

use crate::errors::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// URL prefix under which stored images are served.
pub const PUBLIC_PREFIX: &str = "/uploads/candidates";

/// Accepted image file extensions, lower-case.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Returns the lower-cased extension of `filename` if it is a supported image type.
#[must_use]
pub fn image_extension(filename: &str) -> Option<String> {
    let extension = Path::new(filename)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    SUPPORTED_EXTENSIONS
        .contains(&extension.as_str())
        .then_some(extension)
}

/// Directory-backed image store.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    /// Creates a store writing into `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory images are written to.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes an image and returns its public URL.
    pub async fn save(&self, bytes: &[u8], extension: &str) -> Result<String> {
        let extension = extension.to_ascii_lowercase();
        if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(Error::validation(format!(
                "Unsupported image type .{extension}; expected one of {}",
                SUPPORTED_EXTENSIONS.join(", ")
            )));
        }
        if bytes.is_empty() {
            return Err(Error::validation("Image file is empty"));
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let filename = format!("candidate-{}.{extension}", Uuid::new_v4());
        tokio::fs::write(self.dir.join(&filename), bytes).await?;

        debug!(%filename, size = bytes.len(), "Stored candidate image");
        Ok(format!("{PUBLIC_PREFIX}/{filename}"))
    }

    /// Deletes the file behind a URL previously returned by [`ImageStore::save`].
    ///
    /// Best effort: URLs outside the store and I/O failures are logged and ignored.
    pub async fn remove(&self, url: &str) {
        let Some(path) = self.path_for(url) else {
            debug!(%url, "Not a stored image URL, nothing to delete");
            return;
        };
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!(path = %path.display(), "Failed to delete superseded image: {e}");
        }
    }

    fn path_for(&self, url: &str) -> Option<PathBuf> {
        let filename = url.strip_prefix(PUBLIC_PREFIX)?.strip_prefix('/')?;
        let is_plain_name = !filename.is_empty()
            && !filename.contains(['/', '\\'])
            && filename != "."
            && filename != "..";
        is_plain_name.then(|| self.dir.join(filename))
    }
}
