//! Write the generated feed to its final location.

use std::{
    fs::create_dir_all,
    io::Write,
    path::{Path, PathBuf},
};

use log::info;
use tempfile::NamedTempFile;

use crate::{
    calendar::{verify, CalendarFeed},
    error::{Error, Result},
};

/// Serialize `feed`, check the result and replace the file at `path`.
///
/// The document goes to a temporary file next to `path` first and is renamed
/// into place, so readers see either the old or the new feed, never a mix.
pub fn publish(feed: &CalendarFeed, path: &Path) -> Result<()> {
    let ics = feed.generate()?;
    verify(feed, &ics)?;
    write_atomically(path, ics.as_bytes())?;
    info!("wrote {} events to {}", feed.entries.len(), path.display());
    Ok(())
}

fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    let write_error = |source| Error::Write {
        path: path.to_path_buf(),
        source,
    };
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    create_dir_all(&directory).map_err(write_error)?;
    let mut file = NamedTempFile::new_in(&directory).map_err(write_error)?;
    file.write_all(contents).map_err(write_error)?;
    file.as_file().sync_all().map_err(write_error)?;
    file.persist(path).map_err(|err| write_error(err.error))?;
    Ok(())
}
