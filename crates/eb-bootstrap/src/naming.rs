//! Output paths for realizations.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use eb_core::{Error, Result};

/// Sibling path of `input` for realization `realization`:
/// `<stem>_bs_<realization><.ext>`.
///
/// Only the final extension is kept after the suffix (`a.evt.fits` becomes
/// `a.evt_bs_0.fits`). Inputs without an extension get the suffix appended
/// (`events` becomes `events_bs_0`), and so do dot-files (`.events` becomes
/// `.events_bs_0`).
pub fn realization_path(input: &Path, realization: usize) -> Result<PathBuf> {
    let stem = input.file_stem().ok_or_else(|| {
        Error::Validation(format!("input path {} has no file name", input.display()))
    })?;
    let mut name = OsString::from(stem);
    name.push(format!("_bs_{realization}"));
    if let Some(ext) = input.extension() {
        name.push(".");
        name.push(ext);
    }
    Ok(input.with_file_name(name))
}
