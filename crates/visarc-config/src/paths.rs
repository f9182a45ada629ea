//! Path normalization helpers.
//!
//! The engine may execute with a different working directory than the
//! assembling process, so every path embedded in a stage declaration is
//! normalized to absolute form first.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Resolve a caller-supplied path to absolute form.
///
/// Purely lexical apart from the current-directory lookup: the path is not
/// required to exist, symlinks are not followed, and no I/O is attempted on
/// the path itself. Existence checks are left to the engine's reader and
/// writer stages.
pub fn absolutize(path: &Path) -> Result<PathBuf, ConfigError> {
    std::path::absolute(path).map_err(|e| ConfigError::resolve_path(path, e))
}

/// Derive the companion metadata path by appending `.meta` to the full file
/// name, so `/data/run1.raw` becomes `/data/run1.raw.meta`.
pub fn metadata_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".meta");
    PathBuf::from(name)
}
