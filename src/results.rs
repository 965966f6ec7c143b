use std::path::{Component, Path, PathBuf};

use globset::GlobBuilder;
use log::debug;
use walkdir::WalkDir;

use crate::error::{PublisherError, Result};

/// Finds the result directories matching `pattern`.
///
/// Relative patterns are matched against paths relative to `root`; a leading
/// `./` is ignored. Absolute patterns are matched against absolute paths,
/// walking only below their longest literal prefix. Results are sorted so
/// downstream ordering is stable.
///
/// # Errors
///
/// Returns [`PublisherError::MissingResults`] if nothing matched and
/// [`PublisherError::Config`] for an invalid pattern.
pub fn find_result_dirs(pattern: &str, root: &Path) -> Result<Vec<PathBuf>> {
    let absolute = Path::new(pattern).is_absolute();
    let (glob, base) = if absolute {
        (pattern, literal_prefix(pattern))
    } else {
        (pattern.trim_start_matches("./"), root.to_path_buf())
    };

    let matcher = GlobBuilder::new(glob)
        .literal_separator(true)
        .build()
        .map_err(|e| PublisherError::Config(format!("Invalid results glob '{pattern}': {e}")))?
        .compile_matcher();

    let mut dirs: Vec<PathBuf> = WalkDir::new(&base)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir())
        .filter(|entry| {
            let Ok(relative) = entry.path().strip_prefix(&base) else {
                return false;
            };
            let candidate = if absolute { entry.path() } else { relative };
            !is_hidden(relative) && matcher.is_match(candidate)
        })
        .map(walkdir::DirEntry::into_path)
        .collect();

    if dirs.is_empty() {
        return Err(PublisherError::MissingResults(pattern.to_string()));
    }

    dirs.sort();
    debug!("Found {} result directories for '{pattern}'", dirs.len());

    Ok(dirs)
}

/// Leading components of `pattern` that contain no glob syntax.
fn literal_prefix(pattern: &str) -> PathBuf {
    Path::new(pattern)
        .components()
        .take_while(|component| {
            !component
                .as_os_str()
                .to_str()
                .is_some_and(|s| s.contains(['*', '?', '[', '{']))
        })
        .collect()
}

fn is_hidden(relative: &Path) -> bool {
    relative.components().any(|component| match component {
        Component::Normal(name) => name.to_str().is_some_and(|n| n.starts_with('.')),
        _ => false,
    })
}
