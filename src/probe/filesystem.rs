use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use walkdir::WalkDir;

use super::{ProbeError, Record};

/// Expand a leading `~` to the current user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

/// Walk every root and collect `(path, mtime)` records for regular files.
///
/// Missing roots are skipped; if none of them exist the probe fails.
/// Entries that can't be read are skipped. Symlinks report the mtime of
/// their target, links to directories are not descended into, and
/// dangling links are ignored.
pub fn file_times(roots: &[PathBuf]) -> Result<Vec<Record>, ProbeError> {
    let existing: Vec<&PathBuf> = roots.iter().filter(|r| r.exists()).collect();
    if existing.is_empty() {
        let joined: Vec<String> = roots.iter().map(|r| r.display().to_string()).collect();
        return Err(ProbeError::Missing {
            path: joined.join(", "),
        });
    }

    let mut records = Vec::new();
    for root in existing {
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::debug!(root = %root.display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if entry.file_type().is_dir() {
                continue;
            }

            // resolved, so a link to a directory is skipped like the directory
            let meta = match std::fs::metadata(entry.path()) {
                Ok(m) if m.is_dir() => continue,
                Ok(m) => m,
                Err(e) => {
                    tracing::debug!(path = %entry.path().display(), error = %e, "unresolvable, skipping");
                    continue;
                }
            };
            let modified = match meta.modified() {
                Ok(t) => DateTime::<Utc>::from(t),
                Err(e) => {
                    tracing::debug!(path = %entry.path().display(), error = %e, "no mtime, skipping");
                    continue;
                }
            };
            records.push(Record::file(entry.path(), modified));
        }
    }

    Ok(records)
}
