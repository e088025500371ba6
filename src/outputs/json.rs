//! JSON digest output.
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! └── 2025-05-06/
//!     ├── morning.json
//!     ├── afternoon.json
//!     └── evening.json
//! ```
//!
//! A second run in the same edition merges into that edition's file: the new
//! run's stories come first, followed by the archived ones whose link has not
//! been seen yet.

use std::collections::HashSet;
use std::error::Error;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument, warn};

use crate::models::{Digest, DigestEntry};

/// Path the digest will be written to under `json_output_dir`.
pub fn digest_path(digest: &Digest, json_output_dir: &str) -> PathBuf {
    PathBuf::from(json_output_dir)
        .join(&digest.local_date)
        .join(format!("{}.json", digest.edition))
}

/// Combine fresh entries with archived ones, fresh first, dropping repeated links.
/// Entries without a link are always kept.
pub fn merge_entries(fresh: &[DigestEntry], archived: Vec<DigestEntry>) -> Vec<DigestEntry> {
    let mut seen = HashSet::new();
    fresh
        .iter()
        .cloned()
        .chain(archived)
        .filter(|entry| entry.link.is_empty() || seen.insert(entry.link.clone()))
        .collect()
}

/// Entries of an earlier digest at `path`. Missing or unreadable archives yield nothing.
async fn read_archived_entries(path: &Path) -> Vec<DigestEntry> {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not read existing digest; starting fresh");
            return Vec::new();
        }
    };
    match serde_json::from_str::<Digest>(&raw) {
        Ok(previous) => previous.entries,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Existing digest is not valid JSON; starting fresh");
            Vec::new()
        }
    }
}

/// Write a [`Digest`] to `{json_output_dir}/{date}/{edition}.json`, merged
/// with whatever an earlier run of the same edition left there.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir))]
pub async fn write_digest(digest: &Digest, json_output_dir: &str) -> Result<PathBuf, Box<dyn Error>> {
    let path = digest_path(digest, json_output_dir);

    if let Some(dir) = path.parent() {
        if let Err(e) = fs::create_dir_all(dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to create JSON dir");
            return Err(e.into());
        }
    }

    let archived = read_archived_entries(&path).await;
    let archived_count = archived.len();
    let merged = Digest {
        display_name: digest.display_name.clone(),
        local_date: digest.local_date.clone(),
        local_time: digest.local_time.clone(),
        edition: digest.edition.clone(),
        entries: merge_entries(&digest.entries, archived),
    };

    let json = serde_json::to_string_pretty(&merged)?;
    fs::write(&path, json).await?;
    info!(
        path = %path.display(),
        new = digest.entries.len(),
        archived = archived_count,
        entries = merged.entries.len(),
        "Wrote JSON digest"
    );
    Ok(path)
}
