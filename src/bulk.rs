//! Bulk re-run over a directory of previously harvested identities
//!
//! Folder names are filesystem-safe (underscores escaped to hyphens), so the
//! true identity name can be ambiguous. Recovery prefers the crumb file laid
//! down during the original run; only when no crumb exists does it fall back
//! to brute-force permutation of the delimiter positions.

use crate::error::Result;
use crate::harvester::MediaHarvester;
use crate::types::{Identity, IdentityKind};
use std::path::Path;

/// Candidate true names for a harvested folder, best guesses first
///
/// - A name without `-` is unambiguous and returned as-is.
/// - Crumb file stems are exact names and short-circuit permutation.
/// - Otherwise, for k delimiter positions all 2^k assignments of `{-, _}`
///   are enumerated, the all-hyphen candidate first.
pub fn recover_names(folder: &Path, folder_name: &str) -> Result<Vec<String>> {
    if !folder_name.contains('-') {
        return Ok(vec![folder_name.to_string()]);
    }

    let mut crumbs = Vec::new();
    for entry in std::fs::read_dir(folder)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("crumb")
            && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
        {
            crumbs.push(stem.to_string());
        }
    }
    if !crumbs.is_empty() {
        return Ok(crumbs);
    }

    Ok(permute_delimiters(folder_name))
}

/// All 2^k `{-, _}` assignments over the name's k hyphen positions
fn permute_delimiters(name: &str) -> Vec<String> {
    let positions: Vec<usize> = name
        .char_indices()
        .filter(|(_, c)| *c == '-')
        .map(|(i, _)| i)
        .collect();
    let k = positions.len();

    let mut candidates = Vec::with_capacity(1 << k);
    for mask in 0..(1_usize << k) {
        let mut candidate = name.to_string();
        for (bit, &pos) in positions.iter().enumerate() {
            // Last position varies fastest; the untouched folder name is
            // candidate zero.
            if mask & (1 << (k - 1 - bit)) != 0 {
                candidate.replace_range(pos..pos + 1, "_");
            }
        }
        candidates.push(candidate);
    }
    candidates
}

/// Re-run the harvest for every identity folder under `root`, sequentially
///
/// Each folder's candidate names are tried in order until one resolves
/// against the source; failures are logged and the walk continues with the
/// next folder.
pub async fn update_directory(
    harvester: &MediaHarvester,
    root: &Path,
    kind: IdentityKind,
    limit: Option<u32>,
    search: Option<&str>,
) -> Result<()> {
    let mut folders = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        let file_name = entry.file_name();
        if entry.path().is_dir()
            && let Some(name) = file_name.to_str()
        {
            folders.push((entry.path(), name.to_string()));
        }
    }
    folders.sort_by(|a, b| a.1.cmp(&b.1));

    for (folder, folder_name) in folders {
        let candidates = match recover_names(&folder, &folder_name) {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!(folder = %folder.display(), error = %e, "Skipping unreadable folder");
                continue;
            }
        };

        let mut resolved = false;
        for candidate in candidates {
            let identity = Identity {
                name: candidate.clone(),
                kind,
            };
            tracing::info!(identity = %candidate, "Updating identity");
            match harvester.harvest(&identity, limit, search).await {
                Ok(summary) => {
                    tracing::info!(
                        identity = %candidate,
                        written = summary.written,
                        "Identity updated"
                    );
                    resolved = true;
                    break;
                }
                Err(e) => {
                    tracing::debug!(identity = %candidate, error = %e, "Candidate name failed");
                }
            }
        }
        if !resolved {
            tracing::warn!(folder = %folder_name, "Could not retrieve submissions for any candidate name");
        }
    }
    Ok(())
}
