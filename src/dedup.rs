//! Per-identity dedup state, seeded from files already on disk
//!
//! Stored files are named `<content_hash>_<original_filename>`, so the
//! directory listing itself is the persistent form of this state: each run
//! reconstructs the hash set and the filename set from it, then mutates the
//! in-memory copy as workers persist new assets.
//!
//! Both key spaces expose an atomic insert-if-absent (`try_claim_*`). Workers
//! racing to persist the same never-seen asset all call the claim, exactly
//! one gets `true`, and only that worker writes — the check-then-insert race
//! of a naive shared set cannot produce duplicate files.

use crate::error::Result;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

/// Shared dedup record for one identity's run
#[derive(Debug, Default)]
pub struct DedupState {
    filenames: Mutex<HashSet<String>>,
    hashes: Mutex<HashSet<String>>,
}

impl DedupState {
    /// Build the dedup state for `base_path`, creating the directory if absent
    ///
    /// Scans existing files whose extension is in `extensions` and recovers
    /// `(content_hash, original_filename)` by splitting each name on the
    /// first `_`. Files not matching the naming convention are ignored.
    /// Listing failures are fatal for this identity's run.
    pub async fn initialize(base_path: &Path, extensions: &[&str]) -> Result<Self> {
        tokio::fs::create_dir_all(base_path).await?;

        let mut filenames = HashSet::new();
        let mut hashes = HashSet::new();

        let mut entries = tokio::fs::read_dir(base_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if !extensions.iter().any(|ext| name.ends_with(ext)) {
                continue;
            }
            // Hashes are written first, so the first underscore is the
            // separator even if the original filename contains more.
            if let Some((hash, original)) = name.split_once('_') {
                hashes.insert(hash.to_string());
                filenames.insert(original.to_string());
            }
        }

        tracing::debug!(
            path = %base_path.display(),
            known_files = filenames.len(),
            known_hashes = hashes.len(),
            "Seeded dedup state from disk"
        );

        Ok(Self {
            filenames: Mutex::new(filenames),
            hashes: Mutex::new(hashes),
        })
    }

    /// Whether an original filename is already known (cheap pre-fetch check)
    pub fn contains_filename(&self, name: &str) -> bool {
        match self.filenames.lock() {
            Ok(set) => set.contains(name),
            Err(poisoned) => poisoned.into_inner().contains(name),
        }
    }

    /// Atomically claim an original filename; `true` iff this call was the
    /// first to insert it
    pub fn try_claim_filename(&self, name: &str) -> bool {
        match self.filenames.lock() {
            Ok(mut set) => set.insert(name.to_string()),
            Err(poisoned) => poisoned.into_inner().insert(name.to_string()),
        }
    }

    /// Atomically claim a content hash; `true` iff this call was the first
    /// to insert it
    pub fn try_claim_hash(&self, hash: &str) -> bool {
        match self.hashes.lock() {
            Ok(mut set) => set.insert(hash.to_string()),
            Err(poisoned) => poisoned.into_inner().insert(hash.to_string()),
        }
    }

    /// Release a claimed content hash after the claimant abandoned the write
    ///
    /// Without this, losing the filename race would leave the hash claimed
    /// with nothing on disk, and the same bytes under a fresh name would be
    /// skipped for the rest of the run.
    pub fn release_hash(&self, hash: &str) {
        match self.hashes.lock() {
            Ok(mut set) => {
                set.remove(hash);
            }
            Err(poisoned) => {
                poisoned.into_inner().remove(hash);
            }
        }
    }
}
