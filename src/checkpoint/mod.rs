//! Filesystem-backed record of which content IDs are complete, incomplete,
//! or untouched.
//!
//! Status is derived purely from on-disk artifact presence at scan time,
//! never cached across a run boundary. The only mutation `scan` performs is
//! deleting directories that hold zero non-empty files (garbage left behind
//! by aborted runs), which is idempotent.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, warn};

use crate::identity::{self, PostKind};

/// Completion state of one content ID, as evidenced on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointStatus {
    /// Required artifacts for the inferred kind are present and non-empty.
    Complete,
    /// The directory exists with some content but required artifacts are
    /// missing.
    Incomplete,
    /// No directory (or only an empty one, which scan removes).
    Unseen,
}

/// Which artifacts a kind requires for completeness. Comments are never
/// required; items legitimately have none.
#[derive(Debug, Clone, Copy)]
pub struct ArtifactPolicy {
    pub caption: bool,
    pub media: bool,
}

/// Completeness policy per content kind.
#[must_use]
pub fn required_artifacts(kind: PostKind) -> ArtifactPolicy {
    match kind {
        PostKind::Video | PostKind::Reel => ArtifactPolicy {
            caption: false,
            media: true,
        },
        PostKind::Text | PostKind::Unknown => ArtifactPolicy {
            caption: true,
            media: false,
        },
    }
}

/// Scan result: content ID to evidenced status. IDs without a directory
/// report `Unseen`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CheckpointIndex {
    entries: HashMap<String, CheckpointStatus>,
}

impl CheckpointIndex {
    #[must_use]
    pub fn status(&self, id: &str) -> CheckpointStatus {
        self.entries
            .get(id)
            .copied()
            .unwrap_or(CheckpointStatus::Unseen)
    }

    /// IDs with partial content, in no particular order. Rescan mode
    /// re-processes exactly these.
    #[must_use]
    pub fn incomplete_ids(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, status)| **status == CheckpointStatus::Incomplete)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Whether the ID has any on-disk evidence at all. Resume mode skips
    /// every seen ID, complete or not.
    #[must_use]
    pub fn is_seen(&self, id: &str) -> bool {
        self.status(id) != CheckpointStatus::Unseen
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> &HashMap<String, CheckpointStatus> {
        &self.entries
    }
}

/// What one item directory actually contains.
#[derive(Debug, Default)]
struct DirProbe {
    caption: bool,
    media: bool,
    any_content: bool,
}

const MEDIA_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "mp4", "webm"];

fn probe_dir(dir: &Path) -> Result<DirProbe> {
    let mut probe = DirProbe::default();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read item directory {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let non_empty = entry.metadata().map(|m| m.len() > 0).unwrap_or(false);
        if !non_empty {
            continue;
        }
        probe.any_content = true;

        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name == "caption.txt" {
            probe.caption = true;
        }
        if let Some(ext) = path.extension().and_then(|e| e.to_str())
            && MEDIA_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
        {
            probe.media = true;
        }
    }
    Ok(probe)
}

/// Scan a page-scoped storage root into a [`CheckpointIndex`].
///
/// Re-running on an unchanged tree yields an identical index. Directories
/// with zero non-empty files are removed and reported `Unseen` (absent).
pub fn scan(root: &Path) -> Result<CheckpointIndex> {
    let mut index = CheckpointIndex::default();
    if !root.exists() {
        return Ok(index);
    }

    for entry in std::fs::read_dir(root)
        .with_context(|| format!("failed to read storage root {}", root.display()))?
    {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let id = entry.file_name().to_string_lossy().to_string();

        let probe = match probe_dir(&path) {
            Ok(probe) => probe,
            Err(e) => {
                warn!("skipping unreadable item directory {}: {e}", path.display());
                continue;
            }
        };

        if !probe.any_content {
            debug!("removing empty item directory {}", path.display());
            if let Err(e) = std::fs::remove_dir_all(&path) {
                warn!("failed to remove empty directory {}: {e}", path.display());
            }
            continue;
        }

        let policy = required_artifacts(identity::infer_kind_from_id(&id));
        let complete = (!policy.caption || probe.caption) && (!policy.media || probe.media);
        let status = if complete {
            CheckpointStatus::Complete
        } else {
            CheckpointStatus::Incomplete
        };
        index.entries.insert(id, status);
    }

    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::PostKind;

    #[test]
    fn policy_matches_kind() {
        assert!(required_artifacts(PostKind::Text).caption);
        assert!(!required_artifacts(PostKind::Text).media);
        assert!(required_artifacts(PostKind::Video).media);
        assert!(!required_artifacts(PostKind::Video).caption);
        assert!(required_artifacts(PostKind::Reel).media);
    }

    #[test]
    fn missing_root_scans_empty() {
        let index = scan(Path::new("/definitely/not/here")).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.status("anything"), CheckpointStatus::Unseen);
    }
}
