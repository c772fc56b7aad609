//! On-disk layout for extracted artifacts.
//!
//! One directory per content ID under a page-scoped root. Text artifacts are
//! flat UTF-8 files, one logical entry per line; media files carry a stable
//! sequential name per type.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;

/// Page-scoped storage root: `<storage_root>/<page_name>`, with the page name
/// made filesystem-safe.
#[must_use]
pub fn page_root(storage_root: &Path, page_name: &str) -> PathBuf {
    storage_root.join(sanitize_filename::sanitize(page_name))
}

/// Directory owned by a single content ID.
#[must_use]
pub fn item_dir(page_root: &Path, id: &str) -> PathBuf {
    page_root.join(sanitize_filename::sanitize(id))
}

/// Sequential media path, e.g. `image_1.jpg`, `video_2.mp4`. Indexes are
/// 1-based to match the artifact naming convention.
#[must_use]
pub fn media_path(dir: &Path, prefix: &str, index: usize, extension: &str) -> PathBuf {
    dir.join(format!("{prefix}_{index}.{extension}"))
}

/// Write text lines to `path`, one entry per line. Empty inputs write
/// nothing so an absent artifact stays absent on disk.
pub async fn save_lines(lines: &[String], path: &Path) -> Result<()> {
    if lines.is_empty() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let mut body = lines.join("\n");
    body.push('\n');
    tokio::fs::write(path, body)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    debug!("wrote {} line(s) to {}", lines.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn writes_one_entry_per_line() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("item").join("caption.txt");
        let lines = vec!["first".to_string(), "second".to_string()];
        save_lines(&lines, &path).await.unwrap();
        let body = std::fs::read_to_string(&path).unwrap();
        assert_eq!(body, "first\nsecond\n");
    }

    #[tokio::test]
    async fn empty_input_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("caption.txt");
        save_lines(&[], &path).await.unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn media_names_are_stable() {
        let dir = Path::new("/data/page/1");
        assert_eq!(
            media_path(dir, "image", 1, "jpg"),
            PathBuf::from("/data/page/1/image_1.jpg")
        );
        assert_eq!(
            media_path(dir, "video", 2, "mp4"),
            PathBuf::from("/data/page/1/video_2.mp4")
        );
    }
}
