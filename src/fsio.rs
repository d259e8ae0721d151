//! Atomic output writes.
//!
//! Every artifact is written to a temporary sibling path and renamed into
//! place on success. A cancelled or failed pipeline therefore never leaves a
//! partially written file at an output path — readers see either the old
//! artifact or the complete new one.
//!
//! Disk and permission errors are retried exactly once with a fresh
//! temporary file before being reported.

use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Temporary sibling path for an output. Lives in the same directory so the
/// final rename stays on one filesystem.
fn temp_path(output: &Path, attempt: u32) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    output.with_file_name(format!(".{name}.tmp{attempt}"))
}

async fn write_once(output: &Path, contents: &[u8], attempt: u32) -> io::Result<()> {
    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = temp_path(output, attempt);
    if let Err(e) = tokio::fs::write(&tmp, contents).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    tokio::fs::rename(&tmp, output).await
}

async fn copy_once(source: &Path, output: &Path, attempt: u32) -> io::Result<()> {
    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = temp_path(output, attempt);
    if let Err(e) = tokio::fs::copy(source, &tmp).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    tokio::fs::rename(&tmp, output).await
}

/// Write `contents` to `output` atomically, retrying once on failure.
pub async fn write_atomic(output: &Path, contents: &[u8]) -> io::Result<()> {
    match write_once(output, contents, 0).await {
        Ok(()) => Ok(()),
        Err(e) => {
            warn!(output = %output.display(), error = %e, "write failed, retrying once");
            write_once(output, contents, 1).await
        }
    }
}

/// Copy `source` to `output` atomically, retrying once on failure.
pub async fn copy_atomic(source: &Path, output: &Path) -> io::Result<()> {
    match copy_once(source, output, 0).await {
        Ok(()) => Ok(()),
        Err(e) => {
            warn!(output = %output.display(), error = %e, "copy failed, retrying once");
            copy_once(source, output, 1).await
        }
    }
}

/// Blocking variant of the temp-then-rename protocol for CPU-bound encoders
/// that produce their own file (e.g. image encoding inside
/// `spawn_blocking`). The closure writes to the temporary path; on success
/// the file is renamed into place.
pub fn persist_blocking<F>(output: &Path, produce: F) -> io::Result<()>
where
    F: FnOnce(&Path) -> io::Result<()>,
{
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = temp_path(output, 0);
    if let Err(e) = produce(&tmp) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    std::fs::rename(&tmp, output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn write_atomic_creates_parents() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("a/b/c.html");

        write_atomic(&out, b"<p>Hi</p>").await.unwrap();
        assert_eq!(fs::read(&out).unwrap(), b"<p>Hi</p>");
    }

    #[tokio::test]
    async fn write_atomic_leaves_no_temp_files() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("page.html");

        write_atomic(&out, b"content").await.unwrap();

        let leftovers: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.contains(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");
    }

    #[tokio::test]
    async fn write_atomic_overwrites_existing() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("page.html");
        fs::write(&out, "old").unwrap();

        write_atomic(&out, b"new").await.unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "new");
    }

    #[tokio::test]
    async fn copy_atomic_copies_bytes() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src.bin");
        let out = tmp.path().join("nested/out.bin");
        fs::write(&src, b"\x00\x01\x02").unwrap();

        copy_atomic(&src, &out).await.unwrap();
        assert_eq!(fs::read(&out).unwrap(), b"\x00\x01\x02");
    }

    #[tokio::test]
    async fn copy_atomic_missing_source_fails() {
        let tmp = TempDir::new().unwrap();
        let result = copy_atomic(&tmp.path().join("gone"), &tmp.path().join("out")).await;
        assert!(result.is_err());
    }

    #[test]
    fn persist_blocking_renames_on_success() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("thumb.png");

        persist_blocking(&out, |tmp_path| fs::write(tmp_path, b"png")).unwrap();
        assert_eq!(fs::read(&out).unwrap(), b"png");
    }

    #[test]
    fn persist_blocking_cleans_up_on_failure() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("thumb.png");

        let result = persist_blocking(&out, |_| {
            Err(io::Error::new(io::ErrorKind::Other, "encoder exploded"))
        });
        assert!(result.is_err());
        assert!(!out.exists());
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }
}
