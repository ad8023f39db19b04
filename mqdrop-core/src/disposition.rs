//! What happens to a source file once it has been delivered.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Post-delivery handling of a source file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Disposition {
    /// Leave the file where it is. Dedup keeps it from being sent twice.
    #[default]
    Keep,
    /// Remove the file.
    Delete,
    /// Move the file into the given directory.
    Archive(PathBuf),
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keep => write!(f, "keep"),
            Self::Delete => write!(f, "delete"),
            Self::Archive(dir) => write!(f, "archive to {}", dir.display()),
        }
    }
}

impl Disposition {
    /// Apply to `path`. Returns the archived location, if the file moved.
    pub async fn apply(&self, path: &Path) -> io::Result<Option<PathBuf>> {
        match self {
            Self::Keep => Ok(None),
            Self::Delete => {
                tokio::fs::remove_file(path).await?;
                Ok(None)
            }
            Self::Archive(dir) => {
                let name = path.file_name().ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidInput, "source has no file name")
                })?;
                tokio::fs::create_dir_all(dir).await?;
                let target = free_target(dir, &name.to_string_lossy()).await?;
                move_file(path, &target).await?;
                Ok(Some(target))
            }
        }
    }
}

/// `dir/name`, or `dir/name.N` with the smallest free `N`.
async fn free_target(dir: &Path, name: &str) -> io::Result<PathBuf> {
    let mut target = dir.join(name);
    let mut suffix = 1u32;
    while tokio::fs::try_exists(&target).await? {
        target = dir.join(format!("{name}.{suffix}"));
        suffix += 1;
    }
    Ok(target)
}

/// Rename, falling back to copy-and-remove across filesystems.
async fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(from, to).await?;
    tokio::fs::remove_file(from).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn keep_leaves_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, b"x").unwrap();

        assert_eq!(Disposition::Keep.apply(&file).await.unwrap(), None);
        assert!(file.exists());
    }

    #[tokio::test]
    async fn delete_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, b"x").unwrap();

        Disposition::Delete.apply(&file).await.unwrap();
        assert!(!file.exists());
    }

    #[tokio::test]
    async fn archive_suffixes_collisions() {
        let inbound = tempfile::tempdir().unwrap();
        let archive = inbound.path().join("done");
        let disposition = Disposition::Archive(archive.clone());

        for body in ["first", "second", "third"] {
            let file = inbound.path().join("a.txt");
            std::fs::write(&file, body).unwrap();
            disposition.apply(&file).await.unwrap();
            assert!(!file.exists());
        }

        assert_eq!(std::fs::read(archive.join("a.txt")).unwrap(), b"first");
        assert_eq!(std::fs::read(archive.join("a.txt.1")).unwrap(), b"second");
        assert_eq!(std::fs::read(archive.join("a.txt.2")).unwrap(), b"third");
    }

    #[tokio::test]
    async fn delete_of_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(
            Disposition::Delete
                .apply(&dir.path().join("gone"))
                .await
                .is_err()
        );
    }
}
