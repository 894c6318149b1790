//! Filesystem digest source: walks a directory tree and hashes matching files

use async_trait::async_trait;
use epo_reputation_domain::{
    DigestRecord, DigestSource, FileHasher, FileTypeFilter, Reputation, ScanError,
};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Hashes every file under a root directory whose extension passes the filter
pub struct FsDigestSource {
    root: PathBuf,
    filter: FileTypeFilter,
}

impl FsDigestSource {
    /// Create a new source rooted at `root`
    pub fn new(root: impl AsRef<Path>, filter: FileTypeFilter) -> Result<Self, ScanError> {
        let root = root.as_ref().to_path_buf();

        if !root.is_dir() {
            return Err(ScanError::RootNotFound(root.display().to_string()));
        }

        Ok(Self { root, filter })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Collect matching file paths, depth first, without following directory symlinks
    fn walk(&self, dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), ScanError> {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;

            if file_type.is_dir() {
                self.walk(&path, out)?;
                continue;
            }

            if !path.is_file() {
                continue;
            }

            if self.filter.matches(&path) {
                out.push(path);
            }
        }
        Ok(())
    }

    fn hash_file(path: &Path) -> Result<FileHasher, ScanError> {
        let read_error = |e: std::io::Error| ScanError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        };

        let mut file = File::open(path).map_err(read_error)?;
        let mut hasher = FileHasher::new();
        let mut buffer = vec![0u8; READ_BUFFER_SIZE];

        loop {
            let n = file.read(&mut buffer).map_err(read_error)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        Ok(hasher)
    }
}

#[async_trait]
impl DigestSource for FsDigestSource {
    async fn collect(
        &self,
        reputation: Reputation,
        comment: &str,
    ) -> Result<Vec<DigestRecord>, ScanError> {
        let mut paths = Vec::new();
        self.walk(&self.root, &mut paths)?;
        paths.sort();

        tracing::debug!(
            root = %self.root.display(),
            files = paths.len(),
            filter = ?self.filter.allowed(),
            "Scanning files"
        );

        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());

            let (md5, sha1) = Self::hash_file(&path)?.finalize();
            tracing::trace!(file = %path.display(), md5 = %md5, "Hashed file");

            records.push(DigestRecord::new(name, comment, md5, sha1, reputation));
        }

        tracing::info!(count = records.len(), "Computed file digests");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("setup.exe"), b"hello world").unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"notes").unwrap();
        std::fs::create_dir_all(dir.path().join("bin/nested")).unwrap();
        std::fs::write(dir.path().join("bin/LIB.DLL"), b"library").unwrap();
        std::fs::write(dir.path().join("bin/nested/tool.EXE"), b"tool").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_collect_filters_by_extension_case_insensitively() {
        let dir = setup_tree();
        let source = FsDigestSource::new(dir.path(), "exe".parse().unwrap()).unwrap();

        let records = source
            .collect(Reputation::KnownTrusted, "2016-11-14 alice@WebAPI")
            .await
            .unwrap();

        let names: Vec<&str> = records.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["tool.EXE", "setup.exe"]);
    }

    #[tokio::test]
    async fn test_collect_all_files_recursively() {
        let dir = setup_tree();
        let source = FsDigestSource::new(dir.path(), FileTypeFilter::all()).unwrap();

        let records = source.collect(Reputation::Unknown, "c").await.unwrap();

        assert_eq!(records.len(), 4);
        assert!(records.iter().all(|r| r.comment() == "c"));
        assert!(records.iter().all(|r| r.reputation() == Reputation::Unknown));
    }

    #[tokio::test]
    async fn test_collect_hashes_contents() {
        let dir = setup_tree();
        let source = FsDigestSource::new(dir.path(), "exe+dll".parse().unwrap()).unwrap();

        let records = source.collect(Reputation::KnownTrusted, "c").await.unwrap();
        let setup = records.iter().find(|r| r.name() == "setup.exe").unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(setup.md5().to_hex(), "5eb63bbbe01eeed093cb22bb8f5acdc3");
        assert_eq!(
            setup.sha1().to_hex(),
            "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed"
        );
    }

    #[tokio::test]
    async fn test_empty_directory_yields_no_records() {
        let dir = TempDir::new().unwrap();
        let source = FsDigestSource::new(dir.path(), FileTypeFilter::all()).unwrap();

        let records = source.collect(Reputation::Unknown, "c").await.unwrap();

        assert!(records.is_empty());
    }

    #[test]
    fn test_missing_root_is_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");

        let result = FsDigestSource::new(&missing, FileTypeFilter::all());

        assert!(matches!(result, Err(ScanError::RootNotFound(_))));
    }
}
