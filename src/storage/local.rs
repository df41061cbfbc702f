//! Directory-backed object store.

use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{GraphError, Result};
use crate::storage::{ByteRange, ObjectStore};

/// Every regular file directly under `root` is one object, named by its
/// file name.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Open a store rooted at an existing directory.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let meta = fs::metadata(&root)?;
        if !meta.is_dir() {
            return Err(GraphError::InvalidConfig(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, object: &str) -> Result<PathBuf> {
        // Object names are flat; refuse anything that would escape the root.
        if object.is_empty() || object.contains('/') || object.contains('\\') || object == ".." {
            return Err(GraphError::ObjectNotFound(object.to_string()));
        }
        Ok(self.root.join(object))
    }
}

impl ObjectStore for LocalStore {
    fn list_objects(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn fetch(&self, object: &str, range: ByteRange) -> Result<Vec<u8>> {
        let path = self.object_path(object)?;
        let mut file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(GraphError::ObjectNotFound(object.to_string()))
            }
            Err(e) => return Err(GraphError::Io(e)),
        };
        let len = file.metadata()?.len();
        let (start, end) = range.resolve(object, len)?;

        debug!(object, %range, "local fetch");
        file.seek(SeekFrom::Start(start))?;
        let mut buf = vec![0u8; (end - start) as usize];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_fetch_ranges() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("obj"), (0u8..32).collect::<Vec<_>>()).unwrap();
        let store = LocalStore::open(dir.path()).unwrap();

        assert_eq!(store.fetch("obj", ByteRange::inclusive(0, 3)).unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(store.fetch("obj", ByteRange::to_end(30)).unwrap(), vec![30, 31]);
        assert!(store.fetch("obj", ByteRange::to_end(32)).unwrap().is_empty());
        assert!(matches!(
            store.fetch("obj", ByteRange::inclusive(30, 40)),
            Err(GraphError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_list_skips_directories() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b"), b"x").unwrap();
        fs::write(dir.path().join("a"), b"y").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        assert_eq!(store.list_objects().unwrap(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_missing_object_and_bad_root() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.fetch("nope", ByteRange::to_end(0)),
            Err(GraphError::ObjectNotFound(_))
        ));
        assert!(matches!(
            store.fetch("../etc", ByteRange::to_end(0)),
            Err(GraphError::ObjectNotFound(_))
        ));

        let file = dir.path().join("file");
        fs::write(&file, b"x").unwrap();
        assert!(LocalStore::open(&file).is_err());
    }
}
