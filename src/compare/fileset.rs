//! Matching files between two directories by name.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Partition of the file names found in two directories.
///
/// `common`, `only_a` and `only_b` are pairwise disjoint; `common ∪ only_a`
/// is every name in A and `common ∪ only_b` every name in B.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSet {
    /// Names present in both directories.
    pub common: BTreeSet<String>,
    /// Names present only in directory A.
    pub only_a: BTreeSet<String>,
    /// Names present only in directory B.
    pub only_b: BTreeSet<String>,
}

impl FileSet {
    /// Partition two name sets.
    #[must_use]
    pub fn from_names(a: BTreeSet<String>, b: BTreeSet<String>) -> Self {
        let common = a.intersection(&b).cloned().collect();
        let only_a = a.difference(&b).cloned().collect();
        let only_b = b.difference(&a).cloned().collect();
        Self { common, only_a, only_b }
    }

    /// Number of files in directory A.
    #[must_use]
    pub fn total_a(&self) -> usize {
        self.common.len() + self.only_a.len()
    }

    /// Number of files in directory B.
    #[must_use]
    pub fn total_b(&self) -> usize {
        self.common.len() + self.only_b.len()
    }
}

/// Match the immediate regular files of `dir_a` and `dir_b` by exact name.
///
/// Subdirectories are not descended into. Names are compared case-sensitively
/// and include the extension.
pub fn resolve(dir_a: &Path, dir_b: &Path) -> Result<FileSet> {
    let a = list_files(dir_a)?;
    let b = list_files(dir_b)?;
    Ok(FileSet::from_names(a, b))
}

/// Names of the regular files directly inside `dir`.
pub fn list_files(dir: &Path) -> Result<BTreeSet<String>> {
    if !dir.is_dir() {
        return Err(Error::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let mut names = BTreeSet::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        // Follows symlinks so linked files count as files.
        if !entry.path().is_file() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => {
                names.insert(name);
            }
            Err(raw) => {
                tracing::warn!(dir = %dir.display(), name = ?raw, "skipping non-UTF-8 file name");
            }
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"x").unwrap();
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_resolve_partitions_by_name() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        for name in ["a.png", "b.png", "c.png"] {
            touch(a.path(), name);
        }
        for name in ["b.png", "c.png", "d.png"] {
            touch(b.path(), name);
        }

        let fs = resolve(a.path(), b.path()).unwrap();
        assert_eq!(fs.common, set(&["b.png", "c.png"]));
        assert_eq!(fs.only_a, set(&["a.png"]));
        assert_eq!(fs.only_b, set(&["d.png"]));
        assert_eq!(fs.total_a(), 3);
        assert_eq!(fs.total_b(), 3);
    }

    #[test]
    fn test_case_sensitive_and_extension_aware() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        touch(a.path(), "image.png");
        touch(b.path(), "image.webp");
        touch(a.path(), "Photo.jpg");
        touch(b.path(), "photo.jpg");

        let fs = resolve(a.path(), b.path()).unwrap();
        assert!(fs.common.is_empty());
        assert_eq!(fs.only_a.len(), 2);
        assert_eq!(fs.only_b.len(), 2);
    }

    #[test]
    fn test_subdirectories_are_ignored() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        std::fs::create_dir(a.path().join("nested")).unwrap();
        touch(&a.path().join("nested"), "deep.png");
        std::fs::create_dir(b.path().join("nested")).unwrap();

        let fs = resolve(a.path(), b.path()).unwrap();
        assert_eq!(fs, FileSet::default());
    }

    #[test]
    fn test_missing_directory() {
        let a = tempfile::tempdir().unwrap();
        let missing = a.path().join("does-not-exist");
        let err = resolve(a.path(), &missing).unwrap_err();
        assert!(matches!(err, Error::DirectoryNotFound { path } if path == missing));
    }

    #[test]
    fn test_file_is_not_a_directory() {
        let a = tempfile::tempdir().unwrap();
        touch(a.path(), "plain.png");
        let err = resolve(&a.path().join("plain.png"), a.path()).unwrap_err();
        assert!(matches!(err, Error::DirectoryNotFound { .. }));
    }

    proptest! {
        #[test]
        fn prop_partition_is_exact(
            a in proptest::collection::btree_set("[a-e]{1,3}", 0..20),
            b in proptest::collection::btree_set("[a-e]{1,3}", 0..20),
        ) {
            let fs = FileSet::from_names(a.clone(), b.clone());

            prop_assert!(fs.common.is_disjoint(&fs.only_a));
            prop_assert!(fs.common.is_disjoint(&fs.only_b));
            prop_assert!(fs.only_a.is_disjoint(&fs.only_b));

            let union_a: BTreeSet<String> = fs.common.union(&fs.only_a).cloned().collect();
            let union_b: BTreeSet<String> = fs.common.union(&fs.only_b).cloned().collect();
            prop_assert_eq!(union_a, a);
            prop_assert_eq!(union_b, b);
        }
    }
}
