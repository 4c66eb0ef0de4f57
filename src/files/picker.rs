use super::registry::FileEntry;
use ignore::Walk;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Turns the paths returned by a file dialog into one batch.
pub fn batch_from_paths(paths: &[PathBuf]) -> Vec<FileEntry> {
    paths
        .iter()
        .filter_map(|path| match FileEntry::from_path(path) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                None
            }
        })
        .collect()
}

/// Every file below `folder`, skipping whatever `.gitignore` and hidden-file
/// rules exclude. The result is submitted as a single batch.
pub fn batch_from_folder(folder: &Path) -> Vec<FileEntry> {
    let mut batch = Vec::new();
    for result in Walk::new(folder) {
        match result {
            Ok(entry) => {
                let path = entry.path();
                if !path.is_file() {
                    continue;
                }
                match FileEntry::from_path(path) {
                    Ok(file) => batch.push(file),
                    Err(e) => warn!("Skipping {}: {}", path.display(), e),
                }
            }
            Err(e) => warn!("Error walking directory: {}", e),
        }
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_folder_batch_collects_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("run1")).unwrap();
        fs::write(dir.path().join("a.dat"), b"12").unwrap();
        fs::write(dir.path().join("run1").join("b.dat"), b"1234").unwrap();

        let mut batch = batch_from_folder(dir.path());
        batch.sort_by(|x, y| x.name.cmp(&y.name));

        let names: Vec<_> = batch.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.dat", "b.dat"]);
        assert_eq!(batch[1].size, 4);
    }

    #[test]
    fn test_folder_batch_skips_hidden_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".DS_Store"), b"x").unwrap();
        fs::write(dir.path().join("keep.dat"), b"x").unwrap();

        let batch = batch_from_folder(dir.path());
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].name, "keep.dat");
    }

    #[test]
    fn test_paths_batch_skips_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("present.dat");
        fs::write(&present, b"abc").unwrap();

        let batch = batch_from_paths(&[present, dir.path().join("missing.dat")]);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].size, 3);
    }
}
