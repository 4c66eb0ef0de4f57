use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// 1 GB = 1024 * 1024 * 1024 bytes. Files must be strictly smaller.
pub const MAX_FILE_SIZE_BYTES: u64 = 1_073_741_824;
const MAX_FILE_SIZE_LABEL: &str = "1 GB";

/// One locally selected file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub uid: String,
    pub name: String,
    pub size: u64,
    pub path: PathBuf,
}

impl FileEntry {
    /// Each call hands out a fresh uid, even for the same path.
    pub fn new(name: impl Into<String>, size: u64, path: impl Into<PathBuf>) -> Self {
        Self {
            uid: format!("file-{}", Uuid::new_v4()),
            name: name.into(),
            size,
            path: path.into(),
        }
    }

    pub fn from_path(path: &Path) -> io::Result<Self> {
        let metadata = path.metadata()?;
        let name = path
            .file_name()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Invalid filename"))?
            .to_string_lossy()
            .to_string();
        Ok(Self::new(name, metadata.len(), path))
    }
}

/// Why an incoming batch was dropped as a whole.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchRejection {
    /// Duplicate names win the message even when files were also too large.
    #[error("{}", duplicate_message(.names))]
    Duplicates {
        names: Vec<String>,
        oversized: Vec<String>,
    },

    #[error("{}", oversize_message(.names))]
    TooLarge { names: Vec<String> },
}

fn quote_names(names: &[String]) -> String {
    match names {
        [single] => format!("\"{}\"", single),
        _ => format!("[{}]", names.join(", ")),
    }
}

fn duplicate_message(names: &[String]) -> String {
    let prefix = if names.len() == 1 {
        "Filename already exists, please rename:"
    } else {
        "Filenames already exist, please rename:"
    };
    format!("{} {}", prefix, quote_names(names))
}

fn oversize_message(names: &[String]) -> String {
    format!(
        "Maximum file size exceeded (file size must be less than {} for a single file): {}",
        MAX_FILE_SIZE_LABEL,
        quote_names(names)
    )
}

/// The current file selection and its running total size.
#[derive(Debug, Clone)]
pub struct FileRegistry {
    files: Vec<FileEntry>,
    total_size: u64,
    max_size_bytes: u64,
}

impl Default for FileRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FileRegistry {
    pub fn new() -> Self {
        Self::with_max_size(MAX_FILE_SIZE_BYTES)
    }

    pub fn with_max_size(max_size_bytes: u64) -> Self {
        Self {
            files: Vec::new(),
            total_size: 0,
            max_size_bytes,
        }
    }

    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Copy of the selection handed to an upload batch.
    pub fn snapshot(&self) -> Vec<FileEntry> {
        self.files.clone()
    }

    /// Accepts the whole batch or nothing. Returns the number of files added.
    pub fn submit_batch(&mut self, batch: Vec<FileEntry>) -> Result<usize, BatchRejection> {
        let mut oversized = Vec::new();
        let mut duplicates = Vec::new();
        let mut seen_in_batch = HashSet::new();

        for file in &batch {
            if file.size >= self.max_size_bytes {
                oversized.push(file.name.clone());
            }

            let clashes_with_registered = self
                .files
                .iter()
                .any(|existing| existing.name == file.name && existing.uid != file.uid);
            let clashes_within_batch = !seen_in_batch.insert(file.name.as_str());

            if (clashes_with_registered || clashes_within_batch) && !duplicates.contains(&file.name)
            {
                duplicates.push(file.name.clone());
            }
        }

        if !duplicates.is_empty() {
            warn!("Rejected batch of {} files: duplicate names {:?}", batch.len(), duplicates);
            return Err(BatchRejection::Duplicates {
                names: duplicates,
                oversized,
            });
        }
        if !oversized.is_empty() {
            warn!("Rejected batch of {} files: too large {:?}", batch.len(), oversized);
            return Err(BatchRejection::TooLarge { names: oversized });
        }

        let mut added = 0;
        for file in batch {
            // Re-submitting an already registered entry is a no-op.
            if self.files.iter().any(|existing| existing.uid == file.uid) {
                continue;
            }
            self.total_size += file.size;
            self.files.push(file);
            added += 1;
        }

        info!(
            "Accepted {} files; {} selected, {} bytes total",
            added,
            self.files.len(),
            self.total_size
        );
        Ok(added)
    }

    /// Removes the entry matching all three keys.
    pub fn remove(&mut self, uid: &str, name: &str, size: u64) -> bool {
        let Some(index) = self
            .files
            .iter()
            .position(|file| file.uid == uid && file.name == name && file.size == size)
        else {
            return false;
        };
        self.files.remove(index);
        self.total_size = self.total_size.saturating_sub(size);
        true
    }

    pub fn clear(&mut self) {
        self.files.clear();
        self.total_size = 0;
    }
}
