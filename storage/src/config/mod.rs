use std::path::PathBuf;

pub const DEFAULT_BLOCK_SIZE: usize = 4096;

pub const DEFAULT_DIRECTORY: &str = "sdb-data";

/// Settings for a [`FileManager`](crate::FileManager).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Directory holding every file of the database.
    pub directory: PathBuf,
    /// Size in bytes of every block in every file.
    pub block_size: usize,
    /// Upper bound on cached file handles; `None` keeps every handle open.
    pub max_open_files: Option<usize>,
}

impl StorageConfig {
    pub fn new(directory: impl Into<PathBuf>, block_size: usize) -> Self {
        Self {
            directory: directory.into(),
            block_size,
            max_open_files: None,
        }
    }

    pub fn max_open_files(mut self, limit: usize) -> Self {
        self.max_open_files = Some(limit);
        self
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DIRECTORY, DEFAULT_BLOCK_SIZE)
    }
}
