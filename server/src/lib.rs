//! Database session for SDB.
//!
//! A [`SimpleDb`] owns the storage components of one running database.
//! Only the file manager exists so far; the buffer pool, log and
//! transaction managers will hang off the same session.

pub mod config;

use anyhow::{Context, Result};
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;
use storage::{FileManager, StorageConfig};

pub struct SimpleDb {
    file_manager: Arc<FileManager>,
}

impl SimpleDb {
    pub fn new(directory: impl AsRef<Path>, block_size: usize) -> Result<Self> {
        Self::with_config(StorageConfig::new(directory.as_ref(), block_size))
    }

    pub fn with_config(config: StorageConfig) -> Result<Self> {
        let file_manager = FileManager::with_config(&config)
            .with_context(|| format!("Failed to open database in {:?}", config.directory))?;

        info!(
            "Opened database in {:?} with {}-byte blocks",
            config.directory, config.block_size
        );
        Ok(Self {
            file_manager: Arc::new(file_manager),
        })
    }

    pub fn file_manager(&self) -> &Arc<FileManager> {
        &self.file_manager
    }

    /// Ends the session, syncing and closing every database file.
    ///
    /// If another component still holds the file manager, its files are
    /// closed (without a sync) when the last holder drops it.
    pub fn shutdown(self) -> Result<()> {
        match Arc::try_unwrap(self.file_manager) {
            Ok(file_manager) => file_manager.close().context("Failed to close database files"),
            Err(shared) => {
                warn!(
                    "File manager for {:?} is still in use, leaving files open",
                    shared.directory()
                );
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use storage::{BlockId, Page};
    use tempfile::tempdir;

    fn init_logging() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    #[test]
    fn test_file() -> Result<()> {
        init_logging();
        let dir = tempdir()?;
        let db = SimpleDb::new(dir.path().join("filetest"), 400)?;
        let fm = db.file_manager();

        let mut p1 = fm.new_page();
        let pos1 = 88;
        let value = "qwerty";
        p1.set_string(pos1, value);
        let pos2 = pos1 + Page::max_length(value.encode_utf16().count());
        p1.set_i32(pos2, 606);

        let block = BlockId::new("testfile", 2);
        fm.write(&block, &p1)?;

        let mut p2 = fm.new_page();
        fm.read(&block, &mut p2)?;

        assert_eq!(p2.get_i32(pos2), 606);
        assert_eq!(p2.get_string(pos1), value);

        db.shutdown()
    }

    #[test]
    fn test_startup_removes_temp_files() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("tempLeftover"), b"left by a crash")?;

        let _db = SimpleDb::new(dir.path(), 400)?;

        assert!(!dir.path().join("tempLeftover").exists());
        Ok(())
    }

    #[test]
    fn test_invalid_block_size() {
        let dir = tempdir().unwrap();
        let err = SimpleDb::new(dir.path(), 0).err().unwrap();

        assert!(err.to_string().starts_with("Failed to open database"));
        assert!(err.downcast_ref::<storage::StorageError>().is_some());
    }

    #[test]
    fn test_shutdown_while_shared() -> Result<()> {
        let dir = tempdir()?;
        let db = SimpleDb::new(dir.path(), 400)?;
        let fm = Arc::clone(db.file_manager());

        db.shutdown()?;

        // The shared manager keeps working after the session is gone.
        let block = BlockId::new("data", 0);
        fm.write(&block, &fm.new_page())?;
        Ok(())
    }
}
