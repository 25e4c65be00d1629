// storage/src/file/mod.rs

use crate::config::StorageConfig;
use crate::page::Page;
use crate::{BlockId, Result, StorageError};
use log::{debug, info, trace, warn};
use lru::LruCache;
use parking_lot::Mutex;
use std::fs::{self, DirBuilder, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Directory entries starting with this are leftovers of an earlier session.
const TEMP_FILE_PREFIX: &str = "temp";

/// An open database file. The lock covers a whole seek + transfer.
pub type FileHandle = Arc<Mutex<File>>;

/// Moves whole blocks between pages and the files of one database directory.
///
/// Every file under the directory shares the same block size. Handles are
/// opened on first use and cached; the cache is unbounded unless
/// [`StorageConfig::max_open_files`] is set, in which case the least
/// recently used handle is dropped from it.
pub struct FileManager {
    directory: PathBuf,
    block_size: usize,
    open_files: Mutex<LruCache<String, FileHandle>>,
}

impl FileManager {
    pub fn new(directory: impl AsRef<Path>, block_size: usize) -> Result<Self> {
        Self::with_config(&StorageConfig::new(directory.as_ref(), block_size))
    }

    pub fn with_config(config: &StorageConfig) -> Result<Self> {
        if config.block_size == 0 {
            return Err(StorageError::InvalidBlockSize(config.block_size));
        }

        let directory = config.directory.clone();
        match fs::metadata(&directory) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => create_directory(&directory)?,
            Err(source) => {
                return Err(StorageError::Stat {
                    path: directory,
                    source,
                })
            }
        }
        remove_temp_files(&directory)?;

        let open_files = match config.max_open_files.map(NonZeroUsize::new) {
            Some(Some(limit)) => LruCache::new(limit),
            Some(None) => {
                warn!("max_open_files = 0, keeping every file handle open");
                LruCache::unbounded()
            }
            None => LruCache::unbounded(),
        };

        Ok(Self {
            directory,
            block_size: config.block_size,
            open_files: Mutex::new(open_files),
        })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// A zeroed page sized for this manager's blocks.
    pub fn new_page(&self) -> Page {
        Page::new(self.block_size)
    }

    /// Returns the cached handle for `file_name`, opening (and creating) the
    /// file on first use.
    pub fn open_or_create(&self, file_name: &str) -> Result<FileHandle> {
        let mut open_files = self.open_files.lock();
        if let Some(handle) = open_files.get(file_name) {
            return Ok(Arc::clone(handle));
        }

        let path = self.directory.join(file_name);
        let mut options = OpenOptions::new();
        options.read(true).write(true).create(true).truncate(false);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let file = options
            .open(&path)
            .map_err(|source| StorageError::OpenFile {
                path: path.clone(),
                source,
            })?;
        debug!("Opened {:?}", path);

        let handle = Arc::new(Mutex::new(file));
        if let Some((evicted, _)) = open_files.push(file_name.to_owned(), Arc::clone(&handle)) {
            debug!("Dropped cached handle for {}", evicted);
        }
        Ok(handle)
    }

    /// Fills `page` with the contents of `block`.
    ///
    /// The whole block must exist on disk: reading past the end of the file
    /// fails with an `UnexpectedEof` source instead of zero-filling.
    pub fn read(&self, block: &BlockId, page: &mut Page) -> Result<()> {
        self.check_page(page)?;
        let offset = self.offset_of(block)?;
        let handle = self.open_or_create(block.file_name())?;

        let mut file = handle.lock();
        file.seek(SeekFrom::Start(offset))
            .map_err(|source| StorageError::Seek {
                block: block.clone(),
                source,
            })?;
        file.read_exact(page.as_bytes_mut())
            .map_err(|source| StorageError::Read {
                block: block.clone(),
                source,
            })?;

        trace!("Read {}", block);
        Ok(())
    }

    /// Writes `page` over `block`, growing the file if needed.
    pub fn write(&self, block: &BlockId, page: &Page) -> Result<()> {
        self.check_page(page)?;
        let offset = self.offset_of(block)?;
        let handle = self.open_or_create(block.file_name())?;

        let mut file = handle.lock();
        file.seek(SeekFrom::Start(offset))
            .map_err(|source| StorageError::Seek {
                block: block.clone(),
                source,
            })?;
        file.write_all(page.as_bytes())
            .map_err(|source| StorageError::Write {
                block: block.clone(),
                source,
            })?;

        trace!("Wrote {}", block);
        Ok(())
    }

    pub fn open_file_count(&self) -> usize {
        self.open_files.lock().len()
    }

    /// Syncs and releases every cached handle, returning the first failure
    /// once all of them have been tried.
    ///
    /// Handles already evicted from a bounded cache are not synced here; they
    /// were closed when their last user dropped them. Dropping the manager
    /// releases the cached handles too, without the sync.
    pub fn close(self) -> Result<()> {
        let mut open_files = self.open_files.into_inner();
        debug!("Closing {} file(s) in {:?}", open_files.len(), self.directory);

        let mut first_error = None;
        while let Some((file_name, handle)) = open_files.pop_lru() {
            if let Err(source) = handle.lock().sync_all() {
                warn!("Failed to sync {}: {}", file_name, source);
                first_error.get_or_insert(StorageError::Sync { file_name, source });
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn check_page(&self, page: &Page) -> Result<()> {
        if page.size() != self.block_size {
            return Err(StorageError::BlockSizeMismatch {
                expected: self.block_size,
                actual: page.size(),
            });
        }
        Ok(())
    }

    fn offset_of(&self, block: &BlockId) -> Result<u64> {
        block
            .number()
            .checked_mul(self.block_size as u64)
            .ok_or_else(|| StorageError::OffsetOverflow(block.clone()))
    }
}

fn create_directory(path: &Path) -> Result<()> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder
        .create(path)
        .map_err(|source| StorageError::CreateDirectory {
            path: path.to_owned(),
            source,
        })?;

    info!("Created database directory {:?}", path);
    Ok(())
}

fn remove_temp_files(directory: &Path) -> Result<()> {
    let read_dir_error = |source: io::Error| StorageError::ReadDirectory {
        path: directory.to_owned(),
        source,
    };

    for entry in fs::read_dir(directory).map_err(read_dir_error)? {
        let entry = entry.map_err(read_dir_error)?;
        if !entry.file_name().to_string_lossy().starts_with(TEMP_FILE_PREFIX) {
            continue;
        }

        // Joined onto `directory`, never resolved against the working directory.
        let path = entry.path();
        let removed = match entry.file_type() {
            Ok(file_type) if file_type.is_dir() => fs::remove_dir_all(&path),
            _ => fs::remove_file(&path),
        };
        match removed {
            Ok(()) => info!("Removed leftover temporary file {:?}", path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => return Err(StorageError::RemoveTempFile { path, source }),
        }
    }
    Ok(())
}
