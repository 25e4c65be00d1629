//! Storage engine for SDB
//!
//! This crate provides the lowest storage primitives: block identifiers,
//! fixed-size pages with typed accessors, and the file manager that moves
//! whole blocks between pages and the files of a database directory.

pub mod block;
pub mod config;
pub mod file;
pub mod page;

pub use block::BlockId;
pub use config::StorageConfig;
pub use file::FileManager;
pub use page::Page;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Block size must be positive, got {0}")]
    InvalidBlockSize(usize),

    #[error("Failed to inspect database directory {path:?}: {source}")]
    Stat { path: PathBuf, source: io::Error },

    #[error("Failed to create database directory {path:?}: {source}")]
    CreateDirectory { path: PathBuf, source: io::Error },

    #[error("Failed to list database directory {path:?}: {source}")]
    ReadDirectory { path: PathBuf, source: io::Error },

    #[error("Failed to remove temporary file {path:?}: {source}")]
    RemoveTempFile { path: PathBuf, source: io::Error },

    #[error("Failed to open file {path:?}: {source}")]
    OpenFile { path: PathBuf, source: io::Error },

    #[error("Failed to seek to {block}: {source}")]
    Seek { block: BlockId, source: io::Error },

    #[error("Failed to read {block}: {source}")]
    Read { block: BlockId, source: io::Error },

    #[error("Failed to write {block}: {source}")]
    Write { block: BlockId, source: io::Error },

    #[error("Failed to sync file {file_name}: {source}")]
    Sync { file_name: String, source: io::Error },

    #[error("Page of {actual} bytes does not match block size {expected}")]
    BlockSizeMismatch { expected: usize, actual: usize },

    #[error("Byte offset of {0} does not fit in a file")]
    OffsetOverflow(BlockId),
}

pub type Result<T> = std::result::Result<T, StorageError>;
