use std::fmt;

/// Names a fixed-size block inside a database file.
///
/// Block `n` of a file covers bytes `[n * block_size, (n + 1) * block_size)`,
/// where the block size is the one of the [`FileManager`](crate::FileManager)
/// the identifier is used with.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId {
    file_name: String,
    number: u64,
}

impl BlockId {
    pub fn new(file_name: impl Into<String>, number: u64) -> Self {
        Self {
            file_name: file_name.into(),
            number,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn number(&self) -> u64 {
        self.number
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[file {}, block {}]", self.file_name, self.number)
    }
}
