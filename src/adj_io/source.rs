use std::fs::{self, File};
use std::io::{BufRead, BufReader, Cursor};
use std::path::{Path, PathBuf};

use crate::config::READ_BUFFER_SIZE;
use crate::error::{LocalClusterError, Result};

/// A sequential, rescannable source of adjacency records.
///
/// Every call to [`AdjacencySource::open`] must start a fresh pass from the
/// first record, and the content must not change during a run.
pub trait AdjacencySource {
    /// Opens a new sequential pass over the source.
    fn open(&self) -> Result<Box<dyn BufRead + '_>>;

    /// Path reported in diagnostics.
    fn path(&self) -> &Path;

    /// Total size in bytes, when cheaply known. Drives the progress bar.
    fn len_hint(&self) -> Option<u64>;
}

/// Adjacency records stored in a tab-separated text file on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSource { path: path.into() }
    }
}

impl AdjacencySource for FileSource {
    fn open(&self) -> Result<Box<dyn BufRead + '_>> {
        let file = File::open(&self.path).map_err(|e| LocalClusterError::io(e, &self.path))?;
        Ok(Box::new(BufReader::with_capacity(READ_BUFFER_SIZE, file)))
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn len_hint(&self) -> Option<u64> {
        fs::metadata(&self.path).ok().map(|m| m.len())
    }
}

/// Adjacency records held in memory; handy for tests and small graphs.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    content: String,
}

impl MemorySource {
    pub fn new(content: impl Into<String>) -> Self {
        MemorySource { content: content.into() }
    }

    /// Builds the tab-separated text from `(vertex, neighbours)` pairs.
    pub fn from_records<'a, I, N>(records: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, N)>,
        N: IntoIterator<Item = &'a str>,
    {
        let mut content = String::new();
        for (vertex, neighbors) in records {
            content.push_str(vertex);
            for neighbor in neighbors {
                content.push('\t');
                content.push_str(neighbor);
            }
            content.push('\n');
        }
        MemorySource { content }
    }
}

impl AdjacencySource for MemorySource {
    fn open(&self) -> Result<Box<dyn BufRead + '_>> {
        Ok(Box::new(Cursor::new(self.content.as_bytes())))
    }

    fn path(&self) -> &Path {
        Path::new("<memory>")
    }

    fn len_hint(&self) -> Option<u64> {
        Some(self.content.len() as u64)
    }
}
