//! The page store: an append-only JSON-line log of page records plus a text
//! sidecar mapping every page id to its `(offset, length)` slice of the log.
//!
//! The writer is the single owner of both files while it lives and tracks
//! the log offset with an explicit running byte counter; readers use
//! positional reads so no file cursor is ever shared.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::os::unix::fs::FileExt;
use std::path::Path;

use log::warn;

use crate::error::{IndexError, Result};
use crate::layout;
use crate::types::{Page, PageId};

/// Single-owner appender over the log and its sidecar.
pub struct PageStoreWriter {
    log: BufWriter<File>,
    sidecar: BufWriter<File>,
    offset: u64,
    next_id: PageId,
}

impl PageStoreWriter {
    /// Create (or truncate) the store in `cache_dir`.
    pub fn create(cache_dir: &Path) -> Result<Self> {
        let log = File::create(layout::page_store_path(cache_dir))?;
        let sidecar = File::create(layout::page_store_index_path(cache_dir))?;
        Ok(PageStoreWriter {
            log: BufWriter::new(log),
            sidecar: BufWriter::new(sidecar),
            offset: 0,
            next_id: 0,
        })
    }

    /// Open an existing store for appending. The byte counter resumes from
    /// the log's current length and ids continue from the sidecar maximum.
    pub fn append_to(cache_dir: &Path) -> Result<Self> {
        let log_path = layout::page_store_path(cache_dir);
        let log = OpenOptions::new().create(true).append(true).open(&log_path)?;
        let offset = log.metadata()?.len();
        let sidecar = OpenOptions::new()
            .create(true)
            .append(true)
            .open(layout::page_store_index_path(cache_dir))?;
        let next_id = next_page_id(cache_dir)?;
        Ok(PageStoreWriter {
            log: BufWriter::new(log),
            sidecar: BufWriter::new(sidecar),
            offset,
            next_id,
        })
    }

    /// Append one page record and its sidecar entry, returning the id
    /// assigned to it. The recorded length includes the trailing newline so
    /// consecutive entries tile the log exactly.
    pub fn append(&mut self, page: &Page) -> Result<PageId> {
        let id = self.next_id;
        let mut buf = serde_json::to_vec(page)?;
        buf.push(b'\n');
        self.log.write_all(&buf)?;
        writeln!(self.sidecar, "{} {} {}", id, self.offset, buf.len())?;
        self.offset += buf.len() as u64;
        self.next_id += 1;
        Ok(id)
    }

    pub fn next_id(&self) -> PageId {
        self.next_id
    }

    pub fn finish(mut self) -> Result<()> {
        self.log.flush()?;
        self.sidecar.flush()?;
        Ok(())
    }
}

/// The next free page id: one past the sidecar maximum, or 0 when the
/// sidecar does not exist yet.
pub fn next_page_id(cache_dir: &Path) -> Result<PageId> {
    let path = layout::page_store_index_path(cache_dir);
    let file = match File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };
    let mut max: Option<PageId> = None;
    for line in BufReader::new(file).lines() {
        let line = line?;
        if let Some(id) = line
            .split_whitespace()
            .next()
            .and_then(|s| s.parse::<PageId>().ok())
        {
            max = Some(max.map_or(id, |m| m.max(id)));
        }
    }
    Ok(max.map_or(0, |m| m + 1))
}

/// Read-only view of the store: the sidecar map is loaded once, records are
/// fetched with `pread` against a long-lived handle.
pub struct PageStoreReader {
    log: File,
    offsets: HashMap<PageId, (u64, u64)>,
}

impl PageStoreReader {
    pub fn open(cache_dir: &Path) -> Result<Self> {
        let log = File::open(layout::page_store_path(cache_dir))?;
        let sidecar = File::open(layout::page_store_index_path(cache_dir))?;
        let mut offsets = HashMap::new();
        for line in BufReader::new(sidecar).lines() {
            let line = line?;
            let mut parts = line.split_whitespace();
            let parsed = (
                parts.next().and_then(|s| s.parse::<PageId>().ok()),
                parts.next().and_then(|s| s.parse::<u64>().ok()),
                parts.next().and_then(|s| s.parse::<u64>().ok()),
            );
            match parsed {
                (Some(id), Some(off), Some(len)) => {
                    offsets.insert(id, (off, len));
                }
                _ => warn!("skipping malformed sidecar line: {:?}", line),
            }
        }
        Ok(PageStoreReader { log, offsets })
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn contains(&self, id: PageId) -> bool {
        self.offsets.contains_key(&id)
    }

    /// Fetch and decode the record for `id`, or `None` when the sidecar has
    /// no entry for it.
    pub fn get(&self, id: PageId) -> Result<Option<Page>> {
        let Some(&(offset, length)) = self.offsets.get(&id) else {
            return Ok(None);
        };
        let mut buf = vec![0u8; length as usize];
        self.log.read_exact_at(&mut buf, offset)?;
        let page = serde_json::from_slice(&buf).map_err(|e| {
            IndexError::Other(format!("page record {} undecodable: {}", id, e))
        })?;
        Ok(Some(page))
    }

    pub fn ids(&self) -> impl Iterator<Item = PageId> + '_ {
        self.offsets.keys().copied()
    }
}
