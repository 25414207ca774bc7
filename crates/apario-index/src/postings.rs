//! Postings scratch streams: text lines of `<key> <page_id>` feeding the
//! index builder. Two streams exist per cache, one keyed by surface word
//! and one by `<type>_<value>` gematria keys.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::warn;

use crate::error::Result;
use crate::textee::Textee;
use crate::types::PageId;

/// Buffered appender for one postings stream. Single writer by contract;
/// the builder and the watcher never run concurrently against one cache.
pub struct PostingsWriter {
    w: BufWriter<File>,
    path: PathBuf,
}

impl PostingsWriter {
    /// Create or truncate the stream at `path`.
    pub fn create(path: &Path) -> Result<Self> {
        let f = File::create(path)?;
        Ok(PostingsWriter {
            w: BufWriter::new(f),
            path: path.to_path_buf(),
        })
    }

    /// Open the stream at `path` for appending, creating it if absent.
    pub fn append_to(path: &Path) -> Result<Self> {
        let f = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(PostingsWriter {
            w: BufWriter::new(f),
            path: path.to_path_buf(),
        })
    }

    /// Emit one word posting per distinct surface word on the page.
    pub fn write_word_postings(&mut self, textee: &Textee, page_id: PageId) -> Result<()> {
        for word in textee.gematrias.keys() {
            writeln!(self.w, "{} {}", word, page_id)?;
        }
        Ok(())
    }

    /// Emit six typed gematria postings per distinct surface word.
    pub fn write_gematria_postings(&mut self, textee: &Textee, page_id: PageId) -> Result<()> {
        for g in textee.gematrias.values() {
            for (kind, value) in g.typed_values() {
                writeln!(self.w, "{}_{} {}", kind, value, page_id)?;
            }
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.w.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Scan a postings stream, invoking `f` for every well-formed line.
/// Malformed lines (no separator, non-numeric id) are logged and skipped;
/// the scan only fails on I/O errors.
pub fn scan_postings<F>(path: &Path, mut f: F) -> Result<()>
where
    F: FnMut(&str, PageId) -> Result<()>,
{
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let Some((key, id)) = line.rsplit_once(' ') else {
            warn!("skipping malformed posting line in {}: {:?}", path.display(), line);
            continue;
        };
        let Ok(page_id) = id.parse::<PageId>() else {
            warn!("skipping malformed posting line in {}: {:?}", path.display(), line);
            continue;
        };
        f(key, page_id)?;
    }
    Ok(())
}
