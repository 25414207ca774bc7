use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};
use roaring::RoaringBitmap;

use crate::error::{IndexError, Result};
use crate::layout::TEMP_POSTINGS_DIR;
use crate::postings::scan_postings;

use super::PREFIX_LEN;

/// Postings-size threshold past which the external strategy is preferred.
const EXTERNAL_THRESHOLD_BYTES: u64 = 256 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct IndexWriteOptions {
    /// Ceiling on simultaneously open temp files in the external strategy.
    pub max_open_files: usize,
    /// Postings file size above which the external strategy is selected.
    pub external_threshold: u64,
    /// Always use the external strategy, regardless of postings size.
    pub force_external: bool,
}

impl Default for IndexWriteOptions {
    fn default() -> Self {
        IndexWriteOptions {
            max_open_files: 512,
            external_threshold: EXTERNAL_THRESHOLD_BYTES,
            force_external: false,
        }
    }
}

/// Build the index file at `index_path` from the postings stream at
/// `postings_path`. The artifact is written to a sibling temp file and
/// renamed into place, so a failed build never leaves a torn index behind.
pub fn write_index(postings_path: &Path, index_path: &Path, opts: &IndexWriteOptions) -> Result<()> {
    let tmp = temp_sibling(index_path);
    let postings_len = fs::metadata(postings_path).map(|m| m.len()).unwrap_or(0);
    let external = opts.force_external || postings_len > opts.external_threshold;
    let res = if external {
        write_external(postings_path, &tmp, opts)
    } else {
        write_in_memory(postings_path, &tmp)
    };
    if let Err(e) = res {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    fs::rename(&tmp, index_path)?;
    debug!(
        "built index {} from {} ({} strategy)",
        index_path.display(),
        postings_path.display(),
        if external { "external" } else { "in-memory" }
    );
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Serializes bitmaps into the body as they arrive and finishes with the
/// JSON header plus the patched prefix.
struct BodyWriter {
    w: BufWriter<File>,
    header: BTreeMap<String, (u64, u64)>,
    offset: u64,
}

impl BodyWriter {
    fn create(path: &Path) -> Result<Self> {
        let mut w = BufWriter::new(File::create(path)?);
        w.write_all(&[0u8; PREFIX_LEN as usize])?;
        Ok(BodyWriter {
            w,
            header: BTreeMap::new(),
            offset: PREFIX_LEN,
        })
    }

    fn add(&mut self, key: String, bitmap: &RoaringBitmap) -> Result<()> {
        let mut buf = Vec::with_capacity(bitmap.serialized_size());
        bitmap.serialize_into(&mut buf)?;
        self.w.write_all(&buf)?;
        self.header.insert(key, (self.offset, buf.len() as u64));
        self.offset += buf.len() as u64;
        Ok(())
    }

    fn finish(mut self) -> Result<()> {
        let header_offset = self.offset;
        serde_json::to_writer(&mut self.w, &self.header)?;
        self.w.flush()?;
        let mut file = self
            .w
            .into_inner()
            .map_err(|e| IndexError::Io(e.into_error()))?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&header_offset.to_le_bytes())?;
        file.sync_all()?;
        Ok(())
    }
}

/// Accumulate every key's bitmap in RAM, then serialize. Preferred while
/// the distinct-key set fits in memory.
fn write_in_memory(postings_path: &Path, out: &Path) -> Result<()> {
    let mut bitmaps: HashMap<String, RoaringBitmap> = HashMap::new();
    scan_postings(postings_path, |key, page_id| {
        bitmaps.entry(key.to_string()).or_default().insert(page_id);
        Ok(())
    })?;
    let mut body = BodyWriter::create(out)?;
    for (key, bitmap) in bitmaps {
        body.add(key, &bitmap)?;
    }
    body.finish()
}

/// Demultiplex postings into one temp file per key, then fold each temp
/// file into a bitmap. Open handles are bounded by `max_open_files`: when
/// the cap is hit every handle is flushed and closed, and files reopen in
/// append mode on demand.
fn write_external(postings_path: &Path, out: &Path, opts: &IndexWriteOptions) -> Result<()> {
    let temp_dir = out
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(TEMP_POSTINGS_DIR);
    fs::create_dir_all(&temp_dir)?;
    let res = demux_and_fold(postings_path, out, &temp_dir, opts.max_open_files.max(1));
    let _ = fs::remove_dir_all(&temp_dir);
    res
}

fn demux_and_fold(
    postings_path: &Path,
    out: &Path,
    temp_dir: &Path,
    max_open_files: usize,
) -> Result<()> {
    let mut open: HashMap<String, BufWriter<File>> = HashMap::new();
    let mut keys: BTreeSet<String> = BTreeSet::new();
    scan_postings(postings_path, |key, page_id| {
        if !open.contains_key(key) {
            if open.len() >= max_open_files {
                for (_, mut w) in open.drain() {
                    w.flush()?;
                }
            }
            let f = OpenOptions::new()
                .create(true)
                .append(true)
                .open(temp_dir.join(key))?;
            open.insert(key.to_string(), BufWriter::new(f));
            keys.insert(key.to_string());
        }
        if let Some(w) = open.get_mut(key) {
            writeln!(w, "{}", page_id)?;
        }
        Ok(())
    })?;
    for (_, mut w) in open.drain() {
        w.flush()?;
    }

    info!(
        "external index build: {} distinct keys via {}",
        keys.len(),
        temp_dir.display()
    );
    let mut body = BodyWriter::create(out)?;
    for key in keys {
        let mut bitmap = RoaringBitmap::new();
        let f = File::open(temp_dir.join(&key))?;
        for line in BufReader::new(f).lines() {
            let line = line?;
            if let Ok(id) = line.trim().parse::<u32>() {
                bitmap.insert(id);
            }
        }
        body.add(key, &bitmap)?;
    }
    body.finish()
}
