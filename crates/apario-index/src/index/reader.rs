use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use memmap2::Mmap;
use roaring::RoaringBitmap;

use crate::error::{IndexError, Result};

use super::PREFIX_LEN;

/// Read-only view of one index artifact. The file is mapped once; the
/// header lives in memory for the life of the reader (fuzzy expansion scans
/// it), bitmaps are decoded on demand from the mapped body. A reader opened
/// before an atomic index replacement keeps seeing its original bytes.
pub struct IndexReader {
    mmap: Mmap,
    header: HashMap<String, (u64, u64)>,
}

impl IndexReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        if (mmap.len() as u64) < PREFIX_LEN {
            return Err(IndexError::IndexMalformed(format!(
                "{}: shorter than the {}-byte prefix",
                path.display(),
                PREFIX_LEN
            )));
        }
        let mut prefix = [0u8; PREFIX_LEN as usize];
        prefix.copy_from_slice(&mmap[..PREFIX_LEN as usize]);
        let header_offset = u64::from_le_bytes(prefix);
        if header_offset < PREFIX_LEN || header_offset > mmap.len() as u64 {
            return Err(IndexError::IndexMalformed(format!(
                "{}: header offset {} outside file of {} bytes",
                path.display(),
                header_offset,
                mmap.len()
            )));
        }
        let header: HashMap<String, (u64, u64)> =
            serde_json::from_slice(&mmap[header_offset as usize..]).map_err(|e| {
                IndexError::IndexMalformed(format!(
                    "{}: header undecodable: {}",
                    path.display(),
                    e
                ))
            })?;
        for (key, &(offset, length)) in &header {
            let end = offset.checked_add(length);
            if offset < PREFIX_LEN || end.is_none() || end > Some(header_offset) {
                return Err(IndexError::IndexMalformed(format!(
                    "{}: entry {:?} addresses [{}, +{}) outside the body",
                    path.display(),
                    key,
                    offset,
                    length
                )));
            }
        }
        Ok(IndexReader { mmap, header })
    }

    pub fn len(&self) -> usize {
        self.header.len()
    }

    pub fn is_empty(&self) -> bool {
        self.header.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.header.contains_key(key)
    }

    /// All header keys. Fuzzy expansion walks this.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.header.keys().map(String::as_str)
    }

    /// Decode the bitmap for `key`, or `None` when the key is not indexed.
    pub fn bitmap(&self, key: &str) -> Result<Option<RoaringBitmap>> {
        let Some(&(offset, length)) = self.header.get(key) else {
            return Ok(None);
        };
        let slice = &self.mmap[offset as usize..(offset + length) as usize];
        let bitmap = RoaringBitmap::deserialize_from(slice).map_err(|e| {
            IndexError::IndexMalformed(format!("bitmap for {:?} undecodable: {}", key, e))
        })?;
        Ok(Some(bitmap))
    }
}
