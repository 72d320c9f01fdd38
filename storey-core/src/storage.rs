use crate::header::{HEADER_SIZE, HEADER_SLOTS, Header, MAGIC, RegionKind};
use anyhow::{Context, Result};
use fs2::FileExt;
use memmap2::MmapMut;
use std::fs::{File, OpenOptions};
use std::path::Path;

/// Page size for file alignment (4KB)
const PAGE_SIZE: usize = 4096;

/// Memory-mapped byte region backing one part of a graph directory.
///
/// Layout on disk: `[Header: 4096 bytes][data area ...]`. All offsets taken
/// and returned by this type are relative to the start of the data area, so
/// data offset 0 is the first byte after the header page.
#[derive(Debug)]
pub struct Region {
    /// File handle (owns the file lock)
    file: File,

    /// Memory-mapped view of the file
    mmap: MmapMut,
}

impl Region {
    /// Opens or creates a region file of the given kind
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be opened or created
    /// - The file is already locked by another process
    /// - The file exists but holds a different region kind
    /// - The file is corrupted
    pub fn open<P: AsRef<Path>>(path: P, kind: RegionKind) -> Result<Self> {
        let path = path.as_ref();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("Failed to open region file: {}", path.display()))?;

        file.try_lock_exclusive()
            .context("Region file is already open by another process")?;

        let needs_init = file.metadata().map(|m| m.len() < HEADER_SIZE as u64).unwrap_or(true);

        if needs_init {
            let header = Header::new(kind);
            file.set_len(HEADER_SIZE as u64)?;

            // SAFETY: the file is exclusively locked and was just sized to hold the header.
            unsafe {
                let mut mmap = MmapMut::map_mut(&file)?;
                mmap[..HEADER_SIZE].copy_from_slice(header.as_bytes());
                mmap.flush()?;
            }
        }

        // SAFETY: exclusive lock held for the lifetime of `file`.
        let mmap = unsafe { MmapMut::map_mut(&file)? };

        if mmap.len() < MAGIC.len() || &mmap[..MAGIC.len()] != MAGIC {
            anyhow::bail!("File is not a valid Storey region: {}", path.display());
        }

        let region = Self { file, mmap };
        let header = region.header();

        if !header.is_valid() {
            anyhow::bail!("Corrupted or incompatible region file at {}", path.display());
        }

        if header.region_kind() != Some(kind) {
            anyhow::bail!(
                "Region kind mismatch: file {} holds {:?}, requested {:?}",
                path.display(),
                header.region_kind(),
                kind
            );
        }

        Ok(region)
    }

    /// Returns the region kind recorded in the header
    pub fn kind(&self) -> Option<RegionKind> {
        self.header().region_kind()
    }

    /// Reads a header slot
    ///
    /// # Panics
    ///
    /// Panics if `slot >= HEADER_SLOTS` (programming error).
    pub fn header_slot(&self, slot: usize) -> u32 {
        assert!(slot < HEADER_SLOTS, "Header slot {slot} out of range");
        self.header().slots[slot]
    }

    /// Writes a header slot. Not durable until `commit()`.
    ///
    /// # Panics
    ///
    /// Panics if `slot >= HEADER_SLOTS` (programming error).
    pub fn set_header_slot(&mut self, slot: usize, value: u32) {
        assert!(slot < HEADER_SLOTS, "Header slot {slot} out of range");
        self.header_mut().slots[slot] = value;
    }

    /// Number of bytes currently mapped for data (excludes the header page)
    pub fn capacity(&self) -> usize {
        self.mmap.len().saturating_sub(HEADER_SIZE)
    }

    /// Immutable view of `len` data bytes starting at data offset `offset`
    ///
    /// # Errors
    ///
    /// Returns an error if the requested range is out of bounds
    pub fn bytes(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let (start, end) = self.file_range(offset, len)?;
        Ok(&self.mmap[start..end])
    }

    /// Mutable view of `len` data bytes starting at data offset `offset`
    ///
    /// # Errors
    ///
    /// Returns an error if the requested range is out of bounds
    pub fn bytes_mut(&mut self, offset: usize, len: usize) -> Result<&mut [u8]> {
        let (start, end) = self.file_range(offset, len)?;
        Ok(&mut self.mmap[start..end])
    }

    /// Copies `data` to data offset `offset`, growing the region first
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be grown
    pub fn write_at(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        let end = offset.checked_add(data.len()).context("Region write end offset overflow")?;
        self.ensure_capacity(end)?;
        self.bytes_mut(offset, data.len())?.copy_from_slice(data);
        Ok(())
    }

    /// Ensures the data area holds at least `required` bytes, growing if necessary
    ///
    /// File growth is page-aligned (4KB boundaries).
    ///
    /// # Warning
    ///
    /// This method invalidates all existing pointers into the mmap.
    /// Do not hold references across calls to this method.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be resized or remapped
    pub fn ensure_capacity(&mut self, required: usize) -> Result<()> {
        let required_size = HEADER_SIZE.checked_add(required).context("Region size overflow")?;
        if self.mmap.len() >= required_size {
            return Ok(());
        }

        // Round up to next page boundary (4KB)
        let new_size = (required_size + PAGE_SIZE - 1) & !(PAGE_SIZE - 1);

        self.file.set_len(new_size as u64)?;
        // SAFETY: exclusive lock held; the old map is dropped on assignment.
        self.mmap = unsafe { MmapMut::map_mut(&self.file)? };

        Ok(())
    }

    /// Commits all pending changes to disk
    ///
    /// Flushes the memory map to the kernel page cache and then forces a
    /// physical write via fsync.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing or syncing fails
    pub fn commit(&mut self) -> Result<()> {
        self.mmap.flush()?;
        self.file.sync_all()?;
        Ok(())
    }

    fn file_range(&self, offset: usize, len: usize) -> Result<(usize, usize)> {
        let start = HEADER_SIZE.checked_add(offset).context("Region offset overflow")?;
        let end = start.checked_add(len).context("Region end offset overflow")?;

        if end > self.mmap.len() {
            anyhow::bail!(
                "Region access out of bounds: offset={}, len={}, capacity={}",
                offset,
                len,
                self.capacity()
            );
        }

        Ok((start, end))
    }

    /// Returns a reference to the header
    fn header(&self) -> &Header {
        // SAFETY: the mmap is page-aligned and at least HEADER_SIZE bytes long.
        unsafe { &*(self.mmap.as_ptr() as *const Header) }
    }

    /// Returns a mutable reference to the header
    fn header_mut(&mut self) -> &mut Header {
        // SAFETY: as above, and `&mut self` guarantees exclusive access.
        unsafe { &mut *(self.mmap.as_mut_ptr() as *mut Header) }
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Reads a little-endian u32 at `offset` of `bytes`
#[inline]
pub(crate) fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(buf)
}

/// Reads a little-endian i32 at `offset` of `bytes`
#[inline]
pub(crate) fn read_i32(bytes: &[u8], offset: usize) -> i32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[offset..offset + 4]);
    i32::from_le_bytes(buf)
}

/// Reads a little-endian u64 at `offset` of `bytes`
#[inline]
pub(crate) fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(buf)
}

/// Reads a little-endian f64 at `offset` of `bytes`
#[inline]
pub(crate) fn read_f64(bytes: &[u8], offset: usize) -> f64 {
    f64::from_bits(read_u64(bytes, offset))
}

/// Splits a 64-bit cursor into (low, high) header halves
#[inline]
pub(crate) fn split_cursor(cursor: u64) -> (u32, u32) {
    (cursor as u32, (cursor >> 32) as u32)
}

/// Combines (low, high) header halves into a 64-bit cursor
#[inline]
pub(crate) fn combine_cursor(low: u32, high: u32) -> u64 {
    (u64::from(high) << 32) | u64::from(low)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cursor_halves_roundtrip() {
        for cursor in [0u64, 1, 255, u64::from(u32::MAX), u64::from(u32::MAX) + 7, u64::MAX] {
            let (low, high) = split_cursor(cursor);
            assert_eq!(combine_cursor(low, high), cursor);
        }
    }

    #[test]
    fn test_write_grows_page_aligned() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("levels");
        let mut region = Region::open(&path, RegionKind::Levels).unwrap();
        assert_eq!(region.capacity(), 0);

        region.write_at(10, b"abc").unwrap();
        region.commit().unwrap();

        assert_eq!(region.bytes(10, 3).unwrap(), b"abc");
        let len = std::fs::metadata(&path).unwrap().len();
        assert_eq!(len % 4096, 0, "File size must be page-aligned (4KB)");
    }

    #[test]
    fn test_out_of_bounds_read() {
        let dir = TempDir::new().unwrap();
        let region = Region::open(dir.path().join("edges"), RegionKind::Edges).unwrap();
        let err = region.bytes(0, 1).unwrap_err();
        assert!(err.to_string().contains("out of bounds"));
    }

    #[test]
    fn test_kind_mismatch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nodes");
        drop(Region::open(&path, RegionKind::Nodes).unwrap());

        let err = Region::open(&path, RegionKind::Levels).unwrap_err();
        assert!(err.to_string().contains("kind mismatch"));
    }

    #[test]
    fn test_header_slots_persist() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("geometry");
        {
            let mut region = Region::open(&path, RegionKind::Geometry).unwrap();
            region.set_header_slot(0, 42);
            region.set_header_slot(1, 7);
            region.commit().unwrap();
        }
        let region = Region::open(&path, RegionKind::Geometry).unwrap();
        assert_eq!(region.header_slot(0), 42);
        assert_eq!(region.header_slot(1), 7);
    }

    #[test]
    fn test_exclusive_locking() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("levels");
        let _first = Region::open(&path, RegionKind::Levels).unwrap();
        let second = Region::open(&path, RegionKind::Levels);
        assert!(second.unwrap_err().to_string().contains("already open"));
    }
}
