//! Level Dictionary: append-only interning of level labels.
//!
//! # On-disk layout
//!
//! ```text
//! header slot 0   cursor low 32 bits
//! header slot 1   cursor high 32 bits
//!
//! data offset 0   reserved ("no level")
//! data offset 1   [len: u8][label bytes: len] [len: u8][label bytes] ...
//! ```
//!
//! A reference is the data offset of a record's length byte. Only the most
//! recently inserted label is deduplicated; inserting `A`, `B`, `A` yields two
//! physical records for `A`.

use crate::error::{Error, Result};
use crate::header::RegionKind;
use crate::level::truncate_label;
use crate::storage::{Region, combine_cursor, split_cursor};
use std::path::Path;

/// Reference into the dictionary (0 = no level)
pub type LevelRef = i64;

/// Reference returned for the empty label
pub const NO_LEVEL_REF: LevelRef = 0;

/// First usable data offset
pub const START_POINTER: u64 = 1;

const SLOT_CURSOR_LOW: usize = 0;
const SLOT_CURSOR_HIGH: usize = 1;

/// Append-only label store backed by a memory-mapped region
#[derive(Debug)]
pub struct LevelDictionary {
    region: Region,

    /// Next write offset
    cursor: u64,

    /// Last label passed to `put` and the reference it received
    last: Option<(String, LevelRef)>,

    /// Number of labels truncated since open
    truncations: u64,
}

impl LevelDictionary {
    /// Opens or creates the dictionary file at `path`
    ///
    /// # Errors
    ///
    /// Returns an error if the region cannot be opened or the persisted cursor
    /// points past the mapped data.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let region = Region::open(path, RegionKind::Levels)?;

        let stored =
            combine_cursor(region.header_slot(SLOT_CURSOR_LOW), region.header_slot(SLOT_CURSOR_HIGH));
        let cursor = stored.max(START_POINTER);

        if stored > START_POINTER && stored as usize > region.capacity() {
            return Err(Error::Corrupt(format!(
                "dictionary cursor {stored} exceeds data capacity {}",
                region.capacity()
            )));
        }

        Ok(Self { region, cursor, last: None, truncations: 0 })
    }

    /// Interns `label` and returns its reference.
    ///
    /// The empty label maps to [`NO_LEVEL_REF`] without writing. A label equal to
    /// the previous call's label returns the previous reference without writing.
    /// Labels longer than 255 bytes are truncated and the event is logged.
    ///
    /// # Errors
    ///
    /// Returns an error if the region cannot grow.
    pub fn put(&mut self, label: &str) -> Result<LevelRef> {
        if label.is_empty() {
            return Ok(NO_LEVEL_REF);
        }

        if let Some((last_label, last_ref)) = &self.last {
            if last_label == label {
                return Ok(*last_ref);
            }
        }

        let stored = truncate_label(label);
        if stored.len() != label.len() {
            self.truncations += 1;
            tracing::warn!(
                original_bytes = label.len(),
                truncated_bytes = stored.len(),
                "Level label exceeds 255 bytes, truncated before storing"
            );
        }

        let reference = self.cursor;
        let offset = reference as usize;
        let record_len = 1 + stored.len();

        self.region.ensure_capacity(offset + record_len)?;
        let buf = self.region.bytes_mut(offset, record_len)?;
        buf[0] = stored.len() as u8;
        buf[1..].copy_from_slice(stored.as_bytes());

        self.cursor += record_len as u64;

        let reference = reference as LevelRef;
        self.last = Some((label.to_owned(), reference));
        Ok(reference)
    }

    /// Returns the label stored at `reference`, borrowed from the mapping.
    ///
    /// # Errors
    ///
    /// - `InvalidReference` for negative references or references past the cursor
    /// - `Corrupt` if the record is truncated or not UTF-8
    pub fn get(&self, reference: LevelRef) -> Result<&str> {
        if reference < 0 {
            return Err(Error::InvalidReference { reference, reason: "negative reference" });
        }
        if reference == NO_LEVEL_REF {
            return Ok("");
        }

        let offset = reference as u64;
        if offset >= self.cursor {
            return Err(Error::InvalidReference { reference, reason: "beyond write cursor" });
        }

        let offset = offset as usize;
        let len = self.region.bytes(offset, 1)?[0] as usize;
        if (offset + 1 + len) as u64 > self.cursor {
            return Err(Error::Corrupt(format!(
                "level record at {reference} runs past the write cursor"
            )));
        }

        let bytes = self.region.bytes(offset + 1, len)?;
        std::str::from_utf8(bytes)
            .map_err(|e| Error::Corrupt(format!("level record at {reference} is not UTF-8: {e}")))
    }

    /// Current write cursor (next reference to be handed out)
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Labels truncated by `put` since this dictionary was opened
    pub fn truncations(&self) -> u64 {
        self.truncations
    }

    /// True if nothing has been written
    pub fn is_empty(&self) -> bool {
        self.cursor == START_POINTER
    }

    /// Persists the cursor and commits the region
    pub fn flush(&mut self) -> Result<()> {
        let (low, high) = split_cursor(self.cursor);
        self.region.set_header_slot(SLOT_CURSOR_LOW, low);
        self.region.set_header_slot(SLOT_CURSOR_HIGH, high);
        self.region.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, LevelDictionary) {
        let dir = TempDir::new().unwrap();
        let dict = LevelDictionary::open(dir.path().join("levels")).unwrap();
        (dir, dict)
    }

    #[test]
    fn test_empty_label_is_zero() {
        let (_dir, mut dict) = open_temp();
        assert_eq!(dict.put("").unwrap(), NO_LEVEL_REF);
        assert_eq!(dict.get(0).unwrap(), "");
        assert!(dict.is_empty());
    }

    #[test]
    fn test_first_reference_is_start_pointer() {
        let (_dir, mut dict) = open_temp();
        assert_eq!(dict.put("0").unwrap(), START_POINTER as LevelRef);
        assert_eq!(dict.cursor(), START_POINTER + 2);
    }

    #[test]
    fn test_negative_reference_rejected() {
        let (_dir, dict) = open_temp();
        let err = dict.get(-1).unwrap_err();
        assert!(matches!(err, Error::InvalidReference { reference: -1, .. }));
        assert!(err.is_internal());
    }

    #[test]
    fn test_reference_beyond_cursor_rejected() {
        let (_dir, mut dict) = open_temp();
        dict.put("1").unwrap();
        assert!(matches!(dict.get(100), Err(Error::InvalidReference { .. })));
    }

    #[test]
    fn test_truncation_counted() {
        let (_dir, mut dict) = open_temp();
        let long = "x".repeat(300);
        let r = dict.put(&long).unwrap();
        assert_eq!(dict.get(r).unwrap().len(), 255);
        assert_eq!(dict.truncations(), 1);

        // Same raw label again hits the last-label cache
        assert_eq!(dict.put(&long).unwrap(), r);
        assert_eq!(dict.truncations(), 1);
    }
}
