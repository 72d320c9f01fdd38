use std::mem;

/// Magic bytes identifying a Storey region file
pub const MAGIC: &[u8; 8] = b"STOREY\0\0";

/// Current file format version
pub const VERSION: u32 = 1;

/// Number of generic u32 header slots available to the region owner
pub const HEADER_SLOTS: usize = 16;

/// Kind of data held by a region file.
///
/// Stored in the header so that a `levels` file can never be opened as
/// `edges` by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum RegionKind {
    /// Level Dictionary records
    Levels = 1,
    /// Fixed-width node records
    Nodes = 2,
    /// Fixed-width edge records
    Edges = 3,
    /// Pillar geometry records
    Geometry = 4,
}

impl RegionKind {
    /// Decodes the on-disk tag
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Levels),
            2 => Some(Self::Nodes),
            3 => Some(Self::Edges),
            4 => Some(Self::Geometry),
            _ => None,
        }
    }

    /// File name of this region inside a graph directory
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Levels => "levels",
            Self::Nodes => "nodes",
            Self::Edges => "edges",
            Self::Geometry => "geometry",
        }
    }
}

/// Header structure for Storey region files.
/// The header is always 4096 bytes (one page) to ensure proper alignment.
#[repr(C, align(4096))]
pub struct Header {
    /// Magic bytes for file type identification
    pub magic: [u8; 8],

    /// File format version
    pub version: u32,

    /// Region kind tag (see [`RegionKind`])
    pub kind: u32,

    /// Owner-defined header integers (cursors, counts, flags)
    pub slots: [u32; HEADER_SLOTS],

    /// Reserved space for future use (padding to 4096 bytes)
    pub reserved: [u8; 4016],
}

/// Size of the header in bytes (always one 4KB page)
pub const HEADER_SIZE: usize = mem::size_of::<Header>();

impl Header {
    /// Creates a new header for the given region kind
    pub fn new(kind: RegionKind) -> Self {
        Self {
            magic: *MAGIC,
            version: VERSION,
            kind: kind as u32,
            slots: [0; HEADER_SLOTS],
            reserved: [0; 4016],
        }
    }

    /// Validates the header for correctness and compatibility
    pub fn is_valid(&self) -> bool {
        self.magic == *MAGIC
            && self.version > 0
            && self.version <= VERSION
            && RegionKind::from_u32(self.kind).is_some()
    }

    /// Returns the decoded region kind, if the tag is known
    pub fn region_kind(&self) -> Option<RegionKind> {
        RegionKind::from_u32(self.kind)
    }

    /// Returns the header as a byte slice for writing to disk
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: Header is repr(C), fully initialized and exactly HEADER_SIZE bytes.
        unsafe { std::slice::from_raw_parts(self as *const Self as *const u8, HEADER_SIZE) }
    }
}
