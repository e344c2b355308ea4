// resource.rs - Binary profile resource format and resource sources.
//
// Layout (all integers big-endian):
//
//   magic "SPRP" | format version [u8; 4] | data Unicode version [u8; 4]
//   indexes [u32; INDEX_TOP]
//   trie bytes          (indexes[INDEX_TRIE_SIZE] bytes)
//   mapping data units  (indexes[INDEX_MAPPING_DATA_SIZE] bytes)
//
// Resources are untrusted: every size and offset is checked before use.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::entry::MappingLayout;
use crate::error::PrepError;
use crate::profile::ProfileId;
use crate::rules;
use crate::unicode::UnicodeVersion;

// === Header ===
pub const DATA_MAGIC: [u8; 4] = *b"SPRP";
pub const FORMAT_VERSION: [u8; 4] = [3, 2, 5, 2];
const HEADER_LEN: usize = 12;

// === Index Table ===
pub const INDEX_TRIE_SIZE: usize = 0;
pub const INDEX_MAPPING_DATA_SIZE: usize = 1;
pub const NORM_CORRECTNS_LAST_UNI_VERSION: usize = 2;
pub const ONE_UNIT_MAPPING_INDEX_START: usize = 3;
pub const TWO_UNITS_MAPPING_INDEX_START: usize = 4;
pub const THREE_UNITS_MAPPING_INDEX_START: usize = 5;
pub const FOUR_UNITS_MAPPING_INDEX_START: usize = 6;
pub const OPTIONS: usize = 7;
pub const INDEX_TOP: usize = 16;

// === Option Bits ===
pub const NORMALIZATION_ON: u32 = 0x0001;
pub const CHECK_BIDI_ON: u32 = 0x0002;
const KNOWN_OPTIONS: u32 = NORMALIZATION_ON | CHECK_BIDI_ON;

/// The sections of a resource, checked for consistency but not yet
/// interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceParts<'a> {
    pub data_version: UnicodeVersion,
    pub indexes: [u32; INDEX_TOP],
    pub trie: &'a [u8],
    pub mapping: Vec<u16>,
}

impl ResourceParts<'_> {
    pub fn options(&self) -> u32 {
        self.indexes[OPTIONS]
    }

    pub fn corrections_version(&self) -> UnicodeVersion {
        UnicodeVersion::from_u32(self.indexes[NORM_CORRECTNS_LAST_UNI_VERSION])
    }

    pub fn mapping_layout(&self) -> MappingLayout {
        MappingLayout {
            one_unit_start: self.indexes[ONE_UNIT_MAPPING_INDEX_START],
            two_units_start: self.indexes[TWO_UNITS_MAPPING_INDEX_START],
            three_units_start: self.indexes[THREE_UNITS_MAPPING_INDEX_START],
            four_units_start: self.indexes[FOUR_UNITS_MAPPING_INDEX_START],
        }
    }
}

/// Split a resource into its sections.
pub fn parse_resource(bytes: &[u8]) -> Result<ResourceParts<'_>, PrepError> {
    let fixed = HEADER_LEN + INDEX_TOP * 4;
    if bytes.len() < fixed {
        return Err(PrepError::malformed(format!(
            "resource of {} bytes is shorter than its {} byte header",
            bytes.len(),
            fixed
        )));
    }
    if bytes[..4] != DATA_MAGIC {
        return Err(PrepError::malformed("resource does not start with SPRP"));
    }
    if bytes[4] != FORMAT_VERSION[0] {
        return Err(PrepError::malformed(format!(
            "unsupported resource format version {}",
            bytes[4]
        )));
    }
    let data_version = UnicodeVersion([bytes[8], bytes[9], bytes[10], bytes[11]]);

    let mut indexes = [0u32; INDEX_TOP];
    for (i, slot) in indexes.iter_mut().enumerate() {
        let at = HEADER_LEN + i * 4;
        *slot = u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
    }
    if indexes[OPTIONS] & !KNOWN_OPTIONS != 0 {
        return Err(PrepError::malformed(format!(
            "unknown option bits {:#x}",
            indexes[OPTIONS] & !KNOWN_OPTIONS
        )));
    }

    let trie_size = indexes[INDEX_TRIE_SIZE] as usize;
    let mapping_size = indexes[INDEX_MAPPING_DATA_SIZE] as usize;
    if mapping_size % 2 != 0 {
        return Err(PrepError::malformed(format!(
            "mapping data size {} is not a whole number of units",
            mapping_size
        )));
    }
    let body = &bytes[fixed..];
    if body.len() as u64 != trie_size as u64 + mapping_size as u64 {
        return Err(PrepError::malformed(format!(
            "resource body is {} bytes, index table declares {} + {}",
            body.len(),
            trie_size,
            mapping_size
        )));
    }
    let (trie, mapping_bytes) = body.split_at(trie_size);
    let mapping = mapping_bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();

    trace!(
        %data_version,
        trie_size,
        mapping_size,
        options = indexes[OPTIONS],
        "parsed profile resource header"
    );
    Ok(ResourceParts {
        data_version,
        indexes,
        trie,
        mapping,
    })
}

/// Assemble a resource from its sections.
pub fn write_resource(
    data_version: UnicodeVersion,
    indexes: &[u32; INDEX_TOP],
    trie: &[u8],
    mapping: &[u16],
) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + INDEX_TOP * 4 + trie.len() + mapping.len() * 2);
    out.extend_from_slice(&DATA_MAGIC);
    out.extend_from_slice(&FORMAT_VERSION);
    out.extend_from_slice(&data_version.0);
    for index in indexes {
        out.extend_from_slice(&index.to_be_bytes());
    }
    out.extend_from_slice(trie);
    for unit in mapping {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

// === Sources ===

/// Supplies the binary resource for a profile id.
pub trait ProfileSource: Send + Sync {
    fn load(&self, id: ProfileId) -> Result<Vec<u8>, PrepError>;
}

/// Builds the standard profiles from the compiled-in RFC 3454 tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinSource;

impl ProfileSource for BuiltinSource {
    fn load(&self, id: ProfileId) -> Result<Vec<u8>, PrepError> {
        rules::builder_for(id).to_bytes()
    }
}

/// Reads `<dir>/<resource name>.spp` files.
#[derive(Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirectorySource { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the resource file for `id`.
    pub fn path_for(&self, id: ProfileId) -> PathBuf {
        self.dir.join(format!("{}.spp", id.resource_name()))
    }
}

impl fmt::Debug for DirectorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectorySource").field("dir", &self.dir).finish()
    }
}

impl ProfileSource for DirectorySource {
    fn load(&self, id: ProfileId) -> Result<Vec<u8>, PrepError> {
        let path = self.path_for(id);
        trace!(path = %path.display(), "reading profile resource");
        std::fs::read(&path).map_err(|err| PrepError::ResourceUnavailable {
            profile: Some(id),
            detail: format!("{}: {}", path.display(), err),
        })
    }
}
