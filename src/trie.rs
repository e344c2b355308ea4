// trie.rs - Compact two-stage code point trie.
//
// The code space is split into 32-entry blocks. The index array holds one
// block number per block; identical data blocks are stored once, and block 0
// is all zeros so unmapped regions cost one index entry each. Both arrays are
// stored run-length encoded.

use std::collections::HashMap;

use crate::error::PrepError;
use crate::rle;

// === Trie Constants ===
pub const TRIE_SIGNATURE: u32 = 0x5472_6965; // "Trie"
pub const SHIFT: u32 = 5;
pub const BLOCK_LEN: usize = 1 << SHIFT;
const BLOCK_MASK: u32 = BLOCK_LEN as u32 - 1;
pub const CODE_POINT_LIMIT: u32 = 0x11_0000;
pub const INDEX_LEN: usize = (CODE_POINT_LIMIT >> SHIFT) as usize;
/// Block numbers are 16-bit, which bounds the data array.
pub const MAX_DATA_LEN: usize = 0x1_0000 * BLOCK_LEN;
const HEADER_LEN: usize = 6 * 4;

/// Read-only code point to entry lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyTrie {
    index: Vec<u16>,
    data: Vec<u16>,
}

impl PropertyTrie {
    /// Entry for `cp`; 0 for anything outside the code space.
    #[inline]
    pub fn get(&self, cp: u32) -> u16 {
        if cp >= CODE_POINT_LIMIT {
            return 0;
        }
        // Block numbers were checked against the data length on construction.
        let block = self.index[(cp >> SHIFT) as usize] as usize;
        self.data[(block << SHIFT) | (cp & BLOCK_MASK) as usize]
    }

    /// Every stored entry, once per distinct block.
    pub fn stored_entries(&self) -> &[u16] {
        &self.data
    }

    pub fn block_count(&self) -> usize {
        self.data.len() / BLOCK_LEN
    }

    fn from_parts(index: Vec<u16>, data: Vec<u16>) -> Result<Self, PrepError> {
        if index.len() != INDEX_LEN {
            return Err(PrepError::malformed(format!(
                "trie index has {} entries, expected {}",
                index.len(),
                INDEX_LEN
            )));
        }
        if data.is_empty() || data.len() % BLOCK_LEN != 0 {
            return Err(PrepError::malformed(format!(
                "trie data length {} is not a whole number of blocks",
                data.len()
            )));
        }
        let blocks = data.len() / BLOCK_LEN;
        if let Some(pos) = index.iter().position(|&b| b as usize >= blocks) {
            return Err(PrepError::malformed(format!(
                "trie index entry {} names block {} of {}",
                pos, index[pos], blocks
            )));
        }
        Ok(PropertyTrie { index, data })
    }

    /// Parse a serialized trie. The input must be consumed exactly.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrepError> {
        if bytes.len() < HEADER_LEN {
            return Err(PrepError::malformed(format!(
                "trie of {} bytes is shorter than its header",
                bytes.len()
            )));
        }
        let mut header = [0u32; 6];
        for (i, field) in header.iter_mut().enumerate() {
            let at = i * 4;
            *field = u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        }
        let [signature, shift, index_len, data_len, index_units, data_units] = header;
        if signature != TRIE_SIGNATURE {
            return Err(PrepError::malformed(format!(
                "bad trie signature {:#010x}",
                signature
            )));
        }
        if shift != SHIFT {
            return Err(PrepError::malformed(format!("unsupported trie shift {}", shift)));
        }
        if index_len as usize != INDEX_LEN || data_len as usize > MAX_DATA_LEN {
            return Err(PrepError::malformed(format!(
                "trie header declares {}/{} index/data entries, limits are {}/{}",
                index_len, data_len, INDEX_LEN, MAX_DATA_LEN
            )));
        }
        let body = &bytes[HEADER_LEN..];
        let expected = (index_units as u64 + data_units as u64) * 2;
        if body.len() as u64 != expected {
            return Err(PrepError::malformed(format!(
                "trie body is {} bytes, header declares {}",
                body.len(),
                expected
            )));
        }
        let units: Vec<u16> = body
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        let (index_part, data_part) = units.split_at(index_units as usize);
        for (part, len) in [(index_part, index_len), (data_part, data_len)] {
            let declared = rle::declared_len(part)?;
            if declared != len as usize {
                return Err(PrepError::malformed(format!(
                    "trie array declares {} entries, header declares {}",
                    declared, len
                )));
            }
        }
        let index = rle::decode_u16(index_part)?;
        let data = rle::decode_u16(data_part)?;
        if index.len() != index_len as usize || data.len() != data_len as usize {
            return Err(PrepError::malformed(format!(
                "trie arrays hold {}/{} entries, header declares {}/{}",
                index.len(),
                data.len(),
                index_len,
                data_len
            )));
        }
        Self::from_parts(index, data)
    }

    /// Serialize into the form read by [`PropertyTrie::from_bytes`].
    pub fn to_bytes(&self) -> Vec<u8> {
        let index_units = rle::encode_u16(&self.index);
        let data_units = rle::encode_u16(&self.data);
        let header = [
            TRIE_SIGNATURE,
            SHIFT,
            self.index.len() as u32,
            self.data.len() as u32,
            index_units.len() as u32,
            data_units.len() as u32,
        ];
        let mut out = Vec::with_capacity(HEADER_LEN + 2 * (index_units.len() + data_units.len()));
        for field in header {
            out.extend_from_slice(&field.to_be_bytes());
        }
        for unit in index_units.iter().chain(data_units.iter()) {
            out.extend_from_slice(&unit.to_be_bytes());
        }
        out
    }
}

// === Builder ===

/// Mutable full-resolution table that compacts into a [`PropertyTrie`].
pub struct TrieBuilder {
    values: Vec<u16>,
}

impl Default for TrieBuilder {
    fn default() -> Self {
        TrieBuilder {
            values: vec![0; CODE_POINT_LIMIT as usize],
        }
    }
}

impl std::fmt::Debug for TrieBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrieBuilder").finish_non_exhaustive()
    }
}

impl TrieBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, cp: u32) -> u16 {
        self.values.get(cp as usize).copied().unwrap_or(0)
    }

    pub fn set(&mut self, cp: u32, value: u16) -> Result<(), PrepError> {
        self.set_range(cp, cp, value)
    }

    /// Set every code point in the inclusive range.
    pub fn set_range(&mut self, start: u32, end: u32, value: u16) -> Result<(), PrepError> {
        if start > end || end >= CODE_POINT_LIMIT {
            return Err(PrepError::InvalidRule {
                detail: format!("code point range {:#X}..={:#X} is invalid", start, end),
            });
        }
        self.values[start as usize..=end as usize].fill(value);
        Ok(())
    }

    /// Compact into a trie, sharing identical blocks.
    pub fn build(&self) -> Result<PropertyTrie, PrepError> {
        let mut data: Vec<u16> = vec![0; BLOCK_LEN];
        let mut seen: HashMap<&[u16], u16> = HashMap::new();
        let mut index = Vec::with_capacity(INDEX_LEN);
        for block in self.values.chunks_exact(BLOCK_LEN) {
            if block.iter().all(|&v| v == 0) {
                index.push(0);
                continue;
            }
            let number = match seen.get(block) {
                Some(&number) => number,
                None => {
                    let number = u16::try_from(data.len() / BLOCK_LEN).map_err(|_| {
                        PrepError::InvalidRule {
                            detail: "trie needs more than 65536 distinct blocks".to_string(),
                        }
                    })?;
                    data.extend_from_slice(block);
                    seen.insert(block, number);
                    number
                }
            };
            index.push(number);
        }
        PropertyTrie::from_parts(index, data)
    }
}
