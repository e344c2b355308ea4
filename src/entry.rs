// entry.rs - Trie entry format and mapping data.
//
// Every code point maps to a 16-bit entry:
//
//   0                      pass through unchanged
//   >= TYPE_THRESHOLD      entry - TYPE_THRESHOLD is an EntryType
//   otherwise              mapped; bit 1 selects index (set) or delta (clear),
//                          bit 0 marks the code point as also prohibited,
//                          bits 2..16 carry the index or the signed delta
//
// An index equal to MAX_INDEX_VALUE means "mapped to nothing".

use crate::error::PrepError;

// === Entry Constants ===
pub const TYPE_THRESHOLD: u16 = 0xFFF0;
pub const MAX_INDEX_VALUE: u16 = 0x3FBF;
pub const INDEX_FLAG: u16 = 0x0002;
pub const PROHIBITED_FLAG: u16 = 0x0001;
pub const DELTA_RANGE_POSITIVE_LIMIT: i32 = 8191;
pub const DELTA_RANGE_NEGATIVE_LIMIT: i32 = -8192;

/// Entry word for "mapped to nothing".
pub const DELETE_ENTRY: u16 = (MAX_INDEX_VALUE << 2) | INDEX_FLAG;

/// Type space of entries at or above `TYPE_THRESHOLD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum EntryType {
    Unassigned = 0,
    Mapped = 1,
    Prohibited = 2,
    Deleted = 3,
    PassThrough = 4,
}

impl EntryType {
    /// The entry word encoding this type directly.
    pub const fn entry(self) -> u16 {
        TYPE_THRESHOLD + self as u16
    }
}

/// Replacement for a mapped code point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mapping {
    /// The replacement is `code_point - delta`.
    Delta(i32),
    /// The replacement is `length` units of mapping data starting at `index`.
    TableRef { index: u32, length: u8 },
}

/// Decoded meaning of a trie entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    PassThrough,
    Mapped { mapping: Mapping, prohibited: bool },
    Prohibited,
    Deleted,
    Unassigned,
}

impl Classification {
    pub fn entry_type(&self) -> EntryType {
        match self {
            Classification::PassThrough => EntryType::PassThrough,
            Classification::Mapped { .. } => EntryType::Mapped,
            Classification::Prohibited => EntryType::Prohibited,
            Classification::Deleted => EntryType::Deleted,
            Classification::Unassigned => EntryType::Unassigned,
        }
    }

    /// Whether a code point with this classification may not appear in output.
    pub fn is_prohibited(&self) -> bool {
        matches!(
            self,
            Classification::Prohibited
                | Classification::Mapped {
                    prohibited: true,
                    ..
                }
        )
    }
}

/// An entry split into its fields, before mapping lengths are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEntry {
    Empty,
    Typed(u16),
    Delta { delta: i32, prohibited: bool },
    Index { index: u32, prohibited: bool },
    Deleted,
}

/// Split an entry word using only the fixed thresholds.
pub fn split_entry(entry: u16) -> RawEntry {
    if entry == 0 {
        return RawEntry::Empty;
    }
    if entry >= TYPE_THRESHOLD {
        return RawEntry::Typed(entry - TYPE_THRESHOLD);
    }
    if entry >> 2 == MAX_INDEX_VALUE {
        return RawEntry::Deleted;
    }
    let prohibited = entry & PROHIBITED_FLAG != 0;
    if entry & INDEX_FLAG != 0 {
        RawEntry::Index {
            index: (entry >> 2) as u32,
            prohibited,
        }
    } else {
        RawEntry::Delta {
            delta: ((entry as i16) >> 2) as i32,
            prohibited,
        }
    }
}

/// Decode an entry word into a classification, resolving table references
/// against `data`.
pub fn decode(entry: u16, data: &MappingData) -> Result<Classification, PrepError> {
    Ok(match split_entry(entry) {
        RawEntry::Empty => Classification::PassThrough,
        RawEntry::Typed(t) => match t {
            t if t == EntryType::Unassigned as u16 => Classification::Unassigned,
            t if t == EntryType::Prohibited as u16 => Classification::Prohibited,
            t if t == EntryType::Deleted as u16 => Classification::Deleted,
            t if t == EntryType::PassThrough as u16 => Classification::PassThrough,
            _ => {
                return Err(PrepError::malformed(format!(
                    "entry {:#06x} has unknown type {}",
                    entry, t
                )))
            }
        },
        RawEntry::Deleted => Classification::Deleted,
        RawEntry::Delta { delta, prohibited } => Classification::Mapped {
            mapping: Mapping::Delta(delta),
            prohibited,
        },
        RawEntry::Index { index, prohibited } => {
            let (index, length) = data.resolve(index)?;
            Classification::Mapped {
                mapping: Mapping::TableRef { index, length },
                prohibited,
            }
        }
    })
}

// === Mapping Data ===

/// Start offsets of the four mapping data segments.
///
/// Indices in `[one, two)` address one unit, `[two, three)` two units,
/// `[three, four)` three units. Any other index addresses a length unit
/// followed by that many units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MappingLayout {
    pub one_unit_start: u32,
    pub two_units_start: u32,
    pub three_units_start: u32,
    pub four_units_start: u32,
}

impl MappingLayout {
    fn validate(&self, len: usize) -> Result<(), PrepError> {
        let starts = [
            self.one_unit_start,
            self.two_units_start,
            self.three_units_start,
            self.four_units_start,
        ];
        if starts.windows(2).any(|w| w[0] > w[1]) {
            return Err(PrepError::malformed(format!(
                "mapping segment starts out of order: {:?}",
                starts
            )));
        }
        if self.four_units_start as usize > len {
            return Err(PrepError::malformed(format!(
                "mapping segments end at {} past data length {}",
                self.four_units_start, len
            )));
        }
        if (self.three_units_start - self.two_units_start) % 2 != 0
            || (self.four_units_start - self.three_units_start) % 3 != 0
        {
            return Err(PrepError::malformed(
                "mapping segment sizes are not multiples of their unit length",
            ));
        }
        Ok(())
    }

    fn fixed_length(&self, index: u32) -> Option<u8> {
        if index >= self.one_unit_start && index < self.two_units_start {
            Some(1)
        } else if index >= self.two_units_start && index < self.three_units_start {
            Some(2)
        } else if index >= self.three_units_start && index < self.four_units_start {
            Some(3)
        } else {
            None
        }
    }
}

/// Immutable buffer of 16-bit mapping units.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MappingData {
    units: Vec<u16>,
    layout: MappingLayout,
}

impl MappingData {
    pub fn new(units: Vec<u16>, layout: MappingLayout) -> Result<Self, PrepError> {
        if units.len() > MAX_INDEX_VALUE as usize {
            return Err(PrepError::malformed(format!(
                "{} mapping units exceed the addressable {}",
                units.len(),
                MAX_INDEX_VALUE
            )));
        }
        layout.validate(units.len())?;
        Ok(MappingData { units, layout })
    }

    pub fn units(&self) -> &[u16] {
        &self.units
    }

    pub fn layout(&self) -> &MappingLayout {
        &self.layout
    }

    /// Resolve an index to the start and length of its slice.
    pub fn resolve(&self, index: u32) -> Result<(u32, u8), PrepError> {
        let (start, length) = match self.layout.fixed_length(index) {
            Some(length) => (index, length),
            None => {
                let Some(&length) = self.units.get(index as usize) else {
                    return Err(PrepError::malformed(format!(
                        "mapping index {} outside {} units",
                        index,
                        self.units.len()
                    )));
                };
                let length = u8::try_from(length).map_err(|_| {
                    PrepError::malformed(format!("mapping at {} has length {}", index, length))
                })?;
                (index + 1, length)
            }
        };
        self.slice(start, length)?;
        Ok((start, length))
    }

    /// The units of a table reference.
    pub fn slice(&self, index: u32, length: u8) -> Result<&[u16], PrepError> {
        let start = index as usize;
        self.units
            .get(start..start + length as usize)
            .ok_or_else(|| {
                PrepError::malformed(format!(
                    "mapping {}..{} outside {} units",
                    start,
                    start + length as usize,
                    self.units.len()
                ))
            })
    }
}
