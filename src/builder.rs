// builder.rs - Compiles stringprep rule tables into profile resources.
//
// Rules are collected per code point, then every code point is reduced to a
// single trie entry:
//
//   mapped      delta entry when the replacement is one code point close by,
//               otherwise a reference into the mapping data
//   prohibited  EntryType::Prohibited
//   unassigned  EntryType::Unassigned
//
// A mapped code point that is also prohibited keeps its mapping and sets the
// prohibited bit of the entry.

use std::collections::{BTreeMap, HashMap};

use tracing::trace;

use crate::entry::{
    EntryType, MappingLayout, DELETE_ENTRY, DELTA_RANGE_NEGATIVE_LIMIT,
    DELTA_RANGE_POSITIVE_LIMIT, INDEX_FLAG, MAX_INDEX_VALUE, PROHIBITED_FLAG, TYPE_THRESHOLD,
};
use crate::error::PrepError;
use crate::profile::Profile;
use crate::resource::{
    self, CHECK_BIDI_ON, FOUR_UNITS_MAPPING_INDEX_START, INDEX_MAPPING_DATA_SIZE, INDEX_TOP,
    INDEX_TRIE_SIZE, NORMALIZATION_ON, NORM_CORRECTNS_LAST_UNI_VERSION,
    ONE_UNIT_MAPPING_INDEX_START, OPTIONS, THREE_UNITS_MAPPING_INDEX_START,
    TWO_UNITS_MAPPING_INDEX_START,
};
use crate::trie::{TrieBuilder, CODE_POINT_LIMIT};
use crate::unicode::UnicodeVersion;

const FLAG_UNASSIGNED: u8 = 0x01;
const FLAG_PROHIBITED: u8 = 0x02;

/// Builder for a profile resource.
///
/// # Examples
///
/// ```
/// use sprep::builder::ProfileBuilder;
/// use sprep::unicode::UnicodeVersion;
///
/// let profile = ProfileBuilder::new()
///     .map(0x41, &[0x61])
///     .prohibit(0x20)
///     .build(UnicodeVersion::normalization())
///     .unwrap();
/// assert!(profile.classify(0x20).unwrap().is_prohibited());
/// ```
pub struct ProfileBuilder {
    flags: Vec<u8>,
    mappings: BTreeMap<u32, Vec<u32>>,
    normalize: bool,
    check_bidi: bool,
    data_version: UnicodeVersion,
    corrections_version: UnicodeVersion,
    error: Option<PrepError>,
}

impl Default for ProfileBuilder {
    fn default() -> Self {
        ProfileBuilder {
            flags: vec![0; CODE_POINT_LIMIT as usize],
            mappings: BTreeMap::new(),
            normalize: false,
            check_bidi: false,
            data_version: UnicodeVersion::V3_2_0,
            corrections_version: UnicodeVersion::V3_2_0,
            error: None,
        }
    }
}

impl std::fmt::Debug for ProfileBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileBuilder")
            .field("mappings", &self.mappings.len())
            .field("normalize", &self.normalize)
            .field("check_bidi", &self.check_bidi)
            .field("data_version", &self.data_version)
            .finish_non_exhaustive()
    }
}

impl ProfileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply NFKC after mapping.
    pub fn normalize(mut self, yes: bool) -> Self {
        self.normalize = yes;
        self
    }

    /// Apply the bidi rule to the output.
    pub fn check_bidi(mut self, yes: bool) -> Self {
        self.check_bidi = yes;
        self
    }

    /// Unicode version the tables are defined against.
    pub fn data_version(mut self, version: UnicodeVersion) -> Self {
        self.data_version = version;
        self
    }

    /// Last Unicode version whose normalization corrections the tables account for.
    pub fn corrections_version(mut self, version: UnicodeVersion) -> Self {
        self.corrections_version = version;
        self
    }

    /// Mark an inclusive range as unassigned.
    pub fn unassigned(self, start: u32, end: u32) -> Self {
        self.flag_range(start, end, FLAG_UNASSIGNED)
    }

    pub fn unassigned_ranges(self, table: &[(u32, u32)]) -> Self {
        table
            .iter()
            .fold(self, |b, &(start, end)| b.unassigned(start, end))
    }

    pub fn prohibit(self, cp: u32) -> Self {
        self.flag_range(cp, cp, FLAG_PROHIBITED)
    }

    pub fn prohibit_range(self, start: u32, end: u32) -> Self {
        self.flag_range(start, end, FLAG_PROHIBITED)
    }

    pub fn prohibit_ranges(self, table: &[(u32, u32)]) -> Self {
        table
            .iter()
            .fold(self, |b, &(start, end)| b.prohibit_range(start, end))
    }

    /// Map `cp` to `target`; an empty target deletes it. The first mapping
    /// given for a code point wins.
    pub fn map(mut self, cp: u32, target: &[u32]) -> Self {
        if self.error.is_some() {
            return self;
        }
        if cp >= CODE_POINT_LIMIT {
            return self.fail(format!("cannot map code point {:#X}", cp));
        }
        if let Some(&bad) = target.iter().find(|&&t| char::from_u32(t).is_none()) {
            return self.fail(format!("U+{:04X} maps to non-scalar value {:#X}", cp, bad));
        }
        self.mappings.entry(cp).or_insert_with(|| target.to_vec());
        self
    }

    /// Add every `(code point, replacement)` pair of a mapping table.
    pub fn map_table(self, table: &[(u32, &[u32])]) -> Self {
        table
            .iter()
            .fold(self, |b, &(cp, target)| b.map(cp, target))
    }

    pub fn map_to_nothing_ranges(self, table: &[(u32, u32)]) -> Self {
        self.map_ranges_to(table, &[])
    }

    /// Map every code point of the ranges to the same replacement.
    pub fn map_ranges_to(self, table: &[(u32, u32)], target: &[u32]) -> Self {
        table.iter().fold(self, |b, &(start, end)| {
            (start..=end).fold(b, |b, cp| b.map(cp, target))
        })
    }

    fn flag_range(mut self, start: u32, end: u32, flag: u8) -> Self {
        if self.error.is_some() {
            return self;
        }
        if start > end || end >= CODE_POINT_LIMIT {
            return self.fail(format!("code point range {:#X}..={:#X} is invalid", start, end));
        }
        for f in &mut self.flags[start as usize..=end as usize] {
            *f |= flag;
        }
        self
    }

    fn fail(mut self, detail: String) -> Self {
        self.error = Some(PrepError::InvalidRule { detail });
        self
    }

    /// Serialize the rules into a profile resource.
    pub fn to_bytes(&self) -> Result<Vec<u8>, PrepError> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }

        let mut table = MappingTable::default();
        let mut entries: BTreeMap<u32, Pending> = BTreeMap::new();
        let mut deltas = 0usize;
        for (&cp, target) in &self.mappings {
            let prohibited = self.flags[cp as usize] & FLAG_PROHIBITED != 0;
            let pending = match delta_entry(cp, target, prohibited) {
                Some(word) => {
                    deltas += 1;
                    Pending::Word(word)
                }
                None if target.is_empty() => Pending::Word(DELETE_ENTRY),
                None => Pending::Table {
                    id: table.add(utf16(target))?,
                    prohibited,
                },
            };
            entries.insert(cp, pending);
        }
        let (units, layout, offsets) = table.finish()?;

        let mut trie = TrieBuilder::new();
        for (cp, &flags) in self.flags.iter().enumerate() {
            let word = if flags & FLAG_PROHIBITED != 0 {
                EntryType::Prohibited.entry()
            } else if flags & FLAG_UNASSIGNED != 0 {
                EntryType::Unassigned.entry()
            } else {
                continue;
            };
            trie.set(cp as u32, word)?;
        }
        for (&cp, pending) in &entries {
            let word = match *pending {
                Pending::Word(word) => word,
                Pending::Table { id, prohibited } => {
                    let mut word = ((offsets[id] as u16) << 2) | INDEX_FLAG;
                    if prohibited {
                        word |= PROHIBITED_FLAG;
                    }
                    word
                }
            };
            trie.set(cp, word)?;
        }
        let trie = trie.build()?;

        let trie_bytes = trie.to_bytes();
        let mut indexes = [0u32; INDEX_TOP];
        indexes[INDEX_TRIE_SIZE] = trie_bytes.len() as u32;
        indexes[INDEX_MAPPING_DATA_SIZE] = (units.len() * 2) as u32;
        indexes[NORM_CORRECTNS_LAST_UNI_VERSION] = self.corrections_version.to_u32();
        indexes[ONE_UNIT_MAPPING_INDEX_START] = layout.one_unit_start;
        indexes[TWO_UNITS_MAPPING_INDEX_START] = layout.two_units_start;
        indexes[THREE_UNITS_MAPPING_INDEX_START] = layout.three_units_start;
        indexes[FOUR_UNITS_MAPPING_INDEX_START] = layout.four_units_start;
        if self.normalize {
            indexes[OPTIONS] |= NORMALIZATION_ON;
        }
        if self.check_bidi {
            indexes[OPTIONS] |= CHECK_BIDI_ON;
        }

        trace!(
            mappings = self.mappings.len(),
            deltas,
            mapping_units = units.len(),
            blocks = trie.block_count(),
            "compiled profile rules"
        );
        Ok(resource::write_resource(
            self.data_version,
            &indexes,
            &trie_bytes,
            &units,
        ))
    }

    /// Serialize and parse back into a [`Profile`].
    pub fn build(&self, runtime_version: UnicodeVersion) -> Result<Profile, PrepError> {
        Profile::from_bytes(&self.to_bytes()?, runtime_version)
    }
}

/// Delta entry for a single replacement code point, if one can express it.
fn delta_entry(cp: u32, target: &[u32], prohibited: bool) -> Option<u16> {
    let [replacement] = target else {
        return None;
    };
    let delta = cp as i32 - *replacement as i32;
    if !(DELTA_RANGE_NEGATIVE_LIMIT..=DELTA_RANGE_POSITIVE_LIMIT).contains(&delta) {
        return None;
    }
    let mut word = ((delta << 2) as i16) as u16;
    if prohibited {
        word |= PROHIBITED_FLAG;
    }
    // Deltas near zero or -65 would read back as a type or as deleted.
    if word >= TYPE_THRESHOLD || word >> 2 == MAX_INDEX_VALUE {
        return None;
    }
    Some(word)
}

fn utf16(target: &[u32]) -> Vec<u16> {
    let mut out = Vec::with_capacity(target.len());
    let mut buf = [0u16; 2];
    for &cp in target {
        // Targets were checked to be scalar values in `map`.
        if let Some(c) = char::from_u32(cp) {
            out.extend_from_slice(c.encode_utf16(&mut buf));
        }
    }
    out
}

// === Mapping Data Layout ===

/// Trie entry of a mapped code point, before mapping offsets are known.
enum Pending {
    Word(u16),
    Table { id: usize, prohibited: bool },
}

/// Distinct replacement sequences grouped by length.
#[derive(Default)]
struct MappingTable {
    ids: HashMap<Vec<u16>, usize>,
    // Segments 0..=2 hold sequences of 1..=3 units; 3 holds longer ones.
    segments: [Vec<Vec<u16>>; 4],
}

impl MappingTable {
    fn add(&mut self, units: Vec<u16>) -> Result<usize, PrepError> {
        if units.len() > u8::MAX as usize {
            return Err(PrepError::InvalidRule {
                detail: format!("replacement of {} units is too long", units.len()),
            });
        }
        if let Some(&id) = self.ids.get(&units) {
            return Ok(id);
        }
        let id = self.ids.len();
        self.segments[units.len().min(4) - 1].push(units.clone());
        self.ids.insert(units, id);
        Ok(id)
    }

    /// Lay the segments out back to back. Returns the units, the segment
    /// starts, and the offset of every sequence id.
    fn finish(self) -> Result<(Vec<u16>, MappingLayout, Vec<u32>), PrepError> {
        let mut units: Vec<u16> = Vec::new();
        let mut offsets = vec![0u32; self.ids.len()];
        let mut starts = [0u32; 4];
        for (segment, sequences) in self.segments.iter().enumerate() {
            starts[segment] = units.len() as u32;
            for sequence in sequences {
                offsets[self.ids[sequence]] = units.len() as u32;
                if segment == 3 {
                    units.push(sequence.len() as u16);
                }
                units.extend_from_slice(sequence);
            }
        }
        if units.len() >= MAX_INDEX_VALUE as usize {
            return Err(PrepError::InvalidRule {
                detail: format!("{} mapping units exceed the index space", units.len()),
            });
        }
        let layout = MappingLayout {
            one_unit_start: starts[0],
            two_units_start: starts[1],
            three_units_start: starts[2],
            four_units_start: starts[3],
        };
        Ok((units, layout, offsets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{Classification, Mapping};
    use crate::unicode::rfc3454;

    fn runtime() -> UnicodeVersion {
        UnicodeVersion::normalization()
    }

    fn mapped_units(profile: &Profile, cp: u32) -> Vec<u16> {
        match profile.classify(cp).unwrap() {
            Classification::Mapped {
                mapping: Mapping::TableRef { index, length },
                ..
            } => profile.mapping_data().slice(index, length).unwrap().to_vec(),
            other => panic!("U+{:04X} is {:?}", cp, other),
        }
    }

    #[test]
    fn close_single_replacements_use_deltas() {
        let profile = ProfileBuilder::new().map(0x41, &[0x61]).build(runtime()).unwrap();
        assert_eq!(
            profile.classify(0x41).unwrap(),
            Classification::Mapped {
                mapping: Mapping::Delta(-32),
                prohibited: false
            }
        );
    }

    #[test]
    fn sequences_use_segments() {
        let profile = ProfileBuilder::new()
            .map(0xDF, &[0x73, 0x73])
            .map(0x130, &[0x69, 0x307])
            .map(0x1F80, &[0x1F00, 0x3B9])
            .map(0x3390, &[0x68, 0x7A])
            .map(0xFB03, &[0x66, 0x66, 0x69])
            .map(0x41, &[0x10400])
            .map(0x2000, &[0x61, 0x62, 0x63, 0x64, 0x65])
            .build(runtime())
            .unwrap();
        assert_eq!(mapped_units(&profile, 0xDF), vec![0x73, 0x73]);
        assert_eq!(mapped_units(&profile, 0xFB03), vec![0x66, 0x66, 0x69]);
        // A supplementary target is two units.
        assert_eq!(mapped_units(&profile, 0x41), vec![0xD801, 0xDC00]);
        assert_eq!(
            mapped_units(&profile, 0x2000),
            vec![0x61, 0x62, 0x63, 0x64, 0x65]
        );
        assert_eq!(mapped_units(&profile, 0x3390), vec![0x68, 0x7A]);
    }

    #[test]
    fn identical_sequences_are_shared() {
        let profile = ProfileBuilder::new()
            .map(0x2160, &[0x69, 0x69, 0x69, 0x69])
            .map(0x2161, &[0x69, 0x69, 0x69, 0x69])
            .build(runtime())
            .unwrap();
        assert_eq!(profile.mapping_data().units().len(), 5);
        assert_eq!(profile.entry(0x2160), profile.entry(0x2161));
    }

    #[test]
    fn first_mapping_wins() {
        let profile = ProfileBuilder::new()
            .map_ranges_to(&[(0x200B, 0x200B)], &[0x20])
            .map_to_nothing_ranges(&[(0x200B, 0x200B)])
            .build(runtime())
            .unwrap();
        assert_eq!(
            profile.classify(0x200B).unwrap(),
            Classification::Mapped {
                mapping: Mapping::Delta(0x200B - 0x20),
                prohibited: false
            }
        );
    }

    #[test]
    fn deletion_and_precedence() {
        let profile = ProfileBuilder::new()
            .map_to_nothing_ranges(&[(0xAD, 0xAD)])
            .prohibit(0x3000)
            .map(0x3000, &[0x20])
            .prohibit(0x7F)
            .unassigned(0x7F, 0x7F)
            .unassigned(0x221, 0x221)
            .build(runtime())
            .unwrap();
        assert_eq!(profile.classify(0xAD).unwrap(), Classification::Deleted);
        let space = profile.classify(0x3000).unwrap();
        assert!(space.is_prohibited());
        assert_eq!(space.entry_type(), EntryType::Mapped);
        assert_eq!(profile.classify(0x7F).unwrap(), Classification::Prohibited);
        assert_eq!(profile.classify(0x221).unwrap(), Classification::Unassigned);
    }

    #[test]
    fn self_mapping_prohibited_is_delta_zero() {
        let profile = ProfileBuilder::new()
            .prohibit(0x20)
            .map(0x20, &[0x20])
            .build(runtime())
            .unwrap();
        assert_eq!(profile.entry(0x20), 0x0001);
    }

    #[test]
    fn colliding_deltas_fall_back_to_table() {
        // delta -1 would land in the type space, delta -65 on the deleted sentinel
        let profile = ProfileBuilder::new()
            .map(0x100, &[0x101])
            .map(0x200, &[0x241])
            .build(runtime())
            .unwrap();
        assert_eq!(mapped_units(&profile, 0x100), vec![0x101]);
        assert_eq!(mapped_units(&profile, 0x200), vec![0x241]);
    }

    #[test]
    fn invalid_rules_surface_on_build() {
        let err = ProfileBuilder::new()
            .map(0x41, &[0xD800])
            .to_bytes()
            .unwrap_err();
        assert!(matches!(err, PrepError::InvalidRule { .. }));
        assert!(ProfileBuilder::new().prohibit_range(9, 3).to_bytes().is_err());
        assert!(ProfileBuilder::new().unassigned(0, 0x110000).to_bytes().is_err());
    }

    #[test]
    fn full_case_folding_table_fits() {
        let profile = ProfileBuilder::new()
            .map_table(rfc3454::B_2)
            .build(runtime())
            .unwrap();
        for &(cp, target) in rfc3454::B_2 {
            match profile.classify(cp).unwrap() {
                Classification::Mapped {
                    mapping: Mapping::Delta(delta),
                    ..
                } => assert_eq!(target, &[(cp as i32 - delta) as u32]),
                Classification::Mapped { .. } => {
                    let expected = utf16(target);
                    assert_eq!(mapped_units(&profile, cp), expected);
                }
                other => panic!("U+{:04X} is {:?}", cp, other),
            }
        }
    }
}
