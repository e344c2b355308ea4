// unicode/mod.rs - Unicode services consumed by the preparation pipeline.
//
// Normalization and bidirectional classification are provided by external
// crates behind two small traits, so callers can substitute their own data.

pub mod rfc3454;

use std::fmt;

use unicode_bidi::BidiClass;
use unicode_normalization::UnicodeNormalization;

// === Unicode Version ===

/// A Unicode version as stored in profile resources (major, minor, micro, patch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct UnicodeVersion(pub [u8; 4]);

impl UnicodeVersion {
    /// Unicode 3.2.0, the version RFC 3454 tables are defined against.
    pub const V3_2_0: UnicodeVersion = UnicodeVersion([3, 2, 0, 0]);

    pub const fn new(major: u8, minor: u8, micro: u8) -> Self {
        UnicodeVersion([major, minor, micro, 0])
    }

    /// Unicode version of the normalization data compiled into this build.
    pub fn normalization() -> Self {
        let (major, minor, micro) = unicode_normalization::UNICODE_VERSION;
        UnicodeVersion::new(major, minor, micro)
    }

    pub(crate) fn from_u32(packed: u32) -> Self {
        UnicodeVersion(packed.to_be_bytes())
    }

    pub(crate) fn to_u32(self) -> u32 {
        u32::from_be_bytes(self.0)
    }
}

impl fmt::Display for UnicodeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [major, minor, micro, patch] = self.0;
        write!(f, "{}.{}.{}", major, minor, micro)?;
        if patch != 0 {
            write!(f, ".{}", patch)?;
        }
        Ok(())
    }
}

// === Normalization ===

/// Canonical-compatibility normalization (NFKC).
pub trait Normalizer: Send + Sync {
    fn normalize(&self, input: &[char]) -> Vec<char>;
}

/// NFKC backed by `unicode-normalization`, pinned to the Unicode 3.2
/// repertoire.
///
/// Code points unassigned in Unicode 3.2 (table A.1) are copied through
/// unchanged and split the input into separately normalized runs, so data
/// added after 3.2 never folds them.
#[derive(Debug, Clone, Copy, Default)]
pub struct Nfkc;

pub static NFKC: Nfkc = Nfkc;

impl Normalizer for Nfkc {
    fn normalize(&self, input: &[char]) -> Vec<char> {
        let mut out = Vec::with_capacity(input.len());
        let mut start = 0;
        for (i, &c) in input.iter().enumerate() {
            if in_ranges(rfc3454::A_1, c as u32) {
                out.extend(input[start..i].iter().copied().nfkc());
                out.push(c);
                start = i + 1;
            }
        }
        out.extend(input[start..].iter().copied().nfkc());
        out
    }
}

// === Bidirectional classification ===

/// Bidi categories the stringprep bidi rule distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BidiDirection {
    /// Category L.
    LeftToRight,
    /// Category R.
    RightToLeft,
    /// Category AL.
    RightToLeftArabic,
    /// Any other category.
    Neutral,
}

impl BidiDirection {
    pub fn is_rtl(self) -> bool {
        matches!(
            self,
            BidiDirection::RightToLeft | BidiDirection::RightToLeftArabic
        )
    }
}

/// Maps a code point to its bidirectional category.
pub trait BidiClassifier: Send + Sync {
    fn direction(&self, c: char) -> BidiDirection;
}

/// Bidi classes from `unicode-bidi`'s compiled-in data.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeBidi;

pub static UNICODE_BIDI: UnicodeBidi = UnicodeBidi;

impl BidiClassifier for UnicodeBidi {
    fn direction(&self, c: char) -> BidiDirection {
        match unicode_bidi::bidi_class(c) {
            BidiClass::L => BidiDirection::LeftToRight,
            BidiClass::R => BidiDirection::RightToLeft,
            BidiClass::AL => BidiDirection::RightToLeftArabic,
            _ => BidiDirection::Neutral,
        }
    }
}

// === Range table helpers ===

/// Binary search a sorted table of inclusive ranges.
pub fn in_ranges(table: &[(u32, u32)], cp: u32) -> bool {
    table
        .binary_search_by(|&(start, end)| {
            if end < cp {
                std::cmp::Ordering::Less
            } else if start > cp {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Equal
            }
        })
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_ordering_and_display() {
        assert!(UnicodeVersion::V3_2_0 < UnicodeVersion::new(4, 0, 0));
        assert_eq!(UnicodeVersion::V3_2_0.to_string(), "3.2.0");
        assert_eq!(UnicodeVersion([4, 0, 1, 2]).to_string(), "4.0.1.2");
        let packed = UnicodeVersion::V3_2_0.to_u32();
        assert_eq!(UnicodeVersion::from_u32(packed), UnicodeVersion::V3_2_0);
    }

    #[test]
    fn runtime_normalization_is_newer_than_3_2() {
        assert!(UnicodeVersion::normalization() > UnicodeVersion::V3_2_0);
    }

    #[test]
    fn nfkc_composes_compatibility_forms() {
        // U+FB01 LATIN SMALL LIGATURE FI
        assert_eq!(NFKC.normalize(&['\u{FB01}']), vec!['f', 'i']);
        // e + COMBINING ACUTE ACCENT
        assert_eq!(NFKC.normalize(&['e', '\u{0301}']), vec!['\u{00E9}']);
    }

    #[test]
    fn nfkc_leaves_code_points_unassigned_in_3_2() {
        // U+2C7C LATIN SUBSCRIPT SMALL LETTER J arrived in Unicode 5.1.
        assert_eq!(NFKC.normalize(&['\u{2C7C}']), vec!['\u{2C7C}']);
        // Runs on either side still normalize.
        assert_eq!(
            NFKC.normalize(&['\u{FB01}', '\u{2C7C}', 'e', '\u{0301}']),
            vec!['f', 'i', '\u{2C7C}', '\u{00E9}']
        );
        assert!(NFKC.normalize(&[]).is_empty());
    }

    #[test]
    fn bidi_directions() {
        assert_eq!(UNICODE_BIDI.direction('a'), BidiDirection::LeftToRight);
        assert_eq!(UNICODE_BIDI.direction('\u{05D0}'), BidiDirection::RightToLeft);
        assert_eq!(UNICODE_BIDI.direction('\u{0627}'), BidiDirection::RightToLeftArabic);
        assert_eq!(UNICODE_BIDI.direction('1'), BidiDirection::Neutral);
        assert!(BidiDirection::RightToLeftArabic.is_rtl());
        assert!(!BidiDirection::LeftToRight.is_rtl());
    }

    #[test]
    fn range_lookup() {
        assert!(in_ranges(rfc3454::C_1_2, 0x3000));
        assert!(!in_ranges(rfc3454::C_1_2, 0x0020));
        assert!(in_ranges(rfc3454::A_1, 0x0221));
        assert!(in_ranges(rfc3454::C_3, 0x10FFFD));
    }
}
