// sprep.rs - The preparation pipeline: map, normalize, prohibit, bidi.

use bitflags::bitflags;
use smallvec::SmallVec;
use tracing::trace;

use crate::entry::{Classification, Mapping};
use crate::error::PrepError;
use crate::profile::Profile;
use crate::unicode::{BidiClassifier, BidiDirection, Normalizer, NFKC, UNICODE_BIDI};

bitflags! {
    /// Options for a single preparation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PrepOptions: u32 {
        /// Copy unassigned code points through instead of failing.
        const ALLOW_UNASSIGNED = 0x0001;
    }
}

impl PrepOptions {
    /// Unassigned code points are rejected.
    pub const DEFAULT: PrepOptions = PrepOptions::empty();
}

// === Bidi ===

/// Directional facts gathered while scanning the normalized output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BidiRunState {
    first: Option<BidiDirection>,
    last: Option<BidiDirection>,
    ltr_pos: Option<usize>,
    rtl_pos: Option<usize>,
}

impl BidiRunState {
    pub fn observe(&mut self, index: usize, direction: BidiDirection) {
        if self.first.is_none() {
            self.first = Some(direction);
        }
        self.last = Some(direction);
        match direction {
            BidiDirection::LeftToRight => self.ltr_pos = Some(index),
            BidiDirection::RightToLeft | BidiDirection::RightToLeftArabic => {
                self.rtl_pos = Some(index)
            }
            BidiDirection::Neutral => {}
        }
    }

    pub fn has_ltr(&self) -> bool {
        self.ltr_pos.is_some()
    }

    pub fn has_rtl(&self) -> bool {
        self.rtl_pos.is_some()
    }

    /// Apply the bidi rule to everything observed.
    ///
    /// Mixed directions fail, as does RTL text that does not both start and
    /// end with an RTL character. The reported index is the later of the
    /// last LTR and last RTL positions.
    pub fn finish(&self) -> Result<(), PrepError> {
        let Some(rtl_pos) = self.rtl_pos else {
            return Ok(());
        };
        let index = self.ltr_pos.map_or(rtl_pos, |ltr_pos| ltr_pos.max(rtl_pos));
        if self.has_ltr() {
            return Err(PrepError::BidiRuleViolation { index });
        }
        let enclosed = self.first.is_some_and(BidiDirection::is_rtl)
            && self.last.is_some_and(BidiDirection::is_rtl);
        if !enclosed {
            return Err(PrepError::BidiRuleViolation { index });
        }
        Ok(())
    }
}

// === Pipeline ===

/// Prepare `input` with the default normalization and bidi services.
pub fn prepare_chars(
    profile: &Profile,
    input: &[char],
    options: PrepOptions,
) -> Result<Vec<char>, PrepError> {
    prepare_with(profile, input, options, &NFKC, &UNICODE_BIDI)
}

/// Prepare `input` under `profile`.
///
/// Error indices of unassigned code points refer to `input`; indices of
/// prohibited code points and bidi violations refer to the normalized
/// sequence.
pub fn prepare_with(
    profile: &Profile,
    input: &[char],
    options: PrepOptions,
    normalizer: &dyn Normalizer,
    classifier: &dyn BidiClassifier,
) -> Result<Vec<char>, PrepError> {
    run(profile, input, options, normalizer, classifier).inspect_err(|err| {
        trace!(
            profile = ?profile.id(),
            code = err.code(),
            index = ?err.index(),
            "preparation failed: {}",
            err
        );
    })
}

fn run(
    profile: &Profile,
    input: &[char],
    options: PrepOptions,
    normalizer: &dyn Normalizer,
    classifier: &dyn BidiClassifier,
) -> Result<Vec<char>, PrepError> {
    let mapped = map(profile, input, options)?;

    let output = if profile.normalize() {
        normalizer.normalize(&mapped)
    } else {
        mapped.into_vec()
    };

    let mut bidi = BidiRunState::default();
    for (index, &c) in output.iter().enumerate() {
        if profile.classify(c as u32)?.is_prohibited() {
            return Err(PrepError::ProhibitedCodepoint {
                index,
                code_point: c as u32,
            });
        }
        if profile.check_bidi() {
            bidi.observe(index, classifier.direction(c));
        }
    }
    if profile.check_bidi() {
        bidi.finish()?;
    }
    Ok(output)
}

fn map(
    profile: &Profile,
    input: &[char],
    options: PrepOptions,
) -> Result<SmallVec<[char; 64]>, PrepError> {
    let allow_unassigned = options.contains(PrepOptions::ALLOW_UNASSIGNED);
    let mut out = SmallVec::with_capacity(input.len());
    for (index, &c) in input.iter().enumerate() {
        let cp = c as u32;
        match profile.classify(cp)? {
            Classification::Unassigned if !allow_unassigned => {
                return Err(PrepError::UnassignedCodepoint {
                    index,
                    code_point: cp,
                });
            }
            Classification::Deleted => {}
            Classification::Mapped {
                mapping: Mapping::Delta(delta),
                ..
            } => {
                let replacement = i64::from(cp) - i64::from(delta);
                let c = u32::try_from(replacement)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| {
                        PrepError::malformed(format!(
                            "U+{:04X} maps to invalid code point {:#X}",
                            cp, replacement
                        ))
                    })?;
                out.push(c);
            }
            Classification::Mapped {
                mapping: Mapping::TableRef { index: start, length },
                ..
            } => {
                let units = profile.mapping_data().slice(start, length)?;
                for unit in char::decode_utf16(units.iter().copied()) {
                    let c = unit.map_err(|e| {
                        PrepError::malformed(format!(
                            "mapping of U+{:04X} holds unpaired surrogate {:#X}",
                            cp,
                            e.unpaired_surrogate()
                        ))
                    })?;
                    out.push(c);
                }
            }
            Classification::Unassigned
            | Classification::PassThrough
            | Classification::Prohibited => out.push(c),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ProfileBuilder;
    use crate::unicode::UnicodeVersion;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn profile(builder: ProfileBuilder) -> Profile {
        builder.build(UnicodeVersion::normalization()).unwrap()
    }

    /// Everything left-to-right except Hebrew letters.
    struct HebrewOnly;

    impl BidiClassifier for HebrewOnly {
        fn direction(&self, c: char) -> BidiDirection {
            match c {
                '\u{05D0}'..='\u{05EA}' => BidiDirection::RightToLeft,
                '0'..='9' | ' ' => BidiDirection::Neutral,
                _ => BidiDirection::LeftToRight,
            }
        }
    }

    /// Reverses its input, so tests can tell it ran.
    struct Reverse;

    impl Normalizer for Reverse {
        fn normalize(&self, input: &[char]) -> Vec<char> {
            input.iter().rev().copied().collect()
        }
    }

    #[test]
    fn empty_input() {
        let p = profile(ProfileBuilder::new().check_bidi(true).normalize(true));
        assert_eq!(prepare_chars(&p, &[], PrepOptions::DEFAULT).unwrap(), vec![]);
    }

    #[test]
    fn maps_deletes_and_passes_through() {
        let p = profile(
            ProfileBuilder::new()
                .map(0x41, &[0x61])
                .map(0xDF, &[0x73, 0x73])
                .map_to_nothing_ranges(&[(0xAD, 0xAD)]),
        );
        let out = prepare_chars(&p, &chars("A\u{AD}\u{DF}z"), PrepOptions::DEFAULT).unwrap();
        assert_eq!(out, chars("assz"));
    }

    #[test]
    fn unassigned_needs_option() {
        let p = profile(ProfileBuilder::new().unassigned(0x221, 0x221));
        let input = chars("ab\u{221}");
        assert_eq!(
            prepare_chars(&p, &input, PrepOptions::DEFAULT).unwrap_err(),
            PrepError::UnassignedCodepoint {
                index: 2,
                code_point: 0x221
            }
        );
        assert_eq!(
            prepare_chars(&p, &input, PrepOptions::ALLOW_UNASSIGNED).unwrap(),
            input
        );
    }

    #[test]
    fn prohibited_index_refers_to_output() {
        let p = profile(
            ProfileBuilder::new()
                .map_to_nothing_ranges(&[(0xAD, 0xAD)])
                .prohibit(0x20),
        );
        let err = prepare_chars(&p, &chars("\u{AD}\u{AD}a b"), PrepOptions::DEFAULT).unwrap_err();
        assert_eq!(
            err,
            PrepError::ProhibitedCodepoint {
                index: 1,
                code_point: 0x20
            }
        );
    }

    #[test]
    fn mapped_and_prohibited_checks_output_only() {
        // U+3000 maps to SPACE and is itself prohibited; SPACE is fine.
        let p = profile(ProfileBuilder::new().prohibit(0x3000).map(0x3000, &[0x20]));
        assert_eq!(
            prepare_chars(&p, &chars("a\u{3000}b"), PrepOptions::DEFAULT).unwrap(),
            chars("a b")
        );
    }

    #[test]
    fn normalization_introduces_prohibited() {
        // Normalizer output is re-checked.
        let p = profile(ProfileBuilder::new().normalize(true).prohibit(0x66));
        let err = prepare_chars(&p, &['\u{FB01}'], PrepOptions::DEFAULT).unwrap_err();
        assert_eq!(
            err,
            PrepError::ProhibitedCodepoint {
                index: 0,
                code_point: 0x66
            }
        );
    }

    #[test]
    fn injected_normalizer_runs_only_when_enabled() {
        let on = profile(ProfileBuilder::new().normalize(true));
        let off = profile(ProfileBuilder::new());
        let input = chars("abc");
        let out = prepare_with(&on, &input, PrepOptions::DEFAULT, &Reverse, &UNICODE_BIDI);
        assert_eq!(out.unwrap(), chars("cba"));
        let out = prepare_with(&off, &input, PrepOptions::DEFAULT, &Reverse, &UNICODE_BIDI);
        assert_eq!(out.unwrap(), input);
    }

    #[test]
    fn bidi_rule() {
        let p = profile(ProfileBuilder::new().check_bidi(true));
        let run = |s: &str| prepare_with(&p, &chars(s), PrepOptions::DEFAULT, &NFKC, &HebrewOnly);

        assert!(run("abc").is_ok());
        assert!(run("\u{5D0}1\u{5D1}").is_ok());
        // RTL then LTR: mixed
        assert_eq!(
            run("\u{5D0}a").unwrap_err(),
            PrepError::BidiRuleViolation { index: 1 }
        );
        // LTR then RTL reports the later RTL position
        assert_eq!(
            run("ab\u{5D0}").unwrap_err(),
            PrepError::BidiRuleViolation { index: 2 }
        );
        // RTL not enclosed
        assert_eq!(
            run("\u{5D0}1").unwrap_err(),
            PrepError::BidiRuleViolation { index: 0 }
        );
        assert_eq!(
            run("1\u{5D0}").unwrap_err(),
            PrepError::BidiRuleViolation { index: 1 }
        );
    }

    #[test]
    fn bidi_ignored_when_disabled() {
        let p = profile(ProfileBuilder::new());
        let out = prepare_with(&p, &chars("\u{5D0}a"), PrepOptions::DEFAULT, &NFKC, &HebrewOnly);
        assert!(out.is_ok());
    }

    #[test]
    fn bidi_state_tracks_positions() {
        let mut state = BidiRunState::default();
        state.observe(0, BidiDirection::Neutral);
        assert!(!state.has_ltr() && !state.has_rtl());
        state.observe(1, BidiDirection::RightToLeftArabic);
        state.observe(2, BidiDirection::RightToLeft);
        assert!(state.has_rtl());
        // starts with a neutral
        assert_eq!(
            state.finish(),
            Err(PrepError::BidiRuleViolation { index: 2 })
        );
    }

    #[test]
    fn options_default_is_empty() {
        assert_eq!(PrepOptions::default(), PrepOptions::DEFAULT);
        assert!(!PrepOptions::DEFAULT.contains(PrepOptions::ALLOW_UNASSIGNED));
    }
}
