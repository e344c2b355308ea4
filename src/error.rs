// error.rs - Error types for string preparation.
//
// One semantic variant per failure class. Loading failures carry the
// profile they happened in, preparation failures carry the offending index.

use std::fmt;

use crate::profile::ProfileId;
use crate::rle::RleError;
use crate::unicode::UnicodeVersion;

// === Error codes ===
pub const SPREP_ERR_INVALID_PROFILE_ID: i32 = -1;
pub const SPREP_ERR_PROFILE_VERSION_UNSUPPORTED: i32 = -2;
pub const SPREP_ERR_MALFORMED_TABLE_DATA: i32 = -3;
pub const SPREP_ERR_RESOURCE_UNAVAILABLE: i32 = -4;
pub const SPREP_ERR_UNASSIGNED_CODEPOINT: i32 = -10;
pub const SPREP_ERR_PROHIBITED_CODEPOINT: i32 = -11;
pub const SPREP_ERR_BIDI_RULE_VIOLATION: i32 = -12;
pub const SPREP_ERR_INVALID_RULE: i32 = -20;

/// Error type for profile loading and string preparation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrepError {
    /// The profile identifier is not one of the known profiles.
    InvalidProfileId { id: i32 },
    /// The profile needs normalization data newer than the runtime provides.
    ProfileVersionUnsupported {
        profile: Option<ProfileId>,
        data_version: UnicodeVersion,
        runtime_version: UnicodeVersion,
    },
    /// The binary profile resource is inconsistent or truncated.
    MalformedTableData {
        profile: Option<ProfileId>,
        detail: String,
    },
    /// The binary profile resource could not be obtained.
    ResourceUnavailable {
        profile: Option<ProfileId>,
        detail: String,
    },
    /// An unassigned code point was found and unassigned code points are not allowed.
    UnassignedCodepoint { index: usize, code_point: u32 },
    /// A prohibited code point was found in the prepared output.
    ProhibitedCodepoint { index: usize, code_point: u32 },
    /// The prepared output mixes directions or is not enclosed by RTL characters.
    BidiRuleViolation { index: usize },
    /// A profile builder was given a rule it cannot encode.
    InvalidRule { detail: String },
}

impl fmt::Display for PrepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrepError::InvalidProfileId { id } => write!(f, "invalid profile id {}", id),
            PrepError::ProfileVersionUnsupported {
                profile,
                data_version,
                runtime_version,
            } => {
                write!(
                    f,
                    "profile{} requires Unicode {} but normalization supports {}",
                    ProfileSuffix(profile),
                    data_version,
                    runtime_version
                )
            }
            PrepError::MalformedTableData { profile, detail } => {
                write!(f, "malformed table data{}: {}", ProfileSuffix(profile), detail)
            }
            PrepError::ResourceUnavailable { profile, detail } => {
                write!(f, "resource unavailable{}: {}", ProfileSuffix(profile), detail)
            }
            PrepError::UnassignedCodepoint { index, code_point } => {
                write!(f, "unassigned code point U+{:04X} at index {}", code_point, index)
            }
            PrepError::ProhibitedCodepoint { index, code_point } => {
                write!(f, "prohibited code point U+{:04X} at index {}", code_point, index)
            }
            PrepError::BidiRuleViolation { index } => {
                write!(f, "bidi rule violation at index {}", index)
            }
            PrepError::InvalidRule { detail } => write!(f, "invalid rule: {}", detail),
        }
    }
}

struct ProfileSuffix<'a>(&'a Option<ProfileId>);

impl fmt::Display for ProfileSuffix<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(id) => write!(f, " in {}", id.resource_name()),
            None => Ok(()),
        }
    }
}

impl std::error::Error for PrepError {}

impl From<RleError> for PrepError {
    fn from(err: RleError) -> Self {
        PrepError::MalformedTableData {
            profile: None,
            detail: err.to_string(),
        }
    }
}

impl PrepError {
    /// Returns the stable numeric code of this error.
    pub fn code(&self) -> i32 {
        match self {
            PrepError::InvalidProfileId { .. } => SPREP_ERR_INVALID_PROFILE_ID,
            PrepError::ProfileVersionUnsupported { .. } => SPREP_ERR_PROFILE_VERSION_UNSUPPORTED,
            PrepError::MalformedTableData { .. } => SPREP_ERR_MALFORMED_TABLE_DATA,
            PrepError::ResourceUnavailable { .. } => SPREP_ERR_RESOURCE_UNAVAILABLE,
            PrepError::UnassignedCodepoint { .. } => SPREP_ERR_UNASSIGNED_CODEPOINT,
            PrepError::ProhibitedCodepoint { .. } => SPREP_ERR_PROHIBITED_CODEPOINT,
            PrepError::BidiRuleViolation { .. } => SPREP_ERR_BIDI_RULE_VIOLATION,
            PrepError::InvalidRule { .. } => SPREP_ERR_INVALID_RULE,
        }
    }

    /// The index of the offending code point, for preparation failures.
    pub fn index(&self) -> Option<usize> {
        match self {
            PrepError::UnassignedCodepoint { index, .. }
            | PrepError::ProhibitedCodepoint { index, .. }
            | PrepError::BidiRuleViolation { index } => Some(*index),
            _ => None,
        }
    }

    pub(crate) fn malformed(detail: impl Into<String>) -> Self {
        PrepError::MalformedTableData {
            profile: None,
            detail: detail.into(),
        }
    }

    /// Attach a profile id to loading errors that do not carry one yet.
    pub(crate) fn in_profile(self, id: ProfileId) -> Self {
        match self {
            PrepError::ProfileVersionUnsupported {
                profile: None,
                data_version,
                runtime_version,
            } => PrepError::ProfileVersionUnsupported {
                profile: Some(id),
                data_version,
                runtime_version,
            },
            PrepError::MalformedTableData {
                profile: None,
                detail,
            } => PrepError::MalformedTableData {
                profile: Some(id),
                detail,
            },
            PrepError::ResourceUnavailable {
                profile: None,
                detail,
            } => PrepError::ResourceUnavailable {
                profile: Some(id),
                detail,
            },
            other => other,
        }
    }
}
