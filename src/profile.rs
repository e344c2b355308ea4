// profile.rs - Profile identifiers and parsed profiles.

use std::fmt;
use std::str::FromStr;

use tracing::trace;

use crate::entry::{self, Classification, MappingData};
use crate::error::PrepError;
use crate::resource::{self, CHECK_BIDI_ON, NORMALIZATION_ON};
use crate::trie::PropertyTrie;
use crate::unicode::UnicodeVersion;

/// The standard stringprep profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(i32)]
pub enum ProfileId {
    /// RFC 3491 nameprep (IDNA).
    Rfc3491Nameprep = 0,
    /// RFC 3530 nfs4_cs_prep.
    Rfc3530Nfs4CsPrep = 1,
    /// RFC 3530 nfs4_cs_prep with case-insensitive mapping.
    Rfc3530Nfs4CsPrepCi = 2,
    /// RFC 3530 nfs4_cis_prep.
    Rfc3530Nfs4CisPrep = 3,
    /// RFC 3530 nfs4_mixed_prep, prefix part.
    Rfc3530Nfs4MixedPrepPrefix = 4,
    /// RFC 3530 nfs4_mixed_prep, suffix part.
    Rfc3530Nfs4MixedPrepSuffix = 5,
    /// RFC 3722 iSCSI names.
    Rfc3722Iscsi = 6,
    /// RFC 3920 XMPP nodeprep.
    Rfc3920Nodeprep = 7,
    /// RFC 3920 XMPP resourceprep.
    Rfc3920Resourceprep = 8,
    /// RFC 4011 policy MIB.
    Rfc4011Mib = 9,
    /// RFC 4013 SASLprep.
    Rfc4013Saslprep = 10,
    /// RFC 4505 trace tokens.
    Rfc4505Trace = 11,
    /// RFC 4518 LDAP string matching.
    Rfc4518Ldap = 12,
    /// RFC 4518 LDAP case-ignore matching.
    Rfc4518LdapCi = 13,
}

impl ProfileId {
    pub const ALL: [ProfileId; 14] = [
        ProfileId::Rfc3491Nameprep,
        ProfileId::Rfc3530Nfs4CsPrep,
        ProfileId::Rfc3530Nfs4CsPrepCi,
        ProfileId::Rfc3530Nfs4CisPrep,
        ProfileId::Rfc3530Nfs4MixedPrepPrefix,
        ProfileId::Rfc3530Nfs4MixedPrepSuffix,
        ProfileId::Rfc3722Iscsi,
        ProfileId::Rfc3920Nodeprep,
        ProfileId::Rfc3920Resourceprep,
        ProfileId::Rfc4011Mib,
        ProfileId::Rfc4013Saslprep,
        ProfileId::Rfc4505Trace,
        ProfileId::Rfc4518Ldap,
        ProfileId::Rfc4518LdapCi,
    ];

    /// Name of the binary resource. Profiles with identical rules share one.
    pub fn resource_name(self) -> &'static str {
        match self {
            ProfileId::Rfc3491Nameprep
            | ProfileId::Rfc3530Nfs4CisPrep
            | ProfileId::Rfc3530Nfs4MixedPrepSuffix => "rfc3491",
            ProfileId::Rfc3530Nfs4CsPrep => "rfc3530cs",
            ProfileId::Rfc3530Nfs4CsPrepCi => "rfc3530csci",
            ProfileId::Rfc3530Nfs4MixedPrepPrefix => "rfc3530mixp",
            ProfileId::Rfc3722Iscsi => "rfc3722",
            ProfileId::Rfc3920Nodeprep => "rfc3920node",
            ProfileId::Rfc3920Resourceprep => "rfc3920res",
            ProfileId::Rfc4011Mib => "rfc4011",
            ProfileId::Rfc4013Saslprep => "rfc4013",
            ProfileId::Rfc4505Trace => "rfc4505",
            ProfileId::Rfc4518Ldap => "rfc4518",
            ProfileId::Rfc4518LdapCi => "rfc4518ci",
        }
    }

    /// Conventional profile name.
    pub fn name(self) -> &'static str {
        match self {
            ProfileId::Rfc3491Nameprep => "nameprep",
            ProfileId::Rfc3530Nfs4CsPrep => "nfs4_cs_prep",
            ProfileId::Rfc3530Nfs4CsPrepCi => "nfs4_cs_prep_ci",
            ProfileId::Rfc3530Nfs4CisPrep => "nfs4_cis_prep",
            ProfileId::Rfc3530Nfs4MixedPrepPrefix => "nfs4_mixed_prep_prefix",
            ProfileId::Rfc3530Nfs4MixedPrepSuffix => "nfs4_mixed_prep_suffix",
            ProfileId::Rfc3722Iscsi => "iscsi",
            ProfileId::Rfc3920Nodeprep => "nodeprep",
            ProfileId::Rfc3920Resourceprep => "resourceprep",
            ProfileId::Rfc4011Mib => "mib",
            ProfileId::Rfc4013Saslprep => "saslprep",
            ProfileId::Rfc4505Trace => "trace",
            ProfileId::Rfc4518Ldap => "ldap",
            ProfileId::Rfc4518LdapCi => "ldap_ci",
        }
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<i32> for ProfileId {
    type Error = PrepError;

    fn try_from(id: i32) -> Result<Self, Self::Error> {
        usize::try_from(id)
            .ok()
            .and_then(|i| ProfileId::ALL.get(i).copied())
            .ok_or(PrepError::InvalidProfileId { id })
    }
}

impl FromStr for ProfileId {
    type Err = PrepError;

    /// Accepts the conventional name or the resource name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProfileId::ALL
            .iter()
            .copied()
            .find(|id| id.name().eq_ignore_ascii_case(s))
            .or_else(|| {
                ProfileId::ALL
                    .iter()
                    .copied()
                    .find(|id| id.resource_name().eq_ignore_ascii_case(s))
            })
            .ok_or(PrepError::InvalidProfileId { id: -1 })
    }
}

// === Profile ===

/// A parsed, immutable profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    id: Option<ProfileId>,
    trie: PropertyTrie,
    mapping: MappingData,
    data_version: UnicodeVersion,
    corrections_version: UnicodeVersion,
    normalize: bool,
    check_bidi: bool,
}

impl Profile {
    /// Parse and validate a binary resource.
    ///
    /// `runtime_version` is the Unicode version of the normalization data in
    /// use; a normalizing profile built for a newer version is rejected.
    pub fn from_bytes(bytes: &[u8], runtime_version: UnicodeVersion) -> Result<Self, PrepError> {
        let parts = resource::parse_resource(bytes)?;
        let options = parts.options();
        let normalize = options & NORMALIZATION_ON != 0;
        let check_bidi = options & CHECK_BIDI_ON != 0;
        let corrections_version = parts.corrections_version();

        // The corrections version is informational; only the table data must
        // not be newer than the normalizer.
        if normalize && parts.data_version > runtime_version {
            return Err(PrepError::ProfileVersionUnsupported {
                profile: None,
                data_version: parts.data_version,
                runtime_version,
            });
        }

        let layout = parts.mapping_layout();
        let mapping = MappingData::new(parts.mapping, layout)?;
        let trie = PropertyTrie::from_bytes(parts.trie)?;

        // Decoding every stored entry once keeps lookups free of bounds failures.
        for &word in trie.stored_entries() {
            entry::decode(word, &mapping)?;
        }

        trace!(
            blocks = trie.block_count(),
            mapping_units = mapping.units().len(),
            normalize,
            check_bidi,
            "validated profile tables"
        );
        Ok(Profile {
            id: None,
            trie,
            mapping,
            data_version: parts.data_version,
            corrections_version,
            normalize,
            check_bidi,
        })
    }

    /// Parse the resource of a known profile.
    pub fn load(
        id: ProfileId,
        bytes: &[u8],
        runtime_version: UnicodeVersion,
    ) -> Result<Self, PrepError> {
        let mut profile = Self::from_bytes(bytes, runtime_version).map_err(|e| e.in_profile(id))?;
        profile.id = Some(id);
        Ok(profile)
    }

    pub fn id(&self) -> Option<ProfileId> {
        self.id
    }

    /// Raw trie entry for a code point.
    #[inline]
    pub fn entry(&self, cp: u32) -> u16 {
        self.trie.get(cp)
    }

    /// Classification of a code point.
    #[inline]
    pub fn classify(&self, cp: u32) -> Result<Classification, PrepError> {
        entry::decode(self.trie.get(cp), &self.mapping)
    }

    pub fn mapping_data(&self) -> &MappingData {
        &self.mapping
    }

    /// Unicode version the tables were built from.
    pub fn data_version(&self) -> UnicodeVersion {
        self.data_version
    }

    /// Last Unicode version covered by normalization corrections.
    pub fn corrections_version(&self) -> UnicodeVersion {
        self.corrections_version
    }

    pub fn normalize(&self) -> bool {
        self.normalize
    }

    pub fn check_bidi(&self) -> bool {
        self.check_bidi
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ProfileBuilder;
    use crate::entry::Mapping;

    #[test]
    fn ids_round_trip_through_integers() {
        for (i, id) in ProfileId::ALL.iter().enumerate() {
            assert_eq!(ProfileId::try_from(i as i32).unwrap(), *id);
            assert_eq!(*id as i32, i as i32);
        }
        assert_eq!(
            ProfileId::try_from(14),
            Err(PrepError::InvalidProfileId { id: 14 })
        );
        assert!(ProfileId::try_from(-1).is_err());
    }

    #[test]
    fn ids_parse_from_names() {
        assert_eq!("saslprep".parse::<ProfileId>().unwrap(), ProfileId::Rfc4013Saslprep);
        assert_eq!("RFC3920NODE".parse::<ProfileId>().unwrap(), ProfileId::Rfc3920Nodeprep);
        assert_eq!("rfc3491".parse::<ProfileId>().unwrap(), ProfileId::Rfc3491Nameprep);
        assert!("nonesuch".parse::<ProfileId>().is_err());
        assert_eq!(ProfileId::Rfc4518LdapCi.to_string(), "ldap_ci");
    }

    #[test]
    fn shared_resources() {
        assert_eq!(
            ProfileId::Rfc3530Nfs4CisPrep.resource_name(),
            ProfileId::Rfc3491Nameprep.resource_name()
        );
    }

    #[test]
    fn parse_built_profile() {
        let bytes = ProfileBuilder::new()
            .normalize(true)
            .check_bidi(true)
            .map(0x41, &[0x61])
            .prohibit(0x20)
            .unassigned(0x0221, 0x0221)
            .to_bytes()
            .unwrap();
        let profile = Profile::load(ProfileId::Rfc3491Nameprep, &bytes, UnicodeVersion::new(15, 0, 0))
            .unwrap();
        assert_eq!(profile.id(), Some(ProfileId::Rfc3491Nameprep));
        assert!(profile.normalize());
        assert!(profile.check_bidi());
        assert_eq!(profile.data_version(), UnicodeVersion::V3_2_0);
        assert_eq!(
            profile.classify(0x41).unwrap(),
            Classification::Mapped {
                mapping: Mapping::Delta(-32),
                prohibited: false
            }
        );
        assert_eq!(profile.classify(0x20).unwrap(), Classification::Prohibited);
        assert_eq!(profile.classify(0x0221).unwrap(), Classification::Unassigned);
        assert_eq!(profile.classify(0x42).unwrap(), Classification::PassThrough);
        assert_eq!(profile.entry(0x42), 0);
    }

    #[test]
    fn newer_data_than_runtime_is_unsupported() {
        let bytes = ProfileBuilder::new()
            .normalize(true)
            .data_version(UnicodeVersion::new(9, 0, 0))
            .to_bytes()
            .unwrap();
        let err = Profile::load(ProfileId::Rfc4013Saslprep, &bytes, UnicodeVersion::new(8, 0, 0))
            .unwrap_err();
        assert_eq!(
            err,
            PrepError::ProfileVersionUnsupported {
                profile: Some(ProfileId::Rfc4013Saslprep),
                data_version: UnicodeVersion::new(9, 0, 0),
                runtime_version: UnicodeVersion::new(8, 0, 0),
            }
        );
    }

    #[test]
    fn version_is_ignored_without_normalization() {
        let bytes = ProfileBuilder::new()
            .data_version(UnicodeVersion::new(9, 0, 0))
            .to_bytes()
            .unwrap();
        assert!(Profile::from_bytes(&bytes, UnicodeVersion::new(8, 0, 0)).is_ok());
    }

    #[test]
    fn newer_corrections_version_still_loads() {
        let bytes = ProfileBuilder::new()
            .normalize(true)
            .corrections_version(UnicodeVersion::new(9, 0, 0))
            .to_bytes()
            .unwrap();
        let profile = Profile::from_bytes(&bytes, UnicodeVersion::new(8, 0, 0)).unwrap();
        assert_eq!(profile.corrections_version(), UnicodeVersion::new(9, 0, 0));
        assert_eq!(profile.data_version(), UnicodeVersion::V3_2_0);
    }

    #[test]
    fn out_of_bounds_reference_rejects_profile() {
        let mut bytes = ProfileBuilder::new()
            .map(0x41, &[0x61, 0x62])
            .to_bytes()
            .unwrap();
        // Shrink the declared mapping data so the stored reference dangles.
        let parts = resource::parse_resource(&bytes).unwrap();
        let mut indexes = parts.indexes;
        let trie = parts.trie.to_vec();
        indexes[resource::INDEX_MAPPING_DATA_SIZE] = 0;
        indexes[resource::TWO_UNITS_MAPPING_INDEX_START] = 0;
        indexes[resource::THREE_UNITS_MAPPING_INDEX_START] = 0;
        indexes[resource::FOUR_UNITS_MAPPING_INDEX_START] = 0;
        bytes = resource::write_resource(parts.data_version, &indexes, &trie, &[]);
        let err = Profile::load(ProfileId::Rfc4505Trace, &bytes, UnicodeVersion::new(15, 0, 0))
            .unwrap_err();
        assert!(matches!(
            err,
            PrepError::MalformedTableData {
                profile: Some(ProfileId::Rfc4505Trace),
                ..
            }
        ));
    }
}
