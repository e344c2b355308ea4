// rules.rs - Rule sets of the standard profiles, built from RFC 3454 tables.

use crate::builder::ProfileBuilder;
use crate::profile::ProfileId;
use crate::unicode::rfc3454::*;

const SPACE: u32 = 0x0020;

// RFC 4518 section 2.2.
const LDAP_MAP_TO_NOTHING: &[(u32, u32)] = &[
    (0x0000, 0x0008),
    (0x000E, 0x001F),
    (0x007F, 0x0084),
    (0x0086, 0x009F),
    (0x00AD, 0x00AD),
    (0x034F, 0x034F),
    (0x06DD, 0x06DD),
    (0x070F, 0x070F),
    (0x1806, 0x1806),
    (0x180B, 0x180E),
    (0x200B, 0x200F),
    (0x202A, 0x202E),
    (0x2060, 0x2063),
    (0x206A, 0x206F),
    (0xFE00, 0xFE0F),
    (0xFEFF, 0xFEFF),
    (0xFFF9, 0xFFFC),
    (0x1D173, 0x1D17A),
    (0xE0001, 0xE0001),
    (0xE0020, 0xE007F),
];

const LDAP_MAP_TO_SPACE: &[(u32, u32)] = &[
    (0x0009, 0x000D),
    (0x0085, 0x0085),
    (0x00A0, 0x00A0),
    (0x1680, 0x1680),
    (0x2000, 0x200A),
    (0x2028, 0x2029),
    (0x202F, 0x202F),
    (0x205F, 0x205F),
    (0x3000, 0x3000),
];

// RFC 3722 section 6.1.
const ISCSI_PROHIBITED_ASCII: &[(u32, u32)] = &[
    (0x0000, 0x002C),
    (0x002F, 0x002F),
    (0x003B, 0x0040),
    (0x005B, 0x0060),
    (0x007B, 0x007F),
    (0x3002, 0x3002),
];

// RFC 3920 appendix A.5.
const NODEPREP_PROHIBITED_ASCII: &[u32] = &[0x22, 0x26, 0x27, 0x2F, 0x3A, 0x3C, 0x3E, 0x40];

/// Rules of the resource backing `id`.
pub fn builder_for(id: ProfileId) -> ProfileBuilder {
    match id.resource_name() {
        "rfc3491" => nameprep(),
        "rfc3530cs" | "rfc3530mixp" => nfs4(false),
        "rfc3530csci" => nfs4(true),
        "rfc3722" => iscsi(),
        "rfc3920node" => nodeprep(),
        "rfc3920res" => resourceprep(),
        "rfc4011" => mib(),
        "rfc4013" => saslprep(),
        "rfc4505" => trace_tokens(),
        "rfc4518" => ldap(false),
        _ => ldap(true),
    }
}

fn base() -> ProfileBuilder {
    ProfileBuilder::new().unassigned_ranges(A_1)
}

fn prohibit_all(builder: ProfileBuilder, tables: &[&[(u32, u32)]]) -> ProfileBuilder {
    tables.iter().fold(builder, |b, table| b.prohibit_ranges(table))
}

fn nameprep() -> ProfileBuilder {
    let builder = base()
        .map_to_nothing_ranges(B_1)
        .map_table(B_2)
        .normalize(true)
        .check_bidi(true)
        .prohibit_ranges(C_1_2)
        .prohibit_ranges(C_2_2);
    builder.prohibit_common()
}

fn nfs4(case_insensitive: bool) -> ProfileBuilder {
    let mut builder = base().map_to_nothing_ranges(B_1);
    if case_insensitive {
        builder = builder.map_table(B_2);
    }
    builder.normalize(true).check_bidi(true).prohibit_common()
}

fn iscsi() -> ProfileBuilder {
    let builder = base()
        .map_to_nothing_ranges(B_1)
        .map_table(B_2)
        .normalize(true)
        .check_bidi(true)
        .prohibit_ranges(ISCSI_PROHIBITED_ASCII);
    prohibit_all(
        builder,
        &[C_1_1, C_1_2, C_2_1, C_2_2, C_3, C_4, C_5, C_6, C_7, C_8, C_9],
    )
}

fn nodeprep() -> ProfileBuilder {
    let builder = NODEPREP_PROHIBITED_ASCII
        .iter()
        .fold(nameprep(), |b, &cp| b.prohibit(cp));
    prohibit_all(builder, &[C_1_1, C_2_1])
}

fn resourceprep() -> ProfileBuilder {
    let builder = base()
        .map_to_nothing_ranges(B_1)
        .normalize(true)
        .check_bidi(true);
    prohibit_all(builder, &[C_1_2, C_2_1, C_2_2]).prohibit_common()
}

fn mib() -> ProfileBuilder {
    let builder = base().map_to_nothing_ranges(B_1).normalize(true);
    prohibit_all(builder, &[C_2_1, C_2_2]).prohibit_common()
}

fn saslprep() -> ProfileBuilder {
    let builder = base()
        .map_ranges_to(C_1_2, &[SPACE])
        .map_to_nothing_ranges(B_1)
        .normalize(true)
        .check_bidi(true);
    prohibit_all(builder, &[C_1_2, C_2_1, C_2_2]).prohibit_common()
}

fn trace_tokens() -> ProfileBuilder {
    prohibit_all(
        base().check_bidi(true),
        &[C_2_1, C_2_2, C_3, C_4, C_5, C_6, C_8, C_9],
    )
}

fn ldap(case_insensitive: bool) -> ProfileBuilder {
    let mut builder = base()
        .map_to_nothing_ranges(LDAP_MAP_TO_NOTHING)
        .map_ranges_to(LDAP_MAP_TO_SPACE, &[SPACE]);
    if case_insensitive {
        builder = builder.map_table(B_2);
    }
    prohibit_all(builder.normalize(true), &[C_3, C_4, C_5, C_8]).prohibit(0xFFFD)
}

trait ProhibitCommon {
    /// Prohibit C.3 through C.9, shared by most profiles.
    fn prohibit_common(self) -> Self;
}

impl ProhibitCommon for ProfileBuilder {
    fn prohibit_common(self) -> Self {
        prohibit_all(self, &[C_3, C_4, C_5, C_6, C_7, C_8, C_9])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Classification;
    use crate::profile::Profile;
    use crate::unicode::UnicodeVersion;

    fn load(id: ProfileId) -> Profile {
        let bytes = builder_for(id).to_bytes().unwrap();
        Profile::load(id, &bytes, UnicodeVersion::normalization()).unwrap()
    }

    #[test]
    fn every_profile_compiles() {
        for id in ProfileId::ALL {
            let profile = load(id);
            assert_eq!(profile.id(), Some(id));
            assert_eq!(profile.data_version(), UnicodeVersion::V3_2_0);
            assert_eq!(
                profile.classify(0x0221).unwrap(),
                Classification::Unassigned,
                "{}",
                id
            );
        }
    }

    #[test]
    fn options_per_profile() {
        let trace = load(ProfileId::Rfc4505Trace);
        assert!(!trace.normalize());
        assert!(trace.check_bidi());
        let ldap = load(ProfileId::Rfc4518Ldap);
        assert!(ldap.normalize());
        assert!(!ldap.check_bidi());
        assert!(!load(ProfileId::Rfc4011Mib).check_bidi());
    }

    #[test]
    fn nodeprep_prohibits_address_delimiters() {
        let node = load(ProfileId::Rfc3920Nodeprep);
        for c in "\"&'/:<>@".chars() {
            assert_eq!(node.classify(c as u32).unwrap(), Classification::Prohibited);
        }
        assert_eq!(node.classify('a' as u32).unwrap(), Classification::PassThrough);
        let res = load(ProfileId::Rfc3920Resourceprep);
        assert_eq!(res.classify('@' as u32).unwrap(), Classification::PassThrough);
    }

    #[test]
    fn iscsi_prohibits_ascii_punctuation() {
        let iscsi = load(ProfileId::Rfc3722Iscsi);
        for cp in [0x20, 0x2F, 0x3B, 0x5B, 0x7B, 0x3002] {
            assert_eq!(iscsi.classify(cp).unwrap(), Classification::Prohibited);
        }
        for c in "-.:09az".chars() {
            assert_eq!(iscsi.classify(c as u32).unwrap(), Classification::PassThrough);
        }
    }

    #[test]
    fn saslprep_spaces_map_before_deletion() {
        let sasl = load(ProfileId::Rfc4013Saslprep);
        // U+200B is in both C.1.2 and B.1; the space mapping is applied first.
        let class = sasl.classify(0x200B).unwrap();
        assert!(matches!(class, Classification::Mapped { .. }));
        assert_eq!(sasl.classify(0x00AD).unwrap(), Classification::Deleted);
    }

    #[test]
    fn ldap_zero_width_space_is_deleted() {
        let ldap = load(ProfileId::Rfc4518Ldap);
        assert_eq!(ldap.classify(0x200B).unwrap(), Classification::Deleted);
        assert!(matches!(
            ldap.classify(0x3000).unwrap(),
            Classification::Mapped { .. }
        ));
        assert_eq!(ldap.classify(0xFFFD).unwrap(), Classification::Prohibited);
        assert_eq!(ldap.classify('A' as u32).unwrap(), Classification::PassThrough);
        assert!(matches!(
            load(ProfileId::Rfc4518LdapCi).classify('A' as u32).unwrap(),
            Classification::Mapped { .. }
        ));
    }
}
