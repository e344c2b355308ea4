// api_test.rs - Integration tests for the idiomatic Rust API.

use std::sync::Arc;

use sprep::api::{StringPrep, StringPrepBuilder};
use sprep::builder::ProfileBuilder;
use sprep::error::PrepError;
use sprep::prelude::*;
use sprep::unicode::UnicodeVersion;

// === prepare ===

#[test]
fn nameprep_case_folds() {
    let out = prepare("CAFE", ProfileId::Rfc3491Nameprep, PrepOptions::DEFAULT).unwrap();
    assert_eq!(out, "cafe");
}

#[test]
fn nameprep_sharp_s_folds_to_ss() {
    let out = prepare("Stra\u{00DF}e", ProfileId::Rfc3491Nameprep, PrepOptions::DEFAULT).unwrap();
    assert_eq!(out, "strasse");
}

#[test]
fn empty_input_is_empty_output() {
    for id in ProfileId::ALL {
        assert_eq!(prepare("", id, PrepOptions::DEFAULT).unwrap(), "", "{}", id);
    }
}

#[test]
fn unassigned_rejected_by_default() {
    let err = prepare("ab\u{0221}", ProfileId::Rfc3491Nameprep, PrepOptions::DEFAULT).unwrap_err();
    assert_eq!(
        err,
        PrepError::UnassignedCodepoint {
            index: 2,
            code_point: 0x0221
        }
    );
    assert_eq!(err.code(), sprep::error::SPREP_ERR_UNASSIGNED_CODEPOINT);
}

#[test]
fn unassigned_allowed_with_option() {
    let out = prepare(
        "ab\u{0221}",
        ProfileId::Rfc3491Nameprep,
        PrepOptions::ALLOW_UNASSIGNED,
    )
    .unwrap();
    assert_eq!(out, "ab\u{0221}");
}

// Case folding differs per profile: LDAP folds sharp s, resourceprep keeps case.
#[test]
fn capital_a_then_sharp_s_under_ldap() {
    let out = prepare("A\u{00DF}", ProfileId::Rfc4518LdapCi, PrepOptions::ALLOW_UNASSIGNED).unwrap();
    assert_eq!(out, "ass");
    let out = prepare("A\u{00DF}", ProfileId::Rfc3920Resourceprep, PrepOptions::ALLOW_UNASSIGNED)
        .unwrap();
    assert_eq!(out, "A\u{00DF}");
}

#[test]
fn capital_a_mapped_sharp_s_untouched() {
    let profile = ProfileBuilder::new()
        .normalize(true)
        .check_bidi(true)
        .map(0x41, &[0x61])
        .build(UnicodeVersion::normalization())
        .unwrap();
    let prep = StringPrep::from_profile(Arc::new(profile), PrepOptions::ALLOW_UNASSIGNED);
    assert_eq!(prep.prepare("A\u{00DF}").unwrap(), "a\u{00DF}");
}

#[test]
fn rtl_then_ltr_violates_bidi() {
    let err = prepare("\u{05D0}a", ProfileId::Rfc3491Nameprep, PrepOptions::DEFAULT).unwrap_err();
    assert_eq!(err, PrepError::BidiRuleViolation { index: 1 });
}

#[test]
fn profiles_without_bidi_accept_mixed_text() {
    let out = prepare("\u{05D0}a", ProfileId::Rfc4518Ldap, PrepOptions::DEFAULT).unwrap();
    assert_eq!(out, "\u{05D0}a");
}

// === StringPrep ===

#[test]
fn handle_reuses_profile() {
    let prep = StringPrep::new(ProfileId::Rfc4013Saslprep).unwrap();
    let again = get_profile(ProfileId::Rfc4013Saslprep).unwrap();
    assert!(Arc::ptr_eq(prep.profile(), &again));
    assert_eq!(prep.prepare("user").unwrap(), "user");
    assert_eq!(
        prep.prepare_chars(&['\u{00AA}']).unwrap(),
        vec!['a']
    );
}

#[test]
fn builder_with_private_registry() {
    let registry = ProfileRegistry::new(RegistryConfig::default(), sprep::resource::BuiltinSource);
    let prep: StringPrep = StringPrepBuilder::new(ProfileId::Rfc3722Iscsi)
        .registry(&registry)
        .build()
        .unwrap();
    assert_eq!(
        prep.prepare("iqn.2001-04.com.Example:Storage").unwrap(),
        "iqn.2001-04.com.example:storage"
    );
    assert!(matches!(
        prep.prepare("iqn with space"),
        Err(PrepError::ProhibitedCodepoint {
            index: 3,
            code_point: 0x20
        })
    ));
    assert_eq!(registry.cached_count(), 1);
}

#[test]
fn profile_ids_parse() {
    let id: ProfileId = "nodeprep".parse().unwrap();
    assert_eq!(id, ProfileId::Rfc3920Nodeprep);
    assert_eq!(ProfileId::try_from(10).unwrap(), ProfileId::Rfc4013Saslprep);
    assert!(matches!(
        ProfileId::try_from(42),
        Err(PrepError::InvalidProfileId { id: 42 })
    ));
}

#[test]
fn errors_display_context() {
    let err = prepare("a\u{0007}", ProfileId::Rfc4013Saslprep, PrepOptions::DEFAULT).unwrap_err();
    assert_eq!(err.to_string(), "prohibited code point U+0007 at index 1");
}
