// rfc_vectors.rs - Examples published with the profile RFCs.

use sprep::error::PrepError;
use sprep::{prepare, PrepOptions, ProfileId};

fn sasl(input: &str) -> Result<String, PrepError> {
    prepare(input, ProfileId::Rfc4013Saslprep, PrepOptions::DEFAULT)
}

fn nameprep(input: &str) -> Result<String, PrepError> {
    prepare(input, ProfileId::Rfc3491Nameprep, PrepOptions::DEFAULT)
}

// === RFC 4013 section 3 ===

#[test]
fn saslprep_soft_hyphen_mapped_to_nothing() {
    assert_eq!(sasl("I\u{00AD}X").unwrap(), "IX");
}

#[test]
fn saslprep_no_transformation() {
    assert_eq!(sasl("user").unwrap(), "user");
}

#[test]
fn saslprep_case_preserved() {
    assert_eq!(sasl("USER").unwrap(), "USER");
}

#[test]
fn saslprep_output_is_nfkc() {
    assert_eq!(sasl("\u{00AA}").unwrap(), "a");
    assert_eq!(sasl("\u{2168}").unwrap(), "IX");
}

#[test]
fn saslprep_prohibited_character() {
    assert_eq!(
        sasl("\u{0007}").unwrap_err(),
        PrepError::ProhibitedCodepoint {
            index: 0,
            code_point: 0x0007
        }
    );
}

#[test]
fn saslprep_bidirectional_check() {
    assert!(matches!(
        sasl("\u{0627}\u{0031}").unwrap_err(),
        PrepError::BidiRuleViolation { .. }
    ));
    assert_eq!(sasl("\u{0627}\u{0031}\u{0628}").unwrap(), "\u{0627}1\u{0628}");
}

#[test]
fn saslprep_non_ascii_space_becomes_space() {
    assert_eq!(sasl("pass\u{00A0}word").unwrap(), "pass word");
    assert_eq!(sasl("a\u{200B}b").unwrap(), "a b");
}

// === RFC 3491 ===

#[test]
fn nameprep_maps_and_deletes() {
    assert_eq!(nameprep("\u{00AD}ExAmPlE").unwrap(), "example");
    assert_eq!(nameprep("\u{FB01}").unwrap(), "fi");
    assert_eq!(nameprep("\u{0130}").unwrap(), "i\u{0307}");
}

#[test]
fn nameprep_prohibits_non_ascii_space() {
    assert_eq!(
        nameprep("a\u{1680}b").unwrap_err(),
        PrepError::ProhibitedCodepoint {
            index: 1,
            code_point: 0x1680
        }
    );
    // NFKC turns the ideographic space into an ASCII space first.
    assert_eq!(nameprep("a\u{3000}b").unwrap(), "a b");
}

#[test]
fn nameprep_keeps_ascii_space() {
    assert_eq!(nameprep("a b").unwrap(), "a b");
}

#[test]
fn nameprep_normalizes_with_unicode_3_2_data() {
    // U+2C7C is unassigned in Unicode 3.2; later data folds it to 'j'.
    assert_eq!(
        nameprep("\u{2C7C}").unwrap_err(),
        PrepError::UnassignedCodepoint {
            index: 0,
            code_point: 0x2C7C
        }
    );
    let allowed = prepare(
        "x\u{2C7C}\u{FB01}",
        ProfileId::Rfc3491Nameprep,
        PrepOptions::ALLOW_UNASSIGNED,
    );
    assert_eq!(allowed.unwrap(), "x\u{2C7C}fi");
}

#[test]
fn nameprep_rtl_label() {
    assert_eq!(nameprep("\u{05D0}\u{05D1}").unwrap(), "\u{05D0}\u{05D1}");
    assert!(nameprep("\u{05D0}1").is_err());
}

// === RFC 3920 ===

#[test]
fn xmpp_nodeprep_and_resourceprep() {
    let node = prepare("Romeo", ProfileId::Rfc3920Nodeprep, PrepOptions::DEFAULT).unwrap();
    assert_eq!(node, "romeo");
    assert!(prepare("a b", ProfileId::Rfc3920Nodeprep, PrepOptions::DEFAULT).is_err());
    let res = prepare("Home Office", ProfileId::Rfc3920Resourceprep, PrepOptions::DEFAULT).unwrap();
    assert_eq!(res, "Home Office");
}

// === RFC 4505 ===

#[test]
fn trace_keeps_text_unnormalized() {
    let out = prepare("\u{FB01}", ProfileId::Rfc4505Trace, PrepOptions::DEFAULT).unwrap();
    assert_eq!(out, "\u{FB01}");
    assert!(prepare("a\u{0000}", ProfileId::Rfc4505Trace, PrepOptions::DEFAULT).is_err());
}

// === RFC 4518 ===

#[test]
fn ldap_maps_controls_and_spaces() {
    let out = prepare("a\u{0009}b\u{200B}c", ProfileId::Rfc4518Ldap, PrepOptions::DEFAULT).unwrap();
    assert_eq!(out, "a bc");
    assert!(prepare("\u{FFFD}", ProfileId::Rfc4518Ldap, PrepOptions::DEFAULT).is_err());
    let ci = prepare("ABC", ProfileId::Rfc4518LdapCi, PrepOptions::DEFAULT).unwrap();
    assert_eq!(ci, "abc");
}

// === RFC 3530 ===

#[test]
fn nfs4_case_sensitivity() {
    let cs = prepare("File", ProfileId::Rfc3530Nfs4CsPrep, PrepOptions::DEFAULT).unwrap();
    assert_eq!(cs, "File");
    let ci = prepare("File", ProfileId::Rfc3530Nfs4CsPrepCi, PrepOptions::DEFAULT).unwrap();
    assert_eq!(ci, "file");
    let cis = prepare("File", ProfileId::Rfc3530Nfs4CisPrep, PrepOptions::DEFAULT).unwrap();
    assert_eq!(cis, "file");
}
