// api.rs - Idiomatic entry points for string preparation.
//
// Rust-native types: StringPrep, StringPrepBuilder, plus the free functions
// `prepare` and `get_profile` backed by the global registry.

use std::fmt;
use std::sync::Arc;

use crate::error::PrepError;
use crate::profile::{Profile, ProfileId};
use crate::registry::ProfileRegistry;
use crate::sprep::{self, PrepOptions};
use crate::unicode::{BidiClassifier, Normalizer, NFKC, UNICODE_BIDI};

/// Prepare `input` with a standard profile from the global registry.
///
/// # Examples
///
/// ```
/// use sprep::{prepare, PrepOptions, ProfileId};
///
/// let out = prepare("I\u{00AD}X", ProfileId::Rfc4013Saslprep, PrepOptions::DEFAULT).unwrap();
/// assert_eq!(out, "IX");
/// ```
pub fn prepare(input: &str, id: ProfileId, options: PrepOptions) -> Result<String, PrepError> {
    let profile = get_profile(id)?;
    let chars: Vec<char> = input.chars().collect();
    let out = sprep::prepare_chars(&profile, &chars, options)?;
    Ok(out.into_iter().collect())
}

/// Fetch a standard profile from the global registry.
pub fn get_profile(id: ProfileId) -> Result<Arc<Profile>, PrepError> {
    ProfileRegistry::global().get_profile(id)
}

// === StringPrep ===

/// A profile bound to its preparation options.
///
/// # Examples
///
/// ```
/// use sprep::api::StringPrep;
/// use sprep::ProfileId;
///
/// let nameprep = StringPrep::new(ProfileId::Rfc3491Nameprep).unwrap();
/// assert_eq!(nameprep.prepare("CAFE").unwrap(), "cafe");
/// ```
#[derive(Clone)]
pub struct StringPrep {
    profile: Arc<Profile>,
    options: PrepOptions,
    normalizer: &'static dyn Normalizer,
    classifier: &'static dyn BidiClassifier,
}

impl StringPrep {
    /// Bind a standard profile with default options.
    pub fn new(id: ProfileId) -> Result<Self, PrepError> {
        StringPrepBuilder::new(id).build()
    }

    /// Create a [`StringPrepBuilder`] for fine-grained control.
    pub fn builder(id: ProfileId) -> StringPrepBuilder<'static> {
        StringPrepBuilder::new(id)
    }

    /// Bind an already loaded profile.
    pub fn from_profile(profile: Arc<Profile>, options: PrepOptions) -> Self {
        StringPrep {
            profile,
            options,
            normalizer: &NFKC,
            classifier: &UNICODE_BIDI,
        }
    }

    pub fn prepare(&self, input: &str) -> Result<String, PrepError> {
        let chars: Vec<char> = input.chars().collect();
        Ok(self.prepare_chars(&chars)?.into_iter().collect())
    }

    pub fn prepare_chars(&self, input: &[char]) -> Result<Vec<char>, PrepError> {
        sprep::prepare_with(
            &self.profile,
            input,
            self.options,
            self.normalizer,
            self.classifier,
        )
    }

    pub fn profile(&self) -> &Arc<Profile> {
        &self.profile
    }

    pub fn options(&self) -> PrepOptions {
        self.options
    }
}

impl fmt::Debug for StringPrep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringPrep")
            .field("profile", &self.profile.id())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

// === StringPrepBuilder ===

/// Builder for a [`StringPrep`].
///
/// # Examples
///
/// ```
/// use sprep::api::StringPrep;
/// use sprep::ProfileId;
///
/// let sasl = StringPrep::builder(ProfileId::Rfc4013Saslprep)
///     .allow_unassigned(true)
///     .build()
///     .unwrap();
/// assert_eq!(sasl.prepare("\u{0221}").unwrap(), "\u{0221}");
/// ```
pub struct StringPrepBuilder<'r> {
    id: ProfileId,
    options: PrepOptions,
    registry: &'r ProfileRegistry,
    normalizer: &'static dyn Normalizer,
    classifier: &'static dyn BidiClassifier,
}

impl StringPrepBuilder<'static> {
    pub fn new(id: ProfileId) -> Self {
        StringPrepBuilder {
            id,
            options: PrepOptions::DEFAULT,
            registry: ProfileRegistry::global(),
            normalizer: &NFKC,
            classifier: &UNICODE_BIDI,
        }
    }
}

impl<'r> StringPrepBuilder<'r> {
    /// Copy unassigned code points through instead of failing.
    pub fn allow_unassigned(mut self, yes: bool) -> Self {
        self.options.set(PrepOptions::ALLOW_UNASSIGNED, yes);
        self
    }

    /// Replace the option set wholesale.
    pub fn options(mut self, options: PrepOptions) -> Self {
        self.options = options;
        self
    }

    /// Load the profile from `registry` instead of the global one.
    pub fn registry<'s>(self, registry: &'s ProfileRegistry) -> StringPrepBuilder<'s> {
        StringPrepBuilder {
            id: self.id,
            options: self.options,
            registry,
            normalizer: self.normalizer,
            classifier: self.classifier,
        }
    }

    /// Normalization service for profiles that normalize (default: NFKC).
    pub fn normalizer(mut self, normalizer: &'static dyn Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Bidi classification for profiles that check bidi.
    pub fn bidi_classifier(mut self, classifier: &'static dyn BidiClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Load the profile and bind it.
    pub fn build(self) -> Result<StringPrep, PrepError> {
        let profile = self.registry.get_profile(self.id)?;
        Ok(StringPrep {
            profile,
            options: self.options,
            normalizer: self.normalizer,
            classifier: self.classifier,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryConfig;
    use crate::resource::BuiltinSource;
    use crate::unicode::BidiDirection;

    struct AllLtr;

    static ALL_LTR: AllLtr = AllLtr;

    impl BidiClassifier for AllLtr {
        fn direction(&self, _c: char) -> BidiDirection {
            BidiDirection::LeftToRight
        }
    }

    #[test]
    fn builder_uses_given_registry() {
        let registry = ProfileRegistry::new(RegistryConfig::default(), BuiltinSource);
        let prep = StringPrep::builder(ProfileId::Rfc4505Trace)
            .registry(&registry)
            .build()
            .unwrap();
        assert_eq!(registry.cached_count(), 1);
        assert_eq!(prep.profile().id(), Some(ProfileId::Rfc4505Trace));
        assert_eq!(prep.options(), PrepOptions::DEFAULT);
    }

    #[test]
    fn allow_unassigned_toggles() {
        let b = StringPrep::builder(ProfileId::Rfc3491Nameprep).allow_unassigned(true);
        assert!(b.options.contains(PrepOptions::ALLOW_UNASSIGNED));
        let b = b.allow_unassigned(false);
        assert!(b.options.is_empty());
    }

    #[test]
    fn custom_classifier_is_used() {
        // Hebrew classified as LTR no longer violates the bidi rule.
        let prep = StringPrep::builder(ProfileId::Rfc3491Nameprep)
            .bidi_classifier(&ALL_LTR)
            .build()
            .unwrap();
        assert!(prep.prepare("\u{05D0}a").is_ok());
        let strict = StringPrep::new(ProfileId::Rfc3491Nameprep).unwrap();
        assert!(strict.prepare("\u{05D0}a").is_err());
    }

    #[test]
    fn from_profile_binds_options() {
        let profile = get_profile(ProfileId::Rfc4013Saslprep).unwrap();
        let prep = StringPrep::from_profile(profile, PrepOptions::ALLOW_UNASSIGNED);
        assert_eq!(prep.prepare("a\u{0221}").unwrap(), "a\u{0221}");
    }
}
