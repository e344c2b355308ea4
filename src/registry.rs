// registry.rs - Process-wide cache of parsed profiles.
//
// A profile is parsed once per id and shared as an `Arc<Profile>`. Loading
// happens under the registry lock so concurrent first requests for the same
// id parse the resource exactly once. Published profiles are immutable, so
// preparation never takes the lock.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock, Weak};

use parking_lot::Mutex;
use tracing::debug;

use crate::error::PrepError;
use crate::profile::{Profile, ProfileId};
use crate::resource::{BuiltinSource, ProfileSource};
use crate::unicode::UnicodeVersion;

/// How the registry holds on to parsed profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Keep every loaded profile for the life of the registry.
    #[default]
    Retain,
    /// Keep profiles only while some caller holds them; reload on demand.
    Weak,
}

/// Registry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    pub cache_policy: CachePolicy,
    /// Unicode version of the normalization service profiles are checked against.
    pub runtime_unicode_version: UnicodeVersion,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            cache_policy: CachePolicy::Retain,
            runtime_unicode_version: UnicodeVersion::normalization(),
        }
    }
}

enum Slot {
    Strong(Arc<Profile>),
    Weak(Weak<Profile>),
}

impl Slot {
    fn get(&self) -> Option<Arc<Profile>> {
        match self {
            Slot::Strong(profile) => Some(Arc::clone(profile)),
            Slot::Weak(profile) => profile.upgrade(),
        }
    }
}

/// Cache of parsed profiles keyed by id.
pub struct ProfileRegistry {
    config: RegistryConfig,
    source: Box<dyn ProfileSource>,
    slots: Mutex<HashMap<ProfileId, Slot>>,
}

static GLOBAL: LazyLock<ProfileRegistry> = LazyLock::new(ProfileRegistry::default);

impl Default for ProfileRegistry {
    fn default() -> Self {
        ProfileRegistry::new(RegistryConfig::default(), BuiltinSource)
    }
}

impl fmt::Debug for ProfileRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileRegistry")
            .field("config", &self.config)
            .field("cached", &self.cached_count())
            .finish_non_exhaustive()
    }
}

impl ProfileRegistry {
    pub fn new(config: RegistryConfig, source: impl ProfileSource + 'static) -> Self {
        ProfileRegistry {
            config,
            source: Box::new(source),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// The shared registry backed by the built-in profiles.
    pub fn global() -> &'static ProfileRegistry {
        &GLOBAL
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Return the profile for `id`, loading it on first use.
    ///
    /// Failed loads are not cached; the next request tries again.
    pub fn get_profile(&self, id: ProfileId) -> Result<Arc<Profile>, PrepError> {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get(&id) {
            if let Some(profile) = slot.get() {
                return Ok(profile);
            }
            debug!(profile = %id, "cached profile was dropped, reloading");
        }

        let bytes = self.source.load(id).map_err(|e| e.in_profile(id))?;
        let profile = Arc::new(Profile::load(
            id,
            &bytes,
            self.config.runtime_unicode_version,
        )?);
        let slot = match self.config.cache_policy {
            CachePolicy::Retain => Slot::Strong(Arc::clone(&profile)),
            CachePolicy::Weak => Slot::Weak(Arc::downgrade(&profile)),
        };
        slots.insert(id, slot);
        debug!(
            profile = %id,
            resource = id.resource_name(),
            bytes = bytes.len(),
            normalize = profile.normalize(),
            check_bidi = profile.check_bidi(),
            "loaded profile"
        );
        Ok(profile)
    }

    /// Look a profile up by its numeric id.
    pub fn get_profile_by_number(&self, id: i32) -> Result<Arc<Profile>, PrepError> {
        self.get_profile(ProfileId::try_from(id)?)
    }

    /// Number of profiles currently alive in the cache.
    pub fn cached_count(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|slot| slot.get().is_some())
            .count()
    }

    /// Drop every cached profile. Callers holding a profile keep it alive.
    pub fn clear(&self) {
        let mut slots = self.slots.lock();
        if !slots.is_empty() {
            debug!(count = slots.len(), "evicting cached profiles");
        }
        slots.clear();
    }
}
