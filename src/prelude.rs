// prelude.rs - Convenient re-exports for the idiomatic API.
//
//! # Prelude
//!
//! ```
//! use sprep::prelude::*;
//!
//! let out = prepare("\u{2168}", ProfileId::Rfc4013Saslprep, PrepOptions::DEFAULT).unwrap();
//! assert_eq!(out, "IX");
//! ```

pub use crate::api::{get_profile, prepare, StringPrep, StringPrepBuilder};
pub use crate::error::PrepError;
pub use crate::profile::{Profile, ProfileId};
pub use crate::registry::{CachePolicy, ProfileRegistry, RegistryConfig};
pub use crate::sprep::PrepOptions;
