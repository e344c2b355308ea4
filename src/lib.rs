//! # sprep
//!
//! Pure-Rust stringprep ([RFC 3454](https://www.rfc-editor.org/rfc/rfc3454))
//! with compact trie-backed profiles.
//!
//! Every profile is a binary resource holding a code point trie and a
//! mapping data buffer. Preparation runs four stages: map, normalize (NFKC),
//! prohibit, and the bidi check.
//!
//! ## Quick Start
//!
//! ```rust
//! use sprep::prelude::*;
//!
//! let out = prepare("CAF\u{00C9}", ProfileId::Rfc3491Nameprep, PrepOptions::DEFAULT).unwrap();
//! assert_eq!(out, "caf\u{00E9}");
//!
//! let err = prepare("a\u{0007}", ProfileId::Rfc4013Saslprep, PrepOptions::DEFAULT).unwrap_err();
//! assert_eq!(err.index(), Some(1));
//! ```
//!
//! For a reusable handle, use [`StringPrep`](api::StringPrep):
//!
//! ```rust
//! use sprep::prelude::*;
//!
//! let node = StringPrep::builder(ProfileId::Rfc3920Nodeprep)
//!     .allow_unassigned(true)
//!     .build()
//!     .unwrap();
//! assert_eq!(node.prepare("Juliet").unwrap(), "juliet");
//! assert!(node.prepare("juliet@example").is_err());
//! ```
//!
//! ## Module Structure
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`rle`] | Run-length codec for 32-, 16- and 8-bit arrays |
//! | [`trie`] | Two-stage code point trie |
//! | [`entry`] | Trie entry decoding and mapping data |
//! | [`resource`] | Binary profile resources and their sources |
//! | [`profile`] | Profile ids and parsed profiles |
//! | [`builder`] | Compiles rule tables into resources |
//! | [`rules`] | Rule sets of the standard profiles |
//! | [`registry`] | Cache of parsed profiles |
//! | [`sprep`] | The preparation pipeline |
//! | [`unicode`] | Normalization, bidi classes, RFC 3454 tables |

pub mod api;
pub mod builder;
pub mod entry;
pub mod error;
pub mod prelude;
pub mod profile;
pub mod registry;
pub mod resource;
pub mod rle;
pub mod rules;
pub mod sprep;
pub mod trie;
pub mod unicode;

pub use api::{get_profile, prepare};
pub use error::PrepError;
pub use profile::{Profile, ProfileId};
pub use sprep::{prepare_chars, prepare_with, PrepOptions};
