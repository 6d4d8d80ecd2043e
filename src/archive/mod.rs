//! Archive handling.
//!
//! Recognizes archives by name ([`kind`]) and extracts them through a fixed
//! backend priority ([`backend`]): the native ZIP decoder for `.zip`, the 7z
//! binary for everything else, and decoder crates (sevenz-rust2, unrar, tar)
//! as the fallback when 7z is missing or fails.

pub mod backend;
pub mod kind;
pub mod native;
pub mod sevenzip;
pub mod zipfile;

pub use backend::{Backend, Extractor};
pub use kind::{ArchiveCandidate, ArchiveKind};
