//! Content-addressed audio cache for narratone.
//!
//! Two pieces:
//!
//! - [`key`] — deterministic derivation of short, filesystem-safe cache
//!   tokens from the structured preview inputs (voice, text, style, and —
//!   for processed audio — the full effects chain).
//! - [`store`] — the filesystem-backed key→(audio bytes, metadata) store
//!   with existence checks, read, write, enumerate, and evict operations.
//!
//! Keys are content-derived, so identical inputs always address identical
//! expected bytes: concurrent same-key writes are an accepted, idempotent
//! race and the store needs no locking.

pub mod key;
pub mod store;

pub use key::{CacheKey, DerivedKey, derive_processed_key, derive_synthesis_key};
pub use store::{AudioCache, CacheEntryMeta, CacheEntrySummary, CacheError};
