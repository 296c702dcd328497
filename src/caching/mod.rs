//! # Caching System Module
//!
//! In-memory, TTL-bounded caching for the identity gateway. All cache state
//! lives in this process and can be lost and rebuilt transparently from the
//! directory service; nothing here is persisted.
//!
//! ## Architecture
//! 1. **TtlCache**: typed TTL store with a tag index for bulk invalidation
//! 2. **SingleFlight**: per-key de-duplication of in-flight computations
//! 3. **keys**: cache-key derivation, including the one-way credential hash

pub mod keys;
pub mod single_flight;
pub mod store;

pub use single_flight::SingleFlight;
pub use store::{CacheStats, TtlCache};
