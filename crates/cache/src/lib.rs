//! # Lexiscope Cache
//!
//! Caching layers used by the knowledge engine:
//! - [`LruTtlCache`]: generic bounded LRU cache with lazy TTL expiry
//! - [`CachedSearch`]: vector search memoized through an `LruTtlCache`
//! - [`ResponseCache`]: trigger → pre-written response lookup

pub mod lru_ttl;
pub mod response;
pub mod search;

pub use lru_ttl::{CacheEntry, CacheStats, LruTtlCache};
pub use response::{
    CachedResponse, MatchKind, ResponseCache, ResponseCacheStats, ResponseHit, Trigger,
};
pub use search::CachedSearch;
