// Cache module for local filesystem caching.
// Stores GitHub API responses so repeated audits avoid refetching.

pub mod paths;
pub mod store;

pub use paths::CacheKey;
pub use store::{CacheStore, CachedData};
