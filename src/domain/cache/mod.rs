pub mod clock;
pub mod error;
pub mod key;
pub mod model;
pub mod service;

pub use clock::{Clock, SystemClock};
pub use error::{CacheError, FetchError};
pub use key::CacheKeyBuilder;
pub use model::{CacheEntry, CacheOptions, FetchRequest, FetchResponse, MaxAge};
pub use service::{CachedFetch, DEFAULT_MAX_AGE};
