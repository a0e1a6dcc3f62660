pub mod cache_store;
pub mod memory_cache_store;
pub mod remote_tts_repository;
pub mod sql_cache_store;
pub mod tts_repository;

pub use cache_store::CacheStore;
pub use memory_cache_store::MemoryCacheStore;
pub use remote_tts_repository::RemoteTtsRepository;
pub use sql_cache_store::SqlCacheStore;
pub use tts_repository::TtsRepository;
