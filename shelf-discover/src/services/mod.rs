pub mod books_client;
pub mod books_decoder;
pub mod http_transport;
pub mod memory_cache;
pub mod search_repository;

pub use books_client::GoogleBooksClient;
pub use books_decoder::{decode_search_results, decode_volume_detail, DecodeError};
pub use http_transport::{HttpTransport, RemoteError, ReqwestTransport};
pub use memory_cache::MemoryCache;
pub use search_repository::{BookSearchRepository, SearchSettings};
