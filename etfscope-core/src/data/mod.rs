//! Dataset ingestion, cleaning, caching and loading

pub mod cache;
pub mod clean;
pub mod fallback;
pub mod http;
pub mod ingest;
pub mod loader;
pub mod provider;
pub mod schema;
pub mod summary;

pub use cache::{is_fresh, Cache, CacheEntry, CacheStatus, FileCache, MemoryCache};
pub use clean::{clean_csv, CleanedDataset, CleaningReport, Domain};
pub use http::HttpProvider;
pub use ingest::{parse_csv, RawTable};
pub use loader::{DatasetLoader, LoadOptions, Loaded};
pub use provider::{DataError, DataOrigin, DataProvider, DatasetSource, SourceProvider};
pub use schema::{Column, ColumnMap};
pub use summary::{parse_summary, SummaryKpis};
