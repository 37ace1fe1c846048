pub mod retry;
pub mod schema;
pub mod store;

pub use retry::{with_retry, RetryPolicy, TransactionGuard};
pub use schema::ensure_output_schema;
pub use store::{ScopeFilter, SqliteTileStore, TileRecord};
