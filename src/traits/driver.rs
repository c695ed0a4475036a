//! The per-backend driver trait.
//!
//! Each storage backend implements `BackendDriver`; the session holds one
//! driver behind a closed enum and forwards every operation to it.

use async_trait::async_trait;

use super::filter::FilterPredicate;
use super::row::{ResultSet, TabularBatch};
use crate::error::Result;

/// Operations every backend must provide once it is connected.
///
/// Drivers receive batches that have already been validated and a table
/// name that is known to be non-empty.
#[async_trait]
pub trait BackendDriver: Send + Sync {
    /// Verify the backend is reachable.
    async fn ping(&self) -> Result<()>;

    /// Write every data row of `batch` into `table`.
    async fn write_batch(&self, table: &str, batch: &TabularBatch) -> Result<()>;

    /// Read up to `limit` rows of the columns named by `filters` from `table`.
    ///
    /// `filters` is never empty when this is called on a backend without a
    /// schema registry.
    async fn read_records(
        &self,
        table: &str,
        filters: &[FilterPredicate],
        limit: usize,
    ) -> Result<ResultSet>;

    /// Release the native client.
    async fn close(&mut self) -> Result<()>;
}
