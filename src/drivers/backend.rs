//! The closed set of backends a session can hold.

use async_trait::async_trait;

use super::mongodb::MongoStore;
use super::postgres::PostgresStore;
use super::redis::RedisStore;
use crate::error::Result;
use crate::traits::{BackendDriver, FilterPredicate, ResultSet, TabularBatch};

/// A connected backend. Exactly one native client lives in each variant.
#[derive(Debug)]
pub enum Backend {
    KeyValue(RedisStore),
    Relational(PostgresStore),
    Document(MongoStore),
}

impl Backend {
    fn driver(&self) -> &dyn BackendDriver {
        match self {
            Self::KeyValue(store) => store,
            Self::Relational(store) => store,
            Self::Document(store) => store,
        }
    }

    fn driver_mut(&mut self) -> &mut dyn BackendDriver {
        match self {
            Self::KeyValue(store) => store,
            Self::Relational(store) => store,
            Self::Document(store) => store,
        }
    }
}

#[async_trait]
impl BackendDriver for Backend {
    async fn ping(&self) -> Result<()> {
        self.driver().ping().await
    }

    async fn write_batch(&self, table: &str, batch: &TabularBatch) -> Result<()> {
        self.driver().write_batch(table, batch).await
    }

    async fn read_records(
        &self,
        table: &str,
        filters: &[FilterPredicate],
        limit: usize,
    ) -> Result<ResultSet> {
        self.driver().read_records(table, filters, limit).await
    }

    async fn close(&mut self) -> Result<()> {
        self.driver_mut().close().await
    }
}
