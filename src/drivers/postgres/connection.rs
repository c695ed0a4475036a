//! PostgreSQL driver implementation using SQLx's `PgPool`.

use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use tracing::{debug, warn};

use super::query::{
    create_registry_sql, create_table_sql, insert_sql, register_sql, select_sql,
    RelationalTranslator, WhereClause,
};
use super::types::PgValueConverter;
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::traits::{
    row_matches, selected_columns, BackendDriver, BackendKind, ConnectionDescriptor,
    FilterPredicate, PredicateTranslator, ResultSet, SslMode, TabularBatch, Translation,
};

/// PostgreSQL relational store.
pub struct PostgresStore {
    pool: PgPool,
}

impl std::fmt::Debug for PostgresStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresStore")
            .field("pool", &"<PgPool>")
            .finish()
    }
}

impl PostgresStore {
    /// Open a pool against the server named by `descriptor` and run `SELECT 1`.
    pub async fn open(descriptor: &ConnectionDescriptor, config: &StoreConfig) -> Result<Self> {
        let options = Self::build_connect_options(descriptor)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect_with(options)
            .await
            .map_err(|e| Error::connection(BackendKind::Relational, e))?;

        sqlx::query("SELECT 1")
            .fetch_one(&pool)
            .await
            .map_err(|e| Error::connection(BackendKind::Relational, e))?;

        Ok(Self { pool })
    }

    /// Build PgConnectOptions from the descriptor. `sslmode` is read from
    /// the raw options and defaults to `disable`.
    fn build_connect_options(descriptor: &ConnectionDescriptor) -> Result<PgConnectOptions> {
        let ssl_mode = match descriptor.option("sslmode") {
            Some(value) => SslMode::from_db_str(&value).ok_or_else(|| {
                Error::parse(
                    &descriptor.to_string(),
                    format!("unknown sslmode `{}`", value),
                )
            })?,
            None => SslMode::default(),
        };

        let mut options = PgConnectOptions::new()
            .host(&descriptor.host)
            .port(descriptor.port)
            .ssl_mode(PgValueConverter::map_ssl_mode(&ssl_mode));

        if !descriptor.user.is_empty() {
            options = options.username(&descriptor.user);
        }
        if !descriptor.password.is_empty() {
            options = options.password(&descriptor.password);
        }
        if !descriptor.database_name.is_empty() {
            options = options.database(&descriptor.database_name);
        }
        Ok(options)
    }

    /// Ensure the registry and target table exist and record the column list.
    async fn prepare_table(&self, table: &str, header: &[String]) -> Result<()> {
        sqlx::query(&create_registry_sql())
            .execute(&self.pool)
            .await?;
        sqlx::query(&create_table_sql(table, header))
            .execute(&self.pool)
            .await?;
        sqlx::query(&register_sql())
            .bind(table)
            .bind(header.join(","))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl BackendDriver for PostgresStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    /// Rows are inserted one statement at a time outside a transaction. A
    /// failed row does not stop the rest; only the last failure is returned.
    async fn write_batch(&self, table: &str, batch: &TabularBatch) -> Result<()> {
        self.prepare_table(table, batch.header()).await?;

        let sql = insert_sql(table, batch.header());
        let mut inserted = 0usize;
        let mut last_error = None;

        for (row, values) in batch.numbered_rows() {
            let mut query = sqlx::query(&sql);
            for value in values {
                query = query.bind((!value.is_empty()).then_some(value.as_str()));
            }

            match query.execute(&self.pool).await {
                Ok(_) => inserted += 1,
                Err(e) => {
                    warn!(table, row, error = %e, "row insert failed, continuing");
                    last_error = Some(e);
                }
            }
        }

        debug!(table, inserted, failed = batch.len() - inserted, "relational batch written");

        match last_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    async fn read_records(
        &self,
        table: &str,
        filters: &[FilterPredicate],
        limit: usize,
    ) -> Result<ResultSet> {
        if filters.is_empty() {
            return Err(Error::MissingSchema {
                kind: BackendKind::Relational,
                table: table.to_string(),
            });
        }

        let (clause, residual) = match RelationalTranslator.translate(filters) {
            Translation::Native(clause) => (clause, Vec::new()),
            Translation::Split { native, residual } => (native, residual),
            Translation::InMemory(predicates) => (WhereClause::default(), predicates),
        };

        let columns = selected_columns(filters);
        let sql = select_sql(table, &columns, &clause);
        debug!(sql = %sql, binds = clause.binds.len(), residual = residual.len(), "relational read");

        let mut query = sqlx::query(&sql);
        for value in &clause.binds {
            query = query.bind(value.as_str());
        }

        let mut result = ResultSet::new(columns);
        if limit == 0 {
            return Ok(result);
        }

        // Residual predicates are checked per row, so the limit counts
        // matching rows only.
        let mut rows = query.fetch(&self.pool);
        while result.len() < limit {
            let Some(row) = rows.try_next().await? else {
                break;
            };
            let cells = PgValueConverter::convert_row(&row);
            if row_matches(&result.columns, &cells, &residual) {
                result.push_row(cells);
            }
        }
        Ok(result)
    }

    async fn close(&mut self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_connect_options() {
        let d = ConnectionDescriptor::parse("postgres://pguser:password@db:5433/dfstore1/albums")
            .unwrap();
        let options = PostgresStore::build_connect_options(&d).unwrap();

        assert_eq!(options.get_host(), "db");
        assert_eq!(options.get_port(), 5433);
        assert_eq!(options.get_username(), "pguser");
        assert_eq!(options.get_database(), Some("dfstore1"));
    }

    #[test]
    fn test_sslmode_option() {
        let d = ConnectionDescriptor::parse(
            "postgres://pguser:password@db:5432/dfstore1/albums?sslmode=require",
        )
        .unwrap();
        assert!(PostgresStore::build_connect_options(&d).is_ok());

        let d = ConnectionDescriptor::parse(
            "postgres://pguser:password@db:5432/dfstore1/albums?sslmode=sometimes",
        )
        .unwrap();
        assert!(matches!(
            PostgresStore::build_connect_options(&d),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn test_open_unreachable_is_connection_error() {
        // Port 1 on loopback refuses immediately.
        let d = ConnectionDescriptor::parse("postgres://u:p@127.0.0.1:1/db/t").unwrap();
        let config = StoreConfig::default();
        let result = smol::block_on(PostgresStore::open(&d, &config));
        assert!(matches!(
            result,
            Err(Error::Connection {
                kind: BackendKind::Relational,
                ..
            })
        ));
    }
}
