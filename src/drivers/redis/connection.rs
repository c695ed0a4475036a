//! Redis driver implementation.
//!
//! The synchronous Redis client is wrapped with `smol::unblock` so that no
//! executor thread blocks on the network.
//!
//! Layout of a table `t` with columns `a,b`:
//!
//! ```text
//! schema:t   -> "a,b"
//! t:1:a      -> value of column a in data row 1
//! t:1:b      -> value of column b in data row 1
//! ```

use async_trait::async_trait;
use redis::{Connection, ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use crate::error::{Error, Result};
use crate::traits::{
    apply_in_memory, selected_columns, BackendDriver, BackendKind, ConnectionDescriptor,
    FilterPredicate, PredicateTranslator, ResultSet, TabularBatch, Translation,
};

/// Key holding the comma-joined column list of a table
pub(crate) fn schema_key(table: &str) -> String {
    format!("schema:{}", table)
}

/// Key holding one cell
pub(crate) fn cell_key(table: &str, row: usize, column: &str) -> String {
    format!("{}:{}:{}", table, row, column)
}

/// Redis cannot filter values server-side, so every active predicate is
/// evaluated after the rows are assembled.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyValueTranslator;

impl PredicateTranslator for KeyValueTranslator {
    type Fragment = ();

    fn translate(&self, filters: &[FilterPredicate]) -> Translation<()> {
        Translation::InMemory(filters.iter().filter(|f| f.is_active()).cloned().collect())
    }
}

type SharedConnection = Arc<Mutex<Option<Connection>>>;

/// Redis key-value store.
pub struct RedisStore {
    connection: SharedConnection,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("connection", &"<redis::Connection>")
            .finish()
    }
}

impl RedisStore {
    /// Connect to the server named by `descriptor` and verify it with `PING`.
    pub async fn open(descriptor: &ConnectionDescriptor) -> Result<Self> {
        let info = Self::connection_info(descriptor)?;

        let connection = smol::unblock(move || -> redis::RedisResult<Connection> {
            let client = redis::Client::open(info)?;
            let mut connection = client.get_connection()?;
            redis::cmd("PING").query::<String>(&mut connection)?;
            Ok(connection)
        })
        .await
        .map_err(|e| Error::connection(BackendKind::KeyValue, e))?;

        Ok(Self {
            connection: Arc::new(Mutex::new(Some(connection))),
        })
    }

    /// Build client connection info. The database index comes from the
    /// descriptor's database name; only the password is sent for auth.
    fn connection_info(descriptor: &ConnectionDescriptor) -> Result<ConnectionInfo> {
        let db = descriptor.database_name.parse::<i64>().map_err(|_| {
            Error::parse(
                &descriptor.to_string(),
                format!("database index `{}` is not an integer", descriptor.database_name),
            )
        })?;

        Ok(ConnectionInfo {
            addr: ConnectionAddr::Tcp(descriptor.host.clone(), descriptor.port),
            redis: RedisConnectionInfo {
                db,
                password: (!descriptor.password.is_empty()).then(|| descriptor.password.clone()),
                ..Default::default()
            },
        })
    }

    /// Schema entry plus the flattened `key, value, key, value, ...` MSET arguments.
    fn write_entries(table: &str, batch: &TabularBatch) -> Result<((String, String), Vec<String>)> {
        if let Some(bad) = batch.header().iter().find(|c| c.contains(',')) {
            return Err(Error::InvalidBatch(format!(
                "column `{}` contains `,`, which the schema entry uses as separator",
                bad
            )));
        }

        let schema = (schema_key(table), batch.header().join(","));

        let mut args = Vec::with_capacity(batch.len() * batch.header().len() * 2);
        for (row, values) in batch.numbered_rows() {
            for (column, value) in batch.header().iter().zip(values) {
                args.push(cell_key(table, row, column));
                args.push(value.clone());
            }
        }
        Ok((schema, args))
    }

    fn lock(connection: &SharedConnection) -> Result<MutexGuard<'_, Option<Connection>>> {
        connection.lock().map_err(|_| {
            Error::KeyValue(redis::RedisError::from((
                redis::ErrorKind::ClientError,
                "connection lock poisoned",
            )))
        })
    }

    fn closed() -> Error {
        Error::KeyValue(redis::RedisError::from((
            redis::ErrorKind::ClientError,
            "connection already released",
        )))
    }
}

#[async_trait]
impl BackendDriver for RedisStore {
    async fn ping(&self) -> Result<()> {
        let connection = self.connection.clone();
        smol::unblock(move || -> Result<()> {
            let mut guard = Self::lock(&connection)?;
            let con = guard.as_mut().ok_or_else(Self::closed)?;
            redis::cmd("PING").query::<String>(con)?;
            Ok(())
        })
        .await
    }

    async fn write_batch(&self, table: &str, batch: &TabularBatch) -> Result<()> {
        let ((key, columns), args) = Self::write_entries(table, batch)?;
        debug!(
            table,
            rows = batch.len(),
            entries = args.len() / 2,
            "writing key-value batch"
        );

        let connection = self.connection.clone();
        smol::unblock(move || -> Result<()> {
            let mut guard = Self::lock(&connection)?;
            let con = guard.as_mut().ok_or_else(Self::closed)?;

            let mut pipe = redis::pipe();
            pipe.atomic()
                .cmd("SET")
                .arg(&key)
                .arg(&columns)
                .ignore();
            if !args.is_empty() {
                pipe.cmd("MSET").arg(&args).ignore();
            }
            pipe.query::<()>(con)?;
            Ok(())
        })
        .await
    }

    async fn read_records(
        &self,
        table: &str,
        filters: &[FilterPredicate],
        limit: usize,
    ) -> Result<ResultSet> {
        let predicates = match KeyValueTranslator.translate(filters) {
            Translation::InMemory(predicates) => predicates,
            Translation::Split { residual, .. } => residual,
            Translation::Native(()) => Vec::new(),
        };

        let table = table.to_string();
        let filters = filters.to_vec();
        let connection = self.connection.clone();

        let mut result = smol::unblock(move || -> Result<ResultSet> {
            let mut guard = Self::lock(&connection)?;
            let con = guard.as_mut().ok_or_else(Self::closed)?;

            let columns = if filters.is_empty() {
                let stored: Option<String> =
                    redis::cmd("GET").arg(schema_key(&table)).query(con)?;
                let stored = stored.ok_or_else(|| Error::MissingSchema {
                    kind: BackendKind::KeyValue,
                    table: table.clone(),
                })?;
                stored.split(',').map(str::to_string).collect()
            } else {
                selected_columns(&filters)
            };

            // Rows are addressed by position; nothing marks the end of the
            // data, so indices past it come back as all-NULL rows.
            let mut result = ResultSet::new(columns);
            let mut index = 1;
            while result.len() < limit {
                let keys: Vec<String> = result
                    .columns
                    .iter()
                    .map(|column| cell_key(&table, index, column))
                    .collect();
                let values: Vec<Option<String>> = redis::cmd("MGET").arg(&keys).query(con)?;
                result.push_row(values);
                index += 1;
            }
            Ok(result)
        })
        .await?;

        let fetched = result.len();
        apply_in_memory(&mut result, &predicates);
        debug!(fetched, kept = result.len(), "filtered key-value rows in memory");

        Ok(result)
    }

    async fn close(&mut self) -> Result<()> {
        let mut guard = Self::lock(&self.connection)?;
        guard.take().ok_or_else(Self::closed)?;
        Ok(())
    }
}
