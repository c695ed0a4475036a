//! Backend session lifecycle.
//!
//! A [`BackendSession`] owns at most one connected backend and moves through
//! `Disconnected -> Connected -> Closed`. Reads and writes are only accepted
//! while connected.

use std::future::Future;

use tracing::instrument::WithSubscriber;
use tracing::{debug, info, instrument, Dispatch};

use crate::config::StoreConfig;
use crate::drivers::{Backend, BackendFactory};
use crate::error::{Error, Result};
use crate::traits::{
    BackendDriver, BackendKind, ConnectionDescriptor, FilterPredicate, ResultSet, TabularBatch,
};

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
    Closed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connected => write!(f, "connected"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Run `fut` with the injected logger as its default subscriber, if any.
async fn with_logger<F: Future>(logger: Option<Dispatch>, fut: F) -> F::Output {
    match logger {
        Some(dispatch) => fut.with_subscriber(dispatch).await,
        None => fut.await,
    }
}

/// A connection to one backend, addressed by a [`ConnectionDescriptor`].
///
/// # Example
///
/// ```ignore
/// use dfstore::{BackendSession, FilterPredicate, StoreConfig, TabularBatch};
///
/// let mut session = BackendSession::connect(StoreConfig::new("memory")).await?;
/// session.write_batch(&batch).await?;
/// let rows = session.read_records(&[FilterPredicate::column("title")], 10).await?;
/// session.close().await?;
/// ```
#[derive(Debug)]
pub struct BackendSession {
    descriptor: ConnectionDescriptor,
    config: StoreConfig,
    state: SessionState,
    backend: Option<Backend>,
}

impl BackendSession {
    /// Create a disconnected session. Nothing is contacted until [`open`](Self::open).
    pub fn new(descriptor: ConnectionDescriptor, config: StoreConfig) -> Self {
        Self {
            descriptor,
            config,
            state: SessionState::Disconnected,
            backend: None,
        }
    }

    /// Parse `config.connection` and open a session against it.
    pub async fn connect(config: StoreConfig) -> Result<Self> {
        let descriptor = config.descriptor()?;
        let mut session = Self::new(descriptor, config);
        session.open().await?;
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn kind(&self) -> BackendKind {
        self.descriptor.kind
    }

    pub fn descriptor(&self) -> &ConnectionDescriptor {
        &self.descriptor
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn connected(&self) -> Result<&Backend> {
        match (self.state, self.backend.as_ref()) {
            (SessionState::Connected, Some(backend)) => Ok(backend),
            (state, _) => Err(Error::NotInitialized(state)),
        }
    }

    /// Open and verify the native client.
    ///
    /// Opening a connected session does nothing; a closed session cannot be
    /// reopened.
    pub async fn open(&mut self) -> Result<()> {
        let logger = self.config.logger.clone();
        with_logger(logger, self.open_inner()).await
    }

    #[instrument(name = "open", skip_all, fields(kind = %self.descriptor.kind))]
    async fn open_inner(&mut self) -> Result<()> {
        match self.state {
            SessionState::Connected => {
                debug!("session already connected");
                return Ok(());
            }
            SessionState::Closed => return Err(Error::NotInitialized(self.state)),
            SessionState::Disconnected => {}
        }

        let backend = BackendFactory::open(&self.descriptor, &self.config).await?;
        self.backend = Some(backend);
        self.state = SessionState::Connected;
        info!(host = %self.descriptor.host, port = self.descriptor.port, "session connected");
        Ok(())
    }

    /// Check the backend is still reachable.
    pub async fn ping(&self) -> Result<()> {
        with_logger(self.config.logger.clone(), self.ping_inner()).await
    }

    #[instrument(name = "ping", skip_all, fields(kind = %self.descriptor.kind))]
    async fn ping_inner(&self) -> Result<()> {
        self.connected()?.ping().await?;
        debug!("ping ok");
        Ok(())
    }

    /// Write every data row of `batch` to the descriptor's table.
    ///
    /// The batch is validated in full before the backend is touched, so an
    /// arity mismatch never leaves a partial write behind.
    pub async fn write_batch(&self, batch: &TabularBatch) -> Result<()> {
        with_logger(self.config.logger.clone(), self.write_inner(batch)).await
    }

    #[instrument(
        name = "write_batch",
        skip_all,
        fields(kind = %self.descriptor.kind, table = %self.descriptor.table_name, rows = batch.len())
    )]
    async fn write_inner(&self, batch: &TabularBatch) -> Result<()> {
        let backend = self.connected()?;
        let table = self.descriptor.require_table()?;
        batch.validate()?;

        backend.write_batch(table, batch).await?;
        info!("batch written");
        Ok(())
    }

    /// Read up to `limit` rows from the descriptor's table.
    ///
    /// `filters` names the returned columns in order; predicates with a
    /// comparator also restrict the rows. With no filters only the key-value
    /// backend can answer, from its stored schema entry.
    pub async fn read_records(&self, filters: &[FilterPredicate], limit: usize) -> Result<ResultSet> {
        with_logger(self.config.logger.clone(), self.read_inner(filters, limit)).await
    }

    #[instrument(
        name = "read_records",
        skip_all,
        fields(kind = %self.descriptor.kind, table = %self.descriptor.table_name, filters = filters.len(), limit = limit)
    )]
    async fn read_inner(&self, filters: &[FilterPredicate], limit: usize) -> Result<ResultSet> {
        let backend = self.connected()?;
        let table = self.descriptor.require_table()?;

        if filters.is_empty() && !self.descriptor.kind.has_schema_registry() {
            return Err(Error::MissingSchema {
                kind: self.descriptor.kind,
                table: table.to_string(),
            });
        }

        let result = backend.read_records(table, filters, limit).await?;
        info!(rows = result.len(), "records read");
        Ok(result)
    }

    /// Release the native client. Closing twice is an error.
    pub async fn close(&mut self) -> Result<()> {
        let logger = self.config.logger.clone();
        with_logger(logger, self.close_inner()).await
    }

    #[instrument(name = "close", skip_all, fields(kind = %self.descriptor.kind))]
    async fn close_inner(&mut self) -> Result<()> {
        if self.state != SessionState::Connected {
            return Err(Error::NotInitialized(self.state));
        }
        let Some(mut backend) = self.backend.take() else {
            return Err(Error::NotInitialized(self.state));
        };

        self.state = SessionState::Closed;
        backend.close().await?;
        info!("session closed");
        Ok(())
    }
}
