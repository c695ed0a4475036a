//! Backend factory.
//!
//! Opens the driver matching a descriptor's kind and wraps it in [`Backend`].

use tracing::debug;

use super::backend::Backend;
use super::mongodb::MongoStore;
use super::postgres::PostgresStore;
use super::redis::RedisStore;
use crate::config::StoreConfig;
use crate::error::Result;
use crate::traits::{BackendKind, ConnectionDescriptor};

/// Every scheme the descriptor parser recognizes.
const KNOWN_SCHEMES: &[&str] = &["redis", "postgres", "postgresql", "mongodb", "timescale", "blob"];

/// Factory for opening backends from a parsed descriptor.
///
/// # Example
///
/// ```ignore
/// use dfstore::drivers::BackendFactory;
/// use dfstore::{ConnectionDescriptor, StoreConfig};
///
/// let descriptor = ConnectionDescriptor::parse("memory")?;
/// let backend = BackendFactory::open(&descriptor, &StoreConfig::default()).await?;
/// ```
pub struct BackendFactory;

impl BackendFactory {
    /// Open and verify the native client for `descriptor.kind`.
    ///
    /// # Errors
    ///
    /// Returns `Connection` if the client cannot be created or the backend
    /// does not answer its ping, and `Parse` for backend-specific options
    /// that are malformed.
    pub async fn open(descriptor: &ConnectionDescriptor, config: &StoreConfig) -> Result<Backend> {
        debug!(kind = %descriptor.kind, host = %descriptor.host, port = descriptor.port, "opening backend");

        let backend = match descriptor.kind {
            BackendKind::KeyValue => Backend::KeyValue(RedisStore::open(descriptor).await?),
            BackendKind::Relational => {
                Backend::Relational(PostgresStore::open(descriptor, config).await?)
            }
            BackendKind::Document => Backend::Document(MongoStore::open(descriptor).await?),
        };
        Ok(backend)
    }

    /// Check if a URL scheme has a driver implementation.
    pub fn is_supported(scheme: &str) -> bool {
        BackendKind::from_scheme(scheme).is_ok()
    }

    /// Get a list of all backend kinds with a driver.
    pub fn supported_kinds() -> Vec<BackendKind> {
        BackendKind::all()
    }

    /// Get every recognized scheme, with whether it is implemented.
    pub fn all_schemes() -> Vec<(&'static str, bool)> {
        KNOWN_SCHEMES
            .iter()
            .map(|scheme| (*scheme, Self::is_supported(scheme)))
            .collect()
    }
}
