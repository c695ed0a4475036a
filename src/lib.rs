//! Tabular read/write over Redis, PostgreSQL and MongoDB.
//!
//! One connection string selects the backend; the same pair of operations
//! writes a header-plus-rows batch and reads filtered, limited rows back.
//!
//! ```ignore
//! use dfstore::{BackendSession, Comparator, FilterPredicate, StoreConfig, TabularBatch};
//!
//! let mut session = BackendSession::connect(StoreConfig::new("document")).await?;
//! session.write_batch(&TabularBatch::from_records(records)?).await?;
//!
//! let filters = vec![
//!     FilterPredicate::column("title"),
//!     FilterPredicate::new("artist", Comparator::Eq, "John Coltrane"),
//!     FilterPredicate::new("price", Comparator::Gt, "60"),
//! ];
//! let result = session.read_records(&filters, 20).await?;
//! session.close().await?;
//! ```

pub mod config;
pub mod drivers;
pub mod error;
pub mod session;
pub mod traits;

pub use config::StoreConfig;
pub use error::{Error, Result};
pub use session::{BackendSession, SessionState};
pub use traits::{
    BackendKind, Comparator, ConnectionDescriptor, FilterPredicate, ResultSet, SslMode,
    TabularBatch,
};
