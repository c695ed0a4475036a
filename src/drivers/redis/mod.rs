//! Redis key-value driver.
//!
//! Rows are stored one key per cell and the header as a schema entry, so a
//! table's columns can be recovered without the caller naming them.

mod connection;

pub use connection::{KeyValueTranslator, RedisStore};
