//! MongoDB document driver.

mod connection;
mod filter;

pub use connection::MongoStore;
pub use filter::DocumentTranslator;
