//! Backend driver implementations.
//!
//! - **Redis** (`redis`): key-value, one key per cell
//! - **PostgreSQL** (`postgres`): relational, via SQLx
//! - **MongoDB** (`mongodb`): document, one document per row
//!
//! Each driver implements the `BackendDriver` trait.

mod backend;
mod factory;

pub mod mongodb;
pub mod postgres;
pub mod redis;

pub use backend::Backend;
pub use factory::BackendFactory;
