//! Backend-agnostic traits and types.
//!
//! This module defines the vocabulary shared by every backend:
//!
//! - **Types** (`types`): Backend kinds, connection descriptors, SSL modes
//! - **Rows** (`row`): Write batches and read result sets
//! - **Filters** (`filter`): Column predicates, comparator semantics, translation
//! - **Driver** (`driver`): The trait each backend implements
//!
//! # Example
//!
//! ```ignore
//! use dfstore::traits::{ConnectionDescriptor, FilterPredicate, Comparator};
//!
//! let descriptor = ConnectionDescriptor::parse("redis://:secret@localhost:6379/0/albums")?;
//! let filters = vec![
//!     FilterPredicate::column("title"),
//!     FilterPredicate::new("price", Comparator::Gt, "60"),
//! ];
//! ```

pub mod driver;
pub mod filter;
pub mod row;
pub mod types;

pub use driver::BackendDriver;

pub use filter::{
    apply_in_memory, parse_number, row_matches, selected_columns, Comparator, FilterPredicate,
    PredicateTranslator, Translation,
};

pub use row::{ResultSet, TabularBatch, NULL_DISPLAY};

pub use types::{BackendKind, ConnectionDescriptor, SslMode};
