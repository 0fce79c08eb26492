//! [`DataSource`](crate::traits::DataSource) implementations.

mod memory;
#[cfg(feature = "mysql")]
mod mysql;

pub use memory::{ExecutedStatement, MemoryDataSource};
#[cfg(feature = "mysql")]
pub use mysql::MySqlDataSource;
