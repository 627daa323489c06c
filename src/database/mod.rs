pub mod connection;
pub mod error;
#[cfg(test)]
pub(crate) mod memory;
pub mod operations;
pub mod store;

pub use connection::{create_ssl_connector, with_connection};
pub use error::DatabaseError;
pub use operations::PgStore;
pub use store::{NodeRow, SampleStore};
