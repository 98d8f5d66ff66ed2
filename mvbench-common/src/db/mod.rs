//! Database initialization and the document store

pub mod init;
pub mod store;

pub use init::*;
pub use store::*;
