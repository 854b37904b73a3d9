//! Fingerprint store (component C4): the SQL-backed `hash -> [(song_id,
//! offset)]` index, its row models, bounded connection pool, and CRUD
//! operations.

pub mod connector;
pub mod models;
pub mod pool;
pub mod schema;

pub use connector::Store;
