//! Callback-first driver contract over the synchronous rusqlite engine.
//!
//! The exposed [`Database`](database::Database) surface matches the legacy
//! asynchronous driver API an ORM dialect layer consumes: callback-last
//! `run`/`all`/`get`/`exec`/`close`, error-first callbacks carrying a
//! `last_id`/`changes` execution context, additive open-flag bitmasks, a
//! path-keyed connection cache, and `serialize`/`parallelize` batching
//! hooks. Internally every engine call is synchronous; the asynchronous
//! contract is an illusion maintained by deferring every callback one
//! scheduler tick.

pub mod bindings;
pub mod context;
pub mod database;
pub mod dispatch;
pub mod driver;
pub mod engine;
pub mod error;
pub mod flags;
pub mod registry;
pub mod rows;
pub mod scheduler;
pub mod values;

pub mod prelude;

pub use database::{Database, MEMORY};
pub use driver::Driver;
pub use error::DriverError;
pub use flags::{OPEN_CREATE, OPEN_READONLY, OPEN_READWRITE};
