//! Convenient imports for common functionality.

pub use crate::bindings::{Argument, Bindings};
pub use crate::context::ExecutionContext;
pub use crate::database::{
    ConfigureOption, Database, MEMORY, all_callback, get_callback, run_callback,
};
pub use crate::driver::Driver;
pub use crate::error::DriverError;
pub use crate::flags::{OPEN_CREATE, OPEN_DEFAULT, OPEN_READONLY, OPEN_READWRITE, OpenOptions};
pub use crate::registry::ConnectionRegistry;
pub use crate::rows::{Row, Value, ValueExt};
pub use crate::scheduler::Scheduler;
pub use crate::values::BindValue;
