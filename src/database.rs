//! The exposed legacy driver surface.
//!
//! `Database` mirrors the callback-based contract the ORM dialect layer was
//! written against: `run`/`all`/`get`/`exec`/`close` are callback-last,
//! return the handle for chaining, and deliver results error-first through
//! a callback that receives an explicit [`ExecutionContext`]. All engine
//! work completes synchronously inside the call; only the callbacks are
//! deferred, through the [`Scheduler`].

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::bindings::{self, Argument};
use crate::context::ExecutionContext;
use crate::dispatch;
use crate::engine::EngineHandle;
use crate::error::DriverError;
use crate::flags::{OPEN_DEFAULT, OpenOptions};
use crate::rows::Row;
use crate::scheduler::Scheduler;

/// Path sentinel for an anonymous in-memory database.
pub const MEMORY: &str = ":memory:";

// Lifecycle callbacks take the same context parameter as statement
// callbacks; theirs carries no run-info, only the SQL text when one exists.
pub type OpenCallback = Box<dyn FnOnce(ExecutionContext, Result<(), DriverError>)>;
pub type RunCallback = Box<dyn FnOnce(ExecutionContext, Result<(), DriverError>)>;
pub type AllCallback = Box<dyn FnOnce(ExecutionContext, Result<Vec<Row>, DriverError>)>;
pub type GetCallback = Box<dyn FnOnce(ExecutionContext, Result<Option<Row>, DriverError>)>;
pub type ExecCallback = Box<dyn FnOnce(ExecutionContext, Result<(), DriverError>)>;
pub type CloseCallback = Box<dyn FnOnce(ExecutionContext, Result<(), DriverError>)>;
type ErrorHook = Box<dyn FnMut(DriverError)>;

/// Box a `run` completion callback into an argument-tail element.
pub fn run_callback(
    f: impl FnOnce(ExecutionContext, Result<(), DriverError>) + 'static,
) -> Argument<RunCallback> {
    Argument::Callback(Box::new(f))
}

/// Box an `all` completion callback into an argument-tail element.
pub fn all_callback(
    f: impl FnOnce(ExecutionContext, Result<Vec<Row>, DriverError>) + 'static,
) -> Argument<AllCallback> {
    Argument::Callback(Box::new(f))
}

/// Box a `get` completion callback into an argument-tail element.
pub fn get_callback(
    f: impl FnOnce(ExecutionContext, Result<Option<Row>, DriverError>) + 'static,
) -> Argument<GetCallback> {
    Argument::Callback(Box::new(f))
}

/// Connection configuration applied after open.
#[derive(Debug, Clone, Copy)]
pub enum ConfigureOption {
    /// Engine busy-handler timeout
    BusyTimeout(Duration),
}

struct DatabaseInner {
    engine: RefCell<Option<EngineHandle>>,
    target: String,
    error_hook: RefCell<Option<ErrorHook>>,
    // set by the registry for cached handles; runs on close
    evict: RefCell<Option<Box<dyn Fn()>>>,
}

/// One open database handle. Clones share the same connection.
#[derive(Clone)]
pub struct Database {
    inner: Rc<DatabaseInner>,
    scheduler: Rc<Scheduler>,
}

impl Database {
    /// Open a database, uncached.
    ///
    /// The engine open completes synchronously; the callback fires on a
    /// later scheduler tick with the outcome. On failure the returned
    /// handle is unusable and every subsequent call reports
    /// `DriverError::DatabaseClosed`.
    #[must_use]
    pub fn open(
        scheduler: &Rc<Scheduler>,
        target: &str,
        mode: Option<i32>,
        callback: Option<OpenCallback>,
    ) -> Database {
        let opts = OpenOptions::decode(mode.unwrap_or(OPEN_DEFAULT));
        match Self::open_engine(target, opts) {
            Ok(engine) => {
                debug!(path = target, "database open");
                let db = Self::from_engine(scheduler.clone(), target, Some(engine));
                if let Some(cb) = callback {
                    scheduler.defer(move || cb(ExecutionContext::default(), Ok(())));
                }
                db
            }
            Err(err) => {
                let db = Self::from_engine(scheduler.clone(), target, None);
                match callback {
                    Some(cb) => scheduler.defer(move || cb(ExecutionContext::default(), Err(err))),
                    None => warn!(path = target, error = %err, "database open failed"),
                }
                db
            }
        }
    }

    pub(crate) fn open_engine(target: &str, opts: OpenOptions) -> Result<EngineHandle, DriverError> {
        if target == MEMORY {
            EngineHandle::open_memory()
        } else {
            EngineHandle::open(Path::new(target), opts)
        }
    }

    pub(crate) fn from_engine(
        scheduler: Rc<Scheduler>,
        target: &str,
        engine: Option<EngineHandle>,
    ) -> Database {
        Database {
            inner: Rc::new(DatabaseInner {
                engine: RefCell::new(engine),
                target: target.to_string(),
                error_hook: RefCell::new(None),
                evict: RefCell::new(None),
            }),
            scheduler,
        }
    }

    pub(crate) fn set_evict_hook(&self, hook: impl Fn() + 'static) {
        *self.inner.evict.borrow_mut() = Some(Box::new(hook));
    }

    /// The path or memory sentinel this handle was opened with.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.inner.target
    }

    /// Whether the underlying engine connection is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.inner.engine.borrow().is_some()
    }

    /// Whether two handles share one underlying connection.
    #[must_use]
    pub fn shares_connection(&self, other: &Database) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Execute a statement through the write path.
    ///
    /// The argument tail may carry positional values, a named map, explicit
    /// `Undefined` placeholders, and a trailing callback, in the legacy
    /// call shapes.
    pub fn run(&self, sql: &str, args: Vec<Argument<RunCallback>>) -> &Self {
        match bindings::normalize(args) {
            Ok((raw, callback)) => {
                let prepared = raw.coerce_booleans().strip_named_prefixes();
                let outcome = self
                    .with_engine(|engine| dispatch::execute_run(engine, sql, &prepared))
                    .map(|context| ((), context));
                self.finish(sql, outcome, callback);
            }
            Err(err) => self.report_error(err),
        }
        self
    }

    /// Execute a read returning every row; write-only statements return an
    /// empty sequence with the write's run-info.
    pub fn all(&self, sql: &str, args: Vec<Argument<AllCallback>>) -> &Self {
        match bindings::normalize(args) {
            Ok((raw, callback)) => {
                let prepared = raw.coerce_booleans().strip_named_prefixes();
                let outcome =
                    self.with_engine(|engine| dispatch::execute_all(engine, sql, &prepared));
                self.finish(sql, outcome, callback);
            }
            Err(err) => self.report_error(err),
        }
        self
    }

    /// Execute a read returning the first row; write-only statements return
    /// no row with the write's run-info.
    pub fn get(&self, sql: &str, args: Vec<Argument<GetCallback>>) -> &Self {
        match bindings::normalize(args) {
            Ok((raw, callback)) => {
                let prepared = raw.coerce_booleans().strip_named_prefixes();
                let outcome =
                    self.with_engine(|engine| dispatch::execute_get(engine, sql, &prepared));
                self.finish(sql, outcome, callback);
            }
            Err(err) => self.report_error(err),
        }
        self
    }

    /// Execute a batch of semicolon-separated statements without bindings.
    pub fn exec(&self, sql: &str, callback: Option<ExecCallback>) -> &Self {
        let outcome = self.with_engine(|engine| engine.exec(sql));
        self.deliver_plain(ExecutionContext::empty(sql), outcome, callback);
        self
    }

    /// Close the connection.
    ///
    /// A cached handle is evicted from its registry even when the engine
    /// close fails, so a broken handle is never served again.
    pub fn close(&self, callback: Option<CloseCallback>) -> &Self {
        if let Some(evict) = self.inner.evict.borrow_mut().take() {
            evict();
        }
        let engine = self.inner.engine.borrow_mut().take();
        let outcome = match engine {
            Some(engine) => {
                debug!(path = %self.inner.target, "database close");
                engine.close()
            }
            None => Err(DriverError::DatabaseClosed),
        };
        self.deliver_plain(ExecutionContext::default(), outcome, callback);
        self
    }

    /// Run a batch body. The engine is synchronous, so this is ordering
    /// pass-through; an error from the body is re-raised on a deferred
    /// tick, never thrown synchronously.
    pub fn serialize<F>(&self, body: F) -> &Self
    where
        F: FnOnce(&Database) -> Result<(), DriverError>,
    {
        if let Err(err) = body(self) {
            self.report_error(err);
        }
        self
    }

    /// Identical to [`Database::serialize`]: the engine never interleaves
    /// operations, so parallel scheduling has nothing to reorder.
    pub fn parallelize<F>(&self, body: F) -> &Self
    where
        F: FnOnce(&Database) -> Result<(), DriverError>,
    {
        if let Err(err) = body(self) {
            self.report_error(err);
        }
        self
    }

    /// Apply a connection option.
    pub fn configure(&self, option: ConfigureOption) -> &Self {
        let outcome = self.with_engine(|engine| match option {
            ConfigureOption::BusyTimeout(timeout) => engine.busy_timeout(timeout),
        });
        if let Err(err) = outcome {
            self.report_error(err);
        }
        self
    }

    /// Install a hook for errors that have no callback to land on
    /// (serialize-block failures, fire-and-forget calls). Without a hook
    /// such errors are logged and dropped.
    pub fn on_error(&self, hook: impl FnMut(DriverError) + 'static) -> &Self {
        *self.inner.error_hook.borrow_mut() = Some(Box::new(hook));
        self
    }

    fn with_engine<T>(
        &self,
        f: impl FnOnce(&EngineHandle) -> Result<T, DriverError>,
    ) -> Result<T, DriverError> {
        let guard = self.inner.engine.borrow();
        match guard.as_ref() {
            Some(engine) => f(engine),
            None => Err(DriverError::DatabaseClosed),
        }
    }

    fn finish<T: 'static>(
        &self,
        sql: &str,
        outcome: Result<(T, ExecutionContext), DriverError>,
        callback: Option<Box<dyn FnOnce(ExecutionContext, Result<T, DriverError>)>>,
    ) {
        match (outcome, callback) {
            (Ok((value, context)), Some(cb)) => {
                self.scheduler.defer(move || cb(context, Ok(value)));
            }
            (Ok(_), None) => {}
            (Err(err), Some(cb)) => {
                let context = ExecutionContext::empty(sql);
                self.scheduler.defer(move || cb(context, Err(err)));
            }
            (Err(err), None) => self.report_error(err),
        }
    }

    fn deliver_plain(
        &self,
        context: ExecutionContext,
        outcome: Result<(), DriverError>,
        callback: Option<Box<dyn FnOnce(ExecutionContext, Result<(), DriverError>)>>,
    ) {
        match (outcome, callback) {
            (outcome, Some(cb)) => self.scheduler.defer(move || cb(context, outcome)),
            (Err(err), None) => self.report_error(err),
            (Ok(()), None) => {}
        }
    }

    // Deliver an error that has no callback, one tick later.
    fn report_error(&self, err: DriverError) {
        let inner = self.inner.clone();
        self.scheduler.defer(move || {
            let mut hook = inner.error_hook.borrow_mut();
            match hook.as_mut() {
                Some(hook) => hook(err),
                None => error!(path = %inner.target, error = %err, "unhandled driver error"),
            }
        });
    }
}
