//! Adapter over the synchronous embedded engine.
//!
//! Everything above this module speaks in [`Bindings`], [`Row`], and
//! [`RunInfo`]; everything below is rusqlite. Read calls (`all`/`get`) on a
//! statement whose SQL produces no result set raise
//! [`DriverError::StatementReturnsNoRows`] *before* executing anything, so
//! the dispatcher's fallback can re-execute the same statement through the
//! write path without running it twice. Readability is decided structurally
//! from the prepared statement's column count, never from error wording.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rusqlite::{Connection, OpenFlags};

use crate::bindings::Bindings;
use crate::error::DriverError;
use crate::flags::OpenOptions;
use crate::rows::{Row, index_columns};
use crate::values::to_sqlite_value;

/// Metadata from a write execution.
#[derive(Debug, Clone, Copy)]
pub struct RunInfo {
    /// Rowid of the most recent successful insert on this connection
    pub last_insert_rowid: i64,
    /// Rows changed by the statement
    pub changes: usize,
}

/// One open engine connection.
pub struct EngineHandle {
    conn: Connection,
}

impl EngineHandle {
    /// Open an anonymous in-memory database.
    ///
    /// # Errors
    ///
    /// Returns the engine's open error unchanged.
    pub fn open_memory() -> Result<Self, DriverError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Open a database file with decoded legacy options.
    ///
    /// # Errors
    ///
    /// Returns the engine's open error (missing file with `file_must_exist`,
    /// permission, corruption) unchanged.
    pub fn open(path: &Path, opts: OpenOptions) -> Result<Self, DriverError> {
        let mut flags = OpenFlags::SQLITE_OPEN_NO_MUTEX | OpenFlags::SQLITE_OPEN_URI;
        if opts.readonly {
            flags |= OpenFlags::SQLITE_OPEN_READ_ONLY;
        } else {
            flags |= OpenFlags::SQLITE_OPEN_READ_WRITE;
            if !opts.file_must_exist {
                flags |= OpenFlags::SQLITE_OPEN_CREATE;
            }
        }
        let conn = Connection::open_with_flags(path, flags)?;
        Ok(Self { conn })
    }

    /// Prepare one statement.
    ///
    /// # Errors
    ///
    /// Returns the engine's parse error for malformed SQL.
    pub fn prepare(&self, sql: &str) -> Result<EngineStatement<'_>, DriverError> {
        let stmt = self.conn.prepare(sql)?;
        Ok(EngineStatement {
            conn: &self.conn,
            stmt,
        })
    }

    /// Execute a batch of semicolon-separated statements without bindings.
    ///
    /// # Errors
    ///
    /// Returns the engine's error for the first failing statement.
    pub fn exec(&self, sql: &str) -> Result<(), DriverError> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Set the engine's busy handler timeout.
    ///
    /// # Errors
    ///
    /// Returns the engine's error if the handler cannot be installed.
    pub fn busy_timeout(&self, timeout: Duration) -> Result<(), DriverError> {
        self.conn.busy_timeout(timeout)?;
        Ok(())
    }

    /// Release the connection.
    ///
    /// # Errors
    ///
    /// Returns the engine's close error; the handle is consumed either way.
    pub fn close(self) -> Result<(), DriverError> {
        self.conn.close().map_err(|(_, err)| DriverError::Sqlite(err))
    }
}

/// One prepared statement, alive for a single dispatch.
pub struct EngineStatement<'conn> {
    conn: &'conn Connection,
    stmt: rusqlite::Statement<'conn>,
}

impl EngineStatement<'_> {
    /// Whether the statement's SQL produces a result set.
    #[must_use]
    pub fn returns_rows(&self) -> bool {
        self.stmt.column_count() > 0
    }

    /// Execute through the write path and report run-info.
    ///
    /// Row-returning statements are stepped to completion through the query
    /// path instead, so `run` works on either statement kind.
    ///
    /// # Errors
    ///
    /// Returns binding or execution errors unchanged.
    pub fn run(&mut self, bindings: &Bindings) -> Result<RunInfo, DriverError> {
        self.bind(bindings)?;
        let changes = if self.stmt.column_count() > 0 {
            let mut rows = self.stmt.raw_query();
            while rows.next()?.is_some() {}
            usize::try_from(self.conn.changes()).unwrap_or(0)
        } else {
            self.stmt.raw_execute()?
        };
        Ok(RunInfo {
            last_insert_rowid: self.conn.last_insert_rowid(),
            changes,
        })
    }

    /// Fetch every row of a read statement.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::StatementReturnsNoRows` without executing when
    /// the statement produces no result set; other errors pass through.
    pub fn all(&mut self, bindings: &Bindings) -> Result<Vec<Row>, DriverError> {
        let (shape, mut rows) = self.query(bindings)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(read_row(&shape, row)?);
        }
        Ok(out)
    }

    /// Fetch the first row of a read statement, if any.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::StatementReturnsNoRows` without executing when
    /// the statement produces no result set; other errors pass through.
    pub fn get(&mut self, bindings: &Bindings) -> Result<Option<Row>, DriverError> {
        let (shape, mut rows) = self.query(bindings)?;
        match rows.next()? {
            Some(row) => Ok(Some(read_row(&shape, row)?)),
            None => Ok(None),
        }
    }

    fn query(&mut self, bindings: &Bindings) -> Result<(RowShape, rusqlite::Rows<'_>), DriverError> {
        if !self.returns_rows() {
            return Err(DriverError::StatementReturnsNoRows);
        }
        self.bind(bindings)?;
        let columns: Arc<Vec<String>> = Arc::new(
            self.stmt
                .column_names()
                .iter()
                .map(|name| (*name).to_string())
                .collect(),
        );
        let index = Arc::new(index_columns(&columns));
        Ok((RowShape { columns, index }, self.stmt.raw_query()))
    }

    fn bind(&mut self, bindings: &Bindings) -> Result<(), DriverError> {
        match bindings {
            Bindings::None => Ok(()),
            Bindings::Positional(items) => {
                for (i, value) in items.iter().enumerate() {
                    self.stmt.raw_bind_parameter(i + 1, to_sqlite_value(value)?)?;
                }
                Ok(())
            }
            Bindings::Named(entries) => {
                for (key, value) in entries {
                    let index = self.parameter_index(key)?;
                    self.stmt.raw_bind_parameter(index, to_sqlite_value(value)?)?;
                }
                Ok(())
            }
        }
    }

    // The rewriter hands us bare names; the engine's SQL text carries one of
    // the three sigils. Probe each spelling.
    fn parameter_index(&self, bare: &str) -> Result<usize, DriverError> {
        for sigil in ['$', ':', '@'] {
            let name = format!("{sigil}{bare}");
            if let Some(index) = self.stmt.parameter_index(&name)? {
                return Ok(index);
            }
        }
        Err(DriverError::ParameterError(format!(
            "no such named parameter: {bare}"
        )))
    }
}

// Column names and their lookup index, built once per result set and shared
// by every row read from it.
struct RowShape {
    columns: Arc<Vec<String>>,
    index: Arc<HashMap<String, usize>>,
}

fn read_row(shape: &RowShape, row: &rusqlite::Row<'_>) -> Result<Row, DriverError> {
    let mut values = Vec::with_capacity(shape.columns.len());
    for i in 0..shape.columns.len() {
        values.push(row.get::<_, rusqlite::types::Value>(i)?);
    }
    Ok(Row::with_shared_index(
        shape.columns.clone(),
        shape.index.clone(),
        values,
    ))
}
