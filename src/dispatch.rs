//! Statement dispatch with read-to-write fallback.
//!
//! Legacy callers cannot always know in advance whether a given SQL
//! statement returns rows, and the contract promises `run`, `all`, and
//! `get` work interchangeably. When a read call hits the engine's typed
//! wrong-statement-kind condition, the same statement is executed through
//! the write path and an operation-appropriate empty result is synthesized
//! from the write's run-info. Every other failure propagates unchanged.

use tracing::debug;

use crate::bindings::Bindings;
use crate::context::ExecutionContext;
use crate::engine::EngineHandle;
use crate::error::DriverError;
use crate::rows::Row;

/// Classify the engine's "this statement does not return rows" condition.
///
/// Kept as the single place that recognizes the condition, so an engine
/// change cannot ripple into dispatch logic. The rusqlite variant covers
/// the mirror case of a write call reaching a row-returning statement.
#[must_use]
pub fn is_wrong_statement_kind(err: &DriverError) -> bool {
    matches!(
        err,
        DriverError::StatementReturnsNoRows
            | DriverError::Sqlite(rusqlite::Error::ExecuteReturnedResults)
    )
}

/// Execute through the write path; context always derives from run-info.
///
/// # Errors
///
/// Returns prepare, binding, and execution errors unchanged.
pub fn execute_run(
    engine: &EngineHandle,
    sql: &str,
    bindings: &Bindings,
) -> Result<ExecutionContext, DriverError> {
    let mut stmt = engine.prepare(sql)?;
    let info = stmt.run(bindings)?;
    Ok(ExecutionContext::from_run_info(info, sql))
}

/// Execute a read returning every row, falling back to the write path when
/// the statement returns no rows.
///
/// # Errors
///
/// Returns prepare, binding, and execution errors unchanged; the
/// wrong-statement-kind condition is absorbed, never surfaced.
pub fn execute_all(
    engine: &EngineHandle,
    sql: &str,
    bindings: &Bindings,
) -> Result<(Vec<Row>, ExecutionContext), DriverError> {
    let mut stmt = engine.prepare(sql)?;
    match stmt.all(bindings) {
        Ok(rows) => {
            let context = ExecutionContext::from_row_count(rows.len(), sql);
            Ok((rows, context))
        }
        Err(err) if is_wrong_statement_kind(&err) => {
            debug!(sql, "all() on write statement, falling back to run");
            let info = stmt.run(bindings)?;
            Ok((Vec::new(), ExecutionContext::from_run_info(info, sql)))
        }
        Err(err) => Err(err),
    }
}

/// Execute a read returning the first row, falling back to the write path
/// when the statement returns no rows.
///
/// # Errors
///
/// Returns prepare, binding, and execution errors unchanged; the
/// wrong-statement-kind condition is absorbed, never surfaced.
pub fn execute_get(
    engine: &EngineHandle,
    sql: &str,
    bindings: &Bindings,
) -> Result<(Option<Row>, ExecutionContext), DriverError> {
    let mut stmt = engine.prepare(sql)?;
    match stmt.get(bindings) {
        Ok(row) => {
            let found = usize::from(row.is_some());
            let context = ExecutionContext::from_row_count(found, sql);
            Ok((row, context))
        }
        Err(err) if is_wrong_statement_kind(&err) => {
            debug!(sql, "get() on write statement, falling back to run");
            let info = stmt.run(bindings)?;
            Ok((None, ExecutionContext::from_run_info(info, sql)))
        }
        Err(err) => Err(err),
    }
}
