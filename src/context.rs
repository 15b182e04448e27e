use crate::engine::RunInfo;

/// Per-execution context handed to every callback. Lifecycle callbacks
/// (open, exec, close) receive one with no run-info.
///
/// The legacy contract delivered `lastID`/`changes` on the callback's
/// receiver; here the context travels as an explicit parameter. Each
/// execution builds its own context, so concurrent logical calls never
/// alias state.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    /// Rowid of the last insert; only meaningful after an insert
    pub last_id: Option<i64>,
    /// Rows changed by a write; for `all` the returned row count, for `get`
    /// 1 when a row was found and 0 otherwise. Never unset, defaults to 0.
    pub changes: usize,
    /// The SQL text, for diagnostics only
    pub sql: String,
}

impl ExecutionContext {
    /// Context for a write, from the engine's run-info.
    #[must_use]
    pub fn from_run_info(info: RunInfo, sql: &str) -> Self {
        Self {
            last_id: Some(info.last_insert_rowid),
            changes: info.changes,
            sql: sql.to_string(),
        }
    }

    /// Context for a read that returned `row_count` rows.
    #[must_use]
    pub fn from_row_count(row_count: usize, sql: &str) -> Self {
        Self {
            last_id: None,
            changes: row_count,
            sql: sql.to_string(),
        }
    }

    /// Context with no run-info, only the SQL text.
    #[must_use]
    pub fn empty(sql: &str) -> Self {
        Self {
            last_id: None,
            changes: 0,
            sql: sql.to_string(),
        }
    }
}
