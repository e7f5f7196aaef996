//! Session / query engine (component E, §4.E): opens an embedded
//! `rusqlite::Connection`, registers the virtual-table modules, the scalar
//! function layer, and the view catalog against a workspace adapter, and
//! exposes `query`/`scalar`/`execute`/`handle` — grounded on the teacher's
//! `Database::new`/`run`/`run_timed`, with the statement-execution loop
//! replaced by `rusqlite`'s own prepare/step instead of the teacher's
//! hand-written parser/interpreter.

use std::path::Path;
use std::rc::Rc;

use rusqlite::Connection;

use crate::adapter::WorkspaceAdapter;
use crate::config::IdasqlConfig;
use crate::error::{EngineError, EngineResult};
use crate::policy::Policy;
use crate::value::{ColumnValue, Row};

/// Result of [`Session::query`]: column names in declaration order and
/// every row, materialized eagerly the way `Database::run`'s `Query`
/// callback accumulates output (§4.E "`result` carries
/// `{success, error, columns[], rows[]}`").
#[derive(Debug, Default, Clone)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl QueryResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// First column of the first row, or `None` for an empty result — the
    /// shape `scalar(sql)` wants.
    pub fn scalar(&self) -> Option<&ColumnValue> {
        self.rows.first().and_then(|r| r.first())
    }
}

/// An embedded SQL engine bound to one [`WorkspaceAdapter`] (§4.E). Not
/// `Send`/`Sync`: every method must be called from the workspace thread
/// (§5); cross-thread callers go through [`crate::concurrency::CommandQueue`]
/// instead.
pub struct Session {
    conn: Connection,
    policy: Rc<Policy>,
    last_error: std::cell::RefCell<Option<EngineError>>,
}

impl Session {
    /// Opens an in-memory `Connection`, installs the entity tables, the
    /// scalar/TVF function layer (when the `functions` feature is enabled),
    /// and the view catalog (when the `init` feature is enabled), then
    /// applies `config_path`'s defaults if present.
    pub fn open(adapter: Rc<dyn WorkspaceAdapter>, config_path: Option<&Path>) -> EngineResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| EngineError::Internal(format!("opening connection: {e}")))?;
        let policy = Rc::new(Policy::new());

        crate::entities::register_all(&conn, &adapter, &policy)
            .map_err(|e| EngineError::Internal(format!("registering entity tables: {e}")))?;

        #[cfg(feature = "functions")]
        crate::builtin::register_all(&conn, &adapter, &policy)
            .map_err(|e| EngineError::Internal(format!("registering SQL functions: {e}")))?;

        #[cfg(feature = "init")]
        crate::init::install_views(&conn)
            .map_err(|e| EngineError::Internal(format!("installing view catalog: {e}")))?;

        let config = match config_path {
            Some(path) => IdasqlConfig::load_optional(path)?,
            None => IdasqlConfig::default(),
        };
        config.apply(&policy)?;

        tracing::info!("session opened, entity tables and views installed");
        Ok(Session {
            conn,
            policy,
            last_error: std::cell::RefCell::new(None),
        })
    }

    /// Runs `sql`, materializing every resulting row. A SQL-level error is
    /// captured in [`Session::last_error`] and returned as `Err` rather than
    /// panicking, so a driver loop (REPL, script runner) can report it and
    /// keep the session usable (§9 "error propagation across FFI").
    pub fn query(&self, sql: &str) -> EngineResult<QueryResult> {
        self.run(sql).inspect_err(|e| {
            tracing::warn!(error = %e, "query failed");
            *self.last_error.borrow_mut() = Some(e.clone());
        })
    }

    fn run(&self, sql: &str) -> EngineResult<QueryResult> {
        tracing::debug!(sql, "running statement");
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| EngineError::InvalidArgument(e.to_string()))?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let col_count = columns.len();
        let mut rows_iter = stmt
            .query([])
            .map_err(|e| EngineError::WorkspaceError(e.to_string()))?;
        let mut rows = Vec::new();
        while let Some(row) = rows_iter
            .next()
            .map_err(|e| EngineError::WorkspaceError(e.to_string()))?
        {
            let mut values = Vec::with_capacity(col_count);
            for i in 0..col_count {
                let v = row
                    .get_ref(i)
                    .map_err(|e| EngineError::WorkspaceError(e.to_string()))?;
                values.push(ColumnValue::from(v));
            }
            rows.push(values);
        }
        Ok(QueryResult { columns, rows })
    }

    /// `scalar(sql)`: the first column of the first row as text, or an
    /// empty string for no rows / `NULL` (§4.E).
    pub fn scalar(&self, sql: &str) -> EngineResult<String> {
        let result = self.query(sql)?;
        Ok(match result.scalar() {
            Some(ColumnValue::Null) | None => String::new(),
            Some(ColumnValue::Int(i)) => i.to_string(),
            Some(ColumnValue::Float(f)) => f.to_string(),
            Some(ColumnValue::Text(s)) => s.clone(),
            Some(ColumnValue::Blob(b)) => crate::util::quote_blob(b),
        })
    }

    /// Streams rows to `callback` instead of materializing the whole
    /// result, for large scans (§4.E). `callback` returning `false` stops
    /// iteration early.
    pub fn execute(
        &self,
        sql: &str,
        mut callback: impl FnMut(&[ColumnValue]) -> bool,
    ) -> EngineResult<()> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| EngineError::InvalidArgument(e.to_string()))?;
        let col_count = stmt.column_count();
        let mut rows_iter = stmt
            .query([])
            .map_err(|e| EngineError::WorkspaceError(e.to_string()))?;
        while let Some(row) = rows_iter
            .next()
            .map_err(|e| EngineError::WorkspaceError(e.to_string()))?
        {
            let mut values = Vec::with_capacity(col_count);
            for i in 0..col_count {
                let v = row
                    .get_ref(i)
                    .map_err(|e| EngineError::WorkspaceError(e.to_string()))?;
                values.push(ColumnValue::from(v));
            }
            if !callback(&values) {
                break;
            }
        }
        Ok(())
    }

    /// Escape hatch exposing the underlying `rusqlite::Connection` directly,
    /// for hosts that need prepared statements with bound parameters rather
    /// than text-interpolated SQL (§4.E, feature `max`).
    #[cfg(feature = "max")]
    pub fn handle(&self) -> &Connection {
        &self.conn
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn last_error(&self) -> Option<EngineError> {
        self.last_error.borrow().clone()
    }

    /// No explicit teardown is required — dropping the `Connection` closes
    /// it — but an explicit `close` matches the teacher's `Database`
    /// lifecycle surface and gives hosts a place to hang a log line.
    pub fn close(self) {
        tracing::info!("session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::stub::StubWorkspace;

    fn session() -> Session {
        let ws: Rc<dyn WorkspaceAdapter> = Rc::new(StubWorkspace::with_fixture());
        Session::open(ws, None).unwrap()
    }

    #[test]
    fn queries_func_table() {
        let s = session();
        let result = s
            .query("SELECT address, name FROM funcs ORDER BY address")
            .unwrap();
        assert_eq!(result.columns, vec!["address", "name"]);
        assert!(!result.rows.is_empty());
    }

    #[test]
    fn scalar_reads_count() {
        let s = session();
        let count = s.scalar("SELECT COUNT(*) FROM funcs").unwrap();
        assert!(count.parse::<i64>().unwrap() > 0);
    }

    #[test]
    fn invalid_sql_is_reported_not_panicked() {
        let s = session();
        let err = s.query("SELEKT * FROM funcs").unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));
        assert_eq!(s.last_error(), Some(err));
    }

    #[test]
    fn execute_streams_and_can_stop_early() {
        let s = session();
        let mut seen = 0;
        s.execute("SELECT address FROM funcs ORDER BY address", |_row| {
            seen += 1;
            seen < 1
        })
        .unwrap();
        assert_eq!(seen, 1);
    }
}
