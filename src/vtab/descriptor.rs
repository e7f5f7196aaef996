//! Declarative table descriptor (§4.B design note: "Represent a table as a
//! tagged variant `{Index, Cache, TVF}` with a uniform cursor trait").
//!
//! Every entity table in `crate::entities` is one `TableDescriptor` value,
//! not a hand-written `VTab` impl. The three modules in this directory
//! (`index_table`, `cache_table`, `tvf`) each implement `rusqlite::vtab::VTab`
//! exactly once, generic over the closures a descriptor supplies.

use std::rc::Rc;

use crate::adapter::WorkspaceAdapter;
use crate::error::EngineResult;
use crate::policy::Policy;
use crate::value::Row;

use super::pushdown::{PushOp, PushdownArgs};

/// One declared column. `pushdown` lists the predicate kinds `xBestIndex`
/// is allowed to claim for this column; `required` marks a column (as in
/// `jump_entities.pattern`) that must be bound by `=` or the table refuses
/// to scan at all.
pub struct ColumnDef {
    pub name: &'static str,
    pub writable: bool,
    pub hidden: bool,
    pub pushdown: &'static [PushOp],
    pub required: bool,
}

impl ColumnDef {
    pub const fn ro(name: &'static str) -> Self {
        ColumnDef {
            name,
            writable: false,
            hidden: false,
            pushdown: &[],
            required: false,
        }
    }

    pub const fn rw(name: &'static str) -> Self {
        ColumnDef {
            name,
            writable: true,
            hidden: false,
            pushdown: &[],
            required: false,
        }
    }

    pub const fn with_pushdown(mut self, ops: &'static [PushOp]) -> Self {
        self.pushdown = ops;
        self
    }

    pub const fn required_hidden(mut self) -> Self {
        self.hidden = true;
        self.required = true;
        self.pushdown = &[PushOp::Eq];
        self
    }

    /// A visible column that must be bound by `=` for the table to scan at
    /// all (`blocks.func_ea`, `pseudocode.func_addr`) — unlike
    /// `required_hidden`, this stays a normal projectable column.
    pub const fn required_eq(mut self) -> Self {
        self.required = true;
        self.pushdown = &[PushOp::Eq];
        self
    }
}

/// A row materialized by an index-shaped table: the entity's row values and
/// the rowid the cursor should report for it (used by writable tables so
/// `xUpdate` can map a rowid back to an entity key).
pub type IndexRowFn = dyn Fn(&dyn WorkspaceAdapter, usize) -> Option<(Row, i64)>;
pub type CountFn = dyn Fn(&dyn WorkspaceAdapter) -> usize;
pub type ScanFn = dyn Fn(&dyn WorkspaceAdapter, &PushdownArgs) -> EngineResult<Vec<(Row, i64)>>;
pub type EstimateFn = dyn Fn(&dyn WorkspaceAdapter) -> usize;
pub type TvfRunFn =
    dyn Fn(&dyn WorkspaceAdapter, &PushdownArgs, Option<i64>) -> EngineResult<Vec<Row>>;

pub enum Shape {
    Index {
        count: Box<CountFn>,
        row_at: Box<IndexRowFn>,
    },
    Cache {
        estimate_rows: Box<EstimateFn>,
        scan: Box<ScanFn>,
    },
    Tvf { run: Box<TvfRunFn> },
}

/// `xUpdate` hooks. A table with `None` for a given operation reports
/// `SQLITE_READONLY`-equivalent behavior for it (enforced by the VTab impl,
/// not here).
#[derive(Default)]
pub struct UpdateOps {
    pub insert: Option<Box<dyn Fn(&dyn WorkspaceAdapter, &Row) -> EngineResult<i64>>>,
    pub update: Option<Box<dyn Fn(&dyn WorkspaceAdapter, i64, &Row) -> EngineResult<()>>>,
    pub delete: Option<Box<dyn Fn(&dyn WorkspaceAdapter, i64) -> EngineResult<()>>>,
}

pub struct TableDescriptor {
    pub name: &'static str,
    pub columns: Vec<ColumnDef>,
    pub shape: Shape,
    pub update: UpdateOps,
    pub adapter: Rc<dyn WorkspaceAdapter>,
    pub policy: Rc<Policy>,
}

impl TableDescriptor {
    pub fn create_table_sql(&self) -> String {
        let mut cols = String::new();
        for (i, c) in self.columns.iter().enumerate() {
            if i > 0 {
                cols.push(',');
            }
            cols.push_str(c.name);
            if c.hidden {
                cols.push_str(" HIDDEN");
            }
        }
        format!("CREATE TABLE x({cols})")
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn shape_count(&self) -> &CountFn {
        match &self.shape {
            Shape::Index { count, .. } => count.as_ref(),
            _ => panic!("{} is not index-shaped", self.name),
        }
    }

    pub fn shape_row_at(&self) -> &IndexRowFn {
        match &self.shape {
            Shape::Index { row_at, .. } => row_at.as_ref(),
            _ => panic!("{} is not index-shaped", self.name),
        }
    }

    pub fn shape_estimate(&self) -> &EstimateFn {
        match &self.shape {
            Shape::Cache { estimate_rows, .. } => estimate_rows.as_ref(),
            _ => panic!("{} is not cache-shaped", self.name),
        }
    }

    pub fn shape_scan(&self) -> &ScanFn {
        match &self.shape {
            Shape::Cache { scan, .. } => scan.as_ref(),
            _ => panic!("{} is not cache-shaped", self.name),
        }
    }

    pub fn shape_tvf_run(&self) -> &TvfRunFn {
        match &self.shape {
            Shape::Tvf { run } => run.as_ref(),
            _ => panic!("{} is not a table-valued function", self.name),
        }
    }
}
