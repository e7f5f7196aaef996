//! Constraint-pushdown plan shared by all three table shapes (§4.B).
//!
//! `xBestIndex` picks which declared predicates a query actually supplies
//! and records the choice as a [`PushdownPlan`]; SQLite round-trips it to us
//! verbatim as `idxStr`, so `xFilter` just deserializes it instead of
//! re-deriving anything from the statement.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::value::ColumnValue;

/// One of the four predicate kinds a column may declare it accepts, plus
/// `Limit` for the LIMIT pushdown a TVF claims on its own (not associated
/// with any declared column — see [`LIMIT_SLOT`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PushOp {
    Eq,
    Gt,
    Lt,
    In,
    Limit,
}

/// Sentinel "column" index used to carry the `SQLITE_INDEX_CONSTRAINT_LIMIT`
/// binding through a [`PushdownPlan`] alongside the real column bindings —
/// no declared column ever reaches this index, so it can't collide.
pub const LIMIT_SLOT: usize = usize::MAX;

impl PushOp {
    pub fn from_constraint_op(op: rusqlite::vtab::IndexConstraintOp) -> Option<Self> {
        use rusqlite::vtab::IndexConstraintOp;
        match op {
            IndexConstraintOp::SQLITE_INDEX_CONSTRAINT_EQ => Some(PushOp::Eq),
            IndexConstraintOp::SQLITE_INDEX_CONSTRAINT_GT
            | IndexConstraintOp::SQLITE_INDEX_CONSTRAINT_GE => Some(PushOp::Gt),
            IndexConstraintOp::SQLITE_INDEX_CONSTRAINT_LT
            | IndexConstraintOp::SQLITE_INDEX_CONSTRAINT_LE => Some(PushOp::Lt),
            _ => None,
        }
    }
}

/// `(column index, predicate)` pairs, in the order their bound values arrive
/// as `argv` at `xFilter` time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PushdownPlan {
    pub bindings: Vec<(usize, PushOp)>,
}

impl PushdownPlan {
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn decode(s: &str) -> Self {
        serde_json::from_str(s).unwrap_or_default()
    }

    pub fn column_op(&self, column: usize) -> Option<PushOp> {
        self.bindings
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, op)| *op)
    }
}

/// Resolved bound values, keyed by column index, handed to a cursor's
/// `filter`/scan implementation. `IN` is not modeled as a distinct bound
/// kind here: the framework does not currently push `IN` lists down past
/// the planner boundary, so it is recognized in [`PushOp`] but never
/// populated by `bind_args`.
#[derive(Debug, Clone, Default)]
pub struct PushdownArgs {
    pub eq: FxHashMap<usize, ColumnValue>,
    pub gt: FxHashMap<usize, ColumnValue>,
    pub lt: FxHashMap<usize, ColumnValue>,
    /// The bound `LIMIT` value, when the planner pushed one down via
    /// [`LIMIT_SLOT`] — lets a TVF's `run` stop consulting later sources
    /// once enough rows are collected (§4.D `jump_entities`).
    pub limit: Option<i64>,
}

impl PushdownArgs {
    pub fn eq_ea(&self, column: usize) -> Option<u64> {
        self.eq.get(&column).and_then(ColumnValue::as_ea)
    }

    pub fn eq_str(&self, column: usize) -> Option<&str> {
        self.eq.get(&column).and_then(ColumnValue::as_str)
    }
}

/// Builds a [`PushdownArgs`] from a plan and the argv values SQLite hands
/// `xFilter`, in plan order.
pub fn bind_args(plan: &PushdownPlan, values: &[ColumnValue]) -> PushdownArgs {
    let mut out = PushdownArgs::default();
    for ((col, op), value) in plan.bindings.iter().zip(values.iter()) {
        match op {
            PushOp::Eq | PushOp::In => {
                out.eq.insert(*col, value.clone());
            }
            PushOp::Gt => {
                out.gt.insert(*col, value.clone());
            }
            PushOp::Lt => {
                out.lt.insert(*col, value.clone());
            }
            PushOp::Limit => {
                out.limit = value.as_i64();
            }
        }
    }
    out
}
