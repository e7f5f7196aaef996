//! `disasm_calls`, `disasm_loops` (§2 component C entity list). Both are
//! per-function disassembly-level analyses — call sites and natural-loop
//! back edges — so both require `func_addr = ...`, the key name the fixed
//! external catalog (§6) and the view catalog's `callers`/`callees` joins
//! pin for this table; there is no whole-workspace enumerator for either on
//! the adapter.

use std::rc::Rc;

use rusqlite::Connection;

use crate::adapter::WorkspaceAdapter;
use crate::error::EngineError;
use crate::policy::Policy;
use crate::value::ColumnValue;
use crate::vtab::descriptor::{ColumnDef, Shape, TableDescriptor, UpdateOps};
use crate::vtab::register_cache_table;

pub fn register(
    conn: &Connection,
    adapter: &Rc<dyn WorkspaceAdapter>,
    policy: &Rc<Policy>,
) -> rusqlite::Result<()> {
    register_calls(conn, adapter, policy)?;
    register_loops(conn, adapter, policy)
}

const DC_FUNC_ADDR: usize = 0;

fn register_calls(
    conn: &Connection,
    adapter: &Rc<dyn WorkspaceAdapter>,
    policy: &Rc<Policy>,
) -> rusqlite::Result<()> {
    let descriptor = TableDescriptor {
        name: "disasm_calls",
        columns: vec![
            ColumnDef::ro("func_addr").required_eq(),
            ColumnDef::ro("call_ea"),
            ColumnDef::ro("callee_ea"),
            ColumnDef::ro("callee_name"),
        ],
        shape: Shape::Cache {
            estimate_rows: Box::new(|_ws| 8),
            scan: Box::new(|ws, args| {
                let func_ea = args.eq_ea(DC_FUNC_ADDR).ok_or_else(|| {
                    EngineError::ConstraintRequired("disasm_calls requires func_addr = ...".into())
                })?;
                let mut rowid = 0i64;
                Ok(ws
                    .call_sites(func_ea)
                    .into_iter()
                    .map(|c| {
                        let row = vec![
                            ColumnValue::ea(c.func_ea),
                            ColumnValue::ea(c.call_ea),
                            ColumnValue::opt_ea(c.callee_ea),
                            ColumnValue::opt_text(c.callee_name),
                        ];
                        let id = rowid;
                        rowid += 1;
                        (row, id)
                    })
                    .collect())
            }),
        },
        update: UpdateOps::default(),
        adapter: adapter.clone(),
        policy: policy.clone(),
    };
    register_cache_table(conn, descriptor)
}

const DL_FUNC_ADDR: usize = 0;

fn register_loops(
    conn: &Connection,
    adapter: &Rc<dyn WorkspaceAdapter>,
    policy: &Rc<Policy>,
) -> rusqlite::Result<()> {
    let descriptor = TableDescriptor {
        name: "disasm_loops",
        columns: vec![
            ColumnDef::ro("func_addr").required_eq(),
            ColumnDef::ro("header_ea"),
            ColumnDef::ro("back_edge_ea"),
        ],
        shape: Shape::Cache {
            estimate_rows: Box::new(|_ws| 4),
            scan: Box::new(|ws, args| {
                let func_ea = args.eq_ea(DL_FUNC_ADDR).ok_or_else(|| {
                    EngineError::ConstraintRequired("disasm_loops requires func_addr = ...".into())
                })?;
                let mut rowid = 0i64;
                Ok(ws
                    .loops(func_ea)
                    .into_iter()
                    .map(|l| {
                        let row = vec![
                            ColumnValue::ea(l.func_ea),
                            ColumnValue::ea(l.header_ea),
                            ColumnValue::ea(l.back_edge_ea),
                        ];
                        let id = rowid;
                        rowid += 1;
                        (row, id)
                    })
                    .collect())
            }),
        },
        update: UpdateOps::default(),
        adapter: adapter.clone(),
        policy: policy.clone(),
    };
    register_cache_table(conn, descriptor)
}
