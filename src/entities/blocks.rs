//! `blocks` (§3 Basic block): cache shape, `func_ea = ...` pushdown is
//! mandatory — the adapter has no whole-workspace block enumerator, only
//! `basic_blocks(func_ea)`.

use std::rc::Rc;

use rusqlite::Connection;

use crate::adapter::WorkspaceAdapter;
use crate::policy::Policy;
use crate::value::ColumnValue;
use crate::vtab::descriptor::{ColumnDef, Shape, TableDescriptor, UpdateOps};
use crate::vtab::register_cache_table;

const FUNC_EA: usize = 0;

pub fn register(
    conn: &Connection,
    adapter: &Rc<dyn WorkspaceAdapter>,
    policy: &Rc<Policy>,
) -> rusqlite::Result<()> {
    let descriptor = TableDescriptor {
        name: "blocks",
        columns: vec![
            ColumnDef::ro("func_ea").required_eq(),
            ColumnDef::ro("start_ea"),
            ColumnDef::ro("end_ea"),
            ColumnDef::ro("size"),
        ],
        shape: Shape::Cache {
            estimate_rows: Box::new(|_ws| 16),
            scan: Box::new(|ws, args| {
                let func_ea = args.eq_ea(FUNC_EA).ok_or_else(|| {
                    crate::error::EngineError::ConstraintRequired(
                        "blocks requires func_ea = ...".into(),
                    )
                })?;
                let mut rowid = 0i64;
                let rows = ws
                    .basic_blocks(func_ea)
                    .into_iter()
                    .map(|b| {
                        let row = vec![
                            ColumnValue::ea(b.func_ea),
                            ColumnValue::ea(b.start_ea),
                            ColumnValue::ea(b.end_ea),
                            ColumnValue::int((b.end_ea - b.start_ea) as i64),
                        ];
                        let id = rowid;
                        rowid += 1;
                        (row, id)
                    })
                    .collect();
                Ok(rows)
            }),
        },
        update: UpdateOps::default(),
        adapter: adapter.clone(),
        policy: policy.clone(),
    };
    register_cache_table(conn, descriptor)
}
