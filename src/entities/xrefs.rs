//! `xrefs` (§3 Xref): cache shape with dual-direction pushdown on `to_ea`
//! and `from_ea` (§4.C). Rows aren't deduplicated — join semantics are
//! set-like on `(from_ea, to_ea)`, so the rowid is just scan position.

use std::rc::Rc;

use rusqlite::Connection;

use crate::adapter::WorkspaceAdapter;
use crate::policy::Policy;
use crate::value::ColumnValue;
use crate::vtab::descriptor::{ColumnDef, Shape, TableDescriptor, UpdateOps};
use crate::vtab::pushdown::PushOp;
use crate::vtab::register_cache_table;

const FROM_EA: usize = 0;
const TO_EA: usize = 1;

pub fn register(
    conn: &Connection,
    adapter: &Rc<dyn WorkspaceAdapter>,
    policy: &Rc<Policy>,
) -> rusqlite::Result<()> {
    let descriptor = TableDescriptor {
        name: "xrefs",
        columns: vec![
            ColumnDef::ro("from_ea").with_pushdown(&[PushOp::Eq]),
            ColumnDef::ro("to_ea").with_pushdown(&[PushOp::Eq]),
            ColumnDef::ro("type"),
            ColumnDef::ro("is_code"),
        ],
        shape: Shape::Cache {
            estimate_rows: Box::new(|ws| ws.func_qty() * 4),
            scan: Box::new(|ws, args| {
                let mut rows = Vec::new();
                let mut rowid = 0i64;
                let mut push = |x: &crate::adapter::XrefInfo, rows: &mut Vec<_>| {
                    rows.push((
                        vec![
                            ColumnValue::ea(x.from_ea),
                            ColumnValue::ea(x.to_ea),
                            ColumnValue::int(x.kind as i64),
                            ColumnValue::bool_int(x.is_code),
                        ],
                        rowid,
                    ));
                    rowid += 1;
                };
                if let Some(from_ea) = args.eq_ea(FROM_EA) {
                    ws.for_each_xref_from(from_ea, &mut |x| {
                        push(x, &mut rows);
                        true
                    });
                } else if let Some(to_ea) = args.eq_ea(TO_EA) {
                    ws.for_each_xref_to(to_ea, &mut |x| {
                        push(x, &mut rows);
                        true
                    });
                } else {
                    ws.for_each_xref(&mut |x| {
                        push(x, &mut rows);
                        true
                    });
                }
                Ok(rows)
            }),
        },
        update: UpdateOps::default(),
        adapter: adapter.clone(),
        policy: policy.clone(),
    };
    register_cache_table(conn, descriptor)
}
