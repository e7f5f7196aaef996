//! `names` (§3 Name): cache shape, the workspace only enumerates names by
//! traversal. `ea` is the rowid so `UPDATE`/`DELETE ... WHERE ea=...` map
//! straight through.

use std::rc::Rc;

use rusqlite::Connection;

use crate::adapter::WorkspaceAdapter;
use crate::error::EngineError;
use crate::policy::Policy;
use crate::value::ColumnValue;
use crate::vtab::descriptor::{ColumnDef, Shape, TableDescriptor, UpdateOps};
use crate::vtab::register_cache_table;

const EA: usize = 0;
const NAME: usize = 1;

pub fn register(
    conn: &Connection,
    adapter: &Rc<dyn WorkspaceAdapter>,
    policy: &Rc<Policy>,
) -> rusqlite::Result<()> {
    let descriptor = TableDescriptor {
        name: "names",
        columns: vec![ColumnDef::ro("ea"), ColumnDef::rw("name")],
        shape: Shape::Cache {
            estimate_rows: Box::new(|ws| ws.func_qty()),
            scan: Box::new(|ws, _args| {
                let mut rows = Vec::new();
                ws.for_each_name(&mut |ea, name| {
                    rows.push((vec![ColumnValue::ea(ea), ColumnValue::text(name)], ea as i64));
                    true
                });
                Ok(rows)
            }),
        },
        update: UpdateOps {
            insert: Some(Box::new(|ws, row| {
                let ea = row[EA].as_ea().ok_or_else(|| {
                    EngineError::InvalidArgument("names.ea is required".into())
                })?;
                let name = row[NAME].as_str().ok_or_else(|| {
                    EngineError::InvalidArgument("names.name is required".into())
                })?;
                ws.set_name(ea, name)?;
                Ok(ea as i64)
            })),
            update: Some(Box::new(|ws, rowid, row| {
                let name = row[NAME].as_str().ok_or_else(|| {
                    EngineError::InvalidArgument("names.name is required".into())
                })?;
                ws.set_name(rowid as u64, name)
            })),
            delete: Some(Box::new(|ws, rowid| ws.delete_name(rowid as u64))),
        },
        adapter: adapter.clone(),
        policy: policy.clone(),
    };
    register_cache_table(conn, descriptor)
}
