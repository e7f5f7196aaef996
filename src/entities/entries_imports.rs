//! `entries` (§3 Entry) and `imports` (§3 Import): both read-only cache
//! tables, the workspace only enumerates either by traversal.

use std::rc::Rc;

use rusqlite::Connection;

use crate::adapter::WorkspaceAdapter;
use crate::policy::Policy;
use crate::value::ColumnValue;
use crate::vtab::descriptor::{ColumnDef, Shape, TableDescriptor, UpdateOps};
use crate::vtab::register_cache_table;

pub fn register(
    conn: &Connection,
    adapter: &Rc<dyn WorkspaceAdapter>,
    policy: &Rc<Policy>,
) -> rusqlite::Result<()> {
    register_entries(conn, adapter, policy)?;
    register_imports(conn, adapter, policy)
}

fn register_entries(
    conn: &Connection,
    adapter: &Rc<dyn WorkspaceAdapter>,
    policy: &Rc<Policy>,
) -> rusqlite::Result<()> {
    let descriptor = TableDescriptor {
        name: "entries",
        columns: vec![
            ColumnDef::ro("ordinal"),
            ColumnDef::ro("ea"),
            ColumnDef::ro("name"),
        ],
        shape: Shape::Cache {
            estimate_rows: Box::new(|_ws| 16),
            scan: Box::new(|ws, _args| {
                let mut rows = Vec::new();
                ws.for_each_entry(&mut |e| {
                    rows.push((
                        vec![
                            ColumnValue::int(e.ordinal),
                            ColumnValue::ea(e.ea),
                            ColumnValue::text(e.name.clone()),
                        ],
                        e.ordinal,
                    ));
                    true
                });
                Ok(rows)
            }),
        },
        update: UpdateOps::default(),
        adapter: adapter.clone(),
        policy: policy.clone(),
    };
    register_cache_table(conn, descriptor)
}

fn register_imports(
    conn: &Connection,
    adapter: &Rc<dyn WorkspaceAdapter>,
    policy: &Rc<Policy>,
) -> rusqlite::Result<()> {
    let descriptor = TableDescriptor {
        name: "imports",
        columns: vec![
            ColumnDef::ro("ea"),
            ColumnDef::ro("name"),
            ColumnDef::ro("module"),
            ColumnDef::ro("ordinal"),
        ],
        shape: Shape::Cache {
            estimate_rows: Box::new(|_ws| 64),
            scan: Box::new(|ws, _args| {
                let mut rows = Vec::new();
                let mut rowid = 0i64;
                ws.for_each_import(&mut |imp| {
                    rows.push((
                        vec![
                            ColumnValue::ea(imp.ea),
                            ColumnValue::text(imp.name.clone()),
                            ColumnValue::text(imp.module.clone()),
                            ColumnValue::int(imp.ordinal),
                        ],
                        rowid,
                    ));
                    rowid += 1;
                    true
                });
                Ok(rows)
            }),
        },
        update: UpdateOps::default(),
        adapter: adapter.clone(),
        policy: policy.clone(),
    };
    register_cache_table(conn, descriptor)
}
