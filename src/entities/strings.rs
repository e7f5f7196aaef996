//! `strings` (§3 String): read-only cache table. `rebuild_strings(...)` is a
//! side-effecting scalar function (§4.D), not a table mutation, so this
//! descriptor declares no `UpdateOps`.

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
    let descriptor = TableDescriptor {
        name: "strings",
        columns: vec![
            ColumnDef::ro("ea"),
            ColumnDef::ro("length"),
            ColumnDef::ro("type_name"),
            ColumnDef::ro("width"),
            ColumnDef::ro("layout"),
            ColumnDef::ro("encoding"),
            ColumnDef::ro("content"),
        ],
        shape: Shape::Cache {
            estimate_rows: Box::new(|ws| ws.string_count()),
            scan: Box::new(|ws, _args| {
                let mut rows = Vec::new();
                ws.for_each_string(&mut |s| {
                    rows.push((
                        vec![
                            ColumnValue::ea(s.ea),
                            ColumnValue::int(s.length as i64),
                            ColumnValue::text(s.type_name.clone()),
                            ColumnValue::int(s.width as i64),
                            ColumnValue::text(s.layout.clone()),
                            ColumnValue::text(s.encoding.clone()),
                            ColumnValue::text(s.content.clone()),
                        ],
                        s.ea as i64,
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
