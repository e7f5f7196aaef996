//! `bookmarks` (§3 Bookmark): cache shape, `slot` is the rowid. `INSERT`
//! with `slot` omitted (NULL) auto-assigns the next free slot.

use std::rc::Rc;

use rusqlite::Connection;

use crate::adapter::WorkspaceAdapter;
use crate::error::EngineError;
use crate::policy::Policy;
use crate::value::ColumnValue;
use crate::vtab::descriptor::{ColumnDef, Shape, TableDescriptor, UpdateOps};
use crate::vtab::register_cache_table;

const SLOT: usize = 0;
const EA: usize = 1;
const DESCRIPTION: usize = 2;

pub fn register(
    conn: &Connection,
    adapter: &Rc<dyn WorkspaceAdapter>,
    policy: &Rc<Policy>,
) -> rusqlite::Result<()> {
    let descriptor = TableDescriptor {
        name: "bookmarks",
        columns: vec![
            ColumnDef::ro("slot"),
            ColumnDef::ro("ea"),
            ColumnDef::rw("description"),
        ],
        shape: Shape::Cache {
            estimate_rows: Box::new(|_ws| 8),
            scan: Box::new(|ws, _args| {
                let mut rows = Vec::new();
                ws.for_each_bookmark(&mut |b| {
                    rows.push((
                        vec![
                            ColumnValue::int(b.slot),
                            ColumnValue::ea(b.ea),
                            ColumnValue::text(b.description.clone()),
                        ],
                        b.slot,
                    ));
                    true
                });
                Ok(rows)
            }),
        },
        update: UpdateOps {
            insert: Some(Box::new(|ws, row| {
                let slot = row[SLOT].as_i64();
                let ea = row[EA]
                    .as_ea()
                    .ok_or_else(|| EngineError::InvalidArgument("bookmarks.ea is required".into()))?;
                let description = row[DESCRIPTION].as_str().unwrap_or("");
                ws.create_bookmark(slot, ea, description)
            })),
            update: Some(Box::new(|ws, rowid, row| {
                let description = row[DESCRIPTION].as_str().ok_or_else(|| {
                    EngineError::InvalidArgument("bookmarks.description is required".into())
                })?;
                ws.set_bookmark_description(rowid, description)
            })),
            delete: Some(Box::new(|ws, rowid| ws.delete_bookmark(rowid))),
        },
        adapter: adapter.clone(),
        policy: policy.clone(),
    };
    register_cache_table(conn, descriptor)
}
