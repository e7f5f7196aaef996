//! `comments` (§3 Comment): cache shape. The workspace keeps regular and
//! repeatable comments as separate flavors keyed by `ea`; this table folds
//! both into one row per `ea` the way the rest of the schema presents them.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use rusqlite::Connection;

use crate::adapter::{CommentFlavor, WorkspaceAdapter};
use crate::error::EngineError;
use crate::policy::Policy;
use crate::value::ColumnValue;
use crate::vtab::descriptor::{ColumnDef, Shape, TableDescriptor, UpdateOps};
use crate::vtab::register_cache_table;

const EA: usize = 0;
const COMMENT: usize = 1;
const REPEATABLE: usize = 2;

pub fn register(
    conn: &Connection,
    adapter: &Rc<dyn WorkspaceAdapter>,
    policy: &Rc<Policy>,
) -> rusqlite::Result<()> {
    let descriptor = TableDescriptor {
        name: "comments",
        columns: vec![
            ColumnDef::ro("ea"),
            ColumnDef::rw("comment"),
            ColumnDef::rw("repeatable_comment"),
        ],
        shape: Shape::Cache {
            estimate_rows: Box::new(|ws| ws.func_qty()),
            scan: Box::new(|ws, _args| {
                let mut by_ea: FxHashMap<u64, (Option<String>, Option<String>)> =
                    FxHashMap::default();
                ws.for_each_comment(&mut |ea, flavor, text| {
                    let entry = by_ea.entry(ea).or_default();
                    match flavor {
                        CommentFlavor::Regular => entry.0 = Some(text.to_string()),
                        CommentFlavor::Repeatable => entry.1 = Some(text.to_string()),
                    }
                    true
                });
                let mut rows: Vec<_> = by_ea.into_iter().collect();
                rows.sort_by_key(|(ea, _)| *ea);
                Ok(rows
                    .into_iter()
                    .map(|(ea, (c, rc))| {
                        (
                            vec![ColumnValue::ea(ea), ColumnValue::opt_text(c), ColumnValue::opt_text(rc)],
                            ea as i64,
                        )
                    })
                    .collect())
            }),
        },
        update: UpdateOps {
            insert: Some(Box::new(|ws, row| {
                let ea = row[EA]
                    .as_ea()
                    .ok_or_else(|| EngineError::InvalidArgument("comments.ea is required".into()))?;
                apply(ws, ea, row)?;
                Ok(ea as i64)
            })),
            update: Some(Box::new(|ws, rowid, row| apply(ws, rowid as u64, row))),
            delete: Some(Box::new(|ws, rowid| {
                let ea = rowid as u64;
                let _ = ws.delete_comment(ea, CommentFlavor::Regular);
                let _ = ws.delete_comment(ea, CommentFlavor::Repeatable);
                Ok(())
            })),
        },
        adapter: adapter.clone(),
        policy: policy.clone(),
    };
    register_cache_table(conn, descriptor)
}

fn apply(ws: &dyn WorkspaceAdapter, ea: u64, row: &crate::value::Row) -> crate::error::EngineResult<()> {
    if let Some(text) = row[COMMENT].as_str() {
        ws.set_comment(ea, CommentFlavor::Regular, text)?;
    }
    if let Some(text) = row[REPEATABLE].as_str() {
        ws.set_comment(ea, CommentFlavor::Repeatable, text)?;
    }
    Ok(())
}
