//! `pseudocode` (§3 Pseudocode line, §4.C "constraint-pushdown on
//! `func_addr` is mandatory — unconstrained scan is permitted only in
//! tests"). `UPDATE pseudocode SET comment=..., comment_placement=...`
//! rewrites the decompiler comment attached to the anchor `ea` via
//! `set_pseudo_comment`/`clear_pseudo_comment`.

use std::rc::Rc;

use rusqlite::Connection;

use crate::adapter::{CommentPlacement, WorkspaceAdapter};
use crate::error::EngineError;
use crate::policy::Policy;
use crate::value::ColumnValue;
use crate::vtab::descriptor::{ColumnDef, Shape, TableDescriptor, UpdateOps};
use crate::vtab::pushdown::PushOp;
use crate::vtab::register_cache_table;

const FUNC_ADDR: usize = 0;
const EA: usize = 3;
const COMMENT: usize = 4;
const COMMENT_PLACEMENT: usize = 5;

pub fn register(
    conn: &Connection,
    adapter: &Rc<dyn WorkspaceAdapter>,
    policy: &Rc<Policy>,
) -> rusqlite::Result<()> {
    let descriptor = TableDescriptor {
        name: "pseudocode",
        columns: vec![
            ColumnDef::ro("func_addr").required_eq(),
            ColumnDef::ro("line_num"),
            ColumnDef::ro("line"),
            ColumnDef::ro("ea").with_pushdown(&[PushOp::Eq]),
            ColumnDef::rw("comment"),
            ColumnDef::rw("comment_placement"),
        ],
        shape: Shape::Cache {
            estimate_rows: Box::new(|_ws| 64),
            scan: Box::new(|ws, args| {
                let func_addr = args.eq_ea(FUNC_ADDR).ok_or_else(|| {
                    EngineError::ConstraintRequired("pseudocode requires func_addr = ...".into())
                })?;
                let result = ws.decompile(func_addr, false)?;
                let mut rows = Vec::new();
                for line in result.lines {
                    if let Some(want_ea) = args.eq_ea(EA) {
                        if line.ea != Some(want_ea) {
                            continue;
                        }
                    }
                    let rowid = (line.func_ea as i64) << 20 | line.line_num;
                    rows.push((
                        vec![
                            ColumnValue::ea(line.func_ea),
                            ColumnValue::int(line.line_num),
                            ColumnValue::text(line.line),
                            ColumnValue::opt_ea(line.ea),
                            ColumnValue::opt_text(line.comment),
                            ColumnValue::opt_text(line.comment_placement.map(|p| p.name().to_string())),
                        ],
                        rowid,
                    ));
                }
                Ok(rows)
            }),
        },
        update: UpdateOps {
            update: Some(Box::new(|ws, rowid, row| {
                let func_ea = (rowid >> 20) as u64;
                let line_num = rowid & 0xFFFFF;
                let ea = row[EA].as_ea().ok_or_else(|| {
                    EngineError::InvalidArgument("pseudocode.ea is required to locate the comment anchor".into())
                })?;
                let _ = line_num;
                let placement = match row[COMMENT_PLACEMENT].as_str() {
                    Some(s) => CommentPlacement::parse(s)?,
                    None => CommentPlacement::Semi,
                };
                match row[COMMENT].as_str() {
                    Some(text) => ws.set_pseudo_comment(func_ea, ea, text, placement),
                    None => ws.clear_pseudo_comment(func_ea, ea),
                }
            })),
            ..Default::default()
        },
        adapter: adapter.clone(),
        policy: policy.clone(),
    };
    register_cache_table(conn, descriptor)
}
