//! `segments` (§3 Segment, §4.C second bullet): index shape. `perm` UPDATE
//! accepts 0..7 (bit 4=R, bit 2=W, bit 1=X). No INSERT — segments are
//! carved out by the host's loader, not by SQL.

use std::rc::Rc;

use rusqlite::Connection;

use crate::adapter::WorkspaceAdapter;
use crate::error::EngineError;
use crate::policy::Policy;
use crate::value::ColumnValue;
use crate::vtab::descriptor::{ColumnDef, Shape, TableDescriptor, UpdateOps};
use crate::vtab::register_index_table;

const NAME: usize = 2;
const CLASS: usize = 3;
const PERM: usize = 4;

pub fn register(
    conn: &Connection,
    adapter: &Rc<dyn WorkspaceAdapter>,
    policy: &Rc<Policy>,
) -> rusqlite::Result<()> {
    let descriptor = TableDescriptor {
        name: "segments",
        columns: vec![
            ColumnDef::ro("start_ea"),
            ColumnDef::ro("end_ea"),
            ColumnDef::rw("name"),
            ColumnDef::rw("class"),
            ColumnDef::rw("perm"),
        ],
        shape: Shape::Index {
            count: Box::new(|ws| ws.segment_qty()),
            row_at: Box::new(|ws, i| {
                let s = ws.segment_at_index(i)?;
                let row = vec![
                    ColumnValue::ea(s.start_ea),
                    ColumnValue::ea(s.end_ea),
                    ColumnValue::text(s.name),
                    ColumnValue::text(s.class),
                    ColumnValue::int(s.perm as i64),
                ];
                Some((row, s.start_ea as i64))
            }),
        },
        update: UpdateOps {
            insert: None,
            update: Some(Box::new(|ws, rowid, row| {
                let start_ea = rowid as u64;
                if let Some(name) = row[NAME].as_str() {
                    ws.set_segment_name(start_ea, name)?;
                }
                if let Some(class) = row[CLASS].as_str() {
                    ws.set_segment_class(start_ea, class)?;
                }
                if let Some(perm) = row[PERM].as_i64() {
                    if !(0..=7).contains(&perm) {
                        return Err(EngineError::InvalidArgument(format!(
                            "segments.perm must be 0..7, got {perm}"
                        )));
                    }
                    ws.set_segment_perm(start_ea, perm as u8)?;
                }
                Ok(())
            })),
            delete: Some(Box::new(|ws, rowid| ws.delete_segment(rowid as u64))),
        },
        adapter: adapter.clone(),
        policy: policy.clone(),
    };
    register_index_table(conn, descriptor)
}
