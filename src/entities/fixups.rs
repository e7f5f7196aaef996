//! `fixups`, `fchunks`, `problems`, `hidden_ranges`, `signatures`,
//! `stack_vars` (§4.C **[ADDED]** "fixups, problems, hidden_ranges,
//! signatures, fchunks, and stack_vars tables follow the same shapes as
//! their closest sibling in the core list — fchunks as an index table
//! parented on a function like basic blocks; fixups/problems/
//! hidden_ranges/signatures as cache tables like xrefs").
//!
//! `stack_vars` rides along here too: it shares `fchunks`'s "parented on a
//! function" shape and has no dedicated spec paragraph of its own.

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
    register_fixups(conn, adapter, policy)?;
    register_fchunks(conn, adapter, policy)?;
    register_problems(conn, adapter, policy)?;
    register_hidden_ranges(conn, adapter, policy)?;
    register_signatures(conn, adapter, policy)?;
    register_stack_vars(conn, adapter, policy)
}

fn register_fixups(
    conn: &Connection,
    adapter: &Rc<dyn WorkspaceAdapter>,
    policy: &Rc<Policy>,
) -> rusqlite::Result<()> {
    let descriptor = TableDescriptor {
        name: "fixups",
        columns: vec![
            ColumnDef::ro("ea"),
            ColumnDef::ro("target_ea"),
            ColumnDef::ro("kind"),
            ColumnDef::ro("displacement"),
        ],
        shape: Shape::Cache {
            estimate_rows: Box::new(|_ws| 16),
            scan: Box::new(|ws, _args| {
                let mut rows = Vec::new();
                ws.for_each_fixup(&mut |f| {
                    rows.push((
                        vec![
                            ColumnValue::ea(f.ea),
                            ColumnValue::ea(f.target_ea),
                            ColumnValue::text(f.kind.clone()),
                            ColumnValue::int(f.displacement),
                        ],
                        f.ea as i64,
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

const FC_FUNC_ADDR: usize = 0;

fn register_fchunks(
    conn: &Connection,
    adapter: &Rc<dyn WorkspaceAdapter>,
    policy: &Rc<Policy>,
) -> rusqlite::Result<()> {
    let descriptor = TableDescriptor {
        name: "fchunks",
        columns: vec![
            ColumnDef::ro("func_addr").required_eq(),
            ColumnDef::ro("chunk_start"),
            ColumnDef::ro("chunk_end"),
            ColumnDef::ro("is_main"),
        ],
        shape: Shape::Cache {
            estimate_rows: Box::new(|_ws| 4),
            scan: Box::new(|ws, args| {
                let func_ea = args.eq_ea(FC_FUNC_ADDR).ok_or_else(|| {
                    EngineError::ConstraintRequired("fchunks requires func_addr = ...".into())
                })?;
                let mut rows = Vec::new();
                let mut rowid = 0i64;
                ws.for_each_fchunk(func_ea, &mut |c| {
                    rows.push((
                        vec![
                            ColumnValue::ea(c.func_ea),
                            ColumnValue::ea(c.chunk_start),
                            ColumnValue::ea(c.chunk_end),
                            ColumnValue::bool_int(c.is_main),
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

fn register_problems(
    conn: &Connection,
    adapter: &Rc<dyn WorkspaceAdapter>,
    policy: &Rc<Policy>,
) -> rusqlite::Result<()> {
    let descriptor = TableDescriptor {
        name: "problems",
        columns: vec![
            ColumnDef::ro("ea"),
            ColumnDef::ro("kind"),
            ColumnDef::ro("message"),
        ],
        shape: Shape::Cache {
            estimate_rows: Box::new(|_ws| 4),
            scan: Box::new(|ws, _args| {
                let mut rows = Vec::new();
                ws.for_each_problem(&mut |p| {
                    rows.push((
                        vec![
                            ColumnValue::ea(p.ea),
                            ColumnValue::text(p.kind.clone()),
                            ColumnValue::text(p.message.clone()),
                        ],
                        p.ea as i64,
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

fn register_hidden_ranges(
    conn: &Connection,
    adapter: &Rc<dyn WorkspaceAdapter>,
    policy: &Rc<Policy>,
) -> rusqlite::Result<()> {
    let descriptor = TableDescriptor {
        name: "hidden_ranges",
        columns: vec![
            ColumnDef::ro("start_ea"),
            ColumnDef::ro("end_ea"),
            ColumnDef::ro("description"),
            ColumnDef::ro("visible"),
        ],
        shape: Shape::Cache {
            estimate_rows: Box::new(|_ws| 4),
            scan: Box::new(|ws, _args| {
                let mut rows = Vec::new();
                let mut rowid = 0i64;
                ws.for_each_hidden_range(&mut |h| {
                    rows.push((
                        vec![
                            ColumnValue::ea(h.start_ea),
                            ColumnValue::ea(h.end_ea),
                            ColumnValue::text(h.description.clone()),
                            ColumnValue::bool_int(h.visible),
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

fn register_signatures(
    conn: &Connection,
    adapter: &Rc<dyn WorkspaceAdapter>,
    policy: &Rc<Policy>,
) -> rusqlite::Result<()> {
    let descriptor = TableDescriptor {
        name: "signatures",
        columns: vec![
            ColumnDef::ro("ea"),
            ColumnDef::ro("name"),
            ColumnDef::ro("length"),
        ],
        shape: Shape::Cache {
            estimate_rows: Box::new(|_ws| 4),
            scan: Box::new(|ws, _args| {
                let mut rows = Vec::new();
                ws.for_each_signature(&mut |sg| {
                    rows.push((
                        vec![
                            ColumnValue::ea(sg.ea),
                            ColumnValue::text(sg.name.clone()),
                            ColumnValue::int(sg.length as i64),
                        ],
                        sg.ea as i64,
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

const SV_FUNC_EA: usize = 0;
const SV_NAME: usize = 1;
const SV_NEW_NAME: usize = 5;

fn register_stack_vars(
    conn: &Connection,
    adapter: &Rc<dyn WorkspaceAdapter>,
    policy: &Rc<Policy>,
) -> rusqlite::Result<()> {
    let descriptor = TableDescriptor {
        name: "stack_vars",
        columns: vec![
            ColumnDef::ro("func_ea").required_eq(),
            ColumnDef::ro("name"),
            ColumnDef::ro("offset"),
            ColumnDef::ro("size"),
            ColumnDef::ro("is_arg"),
            ColumnDef::rw("new_name"),
        ],
        shape: Shape::Cache {
            estimate_rows: Box::new(|_ws| 8),
            scan: Box::new(|ws, args| {
                let func_ea = args.eq_ea(SV_FUNC_EA).ok_or_else(|| {
                    EngineError::ConstraintRequired("stack_vars requires func_ea = ...".into())
                })?;
                let mut rows = Vec::new();
                let mut rowid = 0i64;
                ws.for_each_stack_var(func_ea, &mut |v| {
                    rows.push((
                        vec![
                            ColumnValue::ea(v.func_ea),
                            ColumnValue::text(v.name.clone()),
                            ColumnValue::int(v.offset),
                            ColumnValue::int(v.size as i64),
                            ColumnValue::bool_int(v.is_arg),
                            ColumnValue::Null,
                        ],
                        rowid,
                    ));
                    rowid += 1;
                    true
                });
                Ok(rows)
            }),
        },
        update: UpdateOps {
            update: Some(Box::new(|ws, _rowid, row| {
                let func_ea = row[SV_FUNC_EA]
                    .as_ea()
                    .ok_or_else(|| EngineError::InvalidArgument("stack_vars.func_ea is required".into()))?;
                let name = row[SV_NAME]
                    .as_str()
                    .ok_or_else(|| EngineError::InvalidArgument("stack_vars.name is required".into()))?;
                let new_name = row[SV_NEW_NAME].as_str().ok_or_else(|| {
                    EngineError::InvalidArgument("stack_vars rename requires new_name".into())
                })?;
                ws.rename_stack_var(func_ea, name, new_name)
            })),
            ..Default::default()
        },
        adapter: adapter.clone(),
        policy: policy.clone(),
    };
    register_cache_table(conn, descriptor)
}
