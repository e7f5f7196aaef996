//! `ctree`, `ctree_lvars`, `ctree_call_args` (§3 Ctree node / Local
//! variable, §4.C "each row is one AST node ... depth is the tree depth;
//! `parent_id` is the parent node's `item_id`" / "writable columns `name`
//! and `type`; a write may force re-decompilation"). All three require
//! `func_addr = ...` (§4.B pushdown table) since the decompiler call is
//! per-function.

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
    register_ctree(conn, adapter, policy)?;
    register_lvars(conn, adapter, policy)?;
    register_call_args(conn, adapter, policy)
}

const CT_FUNC_ADDR: usize = 0;

fn register_ctree(
    conn: &Connection,
    adapter: &Rc<dyn WorkspaceAdapter>,
    policy: &Rc<Policy>,
) -> rusqlite::Result<()> {
    let descriptor = TableDescriptor {
        name: "ctree",
        columns: vec![
            ColumnDef::ro("func_addr").required_eq(),
            ColumnDef::ro("item_id"),
            ColumnDef::ro("is_expr"),
            ColumnDef::ro("op_name"),
            ColumnDef::ro("ea"),
            ColumnDef::ro("parent_id"),
            ColumnDef::ro("depth"),
            ColumnDef::ro("x_id"),
            ColumnDef::ro("y_id"),
            ColumnDef::ro("z_id"),
            ColumnDef::ro("var_idx"),
            ColumnDef::ro("var_name"),
            ColumnDef::ro("obj_ea"),
            ColumnDef::ro("obj_name"),
            ColumnDef::ro("num_value"),
            ColumnDef::ro("str_value"),
        ],
        shape: Shape::Cache {
            estimate_rows: Box::new(|_ws| 64),
            scan: Box::new(|ws, args| {
                let func_addr = args.eq_ea(CT_FUNC_ADDR).ok_or_else(|| {
                    EngineError::ConstraintRequired("ctree requires func_addr = ...".into())
                })?;
                let result = ws.decompile(func_addr, false)?;
                Ok(result
                    .ctree
                    .into_iter()
                    .map(|n| {
                        let rowid = n.item_id;
                        (
                            vec![
                                ColumnValue::ea(n.func_ea),
                                ColumnValue::int(n.item_id),
                                ColumnValue::bool_int(n.is_expr),
                                ColumnValue::text(n.op_name),
                                ColumnValue::opt_ea(n.ea),
                                ColumnValue::opt_int(n.parent_id),
                                ColumnValue::int(n.depth),
                                ColumnValue::opt_int(n.x_id),
                                ColumnValue::opt_int(n.y_id),
                                ColumnValue::opt_int(n.z_id),
                                ColumnValue::opt_int(n.var_idx),
                                ColumnValue::opt_text(n.var_name),
                                ColumnValue::opt_ea(n.obj_ea),
                                ColumnValue::opt_text(n.obj_name),
                                ColumnValue::opt_int(n.num_value),
                                ColumnValue::opt_text(n.str_value),
                            ],
                            rowid,
                        )
                    })
                    .collect())
            }),
        },
        update: UpdateOps::default(),
        adapter: adapter.clone(),
        policy: policy.clone(),
    };
    register_cache_table(conn, descriptor)
}

const LV_FUNC_ADDR: usize = 0;
const LV_NAME: usize = 2;
const LV_TYPE: usize = 3;

fn register_lvars(
    conn: &Connection,
    adapter: &Rc<dyn WorkspaceAdapter>,
    policy: &Rc<Policy>,
) -> rusqlite::Result<()> {
    let descriptor = TableDescriptor {
        name: "ctree_lvars",
        columns: vec![
            ColumnDef::ro("func_addr").required_eq(),
            ColumnDef::ro("idx"),
            ColumnDef::rw("name"),
            ColumnDef::rw("type"),
            ColumnDef::ro("size"),
            ColumnDef::ro("is_arg"),
            ColumnDef::ro("is_stk_var"),
            ColumnDef::ro("stkoff"),
        ],
        shape: Shape::Cache {
            estimate_rows: Box::new(|_ws| 8),
            scan: Box::new(|ws, args| {
                let func_addr = args.eq_ea(LV_FUNC_ADDR).ok_or_else(|| {
                    EngineError::ConstraintRequired("ctree_lvars requires func_addr = ...".into())
                })?;
                let result = ws.decompile(func_addr, false)?;
                Ok(result
                    .lvars
                    .into_iter()
                    .map(|v| {
                        let rowid = (func_addr as i64) << 16 | v.idx;
                        (
                            vec![
                                ColumnValue::ea(v.func_ea),
                                ColumnValue::int(v.idx),
                                ColumnValue::text(v.name),
                                ColumnValue::text(v.type_name),
                                ColumnValue::int(v.size as i64),
                                ColumnValue::bool_int(v.is_arg),
                                ColumnValue::bool_int(v.is_stk_var),
                                ColumnValue::opt_int(v.stkoff),
                            ],
                            rowid,
                        )
                    })
                    .collect())
            }),
        },
        update: UpdateOps {
            update: Some(Box::new(|ws, rowid, row| {
                let idx = rowid & 0xFFFF;
                let func_ea = row[LV_FUNC_ADDR].as_ea().unwrap_or((rowid >> 16) as u64);
                if let Some(name) = row[LV_NAME].as_str() {
                    ws.set_lvar_name(func_ea, idx, name)?;
                }
                if let Some(type_name) = row[LV_TYPE].as_str() {
                    ws.set_lvar_type(func_ea, idx, type_name)?;
                }
                Ok(())
            })),
            ..Default::default()
        },
        adapter: adapter.clone(),
        policy: policy.clone(),
    };
    register_cache_table(conn, descriptor)
}

const CA_FUNC_ADDR: usize = 0;

fn register_call_args(
    conn: &Connection,
    adapter: &Rc<dyn WorkspaceAdapter>,
    policy: &Rc<Policy>,
) -> rusqlite::Result<()> {
    let descriptor = TableDescriptor {
        name: "ctree_call_args",
        columns: vec![
            ColumnDef::ro("func_addr").required_eq(),
            ColumnDef::ro("call_item_id"),
            ColumnDef::ro("arg_index"),
            ColumnDef::ro("arg_item_id"),
        ],
        shape: Shape::Cache {
            estimate_rows: Box::new(|_ws| 16),
            scan: Box::new(|ws, args| {
                let func_addr = args.eq_ea(CA_FUNC_ADDR).ok_or_else(|| {
                    EngineError::ConstraintRequired("ctree_call_args requires func_addr = ...".into())
                })?;
                let result = ws.decompile(func_addr, false)?;
                let mut rowid = 0i64;
                Ok(result
                    .call_args
                    .into_iter()
                    .map(|a| {
                        let row = vec![
                            ColumnValue::ea(a.func_ea),
                            ColumnValue::int(a.call_item_id),
                            ColumnValue::int(a.arg_index),
                            ColumnValue::int(a.arg_item_id),
                        ];
                        let id = rowid;
                        rowid += 1;
                        (row, id)
                    })
                    .collect())
            }),
        },
        update: UpdateOps::default(),
        adapter: adapter.clone(),
        policy: policy.clone(),
    };
    register_cache_table(conn, descriptor)
}
