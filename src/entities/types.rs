//! `types`, `types_members`, `types_enum_values`, `types_func_args` (§3
//! Type/Type member/Enum value/Function-arg row, §4.C "support CRUD for
//! types/members/enum values"): all cache shape. The workspace has no
//! native type index, only traversal, so there's no index-shaped variant
//! here the way `funcs`/`segments` get one.
//!
//! `*_resolved` columns (§3 Function-arg row "resolve typedefs
//! transitively") are computed here rather than in the adapter: the stub
//! (and any faithful adapter) only needs to hand back the surface type
//! text, and resolving a typedef chain through `types` is the same
//! recursive walk regardless of which workspace backs it.

use std::rc::Rc;

use rusqlite::Connection;

use crate::adapter::{TypeKind, WorkspaceAdapter};
use crate::error::EngineError;
use crate::policy::Policy;
use crate::value::ColumnValue;
use crate::vtab::descriptor::{ColumnDef, Shape, TableDescriptor, UpdateOps};
use crate::vtab::pushdown::PushOp;
use crate::vtab::register_cache_table;

pub fn register(
    conn: &Connection,
    adapter: &Rc<dyn WorkspaceAdapter>,
    policy: &Rc<Policy>,
) -> rusqlite::Result<()> {
    register_types(conn, adapter, policy)?;
    register_members(conn, adapter, policy)?;
    register_enum_values(conn, adapter, policy)?;
    register_func_args(conn, adapter, policy)
}

fn parse_kind(s: &str) -> Result<TypeKind, EngineError> {
    Ok(match s.to_ascii_lowercase().as_str() {
        "struct" => TypeKind::Struct,
        "union" => TypeKind::Union,
        "enum" => TypeKind::Enum,
        "typedef" => TypeKind::Typedef,
        "func" => TypeKind::Func,
        other => {
            return Err(EngineError::InvalidArgument(format!(
                "unknown type kind '{other}'"
            )))
        }
    })
}

const T_NAME: usize = 1;
const T_SIZE: usize = 2;
const T_KIND: usize = 3;

fn register_types(
    conn: &Connection,
    adapter: &Rc<dyn WorkspaceAdapter>,
    policy: &Rc<Policy>,
) -> rusqlite::Result<()> {
    let descriptor = TableDescriptor {
        name: "types",
        columns: vec![
            ColumnDef::ro("ordinal"),
            ColumnDef::rw("name"),
            ColumnDef::rw("size"),
            ColumnDef::rw("kind"),
        ],
        shape: Shape::Cache {
            estimate_rows: Box::new(|_ws| 32),
            scan: Box::new(|ws, _args| {
                let mut rows = Vec::new();
                ws.for_each_type(&mut |t| {
                    rows.push((
                        vec![
                            ColumnValue::int(t.ordinal),
                            ColumnValue::text(t.name.clone()),
                            ColumnValue::int(t.size as i64),
                            ColumnValue::text(t.kind.name()),
                        ],
                        t.ordinal,
                    ));
                    true
                });
                Ok(rows)
            }),
        },
        update: UpdateOps {
            insert: Some(Box::new(|ws, row| {
                let name = row[T_NAME]
                    .as_str()
                    .ok_or_else(|| EngineError::InvalidArgument("types.name is required".into()))?;
                let size = row[T_SIZE].as_i64().unwrap_or(0) as u64;
                let kind = row[T_KIND]
                    .as_str()
                    .map(parse_kind)
                    .transpose()?
                    .unwrap_or(TypeKind::Struct);
                ws.create_type(name, kind, size)
            })),
            update: Some(Box::new(|ws, rowid, row| {
                let name = row[T_NAME].as_str().ok_or_else(|| {
                    EngineError::InvalidArgument("types.name is required".into())
                })?;
                let size = row[T_SIZE].as_i64().unwrap_or(0) as u64;
                ws.update_type(rowid, name, size)
            })),
            delete: Some(Box::new(|ws, rowid| ws.delete_type(rowid))),
        },
        adapter: adapter.clone(),
        policy: policy.clone(),
    };
    register_cache_table(conn, descriptor)
}

const TM_TYPE_ORDINAL: usize = 0;
const TM_NAME: usize = 1;
const TM_OFFSET: usize = 2;
const TM_SIZE: usize = 3;
const TM_TYPE: usize = 4;
const TM_FLAGS: usize = 5;

fn register_members(
    conn: &Connection,
    adapter: &Rc<dyn WorkspaceAdapter>,
    policy: &Rc<Policy>,
) -> rusqlite::Result<()> {
    let descriptor = TableDescriptor {
        name: "types_members",
        columns: vec![
            ColumnDef::ro("type_ordinal")
                .with_pushdown(&[PushOp::Eq])
                .required_eq(),
            ColumnDef::rw("member_name"),
            ColumnDef::rw("offset"),
            ColumnDef::rw("size"),
            ColumnDef::rw("member_type"),
            ColumnDef::rw("flags"),
        ],
        shape: Shape::Cache {
            estimate_rows: Box::new(|_ws| 8),
            scan: Box::new(|ws, args| {
                let type_ordinal = args.eq.get(&TM_TYPE_ORDINAL).and_then(ColumnValue::as_i64).ok_or_else(|| {
                    EngineError::ConstraintRequired("types_members requires type_ordinal = ...".into())
                })?;
                let mut rows = Vec::new();
                let mut rowid = 0i64;
                ws.for_each_type_member(type_ordinal, &mut |m| {
                    rows.push((
                        vec![
                            ColumnValue::int(m.type_ordinal),
                            ColumnValue::text(m.member_name.clone()),
                            ColumnValue::int(m.offset as i64),
                            ColumnValue::int(m.size as i64),
                            ColumnValue::text(m.member_type.clone()),
                            ColumnValue::int(m.flags as i64),
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
            insert: Some(Box::new(|ws, row| {
                let member = member_from_row(row)?;
                ws.create_type_member(member)?;
                Ok(0)
            })),
            update: Some(Box::new(|ws, _rowid, row| {
                let type_ordinal = row[TM_TYPE_ORDINAL]
                    .as_i64()
                    .ok_or_else(|| EngineError::InvalidArgument("type_ordinal is required".into()))?;
                let member_name = row[TM_NAME]
                    .as_str()
                    .ok_or_else(|| EngineError::InvalidArgument("member_name is required".into()))?
                    .to_string();
                let member = member_from_row(row)?;
                ws.update_type_member(type_ordinal, &member_name, member)
            })),
            delete: None,
        },
        adapter: adapter.clone(),
        policy: policy.clone(),
    };
    register_cache_table(conn, descriptor)
}

fn member_from_row(row: &crate::value::Row) -> Result<crate::adapter::TypeMemberInfo, EngineError> {
    Ok(crate::adapter::TypeMemberInfo {
        type_ordinal: row[TM_TYPE_ORDINAL]
            .as_i64()
            .ok_or_else(|| EngineError::InvalidArgument("type_ordinal is required".into()))?,
        member_name: row[TM_NAME]
            .as_str()
            .ok_or_else(|| EngineError::InvalidArgument("member_name is required".into()))?
            .to_string(),
        offset: row[TM_OFFSET].as_i64().unwrap_or(0) as u64,
        size: row[TM_SIZE].as_i64().unwrap_or(0) as u64,
        member_type: row[TM_TYPE].as_str().unwrap_or("int").to_string(),
        flags: row[TM_FLAGS].as_i64().unwrap_or(0) as u32,
    })
}

const EV_TYPE_ORDINAL: usize = 0;
const EV_NAME: usize = 1;
const EV_VALUE: usize = 2;
const EV_COMMENT: usize = 3;

fn register_enum_values(
    conn: &Connection,
    adapter: &Rc<dyn WorkspaceAdapter>,
    policy: &Rc<Policy>,
) -> rusqlite::Result<()> {
    let descriptor = TableDescriptor {
        name: "types_enum_values",
        columns: vec![
            ColumnDef::ro("type_ordinal")
                .with_pushdown(&[PushOp::Eq])
                .required_eq(),
            ColumnDef::rw("value_name"),
            ColumnDef::rw("value"),
            ColumnDef::rw("comment"),
        ],
        shape: Shape::Cache {
            estimate_rows: Box::new(|_ws| 8),
            scan: Box::new(|ws, args| {
                let type_ordinal = args.eq.get(&EV_TYPE_ORDINAL).and_then(ColumnValue::as_i64).ok_or_else(|| {
                    EngineError::ConstraintRequired("types_enum_values requires type_ordinal = ...".into())
                })?;
                let mut rows = Vec::new();
                let mut rowid = 0i64;
                ws.for_each_enum_value(type_ordinal, &mut |v| {
                    rows.push((
                        vec![
                            ColumnValue::int(v.type_ordinal),
                            ColumnValue::text(v.value_name.clone()),
                            ColumnValue::int(v.value),
                            ColumnValue::opt_text(v.comment.clone()),
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
            insert: Some(Box::new(|ws, row| {
                let value = enum_value_from_row(row)?;
                ws.create_enum_value(value)?;
                Ok(0)
            })),
            update: Some(Box::new(|ws, _rowid, row| {
                let type_ordinal = row[EV_TYPE_ORDINAL]
                    .as_i64()
                    .ok_or_else(|| EngineError::InvalidArgument("type_ordinal is required".into()))?;
                let value_name = row[EV_NAME]
                    .as_str()
                    .ok_or_else(|| EngineError::InvalidArgument("value_name is required".into()))?
                    .to_string();
                let value = enum_value_from_row(row)?;
                ws.update_enum_value(type_ordinal, &value_name, value)
            })),
            delete: None,
        },
        adapter: adapter.clone(),
        policy: policy.clone(),
    };
    register_cache_table(conn, descriptor)
}

fn enum_value_from_row(row: &crate::value::Row) -> Result<crate::adapter::EnumValueInfo, EngineError> {
    Ok(crate::adapter::EnumValueInfo {
        type_ordinal: row[EV_TYPE_ORDINAL]
            .as_i64()
            .ok_or_else(|| EngineError::InvalidArgument("type_ordinal is required".into()))?,
        value_name: row[EV_NAME]
            .as_str()
            .ok_or_else(|| EngineError::InvalidArgument("value_name is required".into()))?
            .to_string(),
        value: row[EV_VALUE].as_i64().unwrap_or(0),
        comment: row[EV_COMMENT].as_str().map(str::to_string),
    })
}

const FA_TYPE_ORDINAL: usize = 0;

/// Walks a `(base_type, resolved_base_type)` pair through `types` typedef
/// chains up to a depth bound, so a cycle in bad workspace data can't hang
/// a query.
fn resolve_typedef(ws: &dyn WorkspaceAdapter, type_name: &str) -> String {
    let mut current = type_name.to_string();
    for _ in 0..16 {
        let mut next = None;
        ws.for_each_type(&mut |t| {
            if t.kind == TypeKind::Typedef && t.name == current {
                next = Some(t.name.clone());
            }
            next.is_none()
        });
        match next {
            Some(n) if n != current => current = n,
            _ => break,
        }
    }
    current
}

fn ptr_depth(type_name: &str) -> i64 {
    type_name.chars().filter(|c| *c == '*').count() as i64
}

fn register_func_args(
    conn: &Connection,
    adapter: &Rc<dyn WorkspaceAdapter>,
    policy: &Rc<Policy>,
) -> rusqlite::Result<()> {
    let descriptor = TableDescriptor {
        name: "types_func_args",
        columns: vec![
            ColumnDef::ro("type_ordinal")
                .with_pushdown(&[PushOp::Eq])
                .required_eq(),
            ColumnDef::ro("arg_index"),
            ColumnDef::ro("arg_name"),
            ColumnDef::ro("arg_type"),
            ColumnDef::ro("calling_conv"),
            ColumnDef::ro("surface_flags"),
            ColumnDef::ro("resolved_flags"),
            ColumnDef::ro("base_type"),
            ColumnDef::ro("resolved_base_type"),
            ColumnDef::ro("ptr_depth"),
            ColumnDef::ro("resolved_ptr_depth"),
        ],
        shape: Shape::Cache {
            estimate_rows: Box::new(|_ws| 4),
            scan: Box::new(|ws, args| {
                let type_ordinal = args.eq.get(&FA_TYPE_ORDINAL).and_then(ColumnValue::as_i64).ok_or_else(|| {
                    EngineError::ConstraintRequired("types_func_args requires type_ordinal = ...".into())
                })?;
                let mut rows = Vec::new();
                let mut rowid = 0i64;
                ws.for_each_func_arg(type_ordinal, &mut |a| {
                    let base = a.base_type.clone().unwrap_or_else(|| a.arg_type.clone());
                    let resolved_base = a
                        .resolved_base_type
                        .clone()
                        .unwrap_or_else(|| resolve_typedef(ws, &base));
                    rows.push((
                        vec![
                            ColumnValue::int(a.type_ordinal),
                            ColumnValue::int(a.arg_index),
                            ColumnValue::opt_text(a.arg_name.clone()),
                            ColumnValue::text(a.arg_type.clone()),
                            ColumnValue::opt_text(a.calling_conv.clone()),
                            ColumnValue::int(a.surface_flags as i64),
                            ColumnValue::int(a.resolved_flags as i64),
                            ColumnValue::text(base.clone()),
                            ColumnValue::text(resolved_base.clone()),
                            ColumnValue::int(if a.ptr_depth != 0 { a.ptr_depth } else { ptr_depth(&a.arg_type) }),
                            ColumnValue::int(if a.resolved_ptr_depth != 0 {
                                a.resolved_ptr_depth
                            } else {
                                ptr_depth(&resolved_base)
                            }),
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
