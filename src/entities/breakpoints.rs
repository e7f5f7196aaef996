//! `breakpoints` (§3 Breakpoint): cache shape, full CRUD. Defaults are
//! `type=sw`, `enabled=1`, `size=0`, `group=""` when omitted on INSERT.
//! `type` accepts the numeric [`BreakpointType`] code on write; `type_name`
//! is the read-only text projection of the same value.

use std::rc::Rc;

use rusqlite::Connection;

use crate::adapter::{BreakpointInfo, BreakpointType, WorkspaceAdapter};
use crate::error::EngineError;
use crate::policy::Policy;
use crate::value::ColumnValue;
use crate::vtab::descriptor::{ColumnDef, Shape, TableDescriptor, UpdateOps};
use crate::vtab::register_cache_table;

const EA: usize = 0;
const TYPE: usize = 1;
const ENABLED: usize = 3;
const SIZE: usize = 4;
const FLAGS: usize = 5;
const PASS_COUNT: usize = 6;
const CONDITION: usize = 7;
const LOC_TYPE: usize = 8;
const MODULE: usize = 9;
const SYMBOL: usize = 10;
const OFFSET: usize = 11;
const SOURCE_FILE: usize = 12;
const SOURCE_LINE: usize = 13;
const GROUP: usize = 14;

fn row_of(b: &BreakpointInfo) -> (crate::value::Row, i64) {
    let row = vec![
        ColumnValue::ea(b.ea),
        ColumnValue::int(b.kind.code()),
        ColumnValue::text(b.kind.name()),
        ColumnValue::bool_int(b.enabled),
        ColumnValue::int(b.size as i64),
        ColumnValue::int(b.flags as i64),
        ColumnValue::int(b.pass_count as i64),
        ColumnValue::opt_text(b.condition.clone()),
        ColumnValue::opt_text(b.loc_type.clone()),
        ColumnValue::opt_text(b.module.clone()),
        ColumnValue::opt_text(b.symbol.clone()),
        ColumnValue::opt_int(b.offset),
        ColumnValue::opt_text(b.source_file.clone()),
        ColumnValue::opt_int(b.source_line),
        ColumnValue::text(b.group.clone()),
        ColumnValue::int(b.bptid),
    ];
    (row, b.bptid)
}

fn breakpoint_from_row(row: &crate::value::Row, base: BreakpointInfo) -> crate::error::EngineResult<BreakpointInfo> {
    let mut bp = base;
    if let Some(ea) = row[EA].as_ea() {
        bp.ea = ea;
    }
    if let Some(code) = row[TYPE].as_i64() {
        bp.kind = BreakpointType::from_code(code)?;
    }
    if let Some(enabled) = row[ENABLED].as_i64() {
        bp.enabled = enabled != 0;
    }
    if let Some(size) = row[SIZE].as_i64() {
        bp.size = size as u32;
    }
    if let Some(flags) = row[FLAGS].as_i64() {
        bp.flags = flags as u32;
    }
    if let Some(pass_count) = row[PASS_COUNT].as_i64() {
        bp.pass_count = pass_count as u32;
    }
    if let Some(condition) = row[CONDITION].as_str() {
        bp.condition = Some(condition.to_string());
    }
    if let Some(loc_type) = row[LOC_TYPE].as_str() {
        bp.loc_type = Some(loc_type.to_string());
    }
    if let Some(module) = row[MODULE].as_str() {
        bp.module = Some(module.to_string());
    }
    if let Some(symbol) = row[SYMBOL].as_str() {
        bp.symbol = Some(symbol.to_string());
    }
    if let Some(offset) = row[OFFSET].as_i64() {
        bp.offset = Some(offset);
    }
    if let Some(source_file) = row[SOURCE_FILE].as_str() {
        bp.source_file = Some(source_file.to_string());
    }
    if let Some(source_line) = row[SOURCE_LINE].as_i64() {
        bp.source_line = Some(source_line);
    }
    if let Some(group) = row[GROUP].as_str() {
        bp.group = group.to_string();
    }
    Ok(bp)
}

pub fn register(
    conn: &Connection,
    adapter: &Rc<dyn WorkspaceAdapter>,
    policy: &Rc<Policy>,
) -> rusqlite::Result<()> {
    let descriptor = TableDescriptor {
        name: "breakpoints",
        columns: vec![
            ColumnDef::rw("ea"),
            ColumnDef::rw("type"),
            ColumnDef::ro("type_name"),
            ColumnDef::rw("enabled"),
            ColumnDef::rw("size"),
            ColumnDef::rw("flags"),
            ColumnDef::rw("pass_count"),
            ColumnDef::rw("condition"),
            ColumnDef::rw("loc_type"),
            ColumnDef::rw("module"),
            ColumnDef::rw("symbol"),
            ColumnDef::rw("offset"),
            ColumnDef::rw("source_file"),
            ColumnDef::rw("source_line"),
            ColumnDef::rw("group"),
            ColumnDef::ro("bptid"),
        ],
        shape: Shape::Cache {
            estimate_rows: Box::new(|_ws| 8),
            scan: Box::new(|ws, _args| {
                let mut rows = Vec::new();
                ws.for_each_breakpoint(&mut |b| {
                    rows.push(row_of(b));
                    true
                });
                Ok(rows)
            }),
        },
        update: UpdateOps {
            insert: Some(Box::new(|ws, row| {
                let ea = row[EA]
                    .as_ea()
                    .ok_or_else(|| EngineError::InvalidArgument("breakpoints.ea is required".into()))?;
                let bp = breakpoint_from_row(row, BreakpointInfo::new_default(ea))?;
                ws.create_breakpoint(bp)
            })),
            update: Some(Box::new(|ws, rowid, row| {
                let base = BreakpointInfo::new_default(row[EA].as_ea().unwrap_or_default());
                let bp = breakpoint_from_row(row, base)?;
                ws.update_breakpoint(rowid, bp)
            })),
            delete: Some(Box::new(|ws, rowid| ws.delete_breakpoint(rowid))),
        },
        adapter: adapter.clone(),
        policy: policy.clone(),
    };
    register_cache_table(conn, descriptor)
}
