//! `funcs` (§3 Function, §4.C first bullet): index shape over
//! `func_qty`/`func_at_index`. Prototype classification columns are derived
//! from `return_type` when present, else NULL. The start-address column is
//! named `address` (not `ea`) to match the fixed external catalog (§6) and
//! the literal SQL in §8 invariants 3 and 8, which both reference
//! `funcs.address`.

use std::rc::Rc;

use rusqlite::Connection;

use crate::adapter::WorkspaceAdapter;
use crate::policy::Policy;
use crate::value::ColumnValue;
use crate::vtab::descriptor::{ColumnDef, Shape, TableDescriptor, UpdateOps};
use crate::vtab::register_index_table;

const ADDRESS: usize = 0;
const NAME: usize = 1;
const END_EA: usize = 3;
const FLAGS: usize = 4;

fn classify_return(
    return_type: &Option<String>,
) -> (ColumnValue, ColumnValue, ColumnValue, ColumnValue) {
    match return_type {
        None => (
            ColumnValue::Null,
            ColumnValue::Null,
            ColumnValue::Null,
            ColumnValue::Null,
        ),
        Some(t) => {
            let t = t.trim();
            let is_void = t == "void";
            let is_ptr = t.ends_with('*');
            let is_int = t == "int";
            let integral = !is_void
                && !is_ptr
                && matches!(
                    t,
                    "int" | "unsigned int" | "char" | "unsigned char" | "short" | "unsigned short"
                        | "long" | "unsigned long" | "long long" | "unsigned long long" | "bool"
                        | "size_t" | "int8_t" | "int16_t" | "int32_t" | "int64_t" | "uint8_t"
                        | "uint16_t" | "uint32_t" | "uint64_t" | "DWORD" | "BOOL"
                );
            (
                ColumnValue::bool_int(is_ptr),
                ColumnValue::bool_int(is_int),
                ColumnValue::bool_int(integral),
                ColumnValue::bool_int(is_void),
            )
        }
    }
}

pub fn register(
    conn: &Connection,
    adapter: &Rc<dyn WorkspaceAdapter>,
    policy: &Rc<Policy>,
) -> rusqlite::Result<()> {
    let descriptor = TableDescriptor {
        name: "funcs",
        columns: vec![
            ColumnDef::ro("address"),
            ColumnDef::rw("name"),
            ColumnDef::ro("size"),
            ColumnDef::ro("end_ea"),
            ColumnDef::rw("flags"),
            ColumnDef::ro("return_type"),
            ColumnDef::ro("arg_count"),
            ColumnDef::ro("calling_conv"),
            ColumnDef::ro("return_is_ptr"),
            ColumnDef::ro("return_is_int"),
            ColumnDef::ro("return_is_integral"),
            ColumnDef::ro("return_is_void"),
        ],
        shape: Shape::Index {
            count: Box::new(|ws| ws.func_qty()),
            row_at: Box::new(|ws, i| {
                let f = ws.func_at_index(i)?;
                let (ptr, is_int, integral, is_void) = classify_return(&f.return_type);
                let row = vec![
                    ColumnValue::ea(f.ea),
                    ColumnValue::text(f.name),
                    ColumnValue::int(f.size as i64),
                    ColumnValue::ea(f.end_ea),
                    ColumnValue::int(f.flags as i64),
                    ColumnValue::opt_text(f.return_type),
                    ColumnValue::opt_int(f.arg_count),
                    ColumnValue::opt_text(f.calling_conv),
                    ptr,
                    is_int,
                    integral,
                    is_void,
                ];
                Some((row, f.ea as i64))
            }),
        },
        update: UpdateOps {
            insert: Some(Box::new(|ws, row| {
                let ea = row[ADDRESS].as_ea().ok_or_else(|| {
                    crate::error::EngineError::InvalidArgument("funcs.address is required".into())
                })?;
                let end_ea = row[END_EA].as_ea();
                let name = row[NAME].as_str().map(str::to_string);
                ws.create_function(ea, end_ea, name.as_deref())
                    .map(|ea| ea as i64)
            })),
            update: Some(Box::new(|ws, rowid, row| {
                let ea = rowid as u64;
                if let Some(name) = row[NAME].as_str() {
                    ws.rename_function(ea, name)?;
                }
                if let Some(flags) = row[FLAGS].as_i64() {
                    ws.set_function_flags(ea, flags as u32)?;
                }
                Ok(())
            })),
            delete: Some(Box::new(|ws, rowid| ws.delete_function(rowid as u64))),
        },
        adapter: adapter.clone(),
        policy: policy.clone(),
    };
    register_index_table(conn, descriptor)
}
