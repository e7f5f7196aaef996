//! `instructions` (§3 Instruction): cache shape. `func_addr = ...` pushdown
//! restricts the walk to `decode_instruction` calls between a single
//! function's bounds; without it the table still scans (every function's
//! instructions), which the spec explicitly permits as long as it's a
//! warned fallback rather than a silent one.
//!
//! `operand0..operand3` bound the variadic `operands[]` the adapter
//! returns; functions with more operands than that truncate the tail
//! (no instruction set family in scope exceeds four operands).

use std::rc::Rc;

use rusqlite::Connection;

use crate::adapter::{InstructionInfo, WorkspaceAdapter};
use crate::policy::Policy;
use crate::value::ColumnValue;
use crate::vtab::descriptor::{ColumnDef, Shape, TableDescriptor, UpdateOps};
use crate::vtab::pushdown::PushOp;
use crate::vtab::register_cache_table;

const FUNC_ADDR: usize = 1;
const NUM_OPERAND_COLS: usize = 4;

fn row_of(insn: &InstructionInfo) -> crate::value::Row {
    let mut row = vec![
        ColumnValue::ea(insn.ea),
        ColumnValue::opt_ea(insn.func_ea),
        ColumnValue::int(insn.itype),
        ColumnValue::text(insn.mnemonic.clone()),
        ColumnValue::int(insn.size as i64),
    ];
    for i in 0..NUM_OPERAND_COLS {
        row.push(ColumnValue::opt_text(insn.operands.get(i).cloned()));
    }
    row.push(ColumnValue::text(insn.disasm.clone()));
    row
}

fn walk_function(ws: &dyn WorkspaceAdapter, func_ea: u64, rows: &mut Vec<(crate::value::Row, i64)>) {
    let Some(func) = ws.func_containing(func_ea) else {
        return;
    };
    let mut ea = func.ea;
    while ea < func.end_ea {
        match ws.decode_instruction(ea) {
            Some(insn) => {
                let size = insn.size.max(1) as u64;
                rows.push((row_of(&insn), ea as i64));
                ea += size;
            }
            None => match ws.next_head(ea) {
                Some(next) if next > ea && next < func.end_ea => ea = next,
                _ => break,
            },
        }
    }
}

pub fn register(
    conn: &Connection,
    adapter: &Rc<dyn WorkspaceAdapter>,
    policy: &Rc<Policy>,
) -> rusqlite::Result<()> {
    let mut columns = vec![
        ColumnDef::ro("ea"),
        ColumnDef::ro("func_addr").with_pushdown(&[PushOp::Eq]),
        ColumnDef::ro("itype"),
        ColumnDef::ro("mnemonic"),
        ColumnDef::ro("size"),
    ];
    for i in 0..NUM_OPERAND_COLS {
        columns.push(ColumnDef::ro(match i {
            0 => "operand0",
            1 => "operand1",
            2 => "operand2",
            _ => "operand3",
        }));
    }
    columns.push(ColumnDef::ro("disasm"));

    let descriptor = TableDescriptor {
        name: "instructions",
        columns,
        shape: Shape::Cache {
            estimate_rows: Box::new(|ws| ws.func_qty() * 32),
            scan: Box::new(|ws, args| {
                let mut rows = Vec::new();
                match args.eq_ea(FUNC_ADDR) {
                    Some(func_ea) => walk_function(ws, func_ea, &mut rows),
                    None => {
                        tracing::warn!(
                            "instructions scanned without func_addr constraint; \
                             walking every function"
                        );
                        let mut func_eas = Vec::new();
                        ws.for_each_function(&mut |f| {
                            func_eas.push(f.ea);
                            true
                        });
                        for func_ea in func_eas {
                            walk_function(ws, func_ea, &mut rows);
                        }
                    }
                }
                Ok(rows)
            }),
        },
        update: UpdateOps {
            delete: Some(Box::new(|ws, rowid| ws.delete_instruction(rowid as u64))),
            ..Default::default()
        },
        adapter: adapter.clone(),
        policy: policy.clone(),
    };
    register_cache_table(conn, descriptor)
}
