//! Scalar and table-valued SQL function layer (component D, §4.D): thin
//! wrappers over the workspace adapter (§4.A), registered once per session
//! alongside the entity tables.
//!
//! `rusqlite::Connection::create_scalar_function` requires its closure to be
//! `Send` because the connection type could in principle move threads; this
//! crate's adapter handle is an `Rc`, which isn't. The whole engine is
//! confined to a single workspace thread by construction (component F), so
//! [`AdapterHandle`] asserts `Send` under that invariant — the same pattern
//! `extremedb-rs`'s `LocalEngineRef` uses for its thread-confined SQL engine
//! reference.

use std::fs;
use std::ops::Deref;
use std::rc::Rc;

use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::Connection;
use serde_json::json;

use crate::adapter::{CommentFlavor, WorkspaceAdapter};
use crate::error::EngineError;
use crate::policy::Policy;
use crate::util::{parse_pattern, quote_text};
use crate::value::ColumnValue;

struct AdapterHandle(Rc<dyn WorkspaceAdapter>);
unsafe impl Send for AdapterHandle {}
impl Clone for AdapterHandle {
    fn clone(&self) -> Self {
        AdapterHandle(self.0.clone())
    }
}
impl Deref for AdapterHandle {
    type Target = dyn WorkspaceAdapter;
    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

struct PolicyHandle(Rc<Policy>);
unsafe impl Send for PolicyHandle {}
impl Clone for PolicyHandle {
    fn clone(&self) -> Self {
        PolicyHandle(self.0.clone())
    }
}

const UTF8: FunctionFlags = FunctionFlags::SQLITE_UTF8;

/// Registers every function named in §4.D against `conn`. Called once per
/// session, after [`crate::entities::register_all`] (feature `functions`).
pub fn register_all(
    conn: &Connection,
    adapter: &Rc<dyn WorkspaceAdapter>,
    policy: &Rc<Policy>,
) -> rusqlite::Result<()> {
    let ws = AdapterHandle(adapter.clone());
    let pol = PolicyHandle(policy.clone());
    register_disasm(conn, &ws)?;
    register_lookup(conn, &ws)?;
    register_mutate(conn, &ws)?;
    register_decompile(conn, &ws)?;
    register_search(conn, &ws)?;
    register_generate(conn, &ws)?;
    register_strings(conn, &ws)?;
    register_policy(conn, &ws, &pol)?;
    Ok(())
}

fn ea_arg(ctx: &Context, i: usize) -> rusqlite::Result<u64> {
    Ok(ctx.get::<i64>(i)? as u64)
}

fn opt_i64_arg(ctx: &Context, i: usize, default: i64) -> rusqlite::Result<i64> {
    if ctx.len() > i {
        ctx.get::<i64>(i)
    } else {
        Ok(default)
    }
}

// -- disassembly / address-level reads --------------------------------

fn register_disasm(conn: &Connection, ws: &AdapterHandle) -> rusqlite::Result<()> {
    let w = ws.clone();
    conn.create_scalar_function("disasm", -1, UTF8, move |ctx| {
        let ea = ea_arg(ctx, 0)?;
        let n = opt_i64_arg(ctx, 1, 1)?.max(1) as usize;
        let mut lines = Vec::with_capacity(n);
        let mut cur = Some(ea);
        for _ in 0..n {
            let Some(at) = cur else { break };
            match w.disassemble_line(at) {
                Some(line) => lines.push(line),
                None => break,
            }
            cur = w.next_head(at);
        }
        Ok(ColumnValue::text(lines.join("\n")))
    })?;

    let w = ws.clone();
    conn.create_scalar_function("bytes", 2, UTF8, move |ctx| {
        let ea = ea_arg(ctx, 0)?;
        let n = ctx.get::<i64>(1)?.max(0) as usize;
        let hex = w
            .bytes(ea, n)
            .map(|b| b.iter().map(|x| format!("{x:02x}")).collect::<String>());
        Ok(ColumnValue::opt_text(hex))
    })?;

    let w = ws.clone();
    conn.create_scalar_function("bytes_raw", 2, UTF8, move |ctx| {
        let ea = ea_arg(ctx, 0)?;
        let n = ctx.get::<i64>(1)?.max(0) as usize;
        Ok(match w.bytes(ea, n) {
            Some(b) => ColumnValue::blob(b),
            None => ColumnValue::Null,
        })
    })?;

    let w = ws.clone();
    conn.create_scalar_function("mnemonic", 1, UTF8, move |ctx| {
        let ea = ea_arg(ctx, 0)?;
        Ok(ColumnValue::opt_text(
            w.decode_instruction(ea).map(|i| i.mnemonic),
        ))
    })?;

    let w = ws.clone();
    conn.create_scalar_function("operand", 2, UTF8, move |ctx| {
        let ea = ea_arg(ctx, 0)?;
        let i = ctx.get::<i64>(1)?.max(0) as usize;
        Ok(ColumnValue::opt_text(
            w.decode_instruction(ea).and_then(|insn| insn.operands.get(i).cloned()),
        ))
    })?;

    let w = ws.clone();
    conn.create_scalar_function("operand_type", 2, UTF8, move |ctx| {
        let ea = ea_arg(ctx, 0)?;
        let i = ctx.get::<i64>(1)?.max(0) as usize;
        let kind = w.decode_instruction(ea).and_then(|insn| insn.operands.get(i).cloned()).map(|op| classify_operand(&op));
        Ok(ColumnValue::opt_text(kind))
    })?;

    let w = ws.clone();
    conn.create_scalar_function("operand_value", 2, UTF8, move |ctx| {
        let ea = ea_arg(ctx, 0)?;
        let i = ctx.get::<i64>(1)?.max(0) as usize;
        Ok(ColumnValue::opt_text(
            w.decode_instruction(ea).and_then(|insn| insn.operands.get(i).cloned()),
        ))
    })?;

    let w = ws.clone();
    conn.create_scalar_function("decode_insn", 1, UTF8, move |ctx| {
        let ea = ea_arg(ctx, 0)?;
        Ok(match w.decode_instruction(ea) {
            Some(insn) => ColumnValue::text(
                json!({
                    "ea": insn.ea,
                    "func_ea": insn.func_ea,
                    "itype": insn.itype,
                    "mnemonic": insn.mnemonic,
                    "size": insn.size,
                    "operands": insn.operands,
                    "disasm": insn.disasm,
                })
                .to_string(),
            ),
            None => ColumnValue::Null,
        })
    })?;

    let w = ws.clone();
    conn.create_scalar_function("next_head", 1, UTF8, move |ctx| {
        let ea = ea_arg(ctx, 0)?;
        Ok(ColumnValue::opt_ea(w.next_head(ea)))
    })?;

    let w = ws.clone();
    conn.create_scalar_function("prev_head", 1, UTF8, move |ctx| {
        let ea = ea_arg(ctx, 0)?;
        Ok(ColumnValue::opt_ea(w.prev_head(ea)))
    })?;

    let w = ws.clone();
    conn.create_scalar_function("item_type", 1, UTF8, move |ctx| {
        let ea = ea_arg(ctx, 0)?;
        Ok(ColumnValue::opt_text(w.item_type(ea)))
    })?;

    let w = ws.clone();
    conn.create_scalar_function("item_size", 1, UTF8, move |ctx| {
        let ea = ea_arg(ctx, 0)?;
        Ok(ColumnValue::opt_int(w.item_size(ea).map(|n| n as i64)))
    })?;

    let w = ws.clone();
    conn.create_scalar_function("is_code", 1, UTF8, move |ctx| {
        let ea = ea_arg(ctx, 0)?;
        Ok(ColumnValue::bool_int(w.is_code(ea)))
    })?;

    let w = ws.clone();
    conn.create_scalar_function("is_data", 1, UTF8, move |ctx| {
        let ea = ea_arg(ctx, 0)?;
        Ok(ColumnValue::bool_int(w.is_data(ea)))
    })?;

    let w = ws.clone();
    conn.create_scalar_function("flags_at", 1, UTF8, move |ctx| {
        let ea = ea_arg(ctx, 0)?;
        Ok(ColumnValue::int(
            w.func_containing(ea).map(|f| f.flags as i64).unwrap_or(0),
        ))
    })?;

    let w = ws.clone();
    conn.create_scalar_function("itype", 1, UTF8, move |ctx| {
        let ea = ea_arg(ctx, 0)?;
        Ok(ColumnValue::opt_int(w.decode_instruction(ea).map(|i| i.itype)))
    })?;

    conn.create_scalar_function("hex", 1, UTF8, move |ctx| {
        let v = ctx.get::<i64>(0)?;
        Ok(crate::util::format_hex(v))
    })?;
    Ok(())
}

/// Heuristic operand classification: the adapter hands back operand text,
/// not a structured kind, so this infers `imm`/`mem`/`reg` the way a quick
/// disassembly grep would.
fn classify_operand(op: &str) -> &'static str {
    let op = op.trim();
    if op.starts_with('[') {
        "mem"
    } else if op.starts_with("0x") || op.chars().all(|c| c.is_ascii_digit()) {
        "imm"
    } else {
        "reg"
    }
}

// -- function/segment/name/xref lookups --------------------------------

fn register_lookup(conn: &Connection, ws: &AdapterHandle) -> rusqlite::Result<()> {
    let w = ws.clone();
    conn.create_scalar_function("name_at", 1, UTF8, move |ctx| {
        let ea = ea_arg(ctx, 0)?;
        Ok(ColumnValue::opt_text(w.name_at(ea)))
    })?;

    let w = ws.clone();
    conn.create_scalar_function("func_at", 1, UTF8, move |ctx| {
        let ea = ea_arg(ctx, 0)?;
        Ok(ColumnValue::opt_text(w.func_containing(ea).map(|f| f.name)))
    })?;

    let w = ws.clone();
    conn.create_scalar_function("func_start", 1, UTF8, move |ctx| {
        let ea = ea_arg(ctx, 0)?;
        Ok(ColumnValue::opt_ea(w.func_containing(ea).map(|f| f.ea)))
    })?;

    let w = ws.clone();
    conn.create_scalar_function("func_end", 1, UTF8, move |ctx| {
        let ea = ea_arg(ctx, 0)?;
        Ok(ColumnValue::opt_ea(w.func_containing(ea).map(|f| f.end_ea)))
    })?;

    let w = ws.clone();
    conn.create_scalar_function("func_qty", 0, UTF8, move |_ctx| Ok(ColumnValue::int(w.func_qty() as i64)))?;

    let w = ws.clone();
    conn.create_scalar_function("func_at_index", 1, UTF8, move |ctx| {
        let i = ctx.get::<i64>(0)?.max(0) as usize;
        Ok(ColumnValue::opt_ea(w.func_at_index(i).map(|f| f.ea)))
    })?;

    let w = ws.clone();
    conn.create_scalar_function("xrefs_to", 1, UTF8, move |ctx| {
        let ea = ea_arg(ctx, 0)?;
        let mut xs = Vec::new();
        w.for_each_xref_to(ea, &mut |x| {
            xs.push(json!({"from_ea": x.from_ea, "to_ea": x.to_ea, "kind": x.kind, "is_code": x.is_code}));
            true
        });
        Ok(ColumnValue::text(json!(xs).to_string()))
    })?;

    let w = ws.clone();
    conn.create_scalar_function("xrefs_from", 1, UTF8, move |ctx| {
        let ea = ea_arg(ctx, 0)?;
        let mut xs = Vec::new();
        w.for_each_xref_from(ea, &mut |x| {
            xs.push(json!({"from_ea": x.from_ea, "to_ea": x.to_ea, "kind": x.kind, "is_code": x.is_code}));
            true
        });
        Ok(ColumnValue::text(json!(xs).to_string()))
    })?;

    let w = ws.clone();
    conn.create_scalar_function("segment_at", 1, UTF8, move |ctx| {
        let ea = ea_arg(ctx, 0)?;
        Ok(ColumnValue::opt_text(w.segment_containing(ea).map(|s| s.name)))
    })?;

    let w = ws.clone();
    conn.create_scalar_function("comment_at", 1, UTF8, move |ctx| {
        let ea = ea_arg(ctx, 0)?;
        let c = w
            .comment_at(ea, CommentFlavor::Regular)
            .or_else(|| w.comment_at(ea, CommentFlavor::Repeatable));
        Ok(ColumnValue::opt_text(c))
    })?;

    Ok(())
}

// -- mutators -----------------------------------------------------------

fn register_mutate(conn: &Connection, ws: &AdapterHandle) -> rusqlite::Result<()> {
    let w = ws.clone();
    conn.create_scalar_function("set_comment", -1, UTF8, move |ctx| {
        let ea = ea_arg(ctx, 0)?;
        let text: String = ctx.get(1)?;
        let rep = opt_i64_arg(ctx, 2, 0)? != 0;
        let flavor = if rep { CommentFlavor::Repeatable } else { CommentFlavor::Regular };
        w.set_comment(ea, flavor, &text)?;
        Ok(ColumnValue::bool_int(true))
    })?;

    let w = ws.clone();
    conn.create_scalar_function("set_name", 2, UTF8, move |ctx| {
        let ea = ea_arg(ctx, 0)?;
        let name: String = ctx.get(1)?;
        w.set_name(ea, &name)?;
        Ok(ColumnValue::bool_int(true))
    })?;

    Ok(())
}

// -- decompiler -----------------------------------------------------------

fn register_decompile(conn: &Connection, ws: &AdapterHandle) -> rusqlite::Result<()> {
    let w = ws.clone();
    conn.create_scalar_function("decompile", -1, UTF8, move |ctx| {
        let ea = ea_arg(ctx, 0)?;
        let force = opt_i64_arg(ctx, 1, 0)? != 0;
        let result = w.decompile(ea, force)?;
        let text: String = result
            .lines
            .iter()
            .map(|l| l.line.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        Ok(ColumnValue::text(text))
    })?;

    let w = ws.clone();
    conn.create_scalar_function("list_lvars", 1, UTF8, move |ctx| {
        let ea = ea_arg(ctx, 0)?;
        let result = w.decompile(ea, false)?;
        let arr: Vec<_> = result
            .lvars
            .iter()
            .map(|v| {
                json!({
                    "idx": v.idx,
                    "name": v.name,
                    "type": v.type_name,
                    "size": v.size,
                    "is_arg": v.is_arg,
                    "is_stk_var": v.is_stk_var,
                    "stkoff": v.stkoff,
                })
            })
            .collect();
        Ok(ColumnValue::text(json!(arr).to_string()))
    })?;

    let w = ws.clone();
    conn.create_scalar_function("rename_lvar", 3, UTF8, move |ctx| {
        let ea = ea_arg(ctx, 0)?;
        let old: String = ctx.get(1)?;
        let new: String = ctx.get(2)?;
        let result = w.decompile(ea, false)?;
        let idx = result
            .lvars
            .iter()
            .find(|v| v.name == old)
            .map(|v| v.idx)
            .ok_or(EngineError::NotFound)?;
        w.set_lvar_name(ea, idx, &new)?;
        Ok(ColumnValue::bool_int(true))
    })?;

    Ok(())
}

// -- binary-pattern / entity search --------------------------------------

fn register_search(conn: &Connection, ws: &AdapterHandle) -> rusqlite::Result<()> {
    let w = ws.clone();
    conn.create_scalar_function("search_bytes", -1, UTF8, move |ctx| {
        let pattern_text: String = ctx.get(0)?;
        let pattern = parse_pattern(&pattern_text)?;
        let start = if ctx.len() > 1 { Some(ea_arg(ctx, 1)?) } else { None };
        let end = if ctx.len() > 2 { Some(ea_arg(ctx, 2)?) } else { None };
        let hits = w.search_bytes(&pattern, start, end);
        let arr: Vec<_> = hits.iter().map(|ea| json!({"address": ea})).collect();
        Ok(ColumnValue::text(json!(arr).to_string()))
    })?;

    let w = ws.clone();
    conn.create_scalar_function("search_first", -1, UTF8, move |ctx| {
        let pattern_text: String = ctx.get(0)?;
        let pattern = parse_pattern(&pattern_text)?;
        let start = if ctx.len() > 1 { Some(ea_arg(ctx, 1)?) } else { None };
        let end = if ctx.len() > 2 { Some(ea_arg(ctx, 2)?) } else { None };
        Ok(ColumnValue::opt_ea(w.search_bytes(&pattern, start, end).into_iter().next()))
    })?;

    let w = ws.clone();
    conn.create_scalar_function("jump_search", 4, UTF8, move |ctx| {
        let pattern: String = ctx.get(0)?;
        let mode: String = ctx.get(1)?;
        let limit = ctx.get::<i64>(2)?.max(0) as usize;
        let offset = ctx.get::<i64>(3)?.max(0) as usize;
        let rows = crate::entities::jump::search(&*w, &pattern, &mode, None)?;
        let arr: Vec<_> = rows
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(row_to_json)
            .collect();
        Ok(ColumnValue::text(json!(arr).to_string()))
    })?;

    conn.create_scalar_function("jump_query", 4, UTF8, move |ctx| {
        let pattern: String = ctx.get(0)?;
        let mode: String = ctx.get(1)?;
        let limit = ctx.get::<i64>(2)?;
        let offset = ctx.get::<i64>(3)?;
        Ok(ColumnValue::text(format!(
            "SELECT name, kind, address, ordinal, parent_name, full_name FROM jump_entities({}, {}) LIMIT {} OFFSET {}",
            quote_text(&pattern),
            quote_text(&mode),
            limit,
            offset,
        )))
    })?;

    Ok(())
}

fn row_to_json(row: crate::value::Row) -> serde_json::Value {
    json!({
        "name": row[0].as_str(),
        "kind": row[1].as_str(),
        "address": row[2].as_i64(),
        "ordinal": row[3].as_i64(),
        "parent_name": row[4].as_str(),
        "full_name": row[5].as_str(),
    })
}

// -- file / graph generation ---------------------------------------------

fn register_generate(conn: &Connection, ws: &AdapterHandle) -> rusqlite::Result<()> {
    let w = ws.clone();
    conn.create_scalar_function("gen_asm_file", 1, UTF8, move |ctx| {
        let path: String = ctx.get(0)?;
        let mut out = String::new();
        w.for_each_function(&mut |f| {
            out.push_str(&format!("; --- {} @ {:x} ---\n", f.name, f.ea));
            let mut cur = Some(f.ea);
            while let Some(ea) = cur {
                if ea >= f.end_ea {
                    break;
                }
                if let Some(line) = w.disassemble_line(ea) {
                    out.push_str(&format!("{ea:08x}  {line}\n"));
                }
                cur = w.next_head(ea);
            }
            out.push('\n');
            true
        });
        write_and_len(&path, &out)
    })?;

    let w = ws.clone();
    conn.create_scalar_function("gen_lst_file", 1, UTF8, move |ctx| {
        let path: String = ctx.get(0)?;
        let mut out = String::new();
        w.for_each_function(&mut |f| {
            let mut cur = Some(f.ea);
            while let Some(ea) = cur {
                if ea >= f.end_ea {
                    break;
                }
                if let Some(insn) = w.decode_instruction(ea) {
                    let bytes = w.bytes(ea, insn.size as usize).unwrap_or_default();
                    let hex: String = bytes.iter().map(|b| format!("{b:02X} ")).collect();
                    out.push_str(&format!("{:08X} {:<24}{}\n", ea, hex, insn.disasm));
                }
                cur = w.next_head(ea);
            }
            true
        });
        write_and_len(&path, &out)
    })?;

    let w = ws.clone();
    conn.create_scalar_function("gen_map_file", 1, UTF8, move |ctx| {
        let path: String = ctx.get(0)?;
        let mut out = String::new();
        w.for_each_function(&mut |f| {
            out.push_str(&format!("{:08X} {:08X} {}\n", f.ea, f.size, f.name));
            true
        });
        write_and_len(&path, &out)
    })?;

    let w = ws.clone();
    conn.create_scalar_function("gen_idc_file", 1, UTF8, move |ctx| {
        let path: String = ctx.get(0)?;
        let mut out = String::from("#include <idc.idc>\nstatic main() {\n");
        w.for_each_name(&mut |ea, name| {
            out.push_str(&format!("    MakeNameEx(0x{ea:X}, \"{name}\", SN_CHECK);\n"));
            true
        });
        w.for_each_comment(&mut |ea, flavor, text| {
            let text = text.replace('"', "\\\"");
            let call = match flavor {
                CommentFlavor::Regular => "MakeComm",
                CommentFlavor::Repeatable => "MakeRptCmt",
            };
            out.push_str(&format!("    {call}(0x{ea:X}, \"{text}\");\n"));
            true
        });
        out.push_str("}\n");
        write_and_len(&path, &out)
    })?;

    let w = ws.clone();
    conn.create_scalar_function("gen_html_file", 1, UTF8, move |ctx| {
        let path: String = ctx.get(0)?;
        let mut out = String::from("<html><body><table border=\"1\">\n<tr><th>address</th><th>size</th><th>name</th></tr>\n");
        w.for_each_function(&mut |f| {
            out.push_str(&format!(
                "<tr><td>{:08X}</td><td>{}</td><td>{}</td></tr>\n",
                f.ea, f.size, html_escape(&f.name)
            ));
            true
        });
        out.push_str("</table></body></html>\n");
        write_and_len(&path, &out)
    })?;

    let w = ws.clone();
    conn.create_scalar_function("gen_cfg_dot", 1, UTF8, move |ctx| {
        let ea = ea_arg(ctx, 0)?;
        Ok(ColumnValue::text(cfg_dot(&w, ea)))
    })?;

    let w = ws.clone();
    conn.create_scalar_function("gen_cfg_dot_file", 2, UTF8, move |ctx| {
        let ea = ea_arg(ctx, 0)?;
        let path: String = ctx.get(1)?;
        write_and_len(&path, &cfg_dot(&w, ea))
    })?;

    conn.create_scalar_function("gen_schema_dot", 0, UTF8, move |_ctx| Ok(ColumnValue::text(schema_dot())))?;

    Ok(())
}

fn cfg_dot(ws: &AdapterHandle, func_ea: u64) -> String {
    let blocks = ws.basic_blocks(func_ea);
    let loops = ws.loops(func_ea);
    let mut out = format!("digraph cfg_{func_ea:x} {{\n");
    for b in &blocks {
        out.push_str(&format!("  \"{:x}\" [label=\"{:x}-{:x}\"];\n", b.start_ea, b.start_ea, b.end_ea));
    }
    for w in blocks.windows(2) {
        out.push_str(&format!("  \"{:x}\" -> \"{:x}\";\n", w[0].start_ea, w[1].start_ea));
    }
    for l in &loops {
        out.push_str(&format!("  \"{:x}\" -> \"{:x}\" [style=dashed,label=\"loop\"];\n", l.back_edge_ea, l.header_ea));
    }
    out.push_str("}\n");
    out
}

fn schema_dot() -> String {
    const TABLES: &[&str] = &[
        "funcs", "segments", "names", "comments", "entries", "imports", "strings", "xrefs",
        "blocks", "bookmarks", "breakpoints", "instructions", "types", "types_members",
        "types_enum_values", "types_func_args", "pseudocode", "ctree", "ctree_lvars",
        "ctree_call_args", "fixups", "fchunks", "problems", "hidden_ranges", "signatures",
        "stack_vars", "disasm_calls", "disasm_loops",
    ];
    let mut out = String::from("digraph schema {\n");
    for t in TABLES {
        out.push_str(&format!("  \"{t}\";\n"));
    }
    out.push_str("}\n");
    out
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn write_and_len(path: &str, content: &str) -> rusqlite::Result<ColumnValue> {
    fs::write(path, content)
        .map_err(|e| EngineError::WorkspaceError(format!("writing {path}: {e}")))?;
    Ok(ColumnValue::int(content.len() as i64))
}

// -- strings / persistence ------------------------------------------------

fn register_strings(conn: &Connection, ws: &AdapterHandle) -> rusqlite::Result<()> {
    let w = ws.clone();
    conn.create_scalar_function("string_count", 0, UTF8, move |_ctx| Ok(ColumnValue::int(w.string_count() as i64)))?;

    let w = ws.clone();
    conn.create_scalar_function("rebuild_strings", -1, UTF8, move |ctx| {
        let min_length = opt_i64_arg(ctx, 0, 4)?.max(0) as u32;
        let type_mask = opt_i64_arg(ctx, 1, 0)? as u32;
        Ok(ColumnValue::int(w.rebuild_strings(min_length, type_mask)? as i64))
    })?;

    let w = ws.clone();
    conn.create_scalar_function("save_database", 0, UTF8, move |_ctx| Ok(ColumnValue::bool_int(w.save_database())))?;

    Ok(())
}

// -- policy ---------------------------------------------------------------

fn register_policy(conn: &Connection, ws: &AdapterHandle, pol: &PolicyHandle) -> rusqlite::Result<()> {
    let p = pol.clone();
    let w = ws.clone();
    conn.create_scalar_function("config", 2, UTF8, move |ctx| {
        let key: String = ctx.get(0)?;
        let value: String = ctx.get(1)?;
        let was_batch_off = key.eq_ignore_ascii_case("batch") && value.eq_ignore_ascii_case("off");
        p.0.set(&key, &value)?;
        if was_batch_off {
            if let Some(handle) = p.0.take_batch_handle() {
                w.close_undo(handle);
            }
        }
        Ok(ColumnValue::bool_int(true))
    })?;
    Ok(())
}
