//! `jump_entities(pattern, mode)` (§4.D "global name/address search" TVF):
//! the workspace-wide incremental search behind a `Ctrl+`-style jump-to
//! dialog, exposed as a table-valued function rather than a fixed table
//! since its row set depends entirely on the call arguments.
//!
//! Columns: `name, kind, address, ordinal, parent_name, full_name`, plus
//! the two required hidden arguments `pattern, mode`. `kind` is one of
//! `function, label, segment, struct, union, enum, member, enum_member`.
//! Iteration order is the declared union order below; sources stop being
//! consulted once the caller's `LIMIT` is satisfied.

use std::rc::Rc;

use rusqlite::Connection;

use crate::adapter::WorkspaceAdapter;
use crate::error::EngineError;
use crate::policy::Policy;
use crate::value::{ColumnValue, Row};
use crate::vtab::descriptor::{ColumnDef, Shape, TableDescriptor, UpdateOps};
use crate::vtab::register_tvf;

const PATTERN: usize = 6;
const MODE: usize = 7;

pub fn register(
    conn: &Connection,
    adapter: &Rc<dyn WorkspaceAdapter>,
    policy: &Rc<Policy>,
) -> rusqlite::Result<()> {
    let descriptor = TableDescriptor {
        name: "jump_entities",
        columns: vec![
            ColumnDef::ro("name"),
            ColumnDef::ro("kind"),
            ColumnDef::ro("address"),
            ColumnDef::ro("ordinal"),
            ColumnDef::ro("parent_name"),
            ColumnDef::ro("full_name"),
            ColumnDef::ro("pattern").required_hidden(),
            ColumnDef::ro("mode").required_hidden(),
        ],
        shape: Shape::Tvf {
            run: Box::new(|ws, args, limit| {
                let pattern = args.eq_str(PATTERN).ok_or_else(|| {
                    EngineError::ConstraintRequired("jump_entities requires pattern = ...".into())
                })?;
                let mode = args.eq_str(MODE).ok_or_else(|| {
                    EngineError::ConstraintRequired("jump_entities requires mode = ...".into())
                })?;
                search(ws, pattern, mode, limit)
            }),
        },
        update: UpdateOps::default(),
        adapter: adapter.clone(),
        policy: policy.clone(),
    };
    register_tvf(conn, descriptor)
}

fn matches(mode: &str, needle_lower: &str, haystack: &str) -> bool {
    let haystack = haystack.to_ascii_lowercase();
    match mode {
        "contains" => haystack.contains(needle_lower),
        _ => haystack.starts_with(needle_lower),
    }
}

fn row(
    name: &str,
    kind: &str,
    address: Option<u64>,
    ordinal: Option<i64>,
    parent_name: Option<&str>,
) -> Row {
    let full_name = match parent_name {
        Some(p) => format!("{p}.{name}"),
        None => name.to_string(),
    };
    vec![
        ColumnValue::text(name.to_string()),
        ColumnValue::text(kind.to_string()),
        ColumnValue::opt_ea(address),
        ColumnValue::opt_int(ordinal),
        ColumnValue::opt_text(parent_name.map(str::to_string)),
        ColumnValue::text(full_name),
    ]
}

/// Shared by the TVF cursor and the `jump_search`/`jump_query` scalar
/// helpers so both surfaces enumerate entities identically.
pub(crate) fn search(
    ws: &dyn WorkspaceAdapter,
    pattern: &str,
    mode: &str,
    limit: Option<i64>,
) -> crate::error::EngineResult<Vec<Row>> {
    let mut rows = Vec::new();
    if pattern.is_empty() {
        return Ok(rows);
    }
    let needle = pattern.to_ascii_lowercase();
    let limit = limit.map(|n| n.max(0) as usize);
    let done = |rows: &Vec<Row>| limit.is_some_and(|l| rows.len() >= l);

    let mut function_starts = std::collections::HashSet::new();
    ws.for_each_function(&mut |f| {
        function_starts.insert(f.ea);
        if matches(mode, &needle, &f.name) {
            rows.push(row(&f.name, "function", Some(f.ea), None, None));
        }
        !done(&rows)
    });
    if done(&rows) {
        return Ok(rows);
    }

    ws.for_each_name(&mut |ea, name| {
        if !function_starts.contains(&ea) && matches(mode, &needle, name) {
            rows.push(row(name, "label", Some(ea), None, None));
        }
        !done(&rows)
    });
    if done(&rows) {
        return Ok(rows);
    }

    ws.for_each_segment(&mut |s| {
        if matches(mode, &needle, &s.name) {
            rows.push(row(&s.name, "segment", Some(s.start_ea), None, None));
        }
        !done(&rows)
    });
    if done(&rows) {
        return Ok(rows);
    }

    let mut type_list = Vec::new();
    ws.for_each_type(&mut |t| {
        type_list.push(t.clone());
        true
    });
    for t in &type_list {
        if done(&rows) {
            break;
        }
        let kind = t.kind.name();
        if matches!(kind, "struct" | "union" | "enum") && matches(mode, &needle, &t.name) {
            rows.push(row(&t.name, kind, None, Some(t.ordinal), None));
        }
    }
    if done(&rows) {
        return Ok(rows);
    }

    for t in &type_list {
        if done(&rows) {
            break;
        }
        if matches!(t.kind, crate::adapter::TypeKind::Struct | crate::adapter::TypeKind::Union) {
            ws.for_each_type_member(t.ordinal, &mut |m| {
                if matches(mode, &needle, &m.member_name) {
                    rows.push(row(&m.member_name, "member", None, Some(t.ordinal), Some(&t.name)));
                }
                !done(&rows)
            });
        }
    }
    if done(&rows) {
        return Ok(rows);
    }

    for t in &type_list {
        if done(&rows) {
            break;
        }
        if t.kind == crate::adapter::TypeKind::Enum {
            ws.for_each_enum_value(t.ordinal, &mut |v| {
                if matches(mode, &needle, &v.value_name) {
                    rows.push(row(&v.value_name, "enum_member", None, Some(t.ordinal), Some(&t.name)));
                }
                !done(&rows)
            });
        }
    }

    Ok(rows)
}
