//! Default view catalog (§3 "Default registration", §4.C): plain SQL
//! expressed over the virtual tables, installed once at [`crate::Session`]
//! open the way the teacher's `INITSQL` seeds default schema — only here it
//! is `CREATE VIEW` text instead of `CREATE TABLE`/`CREATE SCHEMA`, since
//! this engine owns no base-table storage of its own.

/// `callers`/`callees`: the call graph read off code `xrefs`, resolving
/// each endpoint's owning function with `func_start`/`func_at` so both
/// views read naturally as `SELECT * FROM callers WHERE func_addr = ...`
/// (who calls this function) and `SELECT * FROM callees WHERE func_addr =
/// ...` (what this function calls) — the column names match the fixed
/// external catalog's `func_addr`/`caller_addr`/`caller_func_addr` and
/// `func_addr`/`func_name`/`callee_addr`/`callee_name`.
const CALLERS_CALLEES: &str = "
CREATE VIEW callers AS
    SELECT x.to_ea AS func_addr,
           x.from_ea AS caller_addr,
           cf.name AS caller_name,
           cf.address AS caller_func_addr
    FROM xrefs x
    JOIN funcs cf ON cf.address = func_start(x.from_ea)
    WHERE x.is_code = 1;

CREATE VIEW callees AS
    SELECT cf.address AS func_addr,
           cf.name AS func_name,
           x.to_ea AS callee_addr,
           name_at(x.to_ea) AS callee_name
    FROM xrefs x
    JOIN funcs cf ON cf.address = func_start(x.from_ea)
    WHERE x.is_code = 1;
";

/// `string_refs`: every xref landing inside a string's location, joined
/// against `strings` so callers don't have to duplicate the join themselves.
const STRING_REFS: &str = "
CREATE VIEW string_refs AS
    SELECT s.ea AS string_ea, s.content, x.from_ea AS ref_ea
    FROM strings s
    JOIN xrefs x ON x.to_ea = s.ea;
";

/// `ctree_v_*`: decompiler output flattened for the common read shapes —
/// one row per pseudocode line with its ctree item (`ctree_v_lines`), local
/// variables re-exposed without the raw rowid encoding (`ctree_v_lvars`),
/// and call expressions paired with their arguments (`ctree_v_calls`).
const CTREE_VIEWS: &str = "
CREATE VIEW ctree_v_lines AS
    SELECT p.func_addr, p.line_num, p.line, p.ea, c.op_name, c.item_id
    FROM pseudocode p
    LEFT JOIN ctree c ON c.func_addr = p.func_addr AND c.ea = p.ea;

CREATE VIEW ctree_v_lvars AS
    SELECT func_addr, idx, name, type, size, is_arg, is_stk_var, stkoff
    FROM ctree_lvars;

CREATE VIEW ctree_v_calls AS
    SELECT c.func_addr, c.item_id AS call_item_id, c.obj_ea AS callee_ea,
           c.obj_name AS callee_name, a.arg_index, a.arg_item_id
    FROM ctree c
    LEFT JOIN ctree_call_args a ON a.func_addr = c.func_addr AND a.call_item_id = c.item_id
    WHERE c.op_name = 'call';
";

/// `types_v_*`: type catalog flattened per kind, so a caller filtering on
/// struct/union/enum doesn't need to repeat the `kind` predicate at every
/// join.
const TYPES_VIEWS: &str = "
CREATE VIEW types_v_structs AS
    SELECT ordinal, name, size FROM types WHERE kind IN ('struct', 'union');

CREATE VIEW types_v_enums AS
    SELECT ordinal, name, size FROM types WHERE kind = 'enum';

CREATE VIEW types_v_members AS
    SELECT type_ordinal, member_name, offset, size, member_type, flags
    FROM types_members;

CREATE VIEW types_v_enum_values AS
    SELECT type_ordinal, value_name, value, comment
    FROM types_enum_values;
";

/// Installs the fixed view catalog on `conn`. Must run after every entity
/// table module has been registered, since each `CREATE VIEW` resolves its
/// underlying virtual tables immediately.
pub fn install_views(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute_batch(CALLERS_CALLEES)?;
    conn.execute_batch(STRING_REFS)?;
    conn.execute_batch(CTREE_VIEWS)?;
    conn.execute_batch(TYPES_VIEWS)?;
    Ok(())
}
