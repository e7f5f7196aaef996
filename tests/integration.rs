//! End-to-end coverage driving `Session` against `StubWorkspace::with_fixture()`
//! the way a real host would: SQL in, rows out. Exercises entity tables,
//! the `jump_entities` TVF, the view catalog, pushdown-required tables, and
//! export round-tripping.

use std::rc::Rc;

use idasql_engine::adapter::stub::StubWorkspace;
use idasql_engine::adapter::WorkspaceAdapter;
use idasql_engine::export;
use idasql_engine::value::ColumnValue;
use idasql_engine::Session;

fn session() -> Session {
    let ws: Rc<dyn WorkspaceAdapter> = Rc::new(StubWorkspace::with_fixture());
    Session::open(ws, None).unwrap()
}

#[test]
fn funcs_table_lists_fixture_functions() {
    let s = session();
    let result = s
        .query("SELECT address, name FROM funcs ORDER BY address")
        .unwrap();
    assert_eq!(result.rows.len(), 2);
    assert_eq!(result.rows[0][1], ColumnValue::text("main"));
    assert_eq!(result.rows[1][1], ColumnValue::text("helper"));
}

#[test]
fn segments_table_exposes_permissions() {
    let s = session();
    let result = s
        .query("SELECT name FROM segments WHERE class = 'CODE'")
        .unwrap();
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0][0], ColumnValue::text(".text"));
}

#[test]
fn disasm_calls_requires_func_addr_pushdown() {
    let s = session();
    let err = s.query("SELECT * FROM disasm_calls").unwrap_err();
    assert!(matches!(err, idasql_engine::EngineError::ConstraintRequired(_)));

    let result = s
        .query("SELECT callee_name FROM disasm_calls WHERE func_addr = 4096")
        .unwrap();
    assert_eq!(result.rows[0][0], ColumnValue::text("helper"));
}

#[test]
fn jump_entities_finds_functions_and_types_by_prefix() {
    let s = session();
    let result = s
        .query("SELECT name, kind FROM jump_entities('he', 'prefix') ORDER BY name")
        .unwrap();
    let names: Vec<&str> = result.rows.iter().map(|r| r[0].as_str().unwrap()).collect();
    assert_eq!(names, vec!["helper"]);

    let result = s
        .query("SELECT name, kind FROM jump_entities('point', 'contains')")
        .unwrap();
    assert_eq!(result.rows[0][0], ColumnValue::text("point_t"));
    assert_eq!(result.rows[0][1], ColumnValue::text("struct"));
}

#[test]
fn jump_entities_where_form_is_equivalent_to_call_form() {
    let s = session();
    let via_call = s
        .query("SELECT name FROM jump_entities('main', 'prefix')")
        .unwrap();
    let via_where = s
        .query("SELECT name FROM jump_entities WHERE pattern = 'main' AND mode = 'prefix'")
        .unwrap();
    assert_eq!(via_call.rows, via_where.rows);
}

#[test]
fn callers_view_resolves_caller_function_by_func_addr() {
    let s = session();
    let result = s
        .query("SELECT caller_addr, caller_name, caller_func_addr FROM callers WHERE func_addr = 4128")
        .unwrap();
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0][0], ColumnValue::ea(0x1000));
    assert_eq!(result.rows[0][1], ColumnValue::text("main"));
    assert_eq!(result.rows[0][2], ColumnValue::ea(0x1000));
}

#[test]
fn callees_view_resolves_callee_name_by_func_addr() {
    let s = session();
    let result = s
        .query("SELECT callee_addr, callee_name FROM callees WHERE func_addr = 4096")
        .unwrap();
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0][0], ColumnValue::ea(0x1020));
    assert_eq!(result.rows[0][1], ColumnValue::text("helper"));
}

#[test]
fn string_refs_view_joins_strings_and_xrefs() {
    let s = session();
    let result = s.query("SELECT content, ref_ea FROM string_refs").unwrap();
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0][0], ColumnValue::text("hello"));
    assert_eq!(result.rows[0][1], ColumnValue::ea(0x1005));
}

#[test]
fn types_v_structs_view_filters_by_kind() {
    let s = session();
    let result = s.query("SELECT name FROM types_v_structs").unwrap();
    assert_eq!(result.rows[0][0], ColumnValue::text("point_t"));
}

#[test]
fn scalar_functions_resolve_name_and_function_bounds() {
    let s = session();
    assert_eq!(s.scalar("SELECT name_at(4096)").unwrap(), "main");
    assert_eq!(s.scalar("SELECT func_start(4112)").unwrap(), "4096");
    assert_eq!(s.scalar("SELECT hex(255)").unwrap(), "ff");
}

#[test]
fn set_name_mutates_names_table() {
    let s = session();
    s.query("SELECT set_name(4096, 'entrypoint')").unwrap();
    assert_eq!(s.scalar("SELECT name_at(4096)").unwrap(), "entrypoint");
}

#[test]
fn config_function_toggles_policy() {
    let s = session();
    assert!(!s.policy().batch_enabled());
    s.query("SELECT config('batch', 'on')").unwrap();
    assert!(s.policy().batch_enabled());
}

#[test]
fn batch_policy_coalesces_undo_handles() {
    let stub = Rc::new(StubWorkspace::with_fixture());
    let ws: Rc<dyn WorkspaceAdapter> = stub.clone();
    let s = Session::open(ws, None).unwrap();

    s.query("INSERT INTO names (ea, name) VALUES (8192, 'a')").unwrap();
    s.query("UPDATE names SET name = 'b' WHERE ea = 8192").unwrap();
    let before = stub.undo_log().len();

    s.query("SELECT config('batch', 'on')").unwrap();
    s.query("UPDATE names SET name = 'c' WHERE ea = 8192").unwrap();
    s.query("UPDATE names SET name = 'd' WHERE ea = 8192").unwrap();
    assert_eq!(stub.undo_log().len(), before + 1, "batch should open one shared handle");

    s.query("SELECT config('batch', 'off')").unwrap();
    s.query("UPDATE names SET name = 'e' WHERE ea = 8192").unwrap();
    assert_eq!(stub.undo_log().len(), before + 2, "turning batch off opens a fresh per-mutation handle again");
}

#[test]
fn export_round_trips_funcs_through_a_plain_connection() {
    let s = session();
    let conn = s.handle();
    let script = export::export_tables(conn, &["strings"]).unwrap();
    assert!(script.contains("INSERT INTO \"strings\""));

    let plain = rusqlite::Connection::open_in_memory().unwrap();
    plain.execute_batch(&script).unwrap();
    let count: i64 = plain
        .query_row("SELECT COUNT(*) FROM strings", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn split_statements_handles_embedded_semicolons() {
    let stmts = export::split_statements("SELECT ';'; SELECT 2;");
    assert_eq!(stmts, vec!["SELECT ';'", "SELECT 2"]);
}

// §8 scenario S1: at least one code segment (perm bit 1 = X) exists.
#[test]
fn s1_at_least_one_executable_segment() {
    let s = session();
    let count = s.scalar("SELECT COUNT(*) FROM segments WHERE perm & 1 = 1").unwrap();
    assert!(count.parse::<i64>().unwrap() >= 1);
}

// §8 scenario S2: inserting a hardware-write breakpoint round-trips its
// numeric type through `type_name`.
#[test]
fn s2_breakpoint_insert_resolves_type_name() {
    let s = session();
    s.query("INSERT INTO breakpoints(ea, type, size) VALUES (0x401000, 1, 4)")
        .unwrap();
    let result = s
        .query("SELECT type_name, size FROM breakpoints WHERE ea = 0x401000")
        .unwrap();
    assert_eq!(result.rows[0][0], ColumnValue::text("hardware_write"));
    assert_eq!(result.rows[0][1], ColumnValue::int(4));
}

// §8 scenario S3: annotating a decompiled line with a comment round-trips
// through `pseudocode` and is visible on a fresh SELECT.
#[test]
fn s3_pseudocode_update_sets_comment() {
    let s = session();
    s.query(
        "UPDATE pseudocode SET comment = 'zero it', comment_placement = 'semi' \
         WHERE func_addr = 4096 AND ea = 4100",
    )
    .unwrap();
    let result = s
        .query("SELECT comment, comment_placement FROM pseudocode WHERE func_addr = 4096 AND ea = 4100")
        .unwrap();
    assert_eq!(result.rows[0][0], ColumnValue::text("zero it"));
    assert_eq!(result.rows[0][1], ColumnValue::text("semi"));
}

// §8 scenario S4: a byte pattern known to be present resolves to the exact
// address, and `bytes()` confirms the match.
#[test]
fn s4_search_first_locates_known_pattern() {
    let s = session();
    let ea = s.scalar("SELECT search_first('CC CC CC')").unwrap();
    assert_eq!(ea, "4176"); // 0x1050
    let hex = s.scalar("SELECT bytes(4176, 3)").unwrap();
    assert_eq!(hex, "cccccc");
}

// §8 scenario S5: `jump_entities` contains-mode search is case-insensitive
// and LIMIT 1 returns a single matching row.
#[test]
fn s5_jump_entities_contains_is_case_insensitive() {
    let s = session();
    let result = s
        .query("SELECT name, kind FROM jump_entities('MAIN', 'contains') LIMIT 1")
        .unwrap();
    assert_eq!(result.rows.len(), 1);
    assert!(result.rows[0][0]
        .as_str()
        .unwrap()
        .to_ascii_lowercase()
        .contains("main"));
}

// §8 scenario S6: rebuilding the string list never shrinks the ascii count.
#[test]
fn s6_rebuild_strings_does_not_shrink_ascii_count() {
    let s = session();
    let before = s
        .scalar("SELECT COUNT(*) FROM strings WHERE type_name = 'ascii'")
        .unwrap()
        .parse::<i64>()
        .unwrap();
    s.query("SELECT rebuild_strings(5, 1)").unwrap();
    let after = s
        .scalar("SELECT COUNT(*) FROM strings WHERE type_name = 'ascii'")
        .unwrap()
        .parse::<i64>()
        .unwrap();
    assert!(after >= before);
}

// §8 invariant 6: insert/update/delete on `names` leaves no trace behind.
#[test]
fn invariant6_names_round_trip_to_empty() {
    let s = session();
    s.query("INSERT INTO names (ea, name) VALUES (8192, 'tmp')").unwrap();
    s.query("UPDATE names SET name = 'tmp2' WHERE ea = 8192").unwrap();
    s.query("DELETE FROM names WHERE ea = 8192").unwrap();
    let result = s.query("SELECT name FROM names WHERE ea = 8192").unwrap();
    assert!(result.rows.is_empty());
}

// §8 invariant 7: insert/delete on `breakpoints` restores the original count.
#[test]
fn invariant7_breakpoints_round_trip_count() {
    let s = session();
    let before = s
        .scalar("SELECT COUNT(*) FROM breakpoints")
        .unwrap()
        .parse::<i64>()
        .unwrap();
    s.query("INSERT INTO breakpoints(ea) VALUES (0x402000)").unwrap();
    s.query("DELETE FROM breakpoints WHERE ea = 0x402000").unwrap();
    let after = s
        .scalar("SELECT COUNT(*) FROM breakpoints")
        .unwrap()
        .parse::<i64>()
        .unwrap();
    assert_eq!(before, after);
}

// §8 invariant 9: `instructions` constrained by `func_addr` returns the same
// rows as the unconstrained full scan restricted to that function.
#[test]
fn invariant9_instructions_pushdown_matches_full_scan_subset() {
    let s = session();
    let constrained = s
        .query("SELECT ea FROM instructions WHERE func_addr = 4096 ORDER BY ea")
        .unwrap();
    let full = s.query("SELECT ea FROM instructions ORDER BY ea").unwrap();
    // the unconstrained scan covers every function; the constrained one is
    // exactly its subset for func_addr = 4096 (main)
    assert_eq!(constrained.rows.len(), 2);
    assert!(full.rows.len() >= constrained.rows.len());
    for row in &constrained.rows {
        assert!(full.rows.contains(row));
    }
}

// §8 invariant 8: updating `funcs.name` twice with the same value is
// idempotent — the second application observes the same state as the first.
#[test]
fn invariant8_funcs_name_update_is_idempotent() {
    let s = session();
    s.query("UPDATE funcs SET name = 'M' WHERE address = 4096")
        .unwrap();
    let once = s
        .query("SELECT name FROM funcs WHERE address = 4096")
        .unwrap();
    s.query("UPDATE funcs SET name = 'M' WHERE address = 4096")
        .unwrap();
    let twice = s
        .query("SELECT name FROM funcs WHERE address = 4096")
        .unwrap();
    assert_eq!(once.rows, twice.rows);
    assert_eq!(once.rows[0][0], ColumnValue::text("M"));
}

// §8 invariant 10: unlimited `jump_entities` count equals summed per-kind
// counts, and LIMIT returns a prefix of the unlimited iteration.
#[test]
fn invariant10_jump_entities_limit_is_a_prefix() {
    let s = session();
    let all = s
        .query("SELECT name FROM jump_entities('', 'contains')")
        .unwrap();
    // an empty pattern yields no rows (§4.D)
    assert!(all.rows.is_empty());

    let unlimited = s
        .query("SELECT name FROM jump_entities('e', 'contains') ORDER BY name")
        .unwrap();
    let limited = s
        .query("SELECT name FROM jump_entities('e', 'contains') ORDER BY name LIMIT 1")
        .unwrap();
    assert_eq!(limited.rows.len(), 1);
    assert_eq!(limited.rows[0], unlimited.rows[0]);
}
