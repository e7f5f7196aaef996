//! Export / script runner (component H, §4.H): statement splitting and a
//! schema-aware dump of table contents into a portable SQL script, grounded
//! on `sqlite_utils.cpp`'s `prepare_next`/`collect_statements`/
//! `export_tables`.
//!
//! `rusqlite` doesn't expose `sqlite3_complete` through its safe API, so
//! this module binds the C entry point directly the way the teacher's own
//! `sqlite_utils.cpp` does, rather than reimplementing a SQL tokenizer.

use std::ffi::CString;

use rusqlite::Connection;

use crate::util::{quote_blob, quote_ident, quote_text};
use crate::value::ColumnValue;

/// Splits a multi-statement SQL script into individual statement texts,
/// using `sqlite3_complete` to tell a `;` inside a string or comment apart
/// from one that actually terminates a statement.
pub fn split_statements(script: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut start = 0;
    for (i, b) in script.bytes().enumerate() {
        if b != b';' {
            continue;
        }
        let candidate = &script[start..=i];
        if is_complete(candidate) {
            let stmt = candidate.trim();
            if !stmt.is_empty() {
                statements.push(stmt.to_string());
            }
            start = i + 1;
        }
    }
    let tail = script[start..].trim();
    if !tail.is_empty() {
        statements.push(tail.to_string());
    }
    statements
}

fn is_complete(sql: &str) -> bool {
    let Ok(c_sql) = CString::new(sql) else {
        return false;
    };
    unsafe { rusqlite::ffi::sqlite3_complete(c_sql.as_ptr()) != 0 }
}

/// Dumps every table in `table_names` as `DROP TABLE IF EXISTS` +
/// `CREATE TABLE` + one `INSERT` per row, using each table's live
/// `decltype`s so the script is self-describing and loads into a plain
/// `sqlite3` CLI with no virtual-table modules registered.
pub fn export_tables(conn: &Connection, table_names: &[&str]) -> rusqlite::Result<String> {
    tracing::info!(tables = table_names.len(), "exporting tables to SQL script");
    let mut out = String::new();
    for &name in table_names {
        export_table(conn, name, &mut out)?;
    }
    Ok(out)
}

fn export_table(conn: &Connection, name: &str, out: &mut String) -> rusqlite::Result<()> {
    let select = format!("SELECT * FROM {}", quote_ident(name));
    let mut stmt = conn.prepare(&select)?;
    let col_count = stmt.column_count();
    let col_names: Vec<String> = (0..col_count)
        .map(|i| stmt.column_name(i).unwrap_or("col").to_string())
        .collect();
    let col_decls: Vec<String> = (0..col_count)
        .map(|i| stmt.column_decltype(i).unwrap_or("TEXT").to_string())
        .collect();

    out.push_str(&format!("DROP TABLE IF EXISTS {};\n", quote_ident(name)));
    let cols_sql: Vec<String> = col_names
        .iter()
        .zip(&col_decls)
        .map(|(n, d)| format!("{} {}", quote_ident(n), d))
        .collect();
    out.push_str(&format!(
        "CREATE TABLE {} ({});\n",
        quote_ident(name),
        cols_sql.join(", ")
    ));

    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let mut literals = Vec::with_capacity(col_count);
        for i in 0..col_count {
            let value = ColumnValue::from(row.get_ref(i)?);
            literals.push(format_literal(&value));
        }
        out.push_str(&format!(
            "INSERT INTO {} VALUES ({});\n",
            quote_ident(name),
            literals.join(", ")
        ));
    }
    Ok(())
}

fn format_literal(v: &ColumnValue) -> String {
    match v {
        ColumnValue::Null => "NULL".to_string(),
        ColumnValue::Int(i) => i.to_string(),
        ColumnValue::Float(f) => format!("{f}"),
        ColumnValue::Text(s) => quote_text(s),
        ColumnValue::Blob(b) => quote_blob(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_top_level_semicolons() {
        let script = "SELECT 1; SELECT 2;\nSELECT 3";
        let stmts = split_statements(script);
        assert_eq!(stmts, vec!["SELECT 1", "SELECT 2", "SELECT 3"]);
    }

    #[test]
    fn keeps_semicolons_inside_string_literals_together() {
        let script = "SELECT 'a;b'; SELECT 2;";
        let stmts = split_statements(script);
        assert_eq!(stmts, vec!["SELECT 'a;b'", "SELECT 2"]);
    }

    #[test]
    fn export_round_trips_plain_table() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t(a INTEGER, b TEXT); INSERT INTO t VALUES (1,'x'), (2, NULL);")
            .unwrap();
        let script = export_tables(&conn, &["t"]).unwrap();
        assert!(script.contains("DROP TABLE IF EXISTS \"t\";"));
        assert!(script.contains("INSERT INTO \"t\" VALUES (1, 'x');"));
        assert!(script.contains("INSERT INTO \"t\" VALUES (2, NULL);"));

        let conn2 = Connection::open_in_memory().unwrap();
        conn2.execute_batch(&script).unwrap();
        let count: i64 = conn2.query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 2);
    }
}
