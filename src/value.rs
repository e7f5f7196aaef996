//! Run-time column value exchanged between the workspace adapter, the
//! virtual-table cursors, and the embedded SQL engine.
//!
//! A database record in the teacher crate this engine is descended from had
//! its own on-disk `Value` representation (binary/string/int/float/bool)
//! because it owned storage. This engine owns no storage: rows are
//! materialized only as long as a cursor needs them, so `ColumnValue` is a
//! plain in-memory enum with no codes, no fragments, no disk layout.

use rusqlite::types::{ToSqlOutput, Value as SqlValue};
use rusqlite::ToSql;

/// A single column value, coerced per the column type coercion rules:
/// address columns are `Int`, text is UTF-8 and NUL-free (embedded NULs are
/// escaped), and `Null` means "absent attribute" (no comment, unknown return
/// type, and so on) rather than an error.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
}

/// One materialized row, column values in declaration order.
pub type Row = Vec<ColumnValue>;

impl ColumnValue {
    /// An effective address, always representable in signed 64 bits.
    pub fn ea(ea: u64) -> Self {
        ColumnValue::Int(ea as i64)
    }

    pub fn opt_ea(ea: Option<u64>) -> Self {
        ea.map(Self::ea).unwrap_or(ColumnValue::Null)
    }

    pub fn int(v: i64) -> Self {
        ColumnValue::Int(v)
    }

    pub fn opt_int(v: Option<i64>) -> Self {
        v.map(ColumnValue::Int).unwrap_or(ColumnValue::Null)
    }

    pub fn bool_int(b: bool) -> Self {
        ColumnValue::Int(b as i64)
    }

    /// NUL bytes can't round-trip through SQLite TEXT storage; escape them
    /// rather than reject the whole value (§4.B).
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.as_bytes().contains(&0) {
            ColumnValue::Text(s.replace('\0', "\\u0000"))
        } else {
            ColumnValue::Text(s)
        }
    }

    pub fn opt_text(s: Option<impl Into<String>>) -> Self {
        s.map(|s| Self::text(s)).unwrap_or(ColumnValue::Null)
    }

    pub fn blob(b: Vec<u8>) -> Self {
        ColumnValue::Blob(b)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ColumnValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_ea(&self) -> Option<u64> {
        self.as_i64().map(|v| v as u64)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ColumnValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }
}

impl ToSql for ColumnValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            ColumnValue::Null => ToSqlOutput::Owned(SqlValue::Null),
            ColumnValue::Int(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            ColumnValue::Float(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            ColumnValue::Text(s) => ToSqlOutput::Owned(SqlValue::Text(s.clone())),
            ColumnValue::Blob(b) => ToSqlOutput::Owned(SqlValue::Blob(b.clone())),
        })
    }
}

impl From<rusqlite::types::ValueRef<'_>> for ColumnValue {
    fn from(v: rusqlite::types::ValueRef<'_>) -> Self {
        use rusqlite::types::ValueRef;
        match v {
            ValueRef::Null => ColumnValue::Null,
            ValueRef::Integer(i) => ColumnValue::Int(i),
            ValueRef::Real(f) => ColumnValue::Float(f),
            ValueRef::Text(t) => ColumnValue::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => ColumnValue::Blob(b.to_vec()),
        }
    }
}
