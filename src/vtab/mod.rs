//! Virtual-table framework (component B, §4.B): a single declarative
//! builder producing one of three table shapes, instead of a hand-written
//! `VTab`/`VTabCursor` pair per entity. `crate::entities` supplies closures;
//! this module supplies the one-time `rusqlite::vtab` glue.

pub mod cache_table;
pub mod descriptor;
pub mod index_table;
pub mod pushdown;
pub mod tvf;
mod util;

use std::rc::Rc;

use rusqlite::Connection;

use descriptor::TableDescriptor;

/// Registers an index-shaped table (`funcs`, `segments`) under its name.
pub fn register_index_table(conn: &Connection, descriptor: TableDescriptor) -> rusqlite::Result<()> {
    let name = descriptor.name;
    let writable = descriptor.update.insert.is_some()
        || descriptor.update.update.is_some()
        || descriptor.update.delete.is_some();
    let aux = Rc::new(descriptor);
    if writable {
        conn.create_module(
            name,
            rusqlite::vtab::update_module::<index_table::IndexVTab>(),
            Some(aux),
        )
    } else {
        conn.create_module(
            name,
            rusqlite::vtab::read_only_module::<index_table::IndexVTab>(),
            Some(aux),
        )
    }
}

/// Registers a cache-shaped table (most entity tables).
pub fn register_cache_table(conn: &Connection, descriptor: TableDescriptor) -> rusqlite::Result<()> {
    let name = descriptor.name;
    let writable = descriptor.update.insert.is_some()
        || descriptor.update.update.is_some()
        || descriptor.update.delete.is_some();
    let aux = Rc::new(descriptor);
    if writable {
        conn.create_module(
            name,
            rusqlite::vtab::update_module::<cache_table::CacheVTab>(),
            Some(aux),
        )
    } else {
        conn.create_module(
            name,
            rusqlite::vtab::read_only_module::<cache_table::CacheVTab>(),
            Some(aux),
        )
    }
}

/// Registers a table-valued function (`jump_entities`); always read-only and
/// eponymous-only (it never appears as a named table you `CREATE`, only as
/// a call in `FROM`).
pub fn register_tvf(conn: &Connection, descriptor: TableDescriptor) -> rusqlite::Result<()> {
    let name = descriptor.name;
    let aux = Rc::new(descriptor);
    conn.create_module(
        name,
        rusqlite::vtab::eponymous_only_module::<tvf::TvfVTab>(),
        Some(aux),
    )
}
