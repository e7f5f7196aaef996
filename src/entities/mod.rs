//! Entity tables (component C, §4.C): one module per closely related group
//! of tables from §3's data model, each a `TableDescriptor` registered
//! through `crate::vtab`.

mod blocks;
mod bookmarks;
mod breakpoints;
mod comments;
mod ctree;
mod disasm;
mod entries_imports;
mod fixups;
mod funcs;
mod instructions;
pub(crate) mod jump;
mod names;
mod pseudocode;
mod segments;
mod strings;
mod types;
mod xrefs;

use std::rc::Rc;

use rusqlite::Connection;

use crate::adapter::WorkspaceAdapter;
use crate::policy::Policy;

/// Registers every entity table against `conn`. Called once per session at
/// `Session::open` (§4.E) — matching the teacher's "install schema once at
/// startup" pattern (`init.rs`'s `INITSQL`).
pub fn register_all(
    conn: &Connection,
    adapter: &Rc<dyn WorkspaceAdapter>,
    policy: &Rc<Policy>,
) -> rusqlite::Result<()> {
    funcs::register(conn, adapter, policy)?;
    segments::register(conn, adapter, policy)?;
    names::register(conn, adapter, policy)?;
    comments::register(conn, adapter, policy)?;
    entries_imports::register(conn, adapter, policy)?;
    strings::register(conn, adapter, policy)?;
    xrefs::register(conn, adapter, policy)?;
    blocks::register(conn, adapter, policy)?;
    bookmarks::register(conn, adapter, policy)?;
    breakpoints::register(conn, adapter, policy)?;
    instructions::register(conn, adapter, policy)?;
    types::register(conn, adapter, policy)?;
    pseudocode::register(conn, adapter, policy)?;
    ctree::register(conn, adapter, policy)?;
    fixups::register(conn, adapter, policy)?;
    disasm::register(conn, adapter, policy)?;
    jump::register(conn, adapter, policy)?;
    Ok(())
}
