//!
//! ToDo List:
//!
//! Push constraint support for the `types_*` tables' `type_ordinal`
//! requirement down through `JOIN`s the way `disasm_calls`/`ctree`'s
//! `func_addr` requirement already gets exercised by the fixture tests.
//!
//! A SQL-embeddable engine over a binary-analysis workspace: virtual tables
//! expose functions, segments, names, xrefs, decompiler output and the rest
//! of a disassembler's data model as queryable SQL, without copying any of
//! it into SQLite's own storage.
//!
//! Example:
//! ```
//! use std::rc::Rc;
//! use idasql_engine::adapter::stub::StubWorkspace;
//! use idasql_engine::adapter::WorkspaceAdapter;
//! use idasql_engine::Session;
//!
//! let ws: Rc<dyn WorkspaceAdapter> = Rc::new(StubWorkspace::with_fixture());
//! let session = Session::open(ws, None).unwrap();
//! let result = session.query("SELECT name FROM funcs ORDER BY address").unwrap();
//! for row in &result.rows {
//!     println!("{:?}", row);
//! }
//! ```
//!
//! General design
//!
//! The workspace adapter (component A) is the single capability boundary:
//! every table, function, and mutation in this crate is written against
//! `WorkspaceAdapter` and never against a concrete backend. The virtual-table
//! framework (component B) turns a declarative `TableDescriptor` into one of
//! three `rusqlite::vtab` shapes — index-addressable, scan-and-cache, or
//! table-valued function — so adding an entity table (component C) means
//! writing a descriptor, not a `VTab`/`VTabCursor` pair. The SQL function
//! layer (component D) and the view catalog (`init`) sit on top, and
//! `Session` (component E) wires all of it into one `rusqlite::Connection`.

mod util;

pub mod adapter;
#[cfg(feature = "functions")]
pub mod builtin;
pub mod concurrency;
pub mod config;
pub mod entities;
pub mod error;
pub mod export;
#[cfg(feature = "init")]
pub mod init;
pub mod policy;
pub mod session;
pub mod value;
pub mod vtab;

pub use error::{EngineError, EngineResult};
pub use session::{QueryResult, Session};
