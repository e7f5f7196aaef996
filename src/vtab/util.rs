//! Shared glue between the three shape modules: the undo-wrapped mutation
//! helper and argv → `Row` conversion for `xUpdate`.

use rusqlite::vtab::Values;
use rusqlite::Error;

use crate::error::EngineResult;
use crate::value::{ColumnValue, Row};

use super::descriptor::TableDescriptor;

/// Wraps a mutation in an undo handle labeled `"{op} {table}"` (§4.B), honoring
/// the `undo` policy flag. The handle is always closed, success or failure,
/// so the undo trail never straddles a statement.
///
/// Under `batch` policy (§4.G), every mutation instead shares one handle
/// (opened lazily, labeled `"batch"`) that stays open across calls until the
/// caller turns `batch` back off — see [`crate::policy::Policy::batch_handle`].
pub fn guarded_mutate<T>(
    descriptor: &TableDescriptor,
    op: &str,
    body: impl FnOnce() -> EngineResult<T>,
) -> EngineResult<T> {
    if !descriptor.policy.undo_enabled() {
        return body();
    }
    if descriptor.policy.batch_enabled() {
        descriptor
            .policy
            .batch_handle(|| descriptor.adapter.open_undo("batch"));
        return body();
    }
    let label = format!("{op} {}", descriptor.name);
    tracing::debug!(undo = %label, "opening undo handle");
    let handle = descriptor.adapter.open_undo(&label);
    let result = body();
    if let Err(e) = &result {
        tracing::warn!(undo = %label, error = %e, "mutation failed, closing undo handle anyway");
    }
    descriptor.adapter.close_undo(handle);
    result
}

/// `xUpdate`'s `args` holds `[old_rowid, new_rowid, col0, col1, ...]`; entity
/// tables only ever need the column values, starting at `skip` (2 for
/// insert/update, since index 0/1 are the rowid pair).
pub fn row_to_values(
    descriptor: &TableDescriptor,
    args: &Values<'_>,
    skip: usize,
) -> rusqlite::Result<Row> {
    let row: Row = args.iter().skip(skip).map(ColumnValue::from).collect();
    if row.len() != descriptor.columns.len() {
        return Err(Error::ModuleError(format!(
            "{}: expected {} column values, got {}",
            descriptor.name,
            descriptor.columns.len(),
            row.len()
        )));
    }
    Ok(row)
}
