//! Table-valued function shape (§4.B #3): `jump_entities(pattern, mode)`.
//! Hidden columns are constant arguments bound either positionally
//! (`FROM jump_entities('x','prefix')`) or by `=` in `WHERE` (§6 "TVF call
//! syntax" — the two forms are accepted and semantically identical because
//! SQLite rewrites the positional form into equality constraints on the
//! hidden columns before `xBestIndex` ever sees it).

use std::os::raw::c_int;
use std::rc::Rc;

use rusqlite::ffi;
use rusqlite::vtab::{Context, IndexConstraintOp, IndexInfo, VTab, VTabConnection, VTabCursor, Values};
use rusqlite::Error;

use crate::value::ColumnValue;

use super::descriptor::TableDescriptor;
use super::pushdown::{bind_args, PushOp, PushdownPlan, LIMIT_SLOT};

#[repr(C)]
pub struct TvfVTab {
    base: ffi::sqlite3_vtab,
    descriptor: Rc<TableDescriptor>,
}

unsafe impl VTab<'_> for TvfVTab {
    type Aux = Rc<TableDescriptor>;
    type Cursor = TvfCursor;

    fn connect(
        _db: &mut VTabConnection,
        aux: Option<&Rc<TableDescriptor>>,
        _args: &[&[u8]],
    ) -> rusqlite::Result<(String, Self)> {
        let descriptor = aux
            .ok_or_else(|| Error::ModuleError("missing table descriptor".into()))?
            .clone();
        let sql = descriptor.create_table_sql();
        Ok((
            sql,
            TvfVTab {
                base: ffi::sqlite3_vtab::default(),
                descriptor,
            },
        ))
    }

    fn best_index(&self, info: &mut IndexInfo) -> rusqlite::Result<()> {
        let mut plan = PushdownPlan::default();
        let mut argv = 1;
        let mut satisfied_required = vec![false; self.descriptor.columns.len()];
        for (constraint, mut usage) in info.constraints().zip(info.constraint_usages()) {
            if constraint.operator() == IndexConstraintOp::SQLITE_INDEX_CONSTRAINT_LIMIT {
                // Claim the LIMIT value itself so it arrives in `xFilter`'s
                // argv; SQLite still enforces the limit independently, so
                // this is never `omit`-ted — it's purely a hint `run` uses
                // to stop consulting later sources early (§1(d), §4.D).
                usage.set_argv_index(argv);
                usage.set_omit(false);
                plan.bindings.push((LIMIT_SLOT, PushOp::Limit));
                argv += 1;
                continue;
            }
            if !constraint.is_usable() {
                continue;
            }
            let col = constraint.column() as usize;
            let Some(def) = self.descriptor.columns.get(col) else {
                continue;
            };
            if constraint.operator() != IndexConstraintOp::SQLITE_INDEX_CONSTRAINT_EQ {
                continue;
            }
            if !def.pushdown.contains(&PushOp::Eq) {
                continue;
            }
            usage.set_argv_index(argv);
            usage.set_omit(true);
            if def.required {
                satisfied_required[col] = true;
            }
            plan.bindings.push((col, PushOp::Eq));
            argv += 1;
        }
        let missing_required = self
            .descriptor
            .columns
            .iter()
            .enumerate()
            .any(|(i, c)| c.required && !satisfied_required[i]);
        info.set_estimated_rows(if missing_required { 0 } else { 64 });
        info.set_estimated_cost(if missing_required { 1e12 } else { 10.0 });
        info.set_idx_num(plan.bindings.len() as c_int);
        info.set_idx_str(&plan.encode());
        Ok(())
    }

    fn open(&'_ self) -> rusqlite::Result<TvfCursor> {
        Ok(TvfCursor {
            base: ffi::sqlite3_vtab_cursor::default(),
            descriptor: self.descriptor.clone(),
            rows: Vec::new(),
            row_index: 0,
        })
    }
}

impl rusqlite::vtab::CreateVTab<'_> for TvfVTab {
    const KIND: rusqlite::vtab::VTabKind = rusqlite::vtab::VTabKind::Eponymous;
}

#[repr(C)]
pub struct TvfCursor {
    base: ffi::sqlite3_vtab_cursor,
    descriptor: Rc<TableDescriptor>,
    rows: Vec<crate::value::Row>,
    row_index: usize,
}

unsafe impl VTabCursor for TvfCursor {
    fn filter(
        &mut self,
        _idx_num: c_int,
        idx_str: Option<&str>,
        args: &Values<'_>,
    ) -> rusqlite::Result<()> {
        let plan = idx_str.map(PushdownPlan::decode).unwrap_or_default();
        let bound: Vec<ColumnValue> = args.iter().map(ColumnValue::from).collect();
        let pushdown = bind_args(&plan, &bound);

        let missing_required = self
            .descriptor
            .columns
            .iter()
            .enumerate()
            .any(|(i, c)| c.required && !pushdown.eq.contains_key(&i));
        if missing_required {
            return Err(crate::error::EngineError::Unsupported(format!(
                "{} called without its required argument",
                self.descriptor.name
            ))
            .into());
        }

        self.rows = (self.descriptor.shape_tvf_run())(&*self.descriptor.adapter, &pushdown, pushdown.limit)
            .map_err(Into::<rusqlite::Error>::into)?;
        self.row_index = 0;
        Ok(())
    }

    fn next(&mut self) -> rusqlite::Result<()> {
        self.row_index += 1;
        Ok(())
    }

    fn eof(&self) -> bool {
        self.row_index >= self.rows.len()
    }

    fn column(&self, ctx: &mut Context, i: c_int) -> rusqlite::Result<()> {
        let row = self
            .rows
            .get(self.row_index)
            .ok_or_else(|| Error::ModuleError("column() at eof".into()))?;
        let value = row.get(i as usize).cloned().unwrap_or(ColumnValue::Null);
        ctx.set_result(&value)
    }

    fn rowid(&self) -> rusqlite::Result<i64> {
        Ok(self.row_index as i64)
    }
}
