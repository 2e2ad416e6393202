//! Immutable tables of rows.

use trace_types::*;

use super::{page, InMemoryTraceServer};
use crate::digest::{digest_rows, digest_value};

impl InMemoryTraceServer {
    pub(crate) fn create_table(&self, req: TableCreateReq) -> TableCreateRes {
        let table = req.table;
        let rows: Vec<TableRowSchema> = table
            .rows
            .into_iter()
            .enumerate()
            .map(|(original_index, val)| TableRowSchema {
                digest: digest_value(&val),
                val,
                original_index,
            })
            .collect();
        let row_digests: Vec<String> = rows.iter().map(|r| r.digest.clone()).collect();
        let digest = digest_rows(&row_digests);

        self.state
            .write()
            .project_mut(&table.project_id)
            .tables
            .entry(digest.clone())
            .or_insert(rows);
        TableCreateRes {
            digest,
            row_digests,
        }
    }

    pub(crate) fn query_rows(&self, req: &TableQueryReq) -> TraceResult<Vec<TableRowSchema>> {
        let state = self.state.read();
        let rows = state
            .project(&req.project_id)
            .and_then(|p| p.tables.get(&req.digest))
            .ok_or_else(|| TraceServerError::NotFound(format!("table {}", req.digest)))?;
        Ok(page(rows.iter().cloned(), req.offset, req.limit))
    }

    pub(crate) fn count_rows(&self, req: TableQueryStatsReq) -> TraceResult<TableQueryStatsRes> {
        let state = self.state.read();
        state
            .project(&req.project_id)
            .and_then(|p| p.tables.get(&req.digest))
            .map(|rows| TableQueryStatsRes { count: rows.len() })
            .ok_or_else(|| TraceServerError::NotFound(format!("table {}", req.digest)))
    }
}
