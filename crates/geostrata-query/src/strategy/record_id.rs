//! Record-id strategy: direct lookups in the record table.
//!
//! Every `IN (...)` conjunct contributes its ids (union across conjuncts);
//! all other conjuncts become a fine filter over the fetched records.

use std::collections::BTreeSet;

use bytes::Bytes;
use tracing::debug;

use geostrata_core::error::Result;
use geostrata_core::filter::Filter;

use crate::keyplan::{ByteRange, ColumnFamilyPlan};
use crate::plan::{QueryPlan, StageNamer, TableRole};

use super::{fine_filter_stage, residual_of, CompileRequest, Strategy};

pub(crate) fn compile(req: &CompileRequest<'_>) -> Result<QueryPlan> {
    let mut ids: BTreeSet<String> = BTreeSet::new();
    let mut absorbed = Vec::new();
    for (i, conjunct) in req.conjuncts.iter().enumerate() {
        if let Filter::IdIn(conjunct_ids) = conjunct {
            ids.extend(conjunct_ids.iter().cloned());
            absorbed.push(i);
        }
    }

    if ids.is_empty() {
        return Ok(QueryPlan::empty(Strategy::RecordId, TableRole::Records));
    }

    let ranges: Vec<ByteRange> = ids
        .iter()
        .map(|id| ByteRange::exact_row(Bytes::copy_from_slice(id.as_bytes())))
        .collect();

    let residual = residual_of(req.conjuncts, &absorbed);
    let mut namer = StageNamer::new();
    let iterators = vec![fine_filter_stage(&mut namer, req, &residual, None)];

    debug!(ids = ids.len(), "compiled record-id plan");

    Ok(QueryPlan {
        strategy: Strategy::RecordId,
        table: TableRole::Records,
        ranges,
        join: None,
        column_families: ColumnFamilyPlan::All,
        iterators,
    })
}
