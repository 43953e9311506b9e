//! Spatio-temporal index strategy.

use std::collections::BTreeMap;

use tracing::debug;

use geostrata_core::error::Result;

use crate::extract;
use crate::keyplan::KeyPlanner;
use crate::plan::{
    band, iterator_class, option_key, IteratorStage, QueryPlan, StageNamer, TableRole,
};

use super::{aggregation_stages, fine_filter_stage, CompileRequest, Strategy};

pub(crate) fn compile(req: &CompileRequest<'_>) -> Result<QueryPlan> {
    let st = extract::extract(req.conjuncts.to_vec(), req.schema);
    if st.excludes_everything() {
        return Ok(QueryPlan::empty(Strategy::StIdx, TableRole::SpatioTemporal));
    }

    let key_space = KeyPlanner::new(req.grammar).plan(st.polygon.as_ref(), st.interval.as_ref());
    let mut namer = StageNamer::new();
    let mut iterators = Vec::new();

    if let Some(regex) = &key_space.row_regex {
        let mut options = BTreeMap::new();
        options.insert(option_key::REGEX.to_string(), regex.clone());
        iterators.push(IteratorStage {
            priority: band::ROW_REGEX,
            name: namer.name("row-regex"),
            class_name: iterator_class::ROW_REGEX.to_string(),
            options,
        });
    }

    let mut options = BTreeMap::new();
    options.insert(
        option_key::DEFAULT_SCHEMA.to_string(),
        req.grammar.format().to_string(),
    );
    options.insert(option_key::SFT.to_string(), req.schema.to_spec_string());
    options.insert(
        option_key::SFT_NAME.to_string(),
        req.schema.type_name().to_string(),
    );
    if let Some(polygon) = &st.polygon {
        options.insert(option_key::ST_FILTER.to_string(), polygon.to_wkt());
    }
    if let Some(interval) = &st.interval {
        let (start, end) = interval.epoch_millis();
        options.insert(option_key::INTERVAL.to_string(), format!("{start},{end}"));
    }
    iterators.push(IteratorStage {
        priority: band::ST_INTERSECT,
        name: namer.name("st-intersect"),
        class_name: iterator_class::ST_INTERSECT.to_string(),
        options,
    });

    iterators.push(fine_filter_stage(&mut namer, req, &st.residual, None));
    iterators.extend(aggregation_stages(&mut namer, req.hints)?);

    let ranges = key_space.key_plan.into_ranges();
    debug!(
        ranges = ranges.len(),
        iterators = iterators.len(),
        "compiled spatio-temporal plan"
    );

    Ok(QueryPlan {
        strategy: Strategy::StIdx,
        table: TableRole::SpatioTemporal,
        ranges,
        join: None,
        column_families: key_space.column_families,
        iterators,
    })
}
