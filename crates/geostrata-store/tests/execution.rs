//! End-to-end execution over the in-memory backend.
//!
//! Seeds the three tables the way the ingest path lays them out, plans real
//! filters, and checks both the entries that come back and the scans the
//! backend observed.

use std::sync::Arc;

use bytes::Bytes;

use geostrata_core::config::CatalogConfig;
use geostrata_core::filter::{Filter, Literal, SpatialRelation, TemporalRelation};
use geostrata_core::geom::BoundingBox;
use geostrata_core::schema::SchemaDescriptor;
use geostrata_core::time::Interval;
use geostrata_query::plan::band;
use geostrata_query::{GridGrammar, QueryHints, StrategyPlanner};
use geostrata_store::{MemoryStore, PlanExecutor};

fn schema() -> SchemaDescriptor {
    SchemaDescriptor::parse(
        "points",
        "attr2:String:index=true,dtg:Date:default=true,geom:Point:srid=4326:default=true",
    )
    .unwrap()
}

fn attribute_row(name: &str, value: &str) -> Vec<u8> {
    let mut row = name.as_bytes().to_vec();
    row.push(0x00);
    row.extend_from_slice(value.as_bytes());
    row
}

/// A store with three features: f1/f2 share `attr2 = 'val56'`, f3 differs.
fn seeded() -> (MemoryStore, PlanExecutor) {
    let store = MemoryStore::new();
    let catalog = CatalogConfig::default().catalog_for("points");

    store.create_table(&catalog.spatio_temporal);
    store.create_table(&catalog.attribute_index);
    store.create_table(&catalog.records);

    for (id, value) in [("f1", "val56"), ("f2", "val56"), ("f3", "other")] {
        store.put(
            &catalog.records,
            Bytes::copy_from_slice(id.as_bytes()),
            &b"F"[..],
            &b""[..],
            Bytes::from(format!("feature-{id}")),
        );
        store.put(
            &catalog.attribute_index,
            Bytes::from(attribute_row("attr2", value)),
            Bytes::copy_from_slice(id.as_bytes()),
            &b""[..],
            &b""[..],
        );
    }

    // One point at (10, 10) on 2012-01-01: grid cell row `03~20120101`,
    // longitude family `06`.
    store.put(
        &catalog.spatio_temporal,
        &b"03~20120101"[..],
        &b"06"[..],
        &b"f1"[..],
        Bytes::from_static(b"feature-f1"),
    );

    let executor = PlanExecutor::new(Arc::new(store.clone()), catalog);
    (store, executor)
}

fn plan(filter: &Filter) -> geostrata_query::QueryPlan {
    let schema = schema();
    let grammar = GridGrammar::new();
    StrategyPlanner::new(&schema, &grammar)
        .plan(filter, &QueryHints::default())
        .unwrap()
}

#[test]
fn test_attribute_equality_runs_two_phases() {
    let (store, executor) = seeded();
    let plan = plan(&Filter::Eq {
        property: "attr2".into(),
        value: Literal::Str("val56".into()),
    });

    let rows: Vec<Bytes> = executor
        .execute(&plan)
        .unwrap()
        .map(|e| e.unwrap().key.row)
        .collect();
    assert_eq!(rows, vec![Bytes::from_static(b"f1"), Bytes::from_static(b"f2")]);

    let log = store.scan_log();
    assert_eq!(log.len(), 2);
    assert!(log[0].table.ends_with("_attr_idx"));
    assert!(log[0].iterators.is_empty());
    assert!(log[1].table.ends_with("_records"));
    assert_eq!(log[1].ranges.len(), 2);
    assert_eq!(log[1].iterators.len(), 1);
    assert_eq!(log[1].iterators[0].0, band::FINE_FILTER);
}

#[test]
fn test_attribute_equality_with_no_matches_is_empty() {
    let (store, executor) = seeded();
    let plan = plan(&Filter::Eq {
        property: "attr2".into(),
        value: Literal::Str("absent".into()),
    });

    let entries: Vec<_> = executor.execute(&plan).unwrap().collect();
    assert!(entries.is_empty());
    // Phase 2 never ran.
    assert_eq!(store.scan_log().len(), 1);
}

#[test]
fn test_record_id_lookup() {
    let (_, executor) = seeded();
    let plan = plan(&Filter::id_in(["f3", "f1"]));

    let rows: Vec<Bytes> = executor
        .execute(&plan)
        .unwrap()
        .map(|e| e.unwrap().key.row)
        .collect();
    assert_eq!(rows, vec![Bytes::from_static(b"f1"), Bytes::from_static(b"f3")]);
}

#[test]
fn test_spatio_temporal_scan_hits_grid_cell() {
    let (store, executor) = seeded();
    let plan = plan(&Filter::And(vec![
        Filter::Spatial {
            relation: SpatialRelation::BBox,
            property: "geom".into(),
            geometry: BoundingBox::new(0.0, 0.0, 10.0, 10.0).to_polygon(),
        },
        Filter::Temporal {
            relation: TemporalRelation::During,
            property: "dtg".into(),
            interval: Interval::new(
                "2012-01-01T00:00:00Z".parse().unwrap(),
                "2012-01-02T00:00:00Z".parse().unwrap(),
            ),
        },
    ]));

    let rows: Vec<Bytes> = executor
        .execute(&plan)
        .unwrap()
        .map(|e| e.unwrap().key.row)
        .collect();
    assert_eq!(rows, vec![Bytes::from_static(b"03~20120101")]);

    let log = store.scan_log();
    assert_eq!(log.len(), 1);
    assert!(log[0].table.ends_with("_st_idx"));
    // The longitude family was constrained by the spatial predicate.
    assert_eq!(log[0].column_families, vec![Bytes::from_static(b"06")]);
    // Coarse intersect before fine filter.
    let priorities: Vec<u16> = log[0].iterators.iter().map(|(p, _)| *p).collect();
    assert_eq!(priorities, vec![band::ST_INTERSECT, band::FINE_FILTER]);
}

#[test]
fn test_empty_plan_never_touches_the_store() {
    let (store, executor) = seeded();
    let during = |start: &str, end: &str| Filter::Temporal {
        relation: TemporalRelation::During,
        property: "dtg".into(),
        interval: Interval::new(start.parse().unwrap(), end.parse().unwrap()),
    };
    let plan = plan(&Filter::And(vec![
        during("2012-01-01T00:00:00Z", "2012-02-01T00:00:00Z"),
        during("2013-01-01T00:00:00Z", "2013-02-01T00:00:00Z"),
    ]));

    assert!(plan.is_empty());
    let entries: Vec<_> = executor.execute(&plan).unwrap().collect();
    assert!(entries.is_empty());
    assert!(store.scan_log().is_empty());
}

#[test]
fn test_stream_close_is_idempotent() {
    let (_, executor) = seeded();
    let plan = plan(&Filter::id_in(["f1"]));

    let mut stream = executor.execute(&plan).unwrap();
    assert!(stream.next().is_some());
    stream.close();
    stream.close();
    assert!(stream.next().is_none());
}

#[test]
fn test_abandoned_stream_releases_on_drop() {
    let (_, executor) = seeded();
    let plan = plan(&Filter::id_in(["f1", "f3"]));

    let mut stream = executor.execute(&plan).unwrap();
    // Consume one of two entries, then abandon the stream.
    assert!(stream.next().is_some());
    drop(stream);
}

#[test]
fn test_missing_table_surfaces_a_store_error() {
    let store = MemoryStore::new();
    let catalog = CatalogConfig::default().catalog_for("absent");
    let executor = PlanExecutor::new(Arc::new(store), catalog);

    let plan = plan(&Filter::id_in(["f1"]));
    assert!(matches!(
        executor.execute(&plan),
        Err(geostrata_core::Error::Store { .. })
    ));
}
