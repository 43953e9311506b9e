//! Core domain types for the GeoStrata spatio-temporal feature store planner.

pub mod config;
pub mod encoding;
pub mod error;
pub mod filter;
pub mod geom;
pub mod schema;
pub mod time;

pub use config::{CatalogConfig, PlannerConfig, QueryConfig, TableCatalog};
pub use error::{Error, Result};
pub use filter::{
    CompareOp, Expression, Filter, Literal, PropertyLiteral, SpatialRelation, TemporalRelation,
};
pub use geom::{BoundingBox, Coordinate, Polygon};
pub use schema::{AttributeDescriptor, AttributeType, Cardinality, SchemaDescriptor};
pub use time::Interval;
