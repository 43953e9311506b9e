//! The cardinality oracle.
//!
//! A pure function of the user-supplied hints carried by the schema; the
//! planner trusts the hints and never samples data. Attributes without a
//! hint (and unknown attribute names) report `Unknown`.

use geostrata_core::schema::{Cardinality, SchemaDescriptor};

/// Reports the selectivity class of a named attribute.
#[must_use]
pub fn cardinality(schema: &SchemaDescriptor, attribute: &str) -> Cardinality {
    schema
        .attribute(attribute)
        .map(|a| a.cardinality)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hints_pass_through() {
        let schema = SchemaDescriptor::parse(
            "t",
            "high:String:index=true:cardinality=high,low:String:index=true:cardinality=low,plain:String",
        )
        .unwrap();
        assert_eq!(cardinality(&schema, "high"), Cardinality::High);
        assert_eq!(cardinality(&schema, "low"), Cardinality::Low);
        assert_eq!(cardinality(&schema, "plain"), Cardinality::Unknown);
        assert_eq!(cardinality(&schema, "missing"), Cardinality::Unknown);
    }
}
