//! Typed feature schemas and the schema-string grammar.
//!
//! The wire grammar is `name:type[:opt=val...]` per attribute, attributes
//! separated by commas, e.g.
//! `attr2:String:index=true:cardinality=high,geom:Point:srid=4326:default=true`.
//! A comma-separated chunk carrying `opt=val` but no `:` continues the
//! previous attribute's option list.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Semantic type of a schema attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeType {
    Int,
    Long,
    Float,
    Double,
    Bool,
    String,
    Uuid,
    Date,
    Point,
    LineString,
    Polygon,
    Geometry,
}

impl AttributeType {
    /// Canonical spelling used by the schema-string grammar.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Int => "Int",
            Self::Long => "Long",
            Self::Float => "Float",
            Self::Double => "Double",
            Self::Bool => "Bool",
            Self::String => "String",
            Self::Uuid => "Uuid",
            Self::Date => "Date",
            Self::Point => "Point",
            Self::LineString => "LineString",
            Self::Polygon => "Polygon",
            Self::Geometry => "Geometry",
        }
    }

    /// True for the geometric types.
    #[must_use]
    pub const fn is_geometry(&self) -> bool {
        matches!(
            self,
            Self::Point | Self::LineString | Self::Polygon | Self::Geometry
        )
    }
}

impl FromStr for AttributeType {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Int" => Ok(Self::Int),
            "Long" => Ok(Self::Long),
            "Float" => Ok(Self::Float),
            "Double" => Ok(Self::Double),
            "Bool" => Ok(Self::Bool),
            "String" => Ok(Self::String),
            "Uuid" => Ok(Self::Uuid),
            "Date" => Ok(Self::Date),
            "Point" => Ok(Self::Point),
            "LineString" => Ok(Self::LineString),
            "Polygon" => Ok(Self::Polygon),
            "Geometry" => Ok(Self::Geometry),
            _ => Err(()),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-declared selectivity class of an attribute. The planner trusts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    High,
    Unknown,
    Low,
}

impl Cardinality {
    /// Canonical lowercase spelling used by the schema-string grammar.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Unknown => "unknown",
            Self::Low => "low",
        }
    }
}

impl Default for Cardinality {
    fn default() -> Self {
        Self::Unknown
    }
}

impl FromStr for Cardinality {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "high" => Ok(Self::High),
            "unknown" => Ok(Self::Unknown),
            "low" => Ok(Self::Low),
            _ => Err(()),
        }
    }
}

/// One attribute of a feature schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDescriptor {
    /// Attribute name.
    pub name: String,
    /// Semantic type.
    pub attr_type: AttributeType,
    /// Whether the attribute participates in the attribute index.
    pub indexed: bool,
    /// Selectivity hint consumed by the strategy decider.
    pub cardinality: Cardinality,
    /// Spatial reference id; geometry attributes only.
    pub srid: Option<i32>,
    /// Marks the default geometry or default date attribute.
    pub default: bool,
}

impl AttributeDescriptor {
    /// Creates a plain, unindexed attribute.
    #[must_use]
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            indexed: false,
            cardinality: Cardinality::default(),
            srid: None,
            default: false,
        }
    }

    /// Marks the attribute as indexed.
    #[must_use]
    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    /// Sets the cardinality hint.
    #[must_use]
    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    /// Marks the attribute as the default geometry or default date.
    #[must_use]
    pub fn as_default(mut self) -> Self {
        self.default = true;
        self
    }

    fn spec_segment(&self) -> String {
        let mut s = format!("{}:{}", self.name, self.attr_type);
        if self.indexed {
            s.push_str(":index=true");
        }
        if self.cardinality != Cardinality::Unknown {
            s.push_str(&format!(":cardinality={}", self.cardinality.as_str()));
        }
        if let Some(srid) = self.srid {
            s.push_str(&format!(":srid={srid}"));
        }
        if self.default {
            s.push_str(":default=true");
        }
        s
    }
}

/// An ordered feature schema: a type name plus attribute descriptors.
///
/// Invariant: at most one attribute is the default geometry and at most one
/// is the default date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    type_name: String,
    attributes: Vec<AttributeDescriptor>,
}

impl SchemaDescriptor {
    /// Builds a schema from parts, enforcing the default-attribute invariant.
    pub fn new(
        type_name: impl Into<String>,
        attributes: Vec<AttributeDescriptor>,
    ) -> Result<Self> {
        let schema = Self {
            type_name: type_name.into(),
            attributes,
        };
        schema.validate()?;
        Ok(schema)
    }

    /// Parses the schema-string grammar.
    pub fn parse(type_name: impl Into<String>, spec: &str) -> Result<Self> {
        let mut attributes: Vec<AttributeDescriptor> = Vec::new();
        for chunk in spec.split(',') {
            let chunk = chunk.trim();
            if chunk.is_empty() {
                return Err(Error::invalid_schema("empty attribute segment"));
            }
            if !chunk.contains(':') && chunk.contains('=') {
                // Option continuation for the previous attribute.
                let attr = attributes.last_mut().ok_or_else(|| {
                    Error::invalid_schema(format!("dangling option `{chunk}`"))
                })?;
                apply_option(attr, chunk)?;
                continue;
            }
            let mut parts = chunk.split(':');
            let name = parts
                .next()
                .filter(|n| !n.is_empty())
                .ok_or_else(|| Error::invalid_schema(format!("missing name in `{chunk}`")))?;
            let type_str = parts
                .next()
                .ok_or_else(|| Error::invalid_schema(format!("missing type in `{chunk}`")))?;
            let attr_type = AttributeType::from_str(type_str)
                .map_err(|_| Error::invalid_schema(format!("unknown type `{type_str}`")))?;
            let mut attr = AttributeDescriptor::new(name, attr_type);
            for opt in parts {
                apply_option(&mut attr, opt)?;
            }
            attributes.push(attr);
        }
        Self::new(type_name, attributes)
    }

    fn validate(&self) -> Result<()> {
        if self.attributes.is_empty() {
            return Err(Error::invalid_schema("schema has no attributes"));
        }
        let default_geoms = self
            .attributes
            .iter()
            .filter(|a| a.default && a.attr_type.is_geometry())
            .count();
        if default_geoms > 1 {
            return Err(Error::invalid_schema("multiple default geometries"));
        }
        let default_dates = self
            .attributes
            .iter()
            .filter(|a| a.default && a.attr_type == AttributeType::Date)
            .count();
        if default_dates > 1 {
            return Err(Error::invalid_schema("multiple default dates"));
        }
        for a in &self.attributes {
            if a.srid.is_some() && !a.attr_type.is_geometry() {
                return Err(Error::invalid_schema(format!(
                    "srid on non-geometry attribute `{}`",
                    a.name
                )));
            }
        }
        Ok(())
    }

    /// The feature type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Attributes in declaration order.
    #[must_use]
    pub fn attributes(&self) -> &[AttributeDescriptor] {
        &self.attributes
    }

    /// Looks up an attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// The default geometry attribute: the one marked `default=true`, or the
    /// first geometry-typed attribute otherwise.
    #[must_use]
    pub fn default_geometry(&self) -> Option<&AttributeDescriptor> {
        self.attributes
            .iter()
            .find(|a| a.default && a.attr_type.is_geometry())
            .or_else(|| self.attributes.iter().find(|a| a.attr_type.is_geometry()))
    }

    /// The default date attribute: the one marked `default=true`, or the
    /// first `Date` attribute otherwise.
    #[must_use]
    pub fn default_date(&self) -> Option<&AttributeDescriptor> {
        self.attributes
            .iter()
            .find(|a| a.default && a.attr_type == AttributeType::Date)
            .or_else(|| {
                self.attributes
                    .iter()
                    .find(|a| a.attr_type == AttributeType::Date)
            })
    }

    /// Renders the canonical schema string.
    #[must_use]
    pub fn to_spec_string(&self) -> String {
        self.attributes
            .iter()
            .map(AttributeDescriptor::spec_segment)
            .collect::<Vec<_>>()
            .join(",")
    }
}

fn apply_option(attr: &mut AttributeDescriptor, opt: &str) -> Result<()> {
    let (key, value) = opt
        .split_once('=')
        .ok_or_else(|| Error::invalid_schema(format!("malformed option `{opt}`")))?;
    match key {
        "index" => {
            attr.indexed = parse_bool(value)
                .ok_or_else(|| Error::invalid_schema(format!("bad index value `{value}`")))?;
        }
        "cardinality" => {
            attr.cardinality = Cardinality::from_str(value)
                .map_err(|_| Error::invalid_schema(format!("bad cardinality `{value}`")))?;
        }
        "srid" => {
            if !attr.attr_type.is_geometry() {
                return Err(Error::invalid_schema(format!(
                    "srid on non-geometry attribute `{}`",
                    attr.name
                )));
            }
            attr.srid = Some(
                value
                    .parse()
                    .map_err(|_| Error::invalid_schema(format!("bad srid `{value}`")))?,
            );
        }
        "default" => {
            attr.default = parse_bool(value)
                .ok_or_else(|| Error::invalid_schema(format!("bad default value `{value}`")))?;
        }
        _ => {
            return Err(Error::invalid_schema(format!("unknown option `{key}`")));
        }
    }
    Ok(())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        let spec = "attr1:String,attr2:String:index=true,high:String:index=true:cardinality=high,dtg:Date:default=true,geom:Point:srid=4326:default=true";
        let schema = SchemaDescriptor::parse("points", spec).unwrap();

        assert_eq!(schema.type_name(), "points");
        assert_eq!(schema.attributes().len(), 5);
        assert!(!schema.attribute("attr1").unwrap().indexed);
        assert!(schema.attribute("attr2").unwrap().indexed);
        assert_eq!(
            schema.attribute("high").unwrap().cardinality,
            Cardinality::High
        );
        assert_eq!(schema.attribute("geom").unwrap().srid, Some(4326));
        assert_eq!(schema.to_spec_string(), spec);
    }

    #[test]
    fn test_option_continuation_chunk() {
        // An `opt=val` chunk with no colon continues the previous attribute.
        let schema = SchemaDescriptor::parse("t", "a:String:index=true,cardinality=low,geom:Point").unwrap();
        let a = schema.attribute("a").unwrap();
        assert!(a.indexed);
        assert_eq!(a.cardinality, Cardinality::Low);
    }

    #[test]
    fn test_default_resolution() {
        let schema =
            SchemaDescriptor::parse("t", "geom:Point,other:Polygon,dtg:Date").unwrap();
        // No explicit defaults: first geometry and first date win.
        assert_eq!(schema.default_geometry().unwrap().name, "geom");
        assert_eq!(schema.default_date().unwrap().name, "dtg");

        let schema =
            SchemaDescriptor::parse("t", "geom:Point,other:Polygon:default=true").unwrap();
        assert_eq!(schema.default_geometry().unwrap().name, "other");
    }

    #[test]
    fn test_conflicting_defaults_rejected() {
        let err = SchemaDescriptor::parse("t", "a:Point:default=true,b:Point:default=true")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSchema { .. }));

        let err = SchemaDescriptor::parse("t", "a:Date:default=true,b:Date:default=true")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSchema { .. }));
    }

    #[test]
    fn test_malformed_specs_rejected() {
        assert!(SchemaDescriptor::parse("t", "").is_err());
        assert!(SchemaDescriptor::parse("t", "name").is_err());
        assert!(SchemaDescriptor::parse("t", "name:Nope").is_err());
        assert!(SchemaDescriptor::parse("t", "name:String:bogus=1").is_err());
        assert!(SchemaDescriptor::parse("t", "name:String:srid=4326").is_err());
    }
}
