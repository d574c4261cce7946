use geojson::{GeoJson, JsonObject};

use crate::crs;
use crate::error::Result;

/// One parsed feature: an optional geometry plus its scalar attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: Option<geo_types::Geometry<f64>>,
    pub properties: JsonObject,
}

/// An in-memory feature table loaded wholesale from one source.
///
/// All geometries share the coordinate reference system identified by
/// `srid`; reprojection updates it for the whole collection at once.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
    pub srid: i32,
}

impl FeatureCollection {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Attribute column names in first-seen order across all features.
    pub fn column_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for feature in &self.features {
            for key in feature.properties.keys() {
                if !names.iter().any(|name| name == key) {
                    names.push(key.clone());
                }
            }
        }
        names
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.features
            .iter()
            .any(|feature| feature.properties.contains_key(name))
    }
}

/// Parse GeoJSON text into a [`FeatureCollection`], defaulting to WGS84
/// when the document does not declare a CRS (RFC 7946).
pub fn parse_geojson(text: &str) -> Result<FeatureCollection> {
    parse_geojson_with_fallback(text, crs::WGS84_SRID)
}

/// Parse GeoJSON text, falling back to `fallback_srid` when the document
/// carries no legacy `crs` member.
///
/// Accepts a FeatureCollection, a single Feature, or a bare Geometry.
pub fn parse_geojson_with_fallback(text: &str, fallback_srid: i32) -> Result<FeatureCollection> {
    let geojson: GeoJson = text.parse()?;
    let srid = declared_srid(&geojson).unwrap_or(fallback_srid);

    let features = match geojson {
        GeoJson::FeatureCollection(collection) => collection
            .features
            .into_iter()
            .map(convert_feature)
            .collect::<Result<Vec<_>>>()?,
        GeoJson::Feature(feature) => vec![convert_feature(feature)?],
        GeoJson::Geometry(geometry) => vec![Feature {
            geometry: Some(geo_types::Geometry::try_from(geometry)?),
            properties: JsonObject::new(),
        }],
    };

    Ok(FeatureCollection { features, srid })
}

fn convert_feature(feature: geojson::Feature) -> Result<Feature> {
    let geometry = match feature.geometry {
        Some(geometry) => Some(geo_types::Geometry::try_from(geometry)?),
        None => None,
    };
    Ok(Feature {
        geometry,
        properties: feature.properties.unwrap_or_default(),
    })
}

/// The SRID named by the legacy `crs` foreign member, if any.
fn declared_srid(geojson: &GeoJson) -> Option<i32> {
    let members = match geojson {
        GeoJson::FeatureCollection(collection) => collection.foreign_members.as_ref(),
        GeoJson::Feature(feature) => feature.foreign_members.as_ref(),
        GeoJson::Geometry(geometry) => geometry.foreign_members.as_ref(),
    }?;
    let name = members.get("crs")?.get("properties")?.get("name")?.as_str()?;
    crs::epsg_from_name(name)
}
