use geo::MapCoords;
use geo_types::Coord;
use proj4rs::proj::Proj;
use proj4rs::transform::transform;

use crate::error::{ImportError, Result};
use crate::feature::FeatureCollection;

pub const WGS84_SRID: i32 = 4326;

const WGS84_DEFINITION: &str = "+proj=longlat +datum=WGS84 +no_defs";

/// proj4 definitions for the EPSG codes German open-data services serve.
fn proj_definition(srid: i32) -> Option<&'static str> {
    match srid {
        4326 => Some(WGS84_DEFINITION),
        4258 => Some("+proj=longlat +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +no_defs"),
        3857 => Some(
            "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +nadgrids=@null +no_defs",
        ),
        25832 => Some("+proj=utm +zone=32 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs"),
        25833 => Some("+proj=utm +zone=33 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs"),
        _ => None,
    }
}

/// Geographic systems carry coordinates in degrees; proj4rs expects radians
/// for those and meters for projected systems.
fn is_geographic(srid: i32) -> bool {
    matches!(srid, 4326 | 4258)
}

/// Extract an EPSG code from the CRS identifier spellings found in GeoJSON
/// `crs` members and WFS capabilities: `EPSG:4326`,
/// `urn:ogc:def:crs:EPSG::25833`, OGC URL form, and `CRS84`.
pub fn epsg_from_name(name: &str) -> Option<i32> {
    let trimmed = name.trim();
    if trimmed.eq_ignore_ascii_case("urn:ogc:def:crs:OGC:1.3:CRS84")
        || trimmed.eq_ignore_ascii_case("OGC:CRS84")
        || trimmed.eq_ignore_ascii_case("CRS84")
    {
        return Some(WGS84_SRID);
    }
    let code = trimmed.rsplit([':', '/']).next()?;
    code.parse().ok()
}

/// Reproject every geometry in the collection to WGS84 (EPSG:4326).
///
/// A collection already in WGS84 passes through untouched. Unregistered
/// source systems are an error.
pub fn to_wgs84(collection: &mut FeatureCollection) -> Result<()> {
    if collection.srid == WGS84_SRID {
        return Ok(());
    }

    let srid = collection.srid;
    let definition = proj_definition(srid).ok_or(ImportError::UnknownCrs(srid))?;
    let source = Proj::from_proj_string(definition)?;
    let target = Proj::from_proj_string(WGS84_DEFINITION)?;
    let geographic_source = is_geographic(srid);

    let transform_coord = |coord: Coord<f64>| -> Result<Coord<f64>> {
        let mut point = if geographic_source {
            (coord.x.to_radians(), coord.y.to_radians(), 0.0)
        } else {
            (coord.x, coord.y, 0.0)
        };
        transform(&source, &target, &mut point)?;
        Ok(Coord {
            x: point.0.to_degrees(),
            y: point.1.to_degrees(),
        })
    };

    for feature in &mut collection.features {
        if let Some(geometry) = feature.geometry.take() {
            feature.geometry = Some(geometry.try_map_coords(transform_coord)?);
        }
    }

    collection.srid = WGS84_SRID;
    Ok(())
}
