use std::path::Path;

use crate::crs;
use crate::error::{ImportError, Result};
use crate::feature;
use crate::normalize;
use crate::postgis::TableWriter;

/// Destination table for the normalized postal-code layer.
pub const TABLE: &str = "germany_plz_with_pop";

/// Default location of the PLZ GeoJSON, relative to the working directory.
pub const DEFAULT_PATH: &str = "PLZ_Gebiete_2313071530551189147.geojson";

/// What a normalize-and-load run did: rows written and the source columns
/// the detection step settled on.
#[derive(Debug)]
pub struct PlzReport {
    pub rows: u64,
    pub plz_column: String,
    pub population_column: Option<String>,
}

/// Load one local PLZ GeoJSON, normalize its postal-code and population
/// columns, reproject everything to WGS84, and replace the destination
/// table, printing a progress line as each step lands. Fail-fast: the
/// first error aborts the whole run.
///
/// The file check runs before anything else, so a missing file never
/// touches the network or the database.
pub async fn run(writer: &dyn TableWriter, path: &Path) -> Result<PlzReport> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }

    println!("Loading GeoJSON from: {} ...", path.display());
    let text = std::fs::read_to_string(path)?;
    let mut collection = feature::parse_geojson(&text)?;
    println!("Loaded {} features", collection.len());

    let plz_column = normalize::detect_column(&collection, normalize::PLZ_CANDIDATES)
        .ok_or(ImportError::MissingPlzColumn)?
        .to_string();
    let population_column =
        normalize::detect_column(&collection, normalize::POPULATION_CANDIDATES).map(str::to_string);
    println!("Using PLZ column: {plz_column}");
    println!(
        "Using population column: {}",
        population_column.as_deref().unwrap_or("none")
    );

    normalize::apply(&mut collection, &plz_column, population_column.as_deref())?;
    crs::to_wgs84(&mut collection)?;

    println!("Writing to PostGIS table: {TABLE} ...");
    let rows = writer.replace_table(TABLE, &collection).await?;
    Ok(PlzReport {
        rows,
        plz_column,
        population_column,
    })
}
